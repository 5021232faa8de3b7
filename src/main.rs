// ==========================================
// 销售分析看板 - HTTP 服务主入口
// ==========================================

use anyhow::Context;
use sales_analytics::app::{create_router, AppState};
use sales_analytics::config::AppConfig;
use sales_analytics::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - Excel 导入服务", sales_analytics::APP_NAME);
    tracing::info!("系统版本: {}", sales_analytics::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("加载配置失败")?;
    tracing::info!("使用数据库: {}", config.database_path);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config).map_err(anyhow::Error::msg)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("无法监听地址 {}", bind_addr))?;
    tracing::info!("HTTP 服务已启动: http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("HTTP 服务已退出");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("无法监听退出信号: {}", e);
    }
}
