// ==========================================
// 销售分析看板 - HTTP 路由
// ==========================================
// 职责: axum Router + 处理函数，将请求转交 API 层
// 线程: 同步 API 调用（解析 / SQLite）一律放到 blocking 线程池执行
// 错误响应: { success: false, error, details }
// ==========================================

use crate::api::{ApiError, ApiResult, ErrorBody};
use crate::app::state::AppState;
use crate::importer::{ImportError, ImportOutcome};
use crate::perf::PerfGuard;
use crate::VERSION;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// 创建 HTTP 路由
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/entities", get(list_entities))
        .route("/api/column-mapping/detect", post(detect_columns))
        .route(
            "/api/column-mapping",
            get(get_column_mapping)
                .post(save_column_mapping)
                .delete(delete_column_mapping),
        )
        .route("/api/upload/validate", post(validate_upload))
        .route("/api/upload/history", get(upload_history))
        .route("/api/upload/:entity", post(upload_entity))
        .route("/api/exchange-rate", get(list_exchange_rates))
        .route("/api/exchange-rate/upload", post(upload_exchange_rates))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==========================================
// 错误响应
// ==========================================

/// 处理函数失败：操作概要 + API 错误
pub struct Failure {
    operation: &'static str,
    error: ApiError,
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(operation = self.operation, error = %self.error, "请求处理失败");
        } else {
            warn!(operation = self.operation, error = %self.error, "请求被拒绝");
        }

        (status, Json(ErrorBody::new(self.operation, &self.error))).into_response()
    }
}

fn fail<E: Into<ApiError>>(operation: &'static str) -> impl Fn(E) -> Failure {
    move |err| Failure {
        operation,
        error: err.into(),
    }
}

type HandlerResult<T> = Result<T, Failure>;

/// 在 blocking 线程池上执行同步 API 调用
async fn run_blocking<T, F>(
    operation: &'static str,
    perf_op: &'static str,
    f: F,
) -> HandlerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _perf = PerfGuard::new(perf_op);
        f()
    })
    .await
    .map_err(|e| {
        fail::<ApiError>(operation)(ApiError::InternalError(format!("Task failed: {}", e)))
    })?
    .map_err(fail(operation))
}

// ==========================================
// multipart 读取
// ==========================================

/// 上传表单（file + 可选 entity）
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    entity: Option<String>,
}

impl UploadForm {
    fn take_file(&mut self) -> Result<(String, Vec<u8>), ApiError> {
        self.file.take().ok_or_else(|| ImportError::MissingFile.into())
    }
}

fn multipart_error(err: MultipartError, limit_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            limit_mb: limit_bytes.div_ceil(1024 * 1024),
        }
    } else {
        ApiError::InvalidInput(err.body_text())
    }
}

async fn read_upload_form(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit_bytes))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, limit_bytes))?;
                debug!(file_name = %file_name, size = bytes.len(), "收到上传文件");
                form.file = Some((file_name, bytes.to_vec()));
            }
            Some("entity") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, limit_bytes))?;
                form.entity = Some(text.trim().to_string()).filter(|e| !e.is_empty());
            }
            _ => {}
        }
    }

    Ok(form)
}

// ==========================================
// 处理函数
// ==========================================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

async fn list_entities(State(state): State<AppState>) -> HandlerResult<Json<Value>> {
    let entities = state
        .entity_api
        .list_entities()
        .await
        .map_err(fail("Failed to fetch entities"))?;
    Ok(Json(json!({ "entities": entities })))
}

async fn detect_columns(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to detect columns";
    let mut form = read_upload_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(fail(OP))?;
    let (file_name, bytes) = form.take_file().map_err(fail(OP))?;

    let api = state.import_api.clone();
    let detected = run_blocking(OP, "http.detect_columns", move || {
        api.detect_columns(&file_name, &bytes)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "excelColumns": detected.excel_columns,
        "dbColumns": detected.db_columns,
    })))
}

async fn validate_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to validate file";
    let form = read_upload_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(fail(OP))?;
    let (Some((file_name, bytes)), Some(entity)) = (form.file, form.entity) else {
        return Err(fail(OP)(ApiError::InvalidInput(
            "File and entity are required".to_string(),
        )));
    };

    let api = state.import_api.clone();
    let result = run_blocking(OP, "http.validate_upload", move || {
        api.validate_upload(&file_name, &bytes, &entity)
    })
    .await?;
    Ok(Json(json!(result)))
}

async fn upload_entity(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    multipart: Multipart,
) -> HandlerResult<Response> {
    const OP: &str = "Upload failed";
    let mut form = read_upload_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(fail(OP))?;
    let (file_name, bytes) = form.take_file().map_err(fail(OP))?;

    // 导入管道含解析与 SQLite 事务，整体在 blocking 线程上驱动
    let api = state.import_api.clone();
    let handle = tokio::runtime::Handle::current();
    let outcome = run_blocking(OP, "http.upload", move || {
        handle.block_on(api.upload(&entity, &file_name, &bytes))
    })
    .await?;

    let response = match outcome {
        ImportOutcome::Imported(summary) => Json(json!({
            "success": true,
            "message": "File uploaded successfully",
            "rowsInserted": summary.rows_inserted,
            "rowsSkipped": summary.rows_skipped,
            "summary": summary,
        }))
        .into_response(),
        ImportOutcome::Rejected(validation) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Validation failed",
                "validation": validation,
            })),
        )
            .into_response(),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    entity: Option<String>,
    limit: Option<usize>,
}

async fn upload_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to fetch upload history";
    let api = state.import_api.clone();
    let history = run_blocking(OP, "http.upload_history", move || {
        api.list_history(query.entity.as_deref(), query.limit)
    })
    .await?;
    Ok(Json(json!({ "history": history })))
}

#[derive(Debug, Deserialize)]
struct EntityQuery {
    entity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveMappingRequest {
    entity: Option<String>,
    mappings: Option<HashMap<String, String>>,
}

fn require_entity_param(entity: Option<String>) -> Result<String, ApiError> {
    entity
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("Entity parameter is required".to_string()))
}

async fn get_column_mapping(
    State(state): State<AppState>,
    Query(query): Query<EntityQuery>,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to fetch column mappings";
    let entity = require_entity_param(query.entity).map_err(fail(OP))?;
    let api = state.column_mapping_api.clone();
    let resp = run_blocking(OP, "http.get_column_mapping", move || api.get(&entity)).await?;

    Ok(Json(json!({
        "success": true,
        "entity": resp.entity,
        "mapping": resp.mapping,
        "mappings": resp.mappings,
    })))
}

async fn save_column_mapping(
    State(state): State<AppState>,
    Json(body): Json<SaveMappingRequest>,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to save column mappings";
    let (Some(entity), Some(mappings)) = (body.entity, body.mappings) else {
        return Err(fail(OP)(ApiError::InvalidInput(
            "Entity and mappings are required".to_string(),
        )));
    };

    let api = state.column_mapping_api.clone();
    let count = run_blocking(OP, "http.save_column_mapping", move || {
        api.save(&entity, &mappings)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Column mappings saved successfully",
        "count": count,
    })))
}

async fn delete_column_mapping(
    State(state): State<AppState>,
    Query(query): Query<EntityQuery>,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to delete column mappings";
    let entity = require_entity_param(query.entity).map_err(fail(OP))?;
    let api = state.column_mapping_api.clone();
    let count =
        run_blocking(OP, "http.delete_column_mapping", move || api.delete(&entity)).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Column mappings deleted successfully",
        "count": count,
    })))
}

#[derive(Debug, Deserialize)]
struct YearQuery {
    year: Option<i32>,
}

async fn list_exchange_rates(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to fetch exchange rates";
    let api = state.exchange_rate_api.clone();
    let rates = run_blocking(OP, "http.list_exchange_rates", move || api.list(query.year)).await?;
    Ok(Json(json!({ "success": true, "rates": rates })))
}

async fn upload_exchange_rates(
    State(state): State<AppState>,
    multipart: Multipart,
) -> HandlerResult<Json<Value>> {
    const OP: &str = "Failed to process file";
    let mut form = read_upload_form(multipart, state.config.max_upload_bytes)
        .await
        .map_err(fail(OP))?;
    let (file_name, bytes) = form.take_file().map_err(fail(OP))?;

    let api = state.exchange_rate_api.clone();
    let summary = run_blocking(OP, "http.upload_exchange_rates", move || {
        api.upload(&file_name, &bytes)
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully uploaded {} exchange rates", summary.count),
        "count": summary.count,
        "skipped": summary.skipped,
        "rates": summary.rates,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status_from_api_error() {
        let resp = fail::<ApiError>("Upload failed")(ApiError::PayloadTooLarge { limit_mb: 100 })
            .into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = fail::<ApiError>("Upload failed")(ApiError::InternalError("boom".to_string()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_run_blocking_maps_errors_and_panics() {
        let ok = run_blocking("Upload failed", "test.ok", || Ok(7)).await;
        assert!(matches!(ok, Ok(7)));

        let err = run_blocking::<(), _>("Upload failed", "test.err", || {
            Err(ApiError::InvalidInput("bad".to_string()))
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let panicked = run_blocking::<(), _>("Upload failed", "test.panic", || panic!("boom"))
            .await
            .err()
            .unwrap();
        assert_eq!(panicked.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upload_form_requires_file() {
        let mut form = UploadForm::default();
        let err = form.take_file().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "No file provided");
    }
}
