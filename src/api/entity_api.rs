// ==========================================
// 销售分析看板 - 实体API
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::Entity;
use crate::repository::SalesDataSink;
use std::sync::Arc;

/// 欧洲汇总视图名称
pub const EUROPE: &str = "Europe";

/// 实体API
pub struct EntityApi<S: SalesDataSink> {
    sink: Arc<S>,
}

impl<S: SalesDataSink> EntityApi<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// 已有数据的实体（排序）
    ///
    /// 荷兰 / 德国 / 英国任一有数据时追加 "Europe"
    pub async fn list_entities(&self) -> ApiResult<Vec<String>> {
        let entities = self.sink.distinct_entities().await?;
        Ok(with_europe(entities))
    }
}

fn with_europe(mut entities: Vec<String>) -> Vec<String> {
    let has_europe_source = Entity::EUROPE_SOURCES
        .iter()
        .any(|source| entities.iter().any(|e| e == source.as_str()));

    if has_europe_source && !entities.iter().any(|e| e == EUROPE) {
        entities.push(EUROPE.to_string());
    }
    entities.sort();
    entities.dedup();
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_europe_added_for_european_source() {
        assert_eq!(
            with_europe(strings(&["USA", "Germany"])),
            strings(&["Europe", "Germany", "USA"])
        );
    }

    #[test]
    fn test_no_europe_without_sources() {
        assert_eq!(with_europe(strings(&["USA", "HQ"])), strings(&["HQ", "USA"]));
        assert!(with_europe(Vec::new()).is_empty());
    }
}
