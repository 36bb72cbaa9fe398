//! Cache item search and removal

use regex::RegexBuilder;
use tracing::warn;

use crate::cluster_client::{CacheAdminRepository, CacheItemStore};
use crate::domain::models::CacheItem;
use crate::errors::AppError;

pub const MAX_PATTERN_LENGTH: usize = 512;

/// Keys of `cache_name` matching `pattern` (case-insensitive regular expression).
///
/// With a region only that region is enumerated, otherwise every region the
/// cluster reports for the cache.
pub async fn search_cache_items(
    admin: &dyn CacheAdminRepository,
    store: &dyn CacheItemStore,
    pattern: &str,
    cache_name: &str,
    region: Option<&str>,
) -> Result<Vec<CacheItem>, AppError> {
    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return Err(AppError::bad_request(
            "invalid_pattern",
            "pattern must not exceed 512 characters",
        ));
    }

    let matcher = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|_| AppError::bad_request("invalid_pattern", "pattern regex is invalid"))?;

    let regions = match region {
        Some(region) => vec![region.to_string()],
        None => admin
            .cache_regions(cache_name)
            .await?
            .into_iter()
            .map(|region| region.region_name)
            .collect(),
    };

    let mut items = Vec::new();
    for region in regions {
        let keys = store.region_keys(cache_name, &region).await?;
        items.extend(
            keys.into_iter()
                .filter(|key| matcher.is_match(key))
                .map(|key| CacheItem {
                    key,
                    named_cache: cache_name.to_string(),
                    region: Some(region.clone()),
                }),
        );
    }

    Ok(items)
}

pub async fn remove_cache_item(
    store: &dyn CacheItemStore,
    cache_name: &str,
    key: &str,
) -> Result<bool, AppError> {
    store.remove_item(cache_name, key).await
}

/// Removes every item and returns only the ones the store actually removed.
pub async fn remove_cache_items(store: &dyn CacheItemStore, items: Vec<CacheItem>) -> Vec<CacheItem> {
    let mut removed = Vec::with_capacity(items.len());
    for item in items {
        if item.key.trim().is_empty() {
            continue;
        }

        match remove_cache_item(store, &item.named_cache, &item.key).await {
            Ok(true) => removed.push(item),
            Ok(false) => {}
            Err(err) => warn!(cache = %item.named_cache, key = %item.key, error = %err, "cache item removal failed"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::domain::fakes::FakeCluster;
    use crate::domain::models::Region;

    fn region(name: &str) -> Region {
        Region {
            region_name: name.to_string(),
            cache_name: "orders".to_string(),
            ..Default::default()
        }
    }

    fn cluster() -> FakeCluster {
        FakeCluster {
            regions: vec![region("eu"), region("us")],
            items: Mutex::new(vec![
                ("eu".to_string(), "Order:1".to_string()),
                ("eu".to_string(), "customer:7".to_string()),
                ("us".to_string(), "order:2".to_string()),
            ]),
            ..Default::default()
        }
    }

    fn item(key: &str) -> CacheItem {
        CacheItem {
            key: key.to_string(),
            named_cache: "orders".to_string(),
            region: None,
        }
    }

    #[tokio::test]
    async fn searches_every_region_case_insensitively() {
        let cluster = cluster();
        let items = search_cache_items(&cluster, &cluster, "^order:", "orders", None)
            .await
            .expect("search");

        let keys = items.iter().map(|item| item.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["Order:1", "order:2"]);
        assert_eq!(items[1].region.as_deref(), Some("us"));
    }

    #[tokio::test]
    async fn searches_only_the_given_region() {
        let cluster = cluster();
        let items = search_cache_items(&cluster, &cluster, "order", "orders", Some("us"))
            .await
            .expect("search");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "order:2");
    }

    #[tokio::test]
    async fn invalid_pattern_is_a_bad_request() {
        let cluster = cluster();
        let error = search_cache_items(&cluster, &cluster, "order(", "orders", None)
            .await
            .expect_err("invalid regex");

        assert!(matches!(error, AppError::BadRequest { code: "invalid_pattern", .. }));
    }

    #[tokio::test]
    async fn pattern_limit_counts_characters() {
        let cluster = cluster();
        let accented = "é".repeat(MAX_PATTERN_LENGTH);
        assert!(accented.len() > MAX_PATTERN_LENGTH);
        let items = search_cache_items(&cluster, &cluster, &accented, "orders", None)
            .await
            .expect("search");
        assert!(items.is_empty());

        let too_long = "é".repeat(MAX_PATTERN_LENGTH + 1);
        let error = search_cache_items(&cluster, &cluster, &too_long, "orders", None)
            .await
            .expect_err("pattern too long");
        assert!(matches!(error, AppError::BadRequest { code: "invalid_pattern", .. }));
    }

    #[tokio::test]
    async fn batch_remove_returns_only_removed_items() {
        let cluster = cluster();
        let removed = remove_cache_items(
            &cluster,
            vec![item("Order:1"), item("missing"), item("poison"), item(" "), item("order:2")],
        )
        .await;

        let keys = removed.iter().map(|item| item.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["Order:1", "order:2"]);
        assert_eq!(cluster.items.lock().expect("items lock").len(), 1);
    }
}
