//! Local backend ⇄ unified mappings.

use super::{dedup_categories, from_epoch_millis, to_epoch_millis};
use unimem_types::local::{
    LocalCreateRequest, LocalFilterRequest, LocalMemory, LocalPage, DEFAULT_LOCAL_PAGE_SIZE,
};
use unimem_types::memory::MemoryPage;
use unimem_types::options::{RequestOptions, SearchOptions};
use unimem_types::{MemoryResult, MemorySource, UnifiedMemory};

pub fn to_unified(memory: LocalMemory) -> MemoryResult<UnifiedMemory> {
    let created_at = from_epoch_millis(memory.created_at)?;
    let updated_at = memory.updated_at.map(from_epoch_millis).transpose()?;

    let mut unified = UnifiedMemory::new(memory.id, memory.content, created_at, MemorySource::Local);
    unified.updated_at = updated_at;
    unified.categories = dedup_categories(memory.categories);
    unified.metadata = memory.metadata.unwrap_or_default();
    unified.client = memory.client;
    unified.app_name = memory.app_name;
    unified.state = memory.state;
    Ok(unified)
}

pub fn from_unified(memory: &UnifiedMemory) -> LocalMemory {
    LocalMemory {
        id: memory.id.clone(),
        content: memory.content.clone(),
        created_at: to_epoch_millis(&memory.created_at),
        updated_at: memory.updated_at.as_ref().map(to_epoch_millis),
        state: memory.state,
        app_name: memory.app_name.clone(),
        client: memory.client.clone(),
        categories: memory.categories.clone(),
        metadata: (!memory.metadata.is_empty()).then(|| memory.metadata.clone()),
    }
}

pub fn page_to_unified(page: LocalPage) -> MemoryResult<MemoryPage> {
    let items = page
        .items
        .into_iter()
        .map(to_unified)
        .collect::<MemoryResult<Vec<_>>>()?;
    Ok(MemoryPage {
        items,
        total: page.total,
        page: page.page,
        size: page.size,
        pages: page.pages,
    })
}

/// List options → filter body. `default_user` applies when none is given.
pub fn to_filter(options: &RequestOptions, default_user: &str) -> LocalFilterRequest {
    LocalFilterRequest {
        user_id: options
            .user_id
            .clone()
            .unwrap_or_else(|| default_user.to_string()),
        page: options.page.unwrap_or(1).max(1),
        size: options.page_size.unwrap_or(DEFAULT_LOCAL_PAGE_SIZE),
        search_query: None,
        app_ids: options.app_ids.clone(),
        category_ids: options.categories.clone(),
        sort_column: options.sort_column.clone(),
        sort_direction: options.sort_direction,
        show_archived: options.show_archived,
    }
}

/// Search options → filter body with `search_query` set.
///
/// `limit` becomes the page size unless an explicit page size was given.
pub fn to_search_filter(query: &str, options: &SearchOptions, default_user: &str) -> LocalFilterRequest {
    let mut filter = to_filter(&options.request, default_user);
    filter.search_query = Some(query.to_string());
    if options.request.page_size.is_none() {
        if let Some(limit) = options.limit {
            filter.size = limit;
        }
    }
    filter
}

pub fn to_create(
    text: &str,
    options: &RequestOptions,
    default_user: &str,
    default_app: &str,
) -> LocalCreateRequest {
    LocalCreateRequest {
        user_id: options
            .user_id
            .clone()
            .unwrap_or_else(|| default_user.to_string()),
        text: text.to_string(),
        infer: options.infer.unwrap_or(true),
        app: options
            .app
            .clone()
            .unwrap_or_else(|| default_app.to_string()),
        metadata: options.metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use unimem_types::local::SortDirection;
    use unimem_types::MemoryState;

    fn sample() -> LocalMemory {
        LocalMemory {
            id: "3f1c".to_string(),
            content: "Allergic to peanuts".to_string(),
            created_at: 1_716_000_000_456,
            updated_at: Some(1_716_000_100_000),
            state: Some(MemoryState::Paused),
            app_name: Some("cursor".to_string()),
            client: Some("claude".to_string()),
            categories: vec!["health".to_string(), "food".to_string()],
            metadata: Some(HashMap::from([(
                "source".to_string(),
                serde_json::json!("chat"),
            )])),
        }
    }

    #[test]
    fn test_roundtrip_preserves_representable_fields() {
        let original = sample();
        let unified = to_unified(original.clone()).unwrap();
        assert_eq!(unified.source, MemorySource::Local);
        assert_eq!(from_unified(&unified), original);
    }

    #[test]
    fn test_platform_only_fields_absent() {
        let unified = to_unified(sample()).unwrap();
        assert!(unified.user_id.is_none());
        assert!(unified.agent_id.is_none());
        assert!(unified.score.is_none());
        assert!(unified.hash.is_none());
        assert!(unified.messages.is_none());
        let json = serde_json::to_value(&unified).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("score").is_none());
    }

    #[test]
    fn test_missing_metadata_roundtrips_as_none() {
        let mut original = sample();
        original.metadata = None;
        original.updated_at = None;
        let unified = to_unified(original.clone()).unwrap();
        assert!(unified.metadata.is_empty());
        assert!(unified.updated_at.is_none());
        assert_eq!(from_unified(&unified), original);
    }

    #[test]
    fn test_page_conversion() {
        let page = LocalPage {
            items: vec![sample()],
            total: 31,
            page: 2,
            size: 10,
            pages: 4,
        };
        let unified = page_to_unified(page).unwrap();
        assert_eq!(unified.items.len(), 1);
        assert_eq!((unified.total, unified.page, unified.size, unified.pages), (31, 2, 10, 4));
    }

    #[test]
    fn test_filter_defaults_and_overrides() {
        let filter = to_filter(&RequestOptions::new(), "default_user");
        assert_eq!(filter.user_id, "default_user");
        assert_eq!(filter.page, 1);
        assert_eq!(filter.size, DEFAULT_LOCAL_PAGE_SIZE);

        let mut opts = RequestOptions::new()
            .with_user("alice")
            .with_page(3, 50)
            .with_categories(vec!["work".into()]);
        opts.sort_direction = Some(SortDirection::Desc);
        opts.show_archived = Some(true);
        let filter = to_filter(&opts, "default_user");
        assert_eq!(filter.user_id, "alice");
        assert_eq!((filter.page, filter.size), (3, 50));
        assert_eq!(filter.category_ids, Some(vec!["work".to_string()]));
        assert_eq!(filter.sort_direction, Some(SortDirection::Desc));
        assert_eq!(filter.show_archived, Some(true));
    }

    #[test]
    fn test_search_filter_uses_limit_as_size() {
        let opts = SearchOptions::new().with_limit(5);
        let filter = to_search_filter("coffee", &opts, "u");
        assert_eq!(filter.search_query.as_deref(), Some("coffee"));
        assert_eq!(filter.size, 5);

        let opts = SearchOptions::new()
            .with_limit(5)
            .with_request(RequestOptions::new().with_page(1, 20));
        assert_eq!(to_search_filter("coffee", &opts, "u").size, 20);
    }

    #[test]
    fn test_create_defaults() {
        let req = to_create("likes jazz", &RequestOptions::new(), "default_user", "unimem");
        assert_eq!(req.user_id, "default_user");
        assert_eq!(req.app, "unimem");
        assert!(req.infer);
        assert!(req.metadata.is_none());
    }
}
