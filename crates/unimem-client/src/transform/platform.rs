//! Platform backend ⇄ unified mappings.

use super::{dedup_categories, format_iso, parse_iso};
use chrono::{SubsecRound, Utc};
use unimem_types::memory::MemoryPage;
use unimem_types::options::{RequestOptions, SearchOptions};
use unimem_types::platform::{PlatformListing, PlatformMemory, PlatformOptions};
use unimem_types::{MemoryError, MemoryResult, MemorySource, Message, UnifiedMemory};

/// Platform record → unified.
///
/// `updated_at` stands in for a missing `created_at`. Add-event records
/// (those carrying `event`) may have neither and are stamped with the time
/// of receipt; any other record without a timestamp is rejected. Either
/// substitute marks the result `created_at_derived`.
pub fn to_unified(memory: PlatformMemory) -> MemoryResult<UnifiedMemory> {
    let derived = memory.created_at.is_none();
    let created_raw = memory.created_at.as_deref().or(memory.updated_at.as_deref());
    let created_at = match (created_raw, &memory.event) {
        (Some(raw), _) => parse_iso(raw)?,
        (None, Some(_)) => Utc::now().trunc_subsecs(3),
        (None, None) => {
            return Err(MemoryError::Serialization(format!(
                "memory {} has no timestamp",
                memory.id
            )))
        }
    };
    let updated_at = memory.updated_at.as_deref().map(parse_iso).transpose()?;
    let content = memory.text().unwrap_or_default().to_string();

    let mut unified = UnifiedMemory::new(memory.id, content, created_at, MemorySource::Platform);
    unified.created_at_derived = derived;
    unified.updated_at = updated_at;
    unified.categories = dedup_categories(memory.categories.unwrap_or_default());
    unified.metadata = memory.metadata.unwrap_or_default();
    unified.user_id = memory.user_id;
    unified.agent_id = memory.agent_id;
    unified.app_id = memory.app_id;
    unified.run_id = memory.run_id;
    unified.messages = memory.messages;
    unified.score = memory.score;
    unified.hash = memory.hash;
    unified.memory_type = memory.memory_type;
    unified.owner = memory.owner;
    Ok(unified)
}

pub fn from_unified(memory: &UnifiedMemory) -> PlatformMemory {
    PlatformMemory {
        id: memory.id.clone(),
        memory: Some(memory.content.clone()),
        data: None,
        event: None,
        created_at: (!memory.created_at_derived).then(|| format_iso(&memory.created_at)),
        updated_at: memory.updated_at.as_ref().map(format_iso),
        user_id: memory.user_id.clone(),
        agent_id: memory.agent_id.clone(),
        app_id: memory.app_id.clone(),
        run_id: memory.run_id.clone(),
        hash: memory.hash.clone(),
        metadata: (!memory.metadata.is_empty()).then(|| memory.metadata.clone()),
        categories: (!memory.categories.is_empty()).then(|| memory.categories.clone()),
        score: memory.score,
        messages: memory.messages.clone(),
        memory_type: memory.memory_type.clone(),
        owner: memory.owner.clone(),
    }
}

pub fn all_to_unified(memories: Vec<PlatformMemory>) -> MemoryResult<Vec<UnifiedMemory>> {
    memories.into_iter().map(to_unified).collect()
}

/// Listing → page. `requested` is the `(page, page_size)` pair that was sent.
pub fn listing_to_page(
    listing: PlatformListing,
    requested: Option<(u32, u32)>,
) -> MemoryResult<MemoryPage> {
    match listing {
        PlatformListing::Paginated { count, results, .. } => {
            let items = all_to_unified(results)?;
            // Unrequested page: the server's page holds every result, or all
            // `count` when it came back empty.
            let (page, size) = requested.unwrap_or_else(|| {
                let size = if items.is_empty() { count } else { items.len() as u64 };
                (1, u32::try_from(size).unwrap_or(u32::MAX))
            });
            let pages = if size == 0 {
                0
            } else {
                count.div_ceil(size as u64) as u32
            };
            Ok(MemoryPage {
                items,
                total: count,
                page,
                size,
                pages,
            })
        }
        PlatformListing::Wrapped { results: items } | PlatformListing::List(items) => {
            Ok(MemoryPage::single(all_to_unified(items)?))
        }
    }
}

/// List options → Platform options.
pub fn to_options(options: &RequestOptions) -> PlatformOptions {
    PlatformOptions {
        user_id: options.user_id.clone(),
        agent_id: options.agent_id.clone(),
        app_id: options.app_id.clone(),
        run_id: options.run_id.clone(),
        metadata: options.metadata.clone(),
        categories: options.categories.clone(),
        infer: options.infer,
        api_version: options.api_version,
        page: options.page,
        page_size: options.page_size,
        ..Default::default()
    }
}

/// Search options → Platform options (`limit` becomes `top_k`).
pub fn to_search_options(options: &SearchOptions) -> PlatformOptions {
    let mut platform = to_options(&options.request);
    platform.top_k = options.limit;
    platform.threshold = options.threshold;
    platform.filters = options.filters.clone();
    platform
}

/// Plain text → the single-message conversation the add endpoint expects.
pub fn to_messages(text: &str) -> Vec<Message> {
    vec![Message::user(text)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use unimem_types::platform::{ApiVersion, PlatformMemoryData};

    fn sample() -> PlatformMemory {
        PlatformMemory {
            id: "9b2e".to_string(),
            memory: Some("Loves espresso".to_string()),
            created_at: Some("2024-07-20T10:00:00.123Z".to_string()),
            updated_at: Some("2024-07-21T08:30:00.000Z".to_string()),
            user_id: Some("alice".to_string()),
            agent_id: Some("barista".to_string()),
            hash: Some("d41d8cd9".to_string()),
            categories: Some(vec!["food".to_string()]),
            metadata: Some(HashMap::from([("mood".to_string(), serde_json::json!("happy"))])),
            score: Some(0.87),
            memory_type: Some("semantic".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_roundtrip_preserves_representable_fields() {
        let original = sample();
        let unified = to_unified(original.clone()).unwrap();
        assert_eq!(unified.source, MemorySource::Platform);
        assert_eq!(unified.content, "Loves espresso");
        assert_eq!(from_unified(&unified), original);
    }

    #[test]
    fn test_roundtrip_without_created_at() {
        let original = PlatformMemory {
            created_at: None,
            ..sample()
        };
        let unified = to_unified(original.clone()).unwrap();
        assert!(unified.created_at_derived);
        assert_eq!(unified.created_at, parse_iso("2024-07-21T08:30:00.000Z").unwrap());
        assert_eq!(from_unified(&unified), original);
        assert!(from_unified(&unified).created_at.is_none());
    }

    #[test]
    fn test_reported_created_at_is_not_derived() {
        let unified = to_unified(sample()).unwrap();
        assert!(!unified.created_at_derived);
        let json = serde_json::to_value(&unified).unwrap();
        assert!(json.get("created_at_derived").is_none());
    }

    #[test]
    fn test_local_only_fields_absent() {
        let unified = to_unified(sample()).unwrap();
        assert!(unified.state.is_none());
        assert!(unified.app_name.is_none());
        assert!(unified.client.is_none());
    }

    #[test]
    fn test_add_event_shape() {
        let mem = PlatformMemory {
            id: "new1".to_string(),
            data: Some(PlatformMemoryData {
                memory: "Name is Alice".to_string(),
            }),
            event: Some("ADD".to_string()),
            updated_at: Some("2024-07-20T10:00:00Z".to_string()),
            ..Default::default()
        };
        let unified = to_unified(mem).unwrap();
        assert_eq!(unified.content, "Name is Alice");
        assert_eq!(unified.created_at, parse_iso("2024-07-20T10:00:00Z").unwrap());
    }

    #[test]
    fn test_add_event_without_timestamps_is_stamped() {
        let mem = PlatformMemory {
            id: "new2".to_string(),
            data: Some(PlatformMemoryData {
                memory: "Likes tea".to_string(),
            }),
            event: Some("ADD".to_string()),
            ..Default::default()
        };
        let before = Utc::now() - chrono::Duration::seconds(1);
        let unified = to_unified(mem).unwrap();
        assert!(unified.created_at >= before);
        assert!(unified.created_at_derived);
        assert!(unified.updated_at.is_none());
        assert!(from_unified(&unified).created_at.is_none());
    }

    #[test]
    fn test_missing_timestamps_is_error() {
        let mem = PlatformMemory {
            id: "x".to_string(),
            memory: Some("text".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            to_unified(mem),
            Err(MemoryError::Serialization(_))
        ));
    }

    #[test]
    fn test_paginated_listing_page_math() {
        let listing = PlatformListing::Paginated {
            count: 45,
            next: None,
            previous: None,
            results: vec![sample(), sample()],
        };
        let page = listing_to_page(listing, Some((3, 20))).unwrap();
        assert_eq!((page.total, page.page, page.size, page.pages), (45, 3, 20, 3));
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_unrequested_empty_page_sizes_to_count() {
        let listing = PlatformListing::Paginated {
            count: 12,
            next: None,
            previous: None,
            results: vec![],
        };
        let page = listing_to_page(listing, None).unwrap();
        assert_eq!((page.total, page.page, page.size, page.pages), (12, 1, 12, 1));

        let listing = PlatformListing::Paginated {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        };
        let page = listing_to_page(listing, None).unwrap();
        assert_eq!((page.size, page.pages), (0, 0));
    }

    #[test]
    fn test_search_options_mapping() {
        let opts = SearchOptions::new()
            .with_limit(7)
            .with_threshold(0.3)
            .with_filters(serde_json::json!({"AND": [{"user_id": "alice"}]}))
            .with_request(RequestOptions::new().with_user("alice").with_api_version(ApiVersion::V2));
        let platform = to_search_options(&opts);
        assert_eq!(platform.top_k, Some(7));
        assert_eq!(platform.threshold, Some(0.3));
        assert_eq!(platform.user_id.as_deref(), Some("alice"));
        assert_eq!(platform.api_version, Some(ApiVersion::V2));
        assert!(platform.filters.is_some());
    }

    #[test]
    fn test_to_messages() {
        assert_eq!(to_messages("hi"), vec![Message::user("hi")]);
    }
}
