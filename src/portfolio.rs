//! Portfolio facade: shared store + read-through result cache
//!
//! [`Portfolio`] is the surface the site layer talks to. It owns a
//! [`ContentStore`] behind a `RwLock` and a [`ContentCache`] behind a
//! `Mutex`, so queries work through `&self` and the whole facade can be
//! shared in an `Arc`.
//!
//! Initialization is latched with `parking_lot::Once`: the first caller
//! loads the content directory and every concurrent caller blocks on the
//! latch until loading finishes, instead of polling a "loading" flag.
//!
//! Cached query results have no dependency tracking back to the content
//! ids that produced them, so every mutation invalidates the `query:`,
//! `search:`, and `content:` key spaces wholesale. Coarse but always
//! correct.

use parking_lot::{Mutex, Once, RwLock};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

use crate::cache::{CacheConfig, ContentCache};
use crate::error::Result;
use crate::loader::{load_content_dir, LoadReport};
use crate::model::{ContentDraft, ContentItem, ContentStatus, ContentType};
use crate::schema::SchemaRegistry;
use crate::store::{ContentPage, ContentQuery, ContentStore, StoreStats, UpdateOptions};

/// Shared content service for a portfolio site
pub struct Portfolio {
    store: RwLock<ContentStore>,
    cache: Mutex<ContentCache>,
    init: Once,
}

impl Portfolio {
    pub fn new(registry: SchemaRegistry) -> Self {
        Portfolio {
            store: RwLock::new(ContentStore::new(registry)),
            cache: Mutex::new(ContentCache::new(CacheConfig::default())),
            init: Once::new(),
        }
    }

    /// Facade over the builtin schemas
    pub fn with_builtin_schemas() -> Self {
        Portfolio::new(SchemaRegistry::builtin())
    }

    /// Load the content directory exactly once
    ///
    /// The first caller performs the load and receives its report; callers
    /// arriving while the load is in flight block until it completes and
    /// then return `Ok(None)`.
    pub fn init_from_dir(&self, dir: &Path) -> Result<Option<LoadReport>> {
        let mut outcome = Ok(None);
        self.init.call_once(|| {
            let mut store = self.store.write();
            outcome = load_content_dir(dir, &mut store).map(Some);
        });
        outcome
    }

    /// Query projects, read-through cached
    pub fn projects(&self, query: &ContentQuery) -> ContentPage {
        let mut scoped = query.clone();
        scoped.content_type = Some(ContentType::Project);
        self.cached_page(&scoped)
    }

    /// Query experiences, read-through cached
    pub fn experiences(&self, query: &ContentQuery) -> ContentPage {
        let mut scoped = query.clone();
        scoped.content_type = Some(ContentType::Experience);
        self.cached_page(&scoped)
    }

    /// Query skills, read-through cached
    pub fn skills(&self, query: &ContentQuery) -> ContentPage {
        let mut scoped = query.clone();
        scoped.content_type = Some(ContentType::Skill);
        self.cached_page(&scoped)
    }

    /// Arbitrary query, read-through cached
    pub fn query(&self, query: &ContentQuery) -> ContentPage {
        self.cached_page(query)
    }

    /// Case-insensitive search across all content types
    pub fn search_all(&self, term: &str, limit: Option<usize>) -> Vec<ContentItem> {
        let params = json!({"term": term.to_lowercase(), "limit": limit});
        {
            let mut cache = self.cache.lock();
            if let Some(hit) = cache.cached_search(&params) {
                if let Ok(items) = serde_json::from_value(hit) {
                    return items;
                }
            }
        }
        let items = self.store.read().search(term, limit);
        if let Ok(value) = serde_json::to_value(&items) {
            self.cache.lock().cache_search(&params, value, None);
        }
        items
    }

    /// Featured, published content
    pub fn featured_content(&self) -> Vec<ContentItem> {
        self.query(&ContentQuery {
            featured: Some(true),
            status: Some(ContentStatus::Published),
            ..ContentQuery::default()
        })
        .items
    }

    /// Aggregate statistics, cached under the `content:` prefix
    pub fn content_stats(&self) -> StoreStats {
        let params = json!({"op": "stats"});
        {
            let mut cache = self.cache.lock();
            if let Some(hit) = cache.cached_content(&params) {
                if let Ok(stats) = serde_json::from_value(hit) {
                    return stats;
                }
            }
        }
        let stats = self.store.read().stats();
        if let Ok(value) = serde_json::to_value(&stats) {
            self.cache.lock().cache_content(&params, value, None);
        }
        stats
    }

    /// Direct lookup (uncached; a point read on the canonical map is
    /// already cheap)
    pub fn get(&self, id: &str) -> Option<ContentItem> {
        self.store.read().get(id).cloned()
    }

    /// Published content most related to `id`, scored by shared tags,
    /// shared categories, and same type; excludes the item itself
    pub fn related_content(&self, id: &str, limit: usize) -> Vec<ContentItem> {
        let store = self.store.read();
        let Some(subject) = store.get(id) else {
            return Vec::new();
        };
        let mut scored: Vec<(usize, ContentItem)> = store
            .query(&ContentQuery {
                status: Some(ContentStatus::Published),
                ..ContentQuery::default()
            })
            .items
            .into_iter()
            .filter(|candidate| candidate.id != subject.id)
            .filter_map(|candidate| {
                let shared_tags = candidate
                    .tags
                    .iter()
                    .filter(|t| subject.tags.contains(t))
                    .count();
                let shared_categories = candidate
                    .categories
                    .iter()
                    .filter(|c| subject.categories.contains(c))
                    .count();
                let same_type = usize::from(candidate.content_type == subject.content_type);
                let score = shared_tags * 2 + shared_categories + same_type;
                (score > 0).then_some((score, candidate))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.into_iter().take(limit).map(|(_, item)| item).collect()
    }

    /// Create content and invalidate cached results
    pub fn create(&self, draft: ContentDraft, author: &str) -> Result<ContentItem> {
        let result = self.store.write().create(draft, author);
        if result.is_ok() {
            self.invalidate_results();
        }
        result
    }

    /// Update content and invalidate cached results
    pub fn update(
        &self,
        id: &str,
        updates: Map<String, Value>,
        author: &str,
        options: &UpdateOptions,
    ) -> Result<ContentItem> {
        let result = self.store.write().update(id, updates, author, options);
        if result.is_ok() {
            self.invalidate_results();
        }
        result
    }

    /// Delete content and invalidate cached results
    pub fn delete(&self, id: &str, author: &str) -> Result<()> {
        let result = self.store.write().delete(id, author);
        if result.is_ok() {
            self.invalidate_results();
        }
        result
    }

    /// Run `f` with read access to the underlying store
    pub fn with_store<T>(&self, f: impl FnOnce(&ContentStore) -> T) -> T {
        f(&self.store.read())
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.lock().stats()
    }

    fn cached_page(&self, query: &ContentQuery) -> ContentPage {
        let params = serde_json::to_value(query).unwrap_or(Value::Null);
        {
            let mut cache = self.cache.lock();
            if let Some(hit) = cache.cached_query(&params) {
                if let Ok(page) = serde_json::from_value(hit) {
                    return page;
                }
            }
        }
        let page = self.store.read().query(query);
        if let Ok(value) = serde_json::to_value(&page) {
            self.cache.lock().cache_query(&params, value, None);
        }
        page
    }

    fn invalidate_results(&self) {
        let mut cache = self.cache.lock();
        let removed = cache.invalidate_pattern("^query:")
            + cache.invalidate_pattern("^search:")
            + cache.invalidate_pattern("^content:");
        debug!(removed, "invalidated cached results after mutation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skill(title: &str, tags: &[&str]) -> ContentDraft {
        ContentDraft::new(ContentType::Skill, title)
            .field("proficiency", json!(80))
            .tags(tags)
    }

    fn published(mut draft: ContentDraft) -> ContentDraft {
        draft.status = Some(ContentStatus::Published);
        draft
    }

    #[test]
    fn test_query_cache_round_trip() {
        let portfolio = Portfolio::with_builtin_schemas();
        portfolio.create(published(skill("Rust", &[])), "alice").unwrap();

        let first = portfolio.skills(&ContentQuery::default());
        assert_eq!(first.total, 1);
        let hits_before = portfolio.cache_stats().hits;
        let second = portfolio.skills(&ContentQuery::default());
        assert_eq!(second, first);
        assert_eq!(portfolio.cache_stats().hits, hits_before + 1);
    }

    #[test]
    fn test_mutation_invalidates_cache() {
        let portfolio = Portfolio::with_builtin_schemas();
        portfolio.create(published(skill("Rust", &[])), "alice").unwrap();

        assert_eq!(portfolio.skills(&ContentQuery::default()).total, 1);
        portfolio.create(published(skill("Go", &[])), "alice").unwrap();
        // A stale cache would still answer 1
        assert_eq!(portfolio.skills(&ContentQuery::default()).total, 2);
    }

    #[test]
    fn test_related_content_scoring() {
        let portfolio = Portfolio::with_builtin_schemas();
        let anchor = portfolio
            .create(published(skill("Rust", &["systems", "backend"])), "alice")
            .unwrap();
        portfolio
            .create(published(skill("C", &["systems"])), "alice")
            .unwrap();
        portfolio
            .create(published(skill("Figma", &["design"])), "alice")
            .unwrap();
        // Draft items never appear in related results
        portfolio.create(skill("Zig", &["systems"]), "alice").unwrap();

        let related = portfolio.related_content(&anchor.id, 5);
        let titles: Vec<&str> = related.iter().map(|i| i.title.as_str()).collect();
        assert!(titles.contains(&"C")); // shared tag + same type
        assert!(titles.contains(&"Figma")); // same type only
        assert!(!titles.contains(&"Zig")); // draft
        assert!(!titles.contains(&"Rust")); // self excluded
        assert_eq!(titles[0], "C"); // highest score first

        assert!(portfolio.related_content("ghost", 5).is_empty());
    }

    #[test]
    fn test_search_all_cached() {
        let portfolio = Portfolio::with_builtin_schemas();
        portfolio.create(published(skill("Rust", &[])), "alice").unwrap();

        assert_eq!(portfolio.search_all("rust", None).len(), 1);
        let hits_before = portfolio.cache_stats().hits;
        assert_eq!(portfolio.search_all("rust", None).len(), 1);
        assert_eq!(portfolio.cache_stats().hits, hits_before + 1);
    }

    #[test]
    fn test_content_stats() {
        let portfolio = Portfolio::with_builtin_schemas();
        portfolio.create(skill("Rust", &[]), "alice").unwrap();
        let stats = portfolio.content_stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_type.get("skill"), Some(&1));
    }
}
