//! Content store: canonical map, secondary indices, and CRUD operations
//!
//! The store exclusively owns the content-by-id map plus derived indices
//! (by type, by status, by tag) and keeps them consistent across every
//! mutation: the union of ids across the type index always equals the key
//! set of the canonical map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use ahash::{AHashMap, AHashSet};

use crate::error::{ContentError, Result};
use crate::model::{generate_id, generate_slug, ContentDraft, ContentItem, ContentStatus, ContentType};
use crate::schema::SchemaRegistry;
use crate::validate::Validator;
use crate::version::{BackupReason, ContentBackup, ContentVersion, FieldChange, UpdateLog, VersionTracker};

/// Options for [`ContentStore::update`]; everything defaults to on
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Snapshot the pre-update state before merging
    pub create_backup: bool,
    /// Re-validate the merged record and abort on failure
    pub validate: bool,
    /// Mint a new version when the fingerprint changed
    pub update_version: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            create_backup: true,
            validate: true,
            update_version: true,
        }
    }
}

/// Sortable fields for queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Title,
    CreatedAt,
    UpdatedAt,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Declarative content query
///
/// Filters apply in a fixed order (type, status, featured, tags,
/// categories, free-text search, date range), then sorting (default:
/// `updated_at` descending), then offset/limit pagination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub featured: Option<bool>,
    /// Any-match intersection with item tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Any-match intersection with item categories
    #[serde(default)]
    pub categories: Vec<String>,
    /// Case-insensitive substring over title, description, and tags
    pub search: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl ContentQuery {
    pub fn for_type(content_type: ContentType) -> Self {
        ContentQuery {
            content_type: Some(content_type),
            ..ContentQuery::default()
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub total: usize,
    /// 1-based page number derived from offset/limit
    pub page: usize,
    pub has_more: bool,
}

/// Bulk import outcome: successes are kept, failures are reported,
/// nothing is rolled back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failures: Vec<ImportFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Position in the input sequence
    pub index: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Snapshot export of the store's content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentExport {
    pub content: Vec<ContentItem>,
    pub exported_at: DateTime<Utc>,
    pub total: usize,
}

/// Aggregate content statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub featured: usize,
    pub tag_count: usize,
}

/// In-memory content manager
pub struct ContentStore {
    items: AHashMap<String, ContentItem>,
    by_type: AHashMap<ContentType, AHashSet<String>>,
    by_status: AHashMap<ContentStatus, AHashSet<String>>,
    by_tag: AHashMap<String, AHashSet<String>>,
    validator: Validator,
    versions: VersionTracker,
    updates: UpdateLog,
}

impl ContentStore {
    pub fn new(registry: SchemaRegistry) -> Self {
        ContentStore {
            items: AHashMap::new(),
            by_type: AHashMap::new(),
            by_status: AHashMap::new(),
            by_tag: AHashMap::new(),
            validator: Validator::new(registry),
            versions: VersionTracker::new(),
            updates: UpdateLog::new(),
        }
    }

    /// Store backed by the builtin project/experience/skill schemas
    pub fn with_builtin_schemas() -> Self {
        ContentStore::new(SchemaRegistry::builtin())
    }

    /// Create a content item from a draft
    ///
    /// Assigns id (generated if absent) and slug (derived from the title if
    /// absent), stamps timestamps, validates, mints version 1.0.0, indexes,
    /// and captures an initial backup. On validation failure nothing is
    /// stored and the issues are returned in [`ContentError::Validation`].
    pub fn create(&mut self, draft: ContentDraft, author: &str) -> Result<ContentItem> {
        let id = draft.id.clone().unwrap_or_else(generate_id);
        if self.items.contains_key(&id) {
            return Err(ContentError::DuplicateId(id));
        }
        let slug = draft
            .slug
            .clone()
            .unwrap_or_else(|| generate_slug(&draft.title));
        let now = Utc::now();
        // Base metadata keys in the draft's loose fields (as seen when
        // re-importing an export) would shadow the envelope; the envelope
        // is authoritative.
        let mut fields = draft.fields;
        for key in [
            "id",
            "type",
            "title",
            "slug",
            "status",
            "featured",
            "createdAt",
            "updatedAt",
            "version",
            "tags",
            "categories",
        ] {
            fields.remove(key);
        }
        let mut item = ContentItem {
            id: id.clone(),
            content_type: draft.content_type,
            title: draft.title,
            slug,
            status: draft.status.unwrap_or(ContentStatus::Draft),
            featured: draft.featured,
            created_at: now,
            updated_at: now,
            version: "1.0.0".to_string(),
            tags: draft.tags,
            categories: draft.categories,
            fields,
        };

        let value = item.to_value();
        let report = self.validator.validate(&value, item.content_type);
        if !report.is_valid() {
            return Err(ContentError::Validation(report.errors));
        }

        let version = self.versions.create_version(
            &id,
            author,
            vec!["created".to_string()],
            &fingerprint_source(&value),
        );
        item.version = version.version.to_string();

        self.versions.create_backup(
            &id,
            item.content_type,
            &item.to_value(),
            &item.version,
            BackupReason::Auto,
        );
        self.index_insert(&item);
        self.items.insert(id.clone(), item.clone());
        info!(id = %id, content_type = %item.content_type, "created content");
        Ok(item)
    }

    /// Merge updates over an existing record
    ///
    /// The id is never overwritten. Unless disabled via `options`, the
    /// pre-update state is backed up first, the merged record is
    /// re-validated (aborting with no mutation on failure), and a new
    /// version is minted only when the content fingerprint actually
    /// changed. Each changed field is recorded in the update log.
    pub fn update(
        &mut self,
        id: &str,
        updates: Map<String, Value>,
        author: &str,
        options: &UpdateOptions,
    ) -> Result<ContentItem> {
        let current = self
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;

        if options.create_backup {
            self.versions.create_backup(
                id,
                current.content_type,
                &current.to_value(),
                &current.version,
                BackupReason::PreUpdate,
            );
        }

        let old_value = current.to_value();
        let mut merged_value = old_value.clone();
        let obj = merged_value
            .as_object_mut()
            .ok_or_else(|| ContentError::BadInput("content did not serialize to an object".to_string()))?;
        for (key, value) in &updates {
            if key == "id" {
                continue;
            }
            obj.insert(key.clone(), value.clone());
        }
        let now = Utc::now();
        obj.insert("updatedAt".to_string(), Value::String(now.to_rfc3339()));

        if options.validate {
            let report = self.validator.validate(&merged_value, current.content_type);
            if !report.is_valid() {
                return Err(ContentError::Validation(report.errors));
            }
        }

        let mut merged: ContentItem = serde_json::from_value(merged_value.clone())?;

        // Field-level change tracking, over the keys the caller touched
        let old_obj = old_value.as_object().cloned().unwrap_or_default();
        let mut changed_fields = Vec::new();
        for key in updates.keys().filter(|k| k.as_str() != "id") {
            let old = old_obj.get(key).cloned().unwrap_or(Value::Null);
            let new = merged_value.get(key).cloned().unwrap_or(Value::Null);
            if old != new {
                self.updates.record(id, key, old, new, author);
                changed_fields.push(key.clone());
            }
        }

        if options.update_version {
            let source = fingerprint_source(&merged_value);
            if self.versions.has_changed(id, &source) {
                let changes = changed_fields
                    .iter()
                    .map(|f| format!("updated {}", f))
                    .collect();
                let version = self.versions.create_version(id, author, changes, &source);
                merged.version = version.version.to_string();
            }
        }

        self.index_remove(&current);
        self.index_insert(&merged);
        self.items.insert(id.to_string(), merged.clone());
        debug!(id, changed = changed_fields.len(), "updated content");
        Ok(merged)
    }

    /// Remove a content item. Terminal: no tombstone, no resurrection.
    ///
    /// A final backup (reason `manual`) is captured before removal.
    pub fn delete(&mut self, id: &str, _author: &str) -> Result<()> {
        let item = self
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(id.to_string()))?;
        self.versions.create_backup(
            id,
            item.content_type,
            &item.to_value(),
            &item.version,
            BackupReason::Manual,
        );
        self.index_remove(&item);
        self.items.remove(id);
        info!(id, "deleted content");
        Ok(())
    }

    /// Direct lookup
    pub fn get(&self, id: &str) -> Option<&ContentItem> {
        self.items.get(id)
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Ids of every stored item, in no particular order
    pub fn ids(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Filter, sort, and paginate
    pub fn query(&self, query: &ContentQuery) -> ContentPage {
        // Narrow by the type index first when possible
        let candidates: Vec<&ContentItem> = match query.content_type {
            Some(t) => self
                .by_type
                .get(&t)
                .into_iter()
                .flat_map(|ids| ids.iter())
                .filter_map(|id| self.items.get(id))
                .collect(),
            None => self.items.values().collect(),
        };

        let term = query.search.as_ref().map(|s| s.to_lowercase());
        let mut matched: Vec<&ContentItem> = candidates
            .into_iter()
            .filter(|item| {
                query.status.map(|s| item.status == s).unwrap_or(true)
                    && query.featured.map(|f| item.featured == f).unwrap_or(true)
                    && (query.tags.is_empty()
                        || query.tags.iter().any(|t| item.tags.contains(t)))
                    && (query.categories.is_empty()
                        || query.categories.iter().any(|c| item.categories.contains(c)))
                    && term
                        .as_ref()
                        .map(|t| matches_search(item, t))
                        .unwrap_or(true)
                    && query
                        .created_after
                        .map(|after| item.created_at >= after)
                        .unwrap_or(true)
                    && query
                        .created_before
                        .map(|before| item.created_at <= before)
                        .unwrap_or(true)
            })
            .collect();

        let sort = query.sort.unwrap_or(SortSpec {
            field: SortField::UpdatedAt,
            direction: SortDirection::Descending,
        });
        matched.sort_by(|a, b| {
            let ordering = match sort.field {
                SortField::Title => a.title.cmp(&b.title),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            };
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let total = matched.len();
        let items: Vec<ContentItem> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        let page = match query.limit {
            Some(limit) if limit > 0 => query.offset / limit + 1,
            _ => 1,
        };
        let has_more = match query.limit {
            Some(limit) => query.offset + limit < total,
            None => false,
        };
        ContentPage {
            items,
            total,
            page,
            has_more,
        }
    }

    /// All items of one type (index-backed), updated_at descending
    pub fn get_by_type(&self, content_type: ContentType) -> Vec<ContentItem> {
        self.query(&ContentQuery::for_type(content_type)).items
    }

    /// All featured published items
    pub fn get_featured(&self) -> Vec<ContentItem> {
        self.query(&ContentQuery {
            featured: Some(true),
            status: Some(ContentStatus::Published),
            ..ContentQuery::default()
        })
        .items
    }

    /// Free-text search across all types
    pub fn search(&self, term: &str, limit: Option<usize>) -> Vec<ContentItem> {
        self.query(&ContentQuery {
            search: Some(term.to_string()),
            limit,
            ..ContentQuery::default()
        })
        .items
    }

    /// Aggregate statistics
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.items.len(),
            tag_count: self.by_tag.len(),
            ..StoreStats::default()
        };
        for item in self.items.values() {
            *stats
                .by_type
                .entry(item.content_type.as_str().to_string())
                .or_insert(0) += 1;
            *stats
                .by_status
                .entry(item.status.as_str().to_string())
                .or_insert(0) += 1;
            if item.featured {
                stats.featured += 1;
            }
        }
        stats
    }

    /// Create every draft, accumulating failures without rolling back
    pub fn bulk_import(&mut self, drafts: Vec<ContentDraft>, author: &str) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            let id = draft.id.clone();
            match self.create(draft, author) {
                Ok(_) => report.imported += 1,
                Err(err) => report.failures.push(ImportFailure {
                    index,
                    id,
                    message: err.to_string(),
                }),
            }
        }
        info!(
            imported = report.imported,
            failed = report.failures.len(),
            "bulk import finished"
        );
        report
    }

    /// Export all content, optionally limited to one type
    pub fn export(&self, content_type: Option<ContentType>) -> ContentExport {
        let mut content: Vec<ContentItem> = self
            .items
            .values()
            .filter(|i| content_type.map(|t| i.content_type == t).unwrap_or(true))
            .cloned()
            .collect();
        content.sort_by(|a, b| a.id.cmp(&b.id));
        let total = content.len();
        ContentExport {
            content,
            exported_at: Utc::now(),
            total,
        }
    }

    /// Drop all content, indices, versions, backups, and update history
    pub fn clear(&mut self) {
        self.items.clear();
        self.by_type.clear();
        self.by_status.clear();
        self.by_tag.clear();
        self.versions.clear();
        self.updates.clear();
    }

    /// Version history for an id, oldest first
    pub fn version_history(&self, id: &str) -> &[ContentVersion] {
        self.versions.history(id)
    }

    /// Backups for an id, oldest first
    pub fn backups(&self, id: &str) -> Vec<&ContentBackup> {
        self.versions.backups(id)
    }

    /// Field-change history for an id, oldest first
    pub fn update_history(&self, id: &str) -> &[FieldChange] {
        self.updates.history(id)
    }

    /// Deep clone of a backup's data, by backup id
    pub fn restore_from_backup(&self, backup_id: &str) -> Option<Value> {
        self.versions.restore_from_backup(backup_id)
    }

    /// Ids currently present in the type index (test/diagnostic surface)
    pub fn ids_by_type(&self, content_type: ContentType) -> Vec<String> {
        self.by_type
            .get(&content_type)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids currently present in the tag index
    pub fn ids_by_tag(&self, tag: &str) -> Vec<String> {
        self.by_tag
            .get(tag)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn index_insert(&mut self, item: &ContentItem) {
        self.by_type
            .entry(item.content_type)
            .or_default()
            .insert(item.id.clone());
        self.by_status
            .entry(item.status)
            .or_default()
            .insert(item.id.clone());
        for tag in &item.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(item.id.clone());
        }
    }

    fn index_remove(&mut self, item: &ContentItem) {
        if let Some(ids) = self.by_type.get_mut(&item.content_type) {
            ids.remove(&item.id);
            if ids.is_empty() {
                self.by_type.remove(&item.content_type);
            }
        }
        if let Some(ids) = self.by_status.get_mut(&item.status) {
            ids.remove(&item.id);
            if ids.is_empty() {
                self.by_status.remove(&item.status);
            }
        }
        for tag in &item.tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.remove(&item.id);
                if ids.is_empty() {
                    self.by_tag.remove(tag);
                }
            }
        }
    }
}

fn matches_search(item: &ContentItem, lowercase_term: &str) -> bool {
    item.title.to_lowercase().contains(lowercase_term)
        || item
            .fields
            .get("description")
            .and_then(Value::as_str)
            .map(|d| d.to_lowercase().contains(lowercase_term))
            .unwrap_or(false)
        || item
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(lowercase_term))
}

/// The fingerprint ignores volatile bookkeeping fields so no-op updates
/// do not mint spurious versions.
fn fingerprint_source(value: &Value) -> Value {
    let mut source = value.clone();
    if let Some(obj) = source.as_object_mut() {
        obj.remove("updatedAt");
        obj.remove("version");
    }
    source
}
