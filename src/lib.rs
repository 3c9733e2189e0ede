//! # folio-rs - In-Memory Portfolio Content Management
//!
//! `folio-rs` is the content layer for a portfolio site: it indexes,
//! validates, and versions structured content (projects, experience
//! entries, skills) loaded from static JSON files.
//!
//! - **Schema-driven validation** with structured errors and warnings
//! - **Version history** per content id (semantic versions, content
//!   fingerprints for change detection)
//! - **Bounded backups** captured before every mutation
//! - **TTL result cache** with approximate LRU eviction
//! - **Indexed queries**: filter by type/status/tag, search, sort, paginate
//!
//! Everything lives in process memory; a restart reloads content from the
//! static JSON snapshot.
//!
//! ## Quick Start
//!
//! ```rust
//! use folio_rs::{ContentDraft, ContentStore, ContentType};
//! use serde_json::json;
//!
//! let mut store = ContentStore::with_builtin_schemas();
//!
//! let draft = ContentDraft::new(ContentType::Skill, "Rust")
//!     .field("proficiency", json!(90));
//! let item = store.create(draft, "alice").unwrap();
//!
//! assert_eq!(item.slug, "rust");
//! assert_eq!(item.version, "1.0.0");
//! assert_eq!(store.get_by_type(ContentType::Skill).len(), 1);
//! ```
//!
//! ## Shared Facade
//!
//! ```rust
//! use folio_rs::{ContentQuery, Portfolio};
//!
//! let portfolio = Portfolio::with_builtin_schemas();
//! let page = portfolio.query(&ContentQuery::default());
//! assert_eq!(page.total, 0);
//! ```

pub mod cache;
pub mod error;
pub mod loader;
pub mod model;
pub mod portfolio;
pub mod schema;
pub mod store;
pub mod validate;
pub mod version;

pub use crate::cache::{CacheConfig, CacheStats, ContentCache};
pub use crate::error::{ContentError, Result};
pub use crate::loader::{import_payload, load_content_dir, ImportPayload, LoadReport};
pub use crate::model::{
    generate_id, generate_slug, ContentDraft, ContentItem, ContentStatus, ContentType,
    ExperienceFields, ProjectFields, SkillFields,
};
pub use crate::portfolio::Portfolio;
pub use crate::schema::{
    ContentSchema, CrossFieldRule, FieldKind, FieldRule, FieldSchema, SchemaRegistry,
};
pub use crate::store::{
    ContentExport, ContentPage, ContentQuery, ContentStore, ImportFailure, ImportReport,
    SortDirection, SortField, SortSpec, StoreStats, UpdateOptions,
};
pub use crate::validate::{
    IssueCode, Severity, ValidationIssue, ValidationReport, Validator,
};
pub use crate::version::{
    bump_major, bump_minor, canonical_json, compare_versions, fingerprint, BackupReason,
    ContentBackup, ContentVersion, FieldChange, UpdateLog, VersionTracker,
};
