//! Static JSON content loading
//!
//! Content ships as three JSON documents in a content directory, each an
//! array under a named key:
//!
//! - `managed-projects.json`    -> `{"projects": [...]}`
//! - `managed-experiences.json` -> `{"experiences": [...]}`
//! - `managed-skills.json`      -> `{"skills": [...]}`
//!
//! Files are read once and fed through [`ContentStore::bulk_import`];
//! missing files are skipped with a warning, and per-item failures are
//! accumulated without rolling back successes. There is no write-back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{ContentDraft, ContentType};
use crate::store::{ContentStore, ImportReport};

/// Author recorded for loader-created content
pub const LOADER_AUTHOR: &str = "loader";

const COLLECTIONS: &[(&str, &str, ContentType)] = &[
    ("managed-projects.json", "projects", ContentType::Project),
    (
        "managed-experiences.json",
        "experiences",
        ContentType::Experience,
    ),
    ("managed-skills.json", "skills", ContentType::Skill),
];

/// Outcome of loading a content directory or import payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Items successfully created
    pub loaded: usize,
    /// File-level problems (unreadable or malformed documents)
    pub file_errors: Vec<String>,
    /// Item-level failures, as "<file-or-collection>: <message>"
    pub item_errors: Vec<String>,
}

impl LoadReport {
    fn absorb(&mut self, source: &str, report: ImportReport) {
        self.loaded += report.imported;
        for failure in report.failures {
            self.item_errors.push(format!(
                "{}[{}{}]: {}",
                source,
                failure.index,
                failure
                    .id
                    .as_deref()
                    .map(|id| format!(", id {}", id))
                    .unwrap_or_default(),
                failure.message
            ));
        }
    }
}

/// Load the three managed-content documents from a directory
pub fn load_content_dir(dir: &Path, store: &mut ContentStore) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for (file, key, content_type) in COLLECTIONS {
        let path = dir.join(file);
        if !path.exists() {
            warn!(file = %file, "content document missing, skipping");
            continue;
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                report.file_errors.push(format!("{}: {}", file, err));
                continue;
            }
        };
        let document: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                report.file_errors.push(format!("{}: {}", file, err));
                continue;
            }
        };
        let drafts = match collect_drafts(&document, key, *content_type) {
            Ok(drafts) => drafts,
            Err(message) => {
                report.file_errors.push(format!("{}: {}", file, message));
                continue;
            }
        };
        report.absorb(file, store.bulk_import(drafts, LOADER_AUTHOR));
    }
    info!(
        loaded = report.loaded,
        file_errors = report.file_errors.len(),
        item_errors = report.item_errors.len(),
        "content directory loaded"
    );
    Ok(report)
}

/// JSON-shaped import payload (the in-memory counterpart of the content
/// directory; used to re-import an [`crate::store::ContentExport`]-style
/// snapshot)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<ContentDraft>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiences: Option<Vec<ContentDraft>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<ContentDraft>>,
}

/// Re-run bulk import per collection of the payload
pub fn import_payload(payload: ImportPayload, store: &mut ContentStore) -> LoadReport {
    let mut report = LoadReport::default();
    for (name, drafts) in [
        ("projects", payload.projects),
        ("experiences", payload.experiences),
        ("skills", payload.skills),
    ] {
        if let Some(drafts) = drafts {
            report.absorb(name, store.bulk_import(drafts, LOADER_AUTHOR));
        }
    }
    report
}

/// Extract drafts from a parsed document, defaulting each item's type to
/// the collection's type when absent
fn collect_drafts(
    document: &Value,
    key: &str,
    content_type: ContentType,
) -> std::result::Result<Vec<ContentDraft>, String> {
    let items = document
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("expected an array under key '{}'", key))?;
    let mut drafts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let mut value = item.clone();
        if let Some(obj) = value.as_object_mut() {
            obj.entry("type".to_string())
                .or_insert_with(|| Value::String(content_type.as_str().to_string()));
        }
        let draft: ContentDraft = serde_json::from_value(value)
            .map_err(|err| format!("item {}: {}", index, err))?;
        drafts.push(draft);
    }
    Ok(drafts)
}
