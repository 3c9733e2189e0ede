//! Version history, backups, and change detection
//!
//! Change detection works by fingerprinting content: SHA-256 over a
//! canonical JSON serialization with *recursively* sorted object keys, so
//! the same logical content always hashes identically regardless of key
//! order. The fingerprint is the first 8 bytes of the digest, hex encoded
//! (16 characters).
//!
//! Backups are full deep copies, distinct from version records, retained
//! in a bounded ring (10 per content id, oldest dropped first).

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

use ahash::AHashMap;

use crate::model::ContentType;

/// Maximum retained backups per content id
pub const BACKUP_RING_CAPACITY: usize = 10;

/// Serialize a JSON value with all object keys sorted, recursively
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// 16-hex-character content fingerprint (first 8 bytes of SHA-256 over the
/// canonical serialization)
pub fn fingerprint(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Pure minor bump: zeroes the patch component
pub fn bump_minor(version: &Version) -> Version {
    Version::new(version.major, version.minor + 1, 0)
}

/// Pure major bump: zeroes minor and patch
pub fn bump_major(version: &Version) -> Version {
    Version::new(version.major + 1, 0, 0)
}

/// Lenient component-wise numeric comparison of version strings
///
/// Missing or unparseable components are treated as 0, so "1.2" == "1.2.0".
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> [u64; 3] {
        let mut parts = [0u64; 3];
        for (i, piece) in s.split('.').take(3).enumerate() {
            parts[i] = piece.trim().parse().unwrap_or(0);
        }
        parts
    };
    parse(a).cmp(&parse(b))
}

/// One entry in a content id's version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub version: Version,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub changes: Vec<String>,
    /// Content fingerprint at the time this version was minted
    pub hash: String,
}

/// Why a backup was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupReason {
    Manual,
    Auto,
    PreUpdate,
    Scheduled,
}

/// Immutable point-in-time deep copy of a content item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBackup {
    pub id: String,
    pub content_id: String,
    pub content_type: ContentType,
    pub data: Value,
    /// Version string active at capture time
    pub version: String,
    pub reason: BackupReason,
    pub created_at: DateTime<Utc>,
}

/// Tracks per-id version history and a bounded backup ring
///
/// An explicitly constructed instance, owned by the content store; all
/// lookups for unknown ids return empty history or `None` rather than
/// failing.
#[derive(Debug, Default)]
pub struct VersionTracker {
    histories: AHashMap<String, Vec<ContentVersion>>,
    backups: AHashMap<String, VecDeque<ContentBackup>>,
    backup_seq: u64,
}

impl VersionTracker {
    pub fn new() -> Self {
        VersionTracker::default()
    }

    /// Mint the next version for a content id and append it to the history
    ///
    /// The first version for an id is 1.0.0; subsequent versions bump the
    /// patch component of the latest recorded version.
    pub fn create_version(
        &mut self,
        content_id: &str,
        author: &str,
        changes: Vec<String>,
        data: &Value,
    ) -> ContentVersion {
        let next = match self.latest(content_id) {
            Some(prev) => Version::new(
                prev.version.major,
                prev.version.minor,
                prev.version.patch + 1,
            ),
            None => Version::new(1, 0, 0),
        };
        let record = ContentVersion {
            version: next,
            timestamp: Utc::now(),
            author: author.to_string(),
            changes,
            hash: fingerprint(data),
        };
        debug!(content_id, version = %record.version, "minted content version");
        self.histories
            .entry(content_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// Full version history for an id, oldest first (empty for unknown ids)
    pub fn history(&self, content_id: &str) -> &[ContentVersion] {
        self.histories
            .get(content_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Most recent version record for an id
    pub fn latest(&self, content_id: &str) -> Option<&ContentVersion> {
        self.histories.get(content_id).and_then(|h| h.last())
    }

    /// True if no version exists yet or the fingerprint differs from the
    /// latest recorded one
    pub fn has_changed(&self, content_id: &str, new_data: &Value) -> bool {
        match self.latest(content_id) {
            Some(latest) => latest.hash != fingerprint(new_data),
            None => true,
        }
    }

    /// Capture a deep-copy backup, trimming the per-id ring to the most
    /// recent [`BACKUP_RING_CAPACITY`] entries. Returns the backup id.
    pub fn create_backup(
        &mut self,
        content_id: &str,
        content_type: ContentType,
        data: &Value,
        version: &str,
        reason: BackupReason,
    ) -> String {
        self.backup_seq += 1;
        let backup = ContentBackup {
            id: format!("bak-{}-{}", content_id, self.backup_seq),
            content_id: content_id.to_string(),
            content_type,
            data: data.clone(),
            version: version.to_string(),
            reason,
            created_at: Utc::now(),
        };
        let id = backup.id.clone();
        let ring = self.backups.entry(content_id.to_string()).or_default();
        ring.push_back(backup);
        while ring.len() > BACKUP_RING_CAPACITY {
            ring.pop_front();
        }
        debug!(content_id, backup_id = %id, ?reason, "captured backup");
        id
    }

    /// Backups for an id, oldest first (empty for unknown ids)
    pub fn backups(&self, content_id: &str) -> Vec<&ContentBackup> {
        self.backups
            .get(content_id)
            .map(|ring| ring.iter().collect())
            .unwrap_or_default()
    }

    /// Linear scan across all ids for a backup; returns a deep clone of
    /// its data, or `None` when not found
    pub fn restore_from_backup(&self, backup_id: &str) -> Option<Value> {
        self.backups
            .values()
            .flat_map(|ring| ring.iter())
            .find(|b| b.id == backup_id)
            .map(|b| b.data.clone())
    }

    /// Drop all history and backups
    pub fn clear(&mut self) {
        self.histories.clear();
        self.backups.clear();
    }
}

/// One recorded field change from an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-id log of field-level changes recorded by updates
#[derive(Debug, Default)]
pub struct UpdateLog {
    entries: AHashMap<String, Vec<FieldChange>>,
}

impl UpdateLog {
    pub fn new() -> Self {
        UpdateLog::default()
    }

    pub fn record(&mut self, content_id: &str, field: &str, old: Value, new: Value, author: &str) {
        self.entries
            .entry(content_id.to_string())
            .or_default()
            .push(FieldChange {
                field: field.to_string(),
                old,
                new,
                author: author.to_string(),
                timestamp: Utc::now(),
            });
    }

    /// Change history for an id, oldest first (empty for unknown ids)
    pub fn history(&self, content_id: &str) -> &[FieldChange] {
        self.entries
            .get(content_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
