//! Core data model for managed content
//!
//! Every managed record shares the same metadata envelope ([`ContentItem`]):
//! id, slug, status, timestamps, version, tags, and categories. Domain
//! fields (client, proficiency, achievements, ...) ride along in a flattened
//! JSON map and are validated against the per-type schema, so the store
//! never needs a separate code path per content type.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ContentError;

/// Content type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Project,
    Experience,
    Skill,
    Education,
    Certification,
    Video,
    Testimonial,
}

impl ContentType {
    /// All known content types
    pub const ALL: [ContentType; 7] = [
        ContentType::Project,
        ContentType::Experience,
        ContentType::Skill,
        ContentType::Education,
        ContentType::Certification,
        ContentType::Video,
        ContentType::Testimonial,
    ];

    /// Lowercase string form (matches the serialized representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Project => "project",
            ContentType::Experience => "experience",
            ContentType::Skill => "skill",
            ContentType::Education => "education",
            ContentType::Certification => "certification",
            ContentType::Video => "video",
            ContentType::Testimonial => "testimonial",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ContentError::BadInput(format!("unknown content type '{}'", s)))
    }
}

/// Publication status
///
/// Status is a plain field, not a transition graph: any status can be set
/// to any other status by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    /// All valid statuses
    pub const ALL: [ContentStatus; 3] = [
        ContentStatus::Draft,
        ContentStatus::Published,
        ContentStatus::Archived,
    ];

    /// Lowercase string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentStatus::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ContentError::BadInput(format!("unknown status '{}'", s)))
    }
}

/// A managed content record
///
/// Invariants maintained by the store:
/// - `id` is immutable after creation and matches `^[a-z0-9-]+$`
/// - `slug` shares the id charset
/// - `updated_at >= created_at`
/// - `version` is a "major.minor.patch" string minted by the version tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    pub slug: String,
    pub status: ContentStatus,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Per-type domain fields (JSON wire keys, e.g. "shortDescription")
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    /// Full JSON representation (the shape the validator and fingerprint see)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Typed view of project-specific fields, if they deserialize cleanly
    pub fn project_fields(&self) -> Option<ProjectFields> {
        serde_json::from_value(Value::Object(self.fields.clone())).ok()
    }

    /// Typed view of experience-specific fields
    pub fn experience_fields(&self) -> Option<ExperienceFields> {
        serde_json::from_value(Value::Object(self.fields.clone())).ok()
    }

    /// Typed view of skill-specific fields
    pub fn skill_fields(&self) -> Option<SkillFields> {
        serde_json::from_value(Value::Object(self.fields.clone())).ok()
    }
}

/// Input shape for [`crate::store::ContentStore::create`]
///
/// Only `content_type` and `title` are mandatory; the store fills in
/// id, slug, status, and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentDraft {
    /// Create a minimal draft
    pub fn new(content_type: ContentType, title: impl Into<String>) -> Self {
        ContentDraft {
            id: None,
            content_type,
            title: title.into(),
            slug: None,
            status: None,
            featured: false,
            tags: Vec::new(),
            categories: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Set a domain field
    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Set tags
    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Project-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    pub client: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub timeline: Option<String>,
    pub project_status: Option<String>,
    pub date_completed: Option<String>,
    pub metrics: Option<Map<String, Value>>,
    pub media: Option<Map<String, Value>>,
}

/// Experience-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceFields {
    pub company: Option<String>,
    pub position: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Skill-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFields {
    pub proficiency: Option<f64>,
    pub years_of_experience: Option<f64>,
    pub category: Option<String>,
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Generate a content id: base36 millisecond timestamp plus a random
/// base36 suffix. Always matches `^[a-z0-9-]+$` by construction.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let salt: u32 = rand::thread_rng().gen();
    format!("{}-{}", to_base36(millis), to_base36(salt as u128))
}

/// Derive a slug from a title: lowercase, runs of non-alphanumeric
/// characters collapse to single hyphens, leading/trailing hyphens trimmed.
///
/// Idempotent: `generate_slug(generate_slug(s)) == generate_slug(s)`.
pub fn generate_slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trip() {
        for t in ContentType::ALL {
            assert_eq!(t.as_str().parse::<ContentType>().unwrap(), t);
        }
        assert!("widget".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for s in ContentStatus::ALL {
            assert_eq!(s.as_str().parse::<ContentStatus>().unwrap(), s);
        }
        assert!("pending".parse::<ContentStatus>().is_err());
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("AI Dashboard"), "ai-dashboard");
        assert_eq!(generate_slug("  Hello,  World!  "), "hello-world");
        assert_eq!(generate_slug("already-a-slug"), "already-a-slug");
        assert_eq!(generate_slug("C++ & Rust (2024)"), "c-rust-2024");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn test_generate_slug_idempotent() {
        for title in ["AI Dashboard", "Über Project", "a--b--c", "Test 123"] {
            let once = generate_slug(title);
            assert_eq!(generate_slug(&once), once);
        }
    }

    #[test]
    fn test_generate_id_charset() {
        let re = regex::Regex::new("^[a-z0-9-]+$").unwrap();
        for _ in 0..50 {
            let id = generate_id();
            assert!(re.is_match(&id), "bad id: {}", id);
        }
    }

    #[test]
    fn test_item_serde_shape() {
        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("client".to_string(), Value::String("Acme".to_string()));
        let item = ContentItem {
            id: "p1".to_string(),
            content_type: ContentType::Project,
            title: "Demo".to_string(),
            slug: "demo".to_string(),
            status: ContentStatus::Draft,
            featured: false,
            created_at: now,
            updated_at: now,
            version: "1.0.0".to_string(),
            tags: vec!["web".to_string()],
            categories: vec![],
            fields,
        };
        let value = item.to_value();
        assert_eq!(value["type"], "project");
        assert_eq!(value["status"], "draft");
        assert_eq!(value["client"], "Acme");
        assert!(value.get("createdAt").is_some());

        let back: ContentItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_typed_field_views() {
        let mut fields = Map::new();
        fields.insert("proficiency".to_string(), Value::from(85.0));
        fields.insert("yearsOfExperience".to_string(), Value::from(4));
        let item = ContentItem {
            id: "s1".to_string(),
            content_type: ContentType::Skill,
            title: "Rust".to_string(),
            slug: "rust".to_string(),
            status: ContentStatus::Published,
            featured: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: "1.0.0".to_string(),
            tags: vec![],
            categories: vec![],
            fields,
        };
        let skill = item.skill_fields().unwrap();
        assert_eq!(skill.proficiency, Some(85.0));
        assert_eq!(skill.years_of_experience, Some(4.0));
    }
}
