//! Schema registry: per-type field definitions and validation rules
//!
//! A [`ContentSchema`] declares, per field, a primitive kind, a required
//! flag, and an ordered list of rules, plus schema-level cross-field rules.
//! Lookups for unknown types return `None` rather than failing.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::model::ContentType;

/// Primitive kind tag for a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Any string parseable as RFC 3339 or `YYYY-MM-DD`
    Date,
}

impl FieldKind {
    /// Does a JSON value match this kind?
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Date => value.as_str().map(is_parseable_date).unwrap_or(false),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
            FieldKind::Date => "date",
        }
    }
}

/// Accepts RFC 3339 timestamps and plain calendar dates
pub(crate) fn is_parseable_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Per-field validation rule, applied in declaration order
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Minimum length (string characters or array elements)
    MinLength(usize),
    /// Maximum length (string characters or array elements)
    MaxLength(usize),
    /// Regex the full string value must match
    Pattern(Regex),
    /// Arbitrary predicate over the field value
    Custom {
        name: &'static str,
        message: &'static str,
        check: fn(&Value) -> bool,
    },
}

/// Declaration for a single schema field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub required: bool,
    pub rules: Vec<FieldRule>,
}

impl FieldSchema {
    pub fn new(kind: FieldKind) -> Self {
        FieldSchema {
            kind,
            required: false,
            rules: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.rules.push(FieldRule::MinLength(n));
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.rules.push(FieldRule::MaxLength(n));
        self
    }

    /// Add a pattern rule. Invalid patterns are ignored (builtin schemas
    /// only use literal patterns).
    pub fn pattern(mut self, pattern: &str) -> Self {
        if let Ok(re) = Regex::new(pattern) {
            self.rules.push(FieldRule::Pattern(re));
        }
        self
    }

    pub fn custom(mut self, name: &'static str, message: &'static str, check: fn(&Value) -> bool) -> Self {
        self.rules.push(FieldRule::Custom {
            name,
            message,
            check,
        });
        self
    }
}

/// Schema-level rule evaluated against the whole content object
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    pub name: &'static str,
    pub message: &'static str,
    /// Returns true when the object satisfies the rule
    pub check: fn(&Map<String, Value>) -> bool,
}

/// Field definitions and cross-field rules for one content type
#[derive(Debug, Clone, Default)]
pub struct ContentSchema {
    fields: BTreeMap<String, FieldSchema>,
    cross_field: Vec<CrossFieldRule>,
}

impl ContentSchema {
    pub fn new() -> Self {
        ContentSchema::default()
    }

    /// Declare a field
    pub fn field(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.insert(name.to_string(), schema);
        self
    }

    /// Declare a cross-field rule
    pub fn cross(mut self, rule: CrossFieldRule) -> Self {
        self.cross_field.push(rule);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    pub fn cross_field_rules(&self) -> &[CrossFieldRule] {
        &self.cross_field
    }
}

/// Static table of per-type schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: AHashMap<ContentType, ContentSchema>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Registry pre-loaded with the project/experience/skill schemas
    pub fn builtin() -> Self {
        let mut registry = SchemaRegistry::new();
        registry.register(ContentType::Project, project_schema());
        registry.register(ContentType::Experience, experience_schema());
        registry.register(ContentType::Skill, skill_schema());
        registry
    }

    /// Register (or replace) a schema for a type
    pub fn register(&mut self, content_type: ContentType, schema: ContentSchema) {
        self.schemas.insert(content_type, schema);
    }

    /// Look up the schema for a type; `None` for unregistered types
    pub fn get(&self, content_type: ContentType) -> Option<&ContentSchema> {
        self.schemas.get(&content_type)
    }

    /// Look up one field's declaration
    pub fn field(&self, content_type: ContentType, name: &str) -> Option<&FieldSchema> {
        self.get(content_type).and_then(|s| s.get_field(name))
    }
}

fn project_schema() -> ContentSchema {
    ContentSchema::new()
        .field(
            "title",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(3)
                .max_length(120),
        )
        .field(
            "description",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(50)
                .max_length(2000),
        )
        .field(
            "shortDescription",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(10)
                .max_length(200),
        )
        .field("client", FieldSchema::new(FieldKind::String).required())
        .field("category", FieldSchema::new(FieldKind::String).required())
        .field(
            "technologies",
            FieldSchema::new(FieldKind::Array).required().min_length(1),
        )
        .field("timeline", FieldSchema::new(FieldKind::String).required())
        .field(
            "projectStatus",
            FieldSchema::new(FieldKind::String)
                .required()
                .pattern("^(planned|in-progress|completed|on-hold)$"),
        )
        .field("media", FieldSchema::new(FieldKind::Object))
        .field("metrics", FieldSchema::new(FieldKind::Object))
        .field("dateCompleted", FieldSchema::new(FieldKind::Date))
        .cross(CrossFieldRule {
            name: "completed-requires-date",
            message: "completed projects must have a completion date (dateCompleted)",
            check: |obj| {
                let completed = obj.get("projectStatus").and_then(Value::as_str)
                    == Some("completed");
                !completed
                    || obj
                        .get("dateCompleted")
                        .and_then(Value::as_str)
                        .map(|s| !s.is_empty())
                        .unwrap_or(false)
            },
        })
}

fn experience_schema() -> ContentSchema {
    ContentSchema::new()
        .field(
            "title",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(3)
                .max_length(120),
        )
        .field("company", FieldSchema::new(FieldKind::String).required())
        .field("position", FieldSchema::new(FieldKind::String).required())
        .field("duration", FieldSchema::new(FieldKind::String).required())
        .field(
            "description",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(50)
                .max_length(2000),
        )
        .field("achievements", FieldSchema::new(FieldKind::Array))
        .field("technologies", FieldSchema::new(FieldKind::Array))
}

fn skill_schema() -> ContentSchema {
    ContentSchema::new()
        .field(
            "title",
            FieldSchema::new(FieldKind::String)
                .required()
                .min_length(1)
                .max_length(80),
        )
        .field(
            "proficiency",
            FieldSchema::new(FieldKind::Number).required().custom(
                "proficiency-range",
                "proficiency must be between 0 and 100",
                |v| v.as_f64().map(|n| (0.0..=100.0).contains(&n)).unwrap_or(false),
            ),
        )
        .field("yearsOfExperience", FieldSchema::new(FieldKind::Number))
        .field("category", FieldSchema::new(FieldKind::String))
}
