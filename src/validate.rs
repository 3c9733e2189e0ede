//! Content validation
//!
//! [`Validator::validate`] is a total function: it never panics and never
//! returns early on malformed input, it only accumulates issues. Warnings
//! never block validity; a report is valid iff its error list is empty.
//!
//! Phases run in a fixed order:
//! 1. required-field check
//! 2. per-field kind check + declared rules (unknown fields warn)
//! 3. cross-field schema rules
//! 4. generic metadata rules (id/slug charset, status enum, timestamps,
//!    tags/categories shape), applied regardless of type

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::model::{ContentStatus, ContentType};
use crate::schema::{is_parseable_date, FieldRule, SchemaRegistry};

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Machine-readable issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    RequiredFieldMissing,
    InvalidType,
    MinLengthViolation,
    MaxLengthViolation,
    PatternMismatch,
    CustomValidationFailed,
    InvalidIdFormat,
    InvalidSlugFormat,
    InvalidStatus,
    InvalidDate,
    UnknownField,
    SchemaNotFound,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueCode::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            IssueCode::InvalidType => "INVALID_TYPE",
            IssueCode::MinLengthViolation => "MIN_LENGTH_VIOLATION",
            IssueCode::MaxLengthViolation => "MAX_LENGTH_VIOLATION",
            IssueCode::PatternMismatch => "PATTERN_MISMATCH",
            IssueCode::CustomValidationFailed => "CUSTOM_VALIDATION_FAILED",
            IssueCode::InvalidIdFormat => "INVALID_ID_FORMAT",
            IssueCode::InvalidSlugFormat => "INVALID_SLUG_FORMAT",
            IssueCode::InvalidStatus => "INVALID_STATUS",
            IssueCode::InvalidDate => "INVALID_DATE",
            IssueCode::UnknownField => "UNKNOWN_FIELD",
            IssueCode::SchemaNotFound => "SCHEMA_NOT_FOUND",
        };
        write!(f, "{}", s)
    }
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: IssueCode,
    pub severity: Severity,
}

impl ValidationIssue {
    fn error(field: &str, code: IssueCode, message: String) -> Self {
        ValidationIssue {
            field: field.to_string(),
            message,
            code,
            severity: Severity::Error,
        }
    }

    fn warning(field: &str, code: IssueCode, message: String) -> Self {
        ValidationIssue {
            field: field.to_string(),
            message,
            code,
            severity: Severity::Warning,
        }
    }
}

/// Structured validation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Valid iff no errors were recorded (warnings never block)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

/// Metadata keys handled by the generic phase; the per-field phase does
/// not flag these as unknown.
const BASE_FIELDS: &[&str] = &[
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
];

/// Schema-driven content validator
#[derive(Debug, Clone)]
pub struct Validator {
    registry: SchemaRegistry,
    id_charset: Regex,
}

impl Validator {
    const ID_PATTERN: &'static str = "^[a-z0-9-]+$";

    pub fn new(registry: SchemaRegistry) -> Self {
        Validator {
            registry,
            // Literal pattern, compiles unconditionally
            id_charset: Regex::new(Self::ID_PATTERN).unwrap(),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Validate a JSON content object against the schema for `content_type`
    pub fn validate(&self, content: &Value, content_type: ContentType) -> ValidationReport {
        let mut report = ValidationReport::default();

        let Some(obj) = content.as_object() else {
            report.push(ValidationIssue::error(
                "$",
                IssueCode::InvalidType,
                "content must be a JSON object".to_string(),
            ));
            return report;
        };

        let Some(schema) = self.registry.get(content_type) else {
            report.push(ValidationIssue::error(
                "type",
                IssueCode::SchemaNotFound,
                format!("no schema registered for content type '{}'", content_type),
            ));
            return report;
        };

        // Phase 1: required fields
        for (name, field) in schema.fields() {
            if field.required && obj.get(name).map(Value::is_null).unwrap_or(true) {
                report.push(ValidationIssue::error(
                    name,
                    IssueCode::RequiredFieldMissing,
                    format!("{} is required", name),
                ));
            }
        }

        // Phase 2: per-field kind and rules. Base metadata keys are only
        // checked here when the schema declares them (e.g. title length
        // rules); otherwise phase 4 covers them.
        for (key, value) in obj {
            if value.is_null() {
                continue;
            }
            let Some(field) = schema.get_field(key) else {
                if !BASE_FIELDS.contains(&key.as_str()) {
                    report.push(ValidationIssue::warning(
                        key,
                        IssueCode::UnknownField,
                        format!("{} is not declared in the {} schema", key, content_type),
                    ));
                }
                continue;
            };
            if !field.kind.matches(value) {
                report.push(ValidationIssue::error(
                    key,
                    IssueCode::InvalidType,
                    format!("{} must be of type {}", key, field.kind.as_str()),
                ));
                continue;
            }
            for rule in &field.rules {
                self.apply_rule(key, value, rule, &mut report);
            }
        }

        // Phase 3: cross-field rules
        for rule in schema.cross_field_rules() {
            if !(rule.check)(obj) {
                report.push(ValidationIssue::error(
                    rule.name,
                    IssueCode::CustomValidationFailed,
                    rule.message.to_string(),
                ));
            }
        }

        // Phase 4: generic metadata rules
        self.check_metadata(obj, &mut report);

        report
    }

    fn apply_rule(&self, key: &str, value: &Value, rule: &FieldRule, report: &mut ValidationReport) {
        let length = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(a) => Some(a.len()),
            _ => None,
        };
        match rule {
            FieldRule::MinLength(min) => {
                if let Some(len) = length {
                    if len < *min {
                        report.push(ValidationIssue::error(
                            key,
                            IssueCode::MinLengthViolation,
                            format!("{} must have at least {} characters", key, min),
                        ));
                    }
                }
            }
            FieldRule::MaxLength(max) => {
                if let Some(len) = length {
                    if len > *max {
                        report.push(ValidationIssue::error(
                            key,
                            IssueCode::MaxLengthViolation,
                            format!("{} must have at most {} characters", key, max),
                        ));
                    }
                }
            }
            FieldRule::Pattern(re) => {
                if let Some(s) = value.as_str() {
                    if !re.is_match(s) {
                        report.push(ValidationIssue::error(
                            key,
                            IssueCode::PatternMismatch,
                            format!("{} does not match the expected pattern", key),
                        ));
                    }
                }
            }
            FieldRule::Custom {
                message, check, ..
            } => {
                if !check(value) {
                    report.push(ValidationIssue::error(
                        key,
                        IssueCode::CustomValidationFailed,
                        (*message).to_string(),
                    ));
                }
            }
        }
    }

    fn check_metadata(&self, obj: &Map<String, Value>, report: &mut ValidationReport) {
        if let Some(id) = obj.get("id") {
            if !id.as_str().map(|s| self.id_charset.is_match(s)).unwrap_or(false) {
                report.push(ValidationIssue::error(
                    "id",
                    IssueCode::InvalidIdFormat,
                    "id must match ^[a-z0-9-]+$".to_string(),
                ));
            }
        }
        if let Some(slug) = obj.get("slug") {
            if !slug.as_str().map(|s| self.id_charset.is_match(s)).unwrap_or(false) {
                report.push(ValidationIssue::error(
                    "slug",
                    IssueCode::InvalidSlugFormat,
                    "slug must match ^[a-z0-9-]+$".to_string(),
                ));
            }
        }
        if let Some(status) = obj.get("status") {
            let known = status
                .as_str()
                .map(|s| ContentStatus::ALL.iter().any(|k| k.as_str() == s))
                .unwrap_or(false);
            if !known {
                report.push(ValidationIssue::error(
                    "status",
                    IssueCode::InvalidStatus,
                    "status must be one of draft, published, archived".to_string(),
                ));
            }
        }
        for key in ["createdAt", "updatedAt"] {
            if let Some(value) = obj.get(key) {
                if !value.as_str().map(is_parseable_date).unwrap_or(false) {
                    report.push(ValidationIssue::error(
                        key,
                        IssueCode::InvalidDate,
                        format!("{} must be a valid date", key),
                    ));
                }
            }
        }
        for key in ["tags", "categories"] {
            if let Some(value) = obj.get(key) {
                let ok = value
                    .as_array()
                    .map(|a| a.iter().all(Value::is_string))
                    .unwrap_or(false);
                if !ok {
                    report.push(ValidationIssue::error(
                        key,
                        IssueCode::InvalidType,
                        format!("{} must be an array of strings", key),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> Validator {
        Validator::new(SchemaRegistry::builtin())
    }

    fn valid_project() -> Value {
        json!({
            "id": "ai-dashboard",
            "type": "project",
            "title": "AI Dashboard",
            "slug": "ai-dashboard",
            "status": "draft",
            "createdAt": "2024-06-01T10:00:00Z",
            "updatedAt": "2024-06-01T10:00:00Z",
            "tags": ["ai", "dashboard"],
            "categories": ["work"],
            "client": "Acme",
            "category": "ai",
            "description": "A dashboard for monitoring AI model performance metrics.",
            "shortDescription": "AI monitoring dashboard for ops",
            "technologies": ["React"],
            "timeline": "3 months",
            "projectStatus": "planned",
            "media": {"hero": "/h.jpg", "gallery": ["/g.jpg"]}
        })
    }

    #[test]
    fn test_valid_project_passes() {
        let report = validator().validate(&valid_project(), ContentType::Project);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn test_required_field_missing() {
        let mut project = valid_project();
        project.as_object_mut().unwrap().remove("description");
        let report = validator().validate(&project, ContentType::Project);
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::RequiredFieldMissing && e.field == "description"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut project = valid_project();
        project["client"] = Value::Null;
        let report = validator().validate(&project, ContentType::Project);
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::RequiredFieldMissing && e.field == "client"));
    }

    #[test]
    fn test_type_mismatch_skips_rules() {
        let mut project = valid_project();
        project["description"] = json!(42);
        let report = validator().validate(&project, ContentType::Project);
        let desc_issues: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.field == "description")
            .collect();
        assert_eq!(desc_issues.len(), 1);
        assert_eq!(desc_issues[0].code, IssueCode::InvalidType);
    }

    #[test]
    fn test_min_length_violation() {
        let mut project = valid_project();
        project["description"] = json!("too short");
        let report = validator().validate(&project, ContentType::Project);
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::MinLengthViolation && e.field == "description"));
    }

    #[test]
    fn test_pattern_mismatch() {
        let mut project = valid_project();
        project["projectStatus"] = json!("cancelled");
        let report = validator().validate(&project, ContentType::Project);
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::PatternMismatch && e.field == "projectStatus"));
    }

    #[test]
    fn test_unknown_field_is_warning_only() {
        let mut project = valid_project();
        project["mysteryField"] = json!("?");
        let report = validator().validate(&project, ContentType::Project);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == IssueCode::UnknownField && w.field == "mysteryField"));
    }

    #[test]
    fn test_completed_without_date_fails() {
        let mut project = valid_project();
        project["projectStatus"] = json!("completed");
        let report = validator().validate(&project, ContentType::Project);
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::CustomValidationFailed
                && e.message.contains("completion date")));
    }

    #[test]
    fn test_metadata_rules() {
        let mut project = valid_project();
        project["id"] = json!("Bad_ID");
        project["slug"] = json!("Bad Slug");
        project["status"] = json!("pending");
        project["createdAt"] = json!("yesterday");
        project["tags"] = json!([1, 2]);
        let report = validator().validate(&project, ContentType::Project);
        let codes: Vec<_> = report.errors.iter().map(|e| e.code).collect();
        assert!(codes.contains(&IssueCode::InvalidIdFormat));
        assert!(codes.contains(&IssueCode::InvalidSlugFormat));
        assert!(codes.contains(&IssueCode::InvalidStatus));
        assert!(codes.contains(&IssueCode::InvalidDate));
        assert!(codes.contains(&IssueCode::InvalidType));
    }

    #[test]
    fn test_schema_not_found() {
        let report = validator().validate(&valid_project(), ContentType::Video);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].code, IssueCode::SchemaNotFound);
    }

    #[test]
    fn test_non_object_content() {
        let report = validator().validate(&json!([1, 2, 3]), ContentType::Project);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].code, IssueCode::InvalidType);
        assert_eq!(report.errors[0].field, "$");
    }

    #[test]
    fn test_skill_proficiency_range() {
        let validator = validator();
        let skill = json!({
            "title": "Rust",
            "proficiency": 85
        });
        assert!(validator.validate(&skill, ContentType::Skill).is_valid());

        let out_of_range = json!({
            "title": "Rust",
            "proficiency": 120
        });
        let report = validator.validate(&out_of_range, ContentType::Skill);
        assert!(report
            .errors
            .iter()
            .any(|e| e.code == IssueCode::CustomValidationFailed && e.field == "proficiency"));
    }

    #[test]
    fn test_validator_idempotent_on_valid_items() {
        let validator = validator();
        let project = valid_project();
        let first = validator.validate(&project, ContentType::Project);
        assert!(first.is_valid());
        let second = validator.validate(&project, ContentType::Project);
        assert!(second.is_valid());
        assert_eq!(first, second);
    }
}
