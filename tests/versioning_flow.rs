//! End-to-end versioning scenarios: create, update, backup, restore

use folio_rs::{
    compare_versions, BackupReason, ContentDraft, ContentError, ContentStore, ContentType,
    UpdateOptions,
};
use serde_json::{json, Map};
use std::cmp::Ordering;

fn ai_dashboard() -> ContentDraft {
    ContentDraft::new(ContentType::Project, "AI Dashboard")
        .field("client", json!("Acme"))
        .field("category", json!("ai"))
        .field(
            "description",
            json!("A dashboard for monitoring AI model performance data"), // 54 chars
        )
        .field("shortDescription", json!("AI monitoring dashboard UI")) // 26 chars
        .field("technologies", json!(["React"]))
        .field("timeline", json!("3 months"))
        .field("projectStatus", json!("planned"))
        .field("media", json!({"hero": "/h.jpg", "gallery": ["/g.jpg"]}))
}

#[test]
fn create_project_assigns_slug_and_initial_version() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    assert_eq!(item.slug, "ai-dashboard");
    assert_eq!(item.version, "1.0.0");
    assert!(item.updated_at >= item.created_at);

    let history = store.version_history(&item.id);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version.to_string(), "1.0.0");
    assert_eq!(history[0].hash.len(), 16);
}

#[test]
fn completed_project_without_date_is_rejected() {
    let mut store = ContentStore::with_builtin_schemas();
    let mut draft = ai_dashboard();
    draft
        .fields
        .insert("projectStatus".to_string(), json!("completed"));

    match store.create(draft, "alice") {
        Err(ContentError::Validation(issues)) => {
            assert!(
                issues.iter().any(|i| i.message.contains("completion date")),
                "issues: {:?}",
                issues
            );
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[test]
fn title_update_mints_version_backup_and_history() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    let mut updates = Map::new();
    updates.insert("title".to_string(), json!("New Title"));
    let updated = store
        .update(&item.id, updates, "alice", &UpdateOptions::default())
        .unwrap();

    // A new version was minted because the fingerprint changed
    assert_eq!(updated.version, "1.0.1");

    // The pre-update backup still carries the old title
    let backups = store.backups(&item.id);
    let pre_update = backups
        .iter()
        .find(|b| b.reason == BackupReason::PreUpdate)
        .expect("pre-update backup");
    assert_eq!(pre_update.data["title"], json!("AI Dashboard"));

    // Exactly one field change was recorded
    let changes = store.update_history(&item.id);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, "title");
}

#[test]
fn version_history_is_monotonic_across_updates() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    for i in 0..5 {
        let mut updates = Map::new();
        updates.insert("timeline".to_string(), json!(format!("{} months", i + 4)));
        store
            .update(&item.id, updates, "alice", &UpdateOptions::default())
            .unwrap();
    }

    let history = store.version_history(&item.id);
    assert_eq!(history.len(), 6);
    for pair in history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
        assert!(pair[0].version < pair[1].version);
        assert_ne!(pair[0].hash, pair[1].hash);
    }
    assert_eq!(history.last().unwrap().version.to_string(), "1.0.5");
}

#[test]
fn update_options_can_skip_backup_and_versioning() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    let mut updates = Map::new();
    updates.insert("timeline".to_string(), json!("6 months"));
    let options = UpdateOptions {
        create_backup: false,
        validate: true,
        update_version: false,
    };
    let updated = store.update(&item.id, updates, "alice", &options).unwrap();

    assert_eq!(updated.version, "1.0.0"); // unchanged
    assert_eq!(store.version_history(&item.id).len(), 1);
    assert_eq!(store.backups(&item.id).len(), 1); // only the creation backup
}

#[test]
fn skipping_validation_commits_invalid_data() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    let mut updates = Map::new();
    updates.insert("projectStatus".to_string(), json!("cancelled")); // not in the enum
    let options = UpdateOptions {
        validate: false,
        ..UpdateOptions::default()
    };
    store.update(&item.id, updates, "alice", &options).unwrap();
    assert_eq!(
        store.get(&item.id).unwrap().fields.get("projectStatus"),
        Some(&json!("cancelled"))
    );
}

#[test]
fn restore_returns_point_in_time_copy() {
    let mut store = ContentStore::with_builtin_schemas();
    let item = store.create(ai_dashboard(), "alice").unwrap();

    let mut updates = Map::new();
    updates.insert("title".to_string(), json!("Renamed"));
    store
        .update(&item.id, updates, "alice", &UpdateOptions::default())
        .unwrap();

    let backups = store.backups(&item.id);
    let pre_update_id = backups
        .iter()
        .find(|b| b.reason == BackupReason::PreUpdate)
        .map(|b| b.id.clone())
        .expect("pre-update backup");

    let snapshot = store.restore_from_backup(&pre_update_id).unwrap();
    assert_eq!(snapshot["title"], json!("AI Dashboard"));

    // Restoring does not mutate the live record
    assert_eq!(store.get(&item.id).unwrap().title, "Renamed");
}

#[test]
fn compare_versions_orders_numerically() {
    assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
    assert_eq!(compare_versions("1.10.0", "1.2.0"), Ordering::Greater);
    assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
}
