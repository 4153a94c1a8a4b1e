//! Integration tests against a file-backed SQLite database

use autoportal_core::{CurrentUser, SettingsStore, SETTING_API_ENDPOINT};
use autoportal_database::models::{CreateCatalogItem, CreateExecution, ExecutionStatus};
use autoportal_database::queries::{catalog, executions, run_counters, settings};
use autoportal_database::{Database, SqliteSettingsStore};

async fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/test.db", dir.path().display());
    let db = Database::new(&url).await.unwrap();
    db.migrate().await.unwrap();
    (dir, db)
}

#[tokio::test]
async fn settings_round_trip_through_the_store_seam() {
    let (_dir, db) = test_db().await;

    // Seeded keys exist but are empty
    let store = SqliteSettingsStore::new(db.pool().clone());
    assert_eq!(
        store.get(SETTING_API_ENDPOINT).await.unwrap(),
        Some(String::new())
    );
    assert_eq!(store.get("no_such_key").await.unwrap(), None);

    settings::set_setting(db.pool(), SETTING_API_ENDPOINT, "https://awx.prod/api/v2")
        .await
        .unwrap();
    assert_eq!(
        store.get(SETTING_API_ENDPOINT).await.unwrap().as_deref(),
        Some("https://awx.prod/api/v2")
    );

    // Secret flag survives the seed
    let token_setting = settings::get_setting(db.pool(), "awx_token").await.unwrap();
    assert!(token_setting.is_secret);
}

#[tokio::test]
async fn run_ids_sequence_per_pool() {
    let (_dir, db) = test_db().await;

    let user = CurrentUser {
        email: Some("jdoe@corp.example".to_string()),
        groups: vec!["network-ops".to_string()],
        ..Default::default()
    };

    let first = run_counters::reserve_run_id(db.pool(), Some(&user))
        .await
        .unwrap();
    let second = run_counters::reserve_run_id(db.pool(), Some(&user))
        .await
        .unwrap();

    // Same pool, consecutive sequence numbers
    assert_eq!(first[..5], second[..5]);
    assert!(first.starts_with("RUN"));
    assert!(first.ends_with("-00001"));
    assert!(second.ends_with("-00002"));

    // Anonymous reservations land in pool 00
    let anonymous = run_counters::reserve_run_id(db.pool(), None).await.unwrap();
    assert!(anonymous.starts_with("RUN00-"));
}

#[tokio::test]
async fn execution_lifecycle_persists_launch_context() {
    let (_dir, db) = test_db().await;

    let item = catalog::create_catalog_item(
        db.pool(),
        &CreateCatalogItem {
            name: "Restart service".to_string(),
            namespace: "default".to_string(),
            description: None,
            template_id: "42".to_string(),
            inventory_id: Some("inv-1".to_string()),
            instance_group_id: None,
            form_schema: None,
            custom_body: None,
            tags: vec![],
            pinned: false,
            featured: false,
        },
    )
    .await
    .unwrap();

    let execution = executions::create_execution(
        db.pool(),
        &CreateExecution {
            catalog_id: item.id.clone(),
            unique_id: "RUN00-00001".to_string(),
            executed_by: "jdoe".to_string(),
            parameters: Some(r#"{"host":"srv1"}"#.to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(execution.status(), Some(ExecutionStatus::Pending));

    executions::set_launched(
        db.pool(),
        execution.id,
        r#"{"inventory":"inv-1","extra_vars":{"host":"srv1"}}"#,
        "1234",
    )
    .await
    .unwrap();

    executions::complete(
        db.pool(),
        execution.id,
        ExecutionStatus::Success,
        Some(r#"{"id":1234,"status":"successful"}"#),
        None,
        None,
    )
    .await
    .unwrap();

    let finished = executions::get_execution(db.pool(), execution.id).await.unwrap();
    assert_eq!(finished.status(), Some(ExecutionStatus::Success));
    assert_eq!(finished.awx_job_id.as_deref(), Some("1234"));
    assert!(finished.request_body.as_deref().unwrap().contains("inv-1"));
    assert!(finished.completed_at.is_some());

    catalog::increment_runs(db.pool(), &item.id).await.unwrap();
    let item = catalog::get_catalog_item(db.pool(), &item.id).await.unwrap();
    assert_eq!(item.runs, 1);

    let listed = executions::list_executions(db.pool(), Some(&item.id), 10, 0)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(executions::count_executions(db.pool(), None).await.unwrap(), 1);
}
