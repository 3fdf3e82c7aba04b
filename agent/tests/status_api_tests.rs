use schoolbase_agent::{
    build_coordinator, build_router, school_profile, AgentConfig, CollectionInfo, StatusResponse,
};
use schoolbase_storage::{save_collection, MemorySnapshotStore, SchoolProfile};
use schoolbase_sync::{MemoryRemoteStore, SyncCoordinator, SyncSummary};
use schoolbase_types::Record;
use serde_json::json;
use std::sync::Arc;

fn record(id: &str) -> Record {
    Record::from_value(json!({"id": id, "name": "test"})).unwrap()
}

async fn test_coordinator(remote: Arc<MemoryRemoteStore>) -> Arc<SyncCoordinator> {
    let local = Arc::new(MemorySnapshotStore::new());
    save_collection(local.as_ref(), "sms_students", &[record("S1"), record("S2")])
        .await
        .unwrap();
    let coordinator = build_coordinator(&AgentConfig::default(), local, remote);
    coordinator.load_local().await;
    Arc::new(coordinator)
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(coordinator: Arc<SyncCoordinator>) -> String {
    let app = build_router(coordinator);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn collections_endpoint_lists_local_counts() {
    let coordinator = test_coordinator(Arc::new(MemoryRemoteStore::new())).await;
    let base = spawn_test_server(coordinator).await;

    let resp = reqwest::get(format!("{}/api/v1/collections", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Vec<CollectionInfo> = resp.json().await.unwrap();
    assert_eq!(body.len(), 21);
    let students = body.iter().find(|c| c.name == "students").unwrap();
    assert_eq!(students.records, 2);
    assert_eq!(students.local_key, "sms_students");
    assert!(students.synchronized);
    let marks = body.iter().find(|c| c.name == "student_marks").unwrap();
    assert_eq!(marks.local_key, "sms_marks");
    assert_eq!(marks.records, 0);
}

#[tokio::test]
async fn status_endpoint_reports_every_synchronized_collection() {
    let coordinator = test_coordinator(Arc::new(MemoryRemoteStore::new())).await;
    let base = spawn_test_server(coordinator).await;

    let resp = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: StatusResponse = resp.json().await.unwrap();
    assert_eq!(body.provider, "memory");
    assert_eq!(body.school.name, "MPULUNGU DAY SECONDARY SCHOOL");
    assert!(!body.syncing);
    assert_eq!(body.collections.len(), 21);
    assert!(body.collections.values().all(|s| s.pushes == 0));
}

#[tokio::test]
async fn status_endpoint_reports_saved_school_profile() {
    let coordinator = test_coordinator(Arc::new(MemoryRemoteStore::new())).await;
    let profile = SchoolProfile {
        name: "LAKESIDE HIGH".to_string(),
        motto: "KNOWLEDGE IS LIGHT".to_string(),
        contact: "0977 000000".to_string(),
        ..Default::default()
    };
    profile.save(coordinator.local().as_ref()).await.unwrap();
    assert_eq!(school_profile(&coordinator).await, profile);

    let base = spawn_test_server(coordinator).await;
    let body: StatusResponse = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body.school, profile);
}

#[tokio::test]
async fn sync_endpoint_pushes_and_updates_status() {
    let remote = Arc::new(MemoryRemoteStore::new());
    let coordinator = test_coordinator(remote.clone()).await;
    let base = spawn_test_server(coordinator).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/sync", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let summary: SyncSummary = resp.json().await.unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.completed.len(), 21);
    assert_eq!(remote.ids("students"), vec!["S1", "S2"]);

    let status: StatusResponse = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let students = &status.collections["students"];
    assert_eq!(students.pushes, 1);
    assert!(students.last_pushed_at.is_some());
}

#[tokio::test]
async fn status_endpoint_content_type_is_json() {
    let coordinator = test_coordinator(Arc::new(MemoryRemoteStore::new())).await;
    let base = spawn_test_server(coordinator).await;
    let resp = reqwest::get(format!("{}/api/v1/status", base))
        .await
        .unwrap();

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let coordinator = test_coordinator(Arc::new(MemoryRemoteStore::new())).await;
    let base = spawn_test_server(coordinator).await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}
