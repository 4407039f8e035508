//! End-to-end migration tests
//!
//! Drive the whole pipeline from an export file on disk, against either the
//! in-memory remote or a mocked HTTP server.

use serde_json::json;
use std::sync::Arc;
use workspace_migrator::error::{MigrationError, PhaseLabel};
use workspace_migrator::export::JsonExport;
use workspace_migrator::migration::{MigrationOrchestrator, Phase, RunContext, RunSettings};
use workspace_migrator::model::{EntityKind, SourceId, TargetId};
use workspace_migrator::remote::{HttpRemoteApi, MockRemoteApi, RemoteCall};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_export(dir: &tempfile::TempDir, body: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("export.json");
    std::fs::write(&path, serde_json::to_vec_pretty(body).unwrap()).unwrap();
    path
}

fn context(remote: Arc<dyn workspace_migrator::remote::RemoteApi>, concurrency: usize) -> RunContext {
    RunContext::new(
        RunSettings::new(TargetId::new("ws-1")).with_concurrency(concurrency),
        remote,
    )
}

fn sample_export() -> serde_json::Value {
    json!({
        "teams": [
            {"source_id": "t1", "name": "Platform", "source_member_ids": ["u1", "u2", "u3"]}
        ],
        "projects": [
            {
                "source_id": "p1",
                "name": "Roadmap",
                "source_team_id": "t1",
                "source_item_ids": ["k1", "k2"],
                "source_follower_ids": ["u1", "u2", "u3"]
            },
            {"source_id": "p2", "name": "Orphan", "source_team_id": "t-missing"}
        ],
        "tags": [
            {"source_id": "g1", "name": "Urgent", "source_item_ids": ["k2"]}
        ],
        "tasks": [
            {
                "source_id": "k1",
                "name": "Design",
                "due_on": "2024-03-01",
                "assignee_status": "today",
                "source_item_ids": ["k2"],
                "source_follower_ids": ["u1", "u2", "u3"],
                "stories": [{"text": "first"}, {"text": "second"}]
            },
            {"source_id": "k2", "name": "Build", "completed": true}
        ],
        "attachments": [
            {"source_id": "a1", "name": "mock.png", "url": "https://files.example.com/mock.png", "source_parent_id": "k1"},
            {"source_id": "a2", "name": "lost.png", "source_parent_id": "k-missing"}
        ],
        "users": [
            {"source_id": "u1", "name": "Ada", "email": "ada@example.com", "source_item_ids": ["k1"]},
            {"source_id": "u2", "name": "Nobody"},
            {"source_id": "u3", "name": "Grace", "email": "grace@example.com"}
        ]
    })
}

#[tokio::test]
async fn test_export_file_migrates_into_mock_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let export = Arc::new(JsonExport::new(write_export(&dir, &sample_export())));
    let remote = Arc::new(MockRemoteApi::new());
    let orch = MigrationOrchestrator::new(export, context(remote.clone(), 4));

    let report = orch.run().await.unwrap();

    // Orphan project and the attachment without a task are skipped, not failed
    assert_eq!(report.totals().failed, 0);
    assert_eq!(report.get(Phase::ImportProjects).unwrap().skipped, 1);
    assert_eq!(report.get(Phase::ImportAttachments).unwrap().skipped, 1);
    // The user without an address is never invited
    assert_eq!(report.get(Phase::ImportUsers).unwrap().skipped, 1);

    let ids = &orch.context().ids;
    assert!(ids.get(EntityKind::Project, &SourceId::new("p2")).is_none());
    let k1 = ids.get(EntityKind::Task, &SourceId::new("k1")).unwrap();
    let u1 = ids.get(EntityKind::User, &SourceId::new("u1")).unwrap();
    let u3 = ids.get(EntityKind::User, &SourceId::new("u3")).unwrap();

    let calls = remote.calls().await;
    // One batch call with the resolvable followers, in source order
    assert!(calls.contains(&RemoteCall::AddTaskFollowers {
        task: k1.clone(),
        followers: vec![u1.clone(), u3.clone()],
    }));
    // Teams take members one at a time
    let team_members = calls
        .iter()
        .filter(|c| matches!(c, RemoteCall::AddTeamMember { .. }))
        .count();
    assert_eq!(team_members, 2);
    // Stories go to the created task
    let stories: Vec<&RemoteCall> = calls
        .iter()
        .filter(|c| matches!(c, RemoteCall::AddStory { task, .. } if *task == k1))
        .collect();
    assert_eq!(stories.len(), 2);
    // Status is set after the assignee, never before
    let assign = calls
        .iter()
        .position(|c| *c == RemoteCall::SetAssignee { task: k1.clone(), user: u1.clone() })
        .unwrap();
    let status = calls
        .iter()
        .position(|c| matches!(c, RemoteCall::SetAssigneeStatus { task, .. } if *task == k1))
        .unwrap();
    assert!(assign < status);
}

#[tokio::test]
async fn test_duplicate_source_id_aborts_run() {
    let mut body = sample_export();
    body["teams"] = json!([
        {"source_id": "t1", "name": "Platform"},
        {"source_id": "t1", "name": "Platform again"}
    ]);
    let dir = tempfile::tempdir().unwrap();
    let export = Arc::new(JsonExport::new(write_export(&dir, &body)));
    let remote = Arc::new(MockRemoteApi::new());

    let failure = MigrationOrchestrator::new(export, context(remote.clone(), 1))
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.failed_phase, PhaseLabel::Phase(Phase::ImportTeams));
    assert_eq!(failure.last_completed_phase, None);
    assert!(matches!(failure.source, MigrationError::DuplicateKey { .. }));
    assert!(!remote
        .calls()
        .await
        .iter()
        .any(|c| matches!(c, RemoteCall::CreateProject { .. })));
}

#[tokio::test]
async fn test_missing_export_file_fails_before_any_phase() {
    let export = Arc::new(JsonExport::new("/tmp/does-not-exist-migrator-export.json"));
    let remote = Arc::new(MockRemoteApi::new());

    let failure = MigrationOrchestrator::new(export, context(remote.clone(), 1))
        .run()
        .await
        .unwrap_err();

    assert_eq!(failure.failed_phase, PhaseLabel::Prepare);
    assert!(matches!(failure.source, MigrationError::Lifecycle { .. }));
    assert!(remote.calls().await.is_empty());
}

#[tokio::test]
async fn test_run_against_http_api() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"gid": "T-1"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/workspaces/ws-1/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"gid": "A-1"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workspaces/ws-1/addUser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"gid": "U-1"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/tasks/A-1"))
        .and(body_json(json!({"data": {"assignee": "U-1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"gid": "A-1"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/tasks/A-1"))
        .and(body_json(json!({"data": {"assignee_status": "later"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"gid": "A-1"}})))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({
        "teams": [{"source_id": "t1", "name": "Platform"}],
        "tasks": [{"source_id": "k1", "name": "Design", "assignee_status": "later"}],
        "users": [{"source_id": "u1", "email": "ada@example.com", "source_item_ids": ["k1"]}]
    });
    let dir = tempfile::tempdir().unwrap();
    let export = Arc::new(JsonExport::new(write_export(&dir, &body)));
    let remote = Arc::new(HttpRemoteApi::new(&server.uri(), Some("token".into())).unwrap());

    let orch = MigrationOrchestrator::new(export, context(remote, 2));
    let report = orch.run().await.unwrap();

    assert_eq!(report.totals().failed, 0);
    assert_eq!(report.get(Phase::AddAssigneesToTasks).unwrap().succeeded, 1);
    assert_eq!(report.get(Phase::AddAssigneeStatuses).unwrap().succeeded, 1);
    assert_eq!(
        orch.context().ids.get(EntityKind::Task, &SourceId::new("k1")),
        Some(TargetId::new("A-1"))
    );
}
