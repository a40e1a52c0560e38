//! End-to-end deployment scenarios: publish, supersede, fail, remove

mod common;

use std::fs;

use pagedock_common::{Error, RejectReason};
use pagedock_pages::{Actor, DeploymentState, DeploymentStore, NamespaceKind, SiteLimits};
use tempfile::TempDir;
use uuid::Uuid;

use common::{build_artifact, TestApp};

#[tokio::test]
async fn test_full_publish_flow() {
    let app = TestApp::with_limits(SiteLimits::new(1024 * 1024));
    let project = app.create_project(NamespaceKind::User).await;

    // 10KB site, 1MB limit
    let body = vec![b'x'; 10 * 1024 - 14];
    let dir = TempDir::new().unwrap();
    let build = build_artifact(
        dir.path(),
        "0b4bc9a49b562e85de7cc9e834518ea6828729b9",
        &[
            ("index.html", b"<h1>deployed</h1>" as &[u8]),
            ("assets/data.bin", body.as_slice()),
        ],
    );

    let deployment = app.service.publish(project.id, build).await.unwrap();
    assert!(deployment.is_success());
    assert_eq!(deployment.commit_sha, "0b4bc9a49b562e85de7cc9e834518ea6828729b9");

    // Deployed flag flipped, content committed and discoverable
    assert_eq!(
        app.service.state(project.id).await.unwrap(),
        DeploymentState::Deployed
    );
    let served = app.service.served_root(project.id).unwrap();
    assert_eq!(
        fs::read_to_string(served.join("index.html")).unwrap(),
        "<h1>deployed</h1>"
    );
    assert_eq!(
        fs::read(served.join("assets/data.bin")).unwrap().len(),
        10 * 1024 - 14
    );
}

#[tokio::test]
async fn test_publish_without_root_index_rejected() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    let dir = TempDir::new().unwrap();
    let build = build_artifact(
        dir.path(),
        "deadbeef",
        &[("assets/app.js", b"console.log(1);" as &[u8])],
    );

    let err = app.service.publish(project.id, build).await.unwrap_err();
    assert!(matches!(err, Error::Rejected(RejectReason::MissingRoot)));
    assert!(app.service.served_root(project.id).is_none());
}

#[tokio::test]
async fn test_sequential_publishes_are_total_replacement() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    let dir_v1 = TempDir::new().unwrap();
    let v1 = build_artifact(
        dir_v1.path(),
        "commit-v1",
        &[
            ("index.html", b"first" as &[u8]),
            ("v1-only/readme.txt", b"will vanish"),
        ],
    );
    app.service.publish(project.id, v1).await.unwrap();

    let dir_v2 = TempDir::new().unwrap();
    let v2 = build_artifact(dir_v2.path(), "commit-v2", &[("index.html", b"second" as &[u8])]);
    app.service.publish(project.id, v2).await.unwrap();

    // No files from the first deployment survive in the served tree
    let served = app.service.served_root(project.id).unwrap();
    assert_eq!(fs::read_to_string(served.join("index.html")).unwrap(), "second");
    assert!(!served.join("v1-only").exists());
}

#[tokio::test]
async fn test_failed_publish_keeps_prior_site_live() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    let dir = TempDir::new().unwrap();
    let good = build_artifact(dir.path(), "good", &[("index.html", b"still here" as &[u8])]);
    app.service.publish(project.id, good).await.unwrap();

    let bad = build_artifact(dir.path(), "bad", &[("no-root.txt", b"nope" as &[u8])]);
    let err = app.service.publish(project.id, bad).await.unwrap_err();
    assert!(err.is_rejection());

    assert_eq!(
        app.service.state(project.id).await.unwrap(),
        DeploymentState::Deployed
    );
    let served = app.service.served_root(project.id).unwrap();
    assert_eq!(
        fs::read_to_string(served.join("index.html")).unwrap(),
        "still here"
    );

    // Both attempts are on record: one success, one failure
    let records = DeploymentStore::list_for_project(&app.store, project.id)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|d| d.is_success()).count(), 1);
}

#[tokio::test]
async fn test_concurrent_publishes_leave_one_consistent_winner() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    let dir_a = TempDir::new().unwrap();
    let build_a = build_artifact(
        dir_a.path(),
        "commit-a",
        &[
            ("index.html", b"site-a" as &[u8]),
            ("stamp-a.txt", b"a"),
        ],
    );
    let dir_b = TempDir::new().unwrap();
    let build_b = build_artifact(
        dir_b.path(),
        "commit-b",
        &[
            ("index.html", b"site-b" as &[u8]),
            ("stamp-b.txt", b"b"),
        ],
    );

    let (a, b) = tokio::join!(
        app.service.publish(project.id, build_a),
        app.service.publish(project.id, build_b),
    );
    a.unwrap();
    b.unwrap();

    // The served tree is fully one deployment, never a mix
    let served = app.service.served_root(project.id).unwrap();
    let index = fs::read_to_string(served.join("index.html")).unwrap();
    match index.as_str() {
        "site-a" => {
            assert!(served.join("stamp-a.txt").exists());
            assert!(!served.join("stamp-b.txt").exists());
        }
        "site-b" => {
            assert!(served.join("stamp-b.txt").exists());
            assert!(!served.join("stamp-a.txt").exists());
        }
        other => panic!("served tree is a mix: {other}"),
    }
}

#[tokio::test]
async fn test_publishes_for_distinct_projects_are_independent() {
    let app = TestApp::new();
    let first = app.create_project(NamespaceKind::User).await;
    let second = app.create_project(NamespaceKind::Group).await;

    let dir = TempDir::new().unwrap();
    let build_one = build_artifact(dir.path(), "one", &[("index.html", b"one" as &[u8])]);
    let build_two = build_artifact(dir.path(), "two", &[("index.html", b"two" as &[u8])]);

    let (a, b) = tokio::join!(
        app.service.publish(first.id, build_one),
        app.service.publish(second.id, build_two),
    );
    a.unwrap();
    b.unwrap();

    let served_one = app.service.served_root(first.id).unwrap();
    let served_two = app.service.served_root(second.id).unwrap();
    assert_eq!(fs::read_to_string(served_one.join("index.html")).unwrap(), "one");
    assert_eq!(fs::read_to_string(served_two.join("index.html")).unwrap(), "two");
}

#[tokio::test]
async fn test_owner_removal_lifecycle() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let owner = Actor::new(project.namespace_owner_id);
    let stranger = Actor::new(Uuid::new_v4());

    let dir = TempDir::new().unwrap();
    let build = build_artifact(dir.path(), "deadbeef", &[("index.html", b"x" as &[u8])]);
    app.service.publish(project.id, build).await.unwrap();

    // A non-owner cannot remove the deployment
    let err = app.service.remove(&stranger, project.id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden));
    assert!(app.service.served_root(project.id).is_some());

    // The owner can; content reads find nothing servable afterward
    app.service.remove(&owner, project.id).await.unwrap();
    assert_eq!(
        app.service.state(project.id).await.unwrap(),
        DeploymentState::NoDeployment
    );
    assert!(app.service.served_root(project.id).is_none());

    // Removing again reports nothing to remove
    let err = app.service.remove(&owner, project.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_republish_after_removal() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let owner = Actor::new(project.namespace_owner_id);

    let dir = TempDir::new().unwrap();
    let build = build_artifact(dir.path(), "first", &[("index.html", b"v1" as &[u8])]);
    app.service.publish(project.id, build).await.unwrap();
    app.service.remove(&owner, project.id).await.unwrap();

    let build = build_artifact(dir.path(), "second", &[("index.html", b"v2" as &[u8])]);
    app.service.publish(project.id, build).await.unwrap();

    let served = app.service.served_root(project.id).unwrap();
    assert_eq!(fs::read_to_string(served.join("index.html")).unwrap(), "v2");
}
