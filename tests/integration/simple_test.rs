//! Simple integration test to verify basic infrastructure works

mod common;

use pagedock_pages::NamespaceKind;

#[tokio::test]
async fn test_basic_infrastructure() {
    common::init_tracing();

    // Test that we can stand up the whole engine over a tempdir
    let app = common::TestApp::new();
    assert!(app.pages_root.ends_with("pages"));
    assert_eq!(app.store.domain_count(), 0);
    assert_eq!(app.store.deployment_count(), 0);
}

#[tokio::test]
async fn test_fixture_builders() {
    let app = common::TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    assert!(!project.pages_deployed());

    let dir = tempfile::TempDir::new().unwrap();
    let build = common::build_artifact(dir.path(), "deadbeef", &[("index.html", b"x" as &[u8])]);
    assert!(build.archive_path.exists());
    assert!(build.metadata_path.exists());

    let (cert, key) = common::generated_cert_pair("fixture.example.com");
    assert!(cert.contains("BEGIN CERTIFICATE"));
    assert!(key.contains("PRIVATE KEY"));
}
