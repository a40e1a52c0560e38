//! End-to-end custom domain scenarios: creation, uniqueness, certificates

mod common;

use pagedock_common::Error;
use pagedock_pages::{Actor, DomainStore, NamespaceKind};
use tempfile::TempDir;

use common::{build_artifact, generated_cert_pair, TestApp};

#[tokio::test]
async fn test_add_new_domain() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    app.registry
        .create(&project, "my.test.domain.com", None, None)
        .await
        .unwrap();

    let domains = app.registry.list(&project).await.unwrap();
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].hostname, "my.test.domain.com");
}

#[tokio::test]
async fn test_add_new_domain_for_group_namespaced_project() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::Group).await;

    app.registry
        .create(&project, "my.test.domain.com", None, None)
        .await
        .unwrap();

    assert_eq!(app.registry.list(&project).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_domain_already_taken_by_another_project() {
    let app = TestApp::new();
    let first = app.create_project(NamespaceKind::User).await;
    let second = app.create_project(NamespaceKind::User).await;

    app.registry
        .create(&first, "a.example.com", None, None)
        .await
        .unwrap();

    let err = app
        .registry
        .create(&second, "a.example.com", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateHostname(_)));
    assert_eq!(
        err.to_string(),
        "hostname has already been taken: a.example.com"
    );

    // No record exists afterward
    assert!(app.registry.list(&second).await.unwrap().is_empty());
    assert_eq!(app.store.domain_count(), 1);
}

#[tokio::test]
async fn test_add_domain_with_certificate() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let (cert, key) = generated_cert_pair("my.test.domain.com");

    let domain = app
        .registry
        .create(&project, "my.test.domain.com", Some(&cert), Some(&key))
        .await
        .unwrap();

    assert!(domain.has_certificate());
    let listed = app.registry.list(&project).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].certificate_pem.as_deref(), Some(cert.as_str()));
}

#[tokio::test]
async fn test_mismatched_certificate_creates_nothing() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let (cert, _) = generated_cert_pair("my.test.domain.com");
    let (_, wrong_key) = generated_cert_pair("unrelated.example.com");

    let err = app
        .registry
        .create(&project, "my.test.domain.com", Some(&cert), Some(&wrong_key))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyCertificateMismatch));

    // Not created at all, not even without the certificate fields
    assert!(app.registry.list(&project).await.unwrap().is_empty());
    assert!(app
        .registry
        .find_by_hostname("my.test.domain.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_certificate_material_rejected() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let (cert, key) = generated_cert_pair("my.test.domain.com");

    let err = app
        .registry
        .create(&project, "my.test.domain.com", Some("garbage"), Some(&key))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedCertificate(_)));

    let err = app
        .registry
        .create(&project, "my.test.domain.com", Some(&cert), Some("garbage"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedKey(_)));

    assert_eq!(app.store.domain_count(), 0);
}

#[tokio::test]
async fn test_domains_survive_deployment_removal() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;
    let owner = Actor::new(project.namespace_owner_id);
    let (cert, key) = generated_cert_pair("my.test.domain.com");

    let dir = TempDir::new().unwrap();
    let build = build_artifact(dir.path(), "deadbeef", &[("index.html", b"x" as &[u8])]);
    app.service.publish(project.id, build).await.unwrap();

    app.registry
        .create(&project, "my.test.domain.com", Some(&cert), Some(&key))
        .await
        .unwrap();

    // Domains have their own lifecycle: removal of the deployment leaves
    // them and their certificates intact
    app.service.remove(&owner, project.id).await.unwrap();

    let domains = app.registry.list(&project).await.unwrap();
    assert_eq!(domains.len(), 1);
    assert!(domains[0].has_certificate());
}

#[tokio::test]
async fn test_domain_removal_and_project_cascade() {
    let app = TestApp::new();
    let project = app.create_project(NamespaceKind::User).await;

    let kept = app
        .registry
        .create(&project, "kept.example.com", None, None)
        .await
        .unwrap();
    app.registry
        .create(&project, "dropped.example.com", None, None)
        .await
        .unwrap();

    app.registry.remove(kept.id).await.unwrap();
    let err = app.registry.remove(kept.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Hostname becomes available again after removal
    app.registry
        .create(&project, "kept.example.com", None, None)
        .await
        .unwrap();

    let removed = app.registry.remove_all_for_project(project.id).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(app.store.domain_count(), 0);
}

/// Postgres parity check for the domain store invariants.
///
/// Requires a reachable database; run locally with
/// `DATABASE_URL=postgres://... cargo test -- --ignored`.
#[tokio::test]
#[ignore]
#[serial_test::serial]
async fn test_postgres_domain_store_uniqueness_parity() {
    use pagedock_pages::{PagesDomain, PgDomainStore, PgProjectStore, Project, ProjectStore};

    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL is required");
    let pool = sqlx::PgPool::connect(&database_url).await.expect("connect");
    sqlx::migrate!("../../migrations").run(&pool).await.expect("migrate");

    let projects = PgProjectStore::new(pool.clone());
    let domains = PgDomainStore::new(pool.clone());

    let first = Project::new(
        "PG Test".to_string(),
        uuid::Uuid::new_v4(),
        NamespaceKind::User,
        uuid::Uuid::new_v4(),
    )
    .unwrap();
    let second = Project::new(
        "PG Test 2".to_string(),
        uuid::Uuid::new_v4(),
        NamespaceKind::User,
        uuid::Uuid::new_v4(),
    )
    .unwrap();
    projects.insert(&first).await.unwrap();
    projects.insert(&second).await.unwrap();

    let hostname = format!("{}.pgtest.example.com", uuid::Uuid::new_v4().simple());
    let domain = PagesDomain::new(first.id, hostname.clone(), None, None).unwrap();
    domains.insert(&domain).await.unwrap();

    let duplicate = PagesDomain::new(second.id, hostname.clone(), None, None).unwrap();
    let err = domains.insert(&duplicate).await.unwrap_err();
    assert!(matches!(err, Error::DuplicateHostname(_)));

    // Cleanup
    domains.delete(domain.id).await.unwrap();
}
