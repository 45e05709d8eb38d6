// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::io::Write;

use mockito::Server;
use serde_json::json;
use tollgate::session::{load_profile_file, visible_labels, AppSession};
use tollgate_core::{
    Capability, ClientConfig, ClientConfigManifest, CredentialStore, HttpMethod, PermissionSet,
};

fn config(base_url: &str) -> ClientConfig {
    let template = include_str!("../templates/config-with-examples.yaml");
    let mut config = ClientConfigManifest::from_yaml_str(template).unwrap().spec;
    config.api.base_url = base_url.to_string();
    config
}

fn account(role: &str) -> serde_json::Value {
    json!({
        "statusCode": 200,
        "data": {
            "user": {
                "_id": "u1",
                "email": "hr@example.com",
                "role": {"_id": "r1", "name": role},
                "permissions": [
                    {"apiPath": "/api/v1/users", "method": "GET", "module": "USERS"},
                    {"apiPath": "/api/v1/jobs/:id", "method": "PATCH", "module": "JOBS"},
                    {"apiPath": "/api/v1/roles/:id", "method": "GET", "module": "ROLES"}
                ]
            }
        }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simultaneous_expiries_show_one_notice() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/auth/login")
        .with_status(201)
        .with_body(r#"{"data":{"access_token":"first"}}"#)
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex(r"^/(jobs|users|roles)$".to_string()))
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("GET", "/auth/refresh")
        .with_status(400)
        .expect(1)
        .create_async()
        .await;

    let session = AppSession::connect(config(&server.url())).unwrap();
    session.login("hr@example.com", "secret").await.unwrap();

    let client = session.client();
    let (jobs, users, roles) = tokio::join!(client.get("/jobs"), client.get("/users"), client.get("/roles"));

    assert!(jobs.unwrap_err().is_session_expired());
    assert!(users.unwrap_err().is_session_expired());
    assert!(roles.unwrap_err().is_session_expired());

    assert_eq!(session.notice().reports(), 3);
    assert_eq!(session.notice().notices(), 1);
    assert_eq!(client.coordinator().renewal_count(), 1);
    assert!(!client.credentials().is_authenticated());
    refresh.assert_async().await;

    // Logging in again re-arms the notice
    session.login("hr@example.com", "secret").await.unwrap();
    assert!(!session.notice().is_expired());
}

#[tokio::test]
async fn test_live_profile_drives_navigation() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/auth/login")
        .with_status(201)
        .with_body(r#"{"data":{"access_token":"token"}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/auth/account")
        .match_header("authorization", "Bearer token")
        .with_status(200)
        .with_body(account("HR").to_string())
        .create_async()
        .await;

    let session = AppSession::connect(config(&server.url())).unwrap();
    session.login("hr@example.com", "secret").await.unwrap();

    let (profile, permissions) = session.permissions().await.unwrap();

    assert_eq!(profile.role_name(), Some("HR"));
    assert!(permissions.can(&Capability::new(HttpMethod::Patch, "/api/v1/jobs/64f9a3", "jobs")));
    assert!(!permissions.can(&Capability::new(HttpMethod::Delete, "/api/v1/jobs/64f9a3", "JOBS")));
    assert_eq!(
        session.navigation(&permissions),
        vec!["Dashboard", "Users", "Jobs", "Roles"]
    );
}

#[test]
fn test_saved_profile_file() {
    let config = config("http://localhost:8000");

    let mut account_file = tempfile::NamedTempFile::new().unwrap();
    write!(account_file, "{}", account("SUPER_ADMIN")).unwrap();
    let profile = load_profile_file(account_file.path(), &config).unwrap();
    let permissions = PermissionSet::from_profile(&profile, &config.access);

    assert!(permissions.is_bypass());
    assert_eq!(visible_labels(&config, &permissions).len(), 7);

    // A bare profile object works too
    let mut profile_file = tempfile::NamedTempFile::new().unwrap();
    write!(profile_file, "{}", account("HR")["data"]["user"]).unwrap();
    let profile = load_profile_file(profile_file.path(), &config).unwrap();

    assert_eq!(profile.permissions.len(), 3);
    assert!(!PermissionSet::from_profile(&profile, &config.access).is_bypass());
}

#[test]
fn test_unreadable_profile_is_an_error() {
    let config = config("http://localhost:8000");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    assert!(load_profile_file(file.path(), &config).is_err());
}
