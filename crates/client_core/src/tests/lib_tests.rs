use std::sync::Arc;

use super::*;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Json(String, Value),
    Multipart(String, Vec<(String, String)>),
    Delete(String),
}

#[derive(Clone, Default)]
struct MockState {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockState {
    async fn push(&self, seen: Seen) {
        self.seen.lock().await.push(seen);
    }

    async fn seen(&self) -> Vec<Seen> {
        self.seen.lock().await.clone()
    }
}

/// Collects multipart fields as `(name, value)`; file parts become `file_name:contents`.
async fn read_fields(mut multipart: Multipart) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let prefix = field
            .file_name()
            .map(|file| format!("{file}:"))
            .unwrap_or_default();
        let text = field.text().await.unwrap_or_default();
        fields.push((name, format!("{prefix}{text}")));
    }
    fields
}

async fn list_environments() -> Json<Value> {
    Json(json!([
        {
            "name": "base",
            "path": "/opt/conda",
            "size": "1.2G",
            "last_modified": "2024-01-01 10:00",
            "python_version": "3.10"
        },
        {
            "name": "broken",
            "path": "/opt/conda/envs/broken",
            "size": "N/A",
            "last_modified": "N/A"
        }
    ]))
}

async fn create_environment(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.push(Seen::Json("create".into(), body)).await;
    Json(json!({ "message": "created" }))
}

async fn clone_environment(
    State(state): State<MockState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.push(Seen::Json(format!("clone {name}"), body)).await;
    Json(json!({ "message": "cloned" }))
}

async fn delete_environment(
    State(state): State<MockState>,
    Path(name): Path<String>,
) -> (StatusCode, String) {
    state.push(Seen::Delete(name.clone())).await;
    match name.as_str() {
        "active" => (
            StatusCode::BAD_REQUEST,
            json!({ "detail": "Cannot remove the active environment" }).to_string(),
        ),
        "flaky" => (StatusCode::INTERNAL_SERVER_ERROR, "oops".to_string()),
        _ => (StatusCode::OK, json!({ "message": "deleted" }).to_string()),
    }
}

async fn export_environment(Path(name): Path<String>) -> Json<Value> {
    Json(json!({ "yaml": format!("name: {name}\nchannels:\n  - defaults\n") }))
}

async fn environment_size(Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    if name == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Environment 'missing' not found" })),
        );
    }
    (StatusCode::OK, Json(json!({ "size": "512M" })))
}

async fn import_environment(State(state): State<MockState>, multipart: Multipart) -> Json<Value> {
    let fields = read_fields(multipart).await;
    state.push(Seen::Multipart("import".into(), fields)).await;
    Json(json!({ "message": "imported" }))
}

async fn list_packages(Path(name): Path<String>) -> (StatusCode, Json<Value>) {
    if name == "garbled" {
        return (StatusCode::OK, Json(json!({ "unexpected": true })));
    }
    (
        StatusCode::OK,
        Json(json!([
            { "name": "numpy", "version": "1.26.4", "build_string": "py311h_0" },
            { "name": "pip", "version": "24.0" }
        ])),
    )
}

async fn install_package(
    State(state): State<MockState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.push(Seen::Json(format!("install {name}"), body)).await;
    Json(json!({ "message": "installed" }))
}

async fn uninstall_package(
    State(state): State<MockState>,
    Path((name, package)): Path<(String, String)>,
) -> Json<Value> {
    state.push(Seen::Delete(format!("{name}/{package}"))).await;
    Json(json!({ "message": "uninstalled" }))
}

async fn install_from_file(
    State(state): State<MockState>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> Json<Value> {
    let fields = read_fields(multipart).await;
    state.push(Seen::Multipart(format!("bulk {name}"), fields)).await;
    Json(json!({ "message": "Packages from 'requirements.txt' installed successfully (pip)." }))
}

async fn spawn_management_server() -> Result<(String, MockState), std::io::Error> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::default();
    let app = Router::new()
        .route("/api/envs", get(list_environments).post(create_environment))
        .route("/api/envs/import", post(import_environment))
        .route("/api/envs/:name", delete(delete_environment))
        .route("/api/envs/:name/clone", post(clone_environment))
        .route("/api/envs/:name/export", get(export_environment))
        .route("/api/envs/:name/size", get(environment_size))
        .route(
            "/api/envs/:name/packages",
            get(list_packages).post(install_package),
        )
        .route("/api/envs/:name/packages/file", post(install_from_file))
        .route("/api/envs/:name/packages/:package", delete(uninstall_package))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn client() -> (ManagerClient, MockState) {
    let (url, state) = spawn_management_server().await.expect("spawn server");
    (ManagerClient::new(&url).expect("client"), state)
}

#[test]
fn endpoints_are_rooted_at_the_api_prefix_and_percent_encoded() {
    let client = ManagerClient::new("http://localhost:8000/").expect("client");
    assert_eq!(
        client.endpoint(&[]).as_str(),
        "http://localhost:8000/api/envs"
    );
    assert_eq!(
        client.endpoint(&["my env", "packages", "a/b"]).as_str(),
        "http://localhost:8000/api/envs/my%20env/packages/a%2Fb"
    );

    let nested = ManagerClient::new("http://gateway.local/manager").expect("client");
    assert_eq!(
        nested.endpoint(&["base", "export"]).as_str(),
        "http://gateway.local/manager/api/envs/base/export"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(matches!(
        ManagerClient::new("not a url"),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        ManagerClient::new("mailto:ops@example.com"),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
}

#[tokio::test]
async fn lists_environments_with_missing_fields_as_not_available() {
    let (client, _) = client().await;
    let envs = client.list_environments().await.expect("list");

    assert_eq!(envs.len(), 2);
    assert_eq!(envs[0].runtime_version, "3.10");
    assert_eq!(envs[0].size_on_disk, "1.2G");
    assert_eq!(envs[1].runtime_version, "N/A");
    assert_eq!(envs[1].size_bytes(), 0);
}

#[tokio::test]
async fn create_and_clone_post_json_bodies() {
    let (client, state) = client().await;
    client
        .create_environment("envA", "3.11")
        .await
        .expect("create");
    client
        .clone_environment("envA", "envA_clone")
        .await
        .expect("clone");

    assert_eq!(
        state.seen().await,
        vec![
            Seen::Json(
                "create".into(),
                json!({ "name": "envA", "runtime_version": "3.11" })
            ),
            Seen::Json("clone envA".into(), json!({ "new_name": "envA_clone" })),
        ]
    );
}

#[tokio::test]
async fn delete_surfaces_detail_or_falls_back_to_generic_message() {
    let (client, state) = client().await;

    client.delete_environment("envA").await.expect("delete");

    let err = client
        .delete_environment("active")
        .await
        .expect_err("detail error");
    assert_eq!(err.to_string(), "Cannot remove the active environment");
    assert_eq!(err.status(), Some(400));

    let err = client
        .delete_environment("flaky")
        .await
        .expect_err("generic error");
    assert_eq!(
        err,
        RemoteError::Rejected {
            operation: Operation::DeleteEnvironment,
            status: 500
        }
    );
    assert_eq!(err.to_string(), "Failed to delete environment");

    assert_eq!(
        state.seen().await,
        vec![
            Seen::Delete("envA".into()),
            Seen::Delete("active".into()),
            Seen::Delete("flaky".into()),
        ]
    );
}

#[tokio::test]
async fn path_segments_reach_the_server_decoded() {
    let (client, state) = client().await;
    client
        .uninstall_package("my env", "scikit-learn")
        .await
        .expect("uninstall");

    assert_eq!(
        state.seen().await,
        vec![Seen::Delete("my env/scikit-learn".into())]
    );
}

#[tokio::test]
async fn export_and_size_unwrap_their_envelopes() {
    let (client, _) = client().await;

    let yaml = client.export_environment("envA").await.expect("export");
    assert!(yaml.starts_with("name: envA\n"));

    assert_eq!(client.environment_size("envA").await.expect("size"), "512M");
    let err = client
        .environment_size("missing")
        .await
        .expect_err("not found");
    assert_eq!(err.to_string(), "Environment 'missing' not found");
}

#[tokio::test]
async fn import_sends_manifest_and_only_the_given_fields() {
    let (client, state) = client().await;
    let manifest = ManifestFile::new("requirements.txt", "numpy==1.26\n");

    client
        .import_environment(&manifest, Some("fromreq"), Some("3.11"))
        .await
        .expect("import with fields");
    client
        .import_environment(&ManifestFile::new("environment.yml", "name: x\n"), None, None)
        .await
        .expect("bare import");

    assert_eq!(
        state.seen().await,
        vec![
            Seen::Multipart(
                "import".into(),
                vec![
                    ("file".into(), "requirements.txt:numpy==1.26\n".into()),
                    ("name".into(), "fromreq".into()),
                    ("runtime_version".into(), "3.11".into()),
                ]
            ),
            Seen::Multipart(
                "import".into(),
                vec![("file".into(), "environment.yml:name: x\n".into())]
            ),
        ]
    );
}

#[tokio::test]
async fn packages_round_trip_through_the_package_endpoints() {
    let (client, state) = client().await;

    let packages = client.list_packages("envA").await.expect("packages");
    assert_eq!(packages[0].build_string, "py311h_0");
    assert_eq!(packages[1].build_string, "");

    client
        .install_package("envA", "requests==2.31")
        .await
        .expect("install");
    let message = client
        .install_from_file("envA", &ManifestFile::new("requirements.txt", "numpy\n"))
        .await
        .expect("bulk");
    assert_eq!(
        message,
        "Packages from 'requirements.txt' installed successfully (pip)."
    );

    assert_eq!(
        state.seen().await,
        vec![
            Seen::Json("install envA".into(), json!({ "package": "requests==2.31" })),
            Seen::Multipart(
                "bulk envA".into(),
                vec![("file".into(), "requirements.txt:numpy\n".into())]
            ),
        ]
    );
}

#[tokio::test]
async fn undecodable_success_body_is_an_invalid_response() {
    let (client, _) = client().await;
    let err = client
        .list_packages("garbled")
        .await
        .expect_err("invalid body");
    assert!(matches!(
        err,
        RemoteError::InvalidResponse {
            operation: Operation::ListPackages,
            ..
        }
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = ManagerClient::new(&format!("http://{addr}")).expect("client");
    let err = client.list_environments().await.expect_err("refused");

    assert!(matches!(err, RemoteError::Transport { .. }));
    assert_eq!(err.to_string(), "Failed to fetch environments");
}

#[test]
fn settings_feed_the_client() {
    let settings = Settings {
        api_base_url: "http://manager.internal:9000".to_string(),
        connect_timeout_secs: Some(2),
        ..Settings::default()
    };
    let client = ManagerClient::from_settings(&settings).expect("client");
    assert_eq!(client.base_url().as_str(), "http://manager.internal:9000/");
}
