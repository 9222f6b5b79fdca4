use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use vitrine::{
    AppState,
    auth::{Claims, issue_token},
    config::AppConfig,
    create_router,
    models::{LikeResponse, ProjectSummary, Record, fields, tables},
    store::{Fields, MockRecordStore},
};

// --- Test Scaffolding ---

fn obj(value: serde_json::Value) -> Fields {
    value.as_object().expect("fields must be an object").clone()
}

/// Spins the full router up on an ephemeral port, backed by the given mock
/// store, and returns the base address.
async fn spawn_app(store: Arc<MockRecordStore>) -> String {
    let state = AppState::new(store, AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

fn admin_token() -> String {
    let claims = Claims::new(
        "recUSER0000000001".to_string(),
        "admin@example.com".to_string(),
        "admin".to_string(),
    );
    issue_token(&claims, &AppConfig::default().jwt_secret).unwrap()
}

fn expired_token() -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "recUSER0000000001".to_string(),
        email: "admin@example.com".to_string(),
        role: "admin".to_string(),
        iat: (now - 7300) as usize,
        exp: (now - 7200) as usize,
    };
    issue_token(&claims, &AppConfig::default().jwt_secret).unwrap()
}

// --- Liveness ---

#[tokio::test]
async fn health_check_answers_ok() {
    let address = spawn_app(Arc::new(MockRecordStore::new())).await;
    let response = reqwest::get(format!("{}/health", address)).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

// --- Guard Matrix ---

#[tokio::test]
async fn admin_routes_reject_requests_without_a_token() {
    let address = spawn_app(Arc::new(MockRecordStore::new())).await;
    let response = reqwest::get(format!("{}/admin/projects", address))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_routes_reject_expired_and_tampered_tokens() {
    let address = spawn_app(Arc::new(MockRecordStore::new())).await;
    let client = reqwest::Client::new();

    let expired = client
        .get(format!("{}/admin/projects", address))
        .bearer_auth(expired_token())
        .send()
        .await
        .unwrap();
    assert_eq!(expired.status(), 401);

    let forged_claims = Claims::new(
        "recUSER0000000001".to_string(),
        "admin@example.com".to_string(),
        "admin".to_string(),
    );
    let forged = client
        .get(format!("{}/admin/projects", address))
        .bearer_auth(issue_token(&forged_claims, "some-other-secret").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), 401);
}

#[tokio::test]
async fn admin_routes_admit_a_valid_token() {
    let address = spawn_app(Arc::new(MockRecordStore::new())).await;
    let response = reqwest::Client::new()
        .get(format!("{}/admin/projects", address))
        .bearer_auth(admin_token())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

// --- Public Surface ---

#[tokio::test]
async fn public_listing_hides_unpublished_projects() {
    let store = Arc::new(MockRecordStore::new());
    let visible = store.seed(
        tables::PROJECTS,
        obj(json!({ "Titre": "Visible", "Publier": true })),
    );
    let hidden = store.seed(tables::PROJECTS, obj(json!({ "Titre": "Hidden" })));
    let address = spawn_app(store).await;

    let listing: Vec<ProjectSummary> = reqwest::get(format!("{}/projects", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(listing.iter().any(|p| p.id == visible));
    assert!(listing.iter().all(|p| p.id != hidden));
}

#[tokio::test]
async fn sequential_likes_add_up_exactly() {
    let store = Arc::new(MockRecordStore::new());
    let id = store.seed(
        tables::PROJECTS,
        obj(json!({ "Titre": "Site", "Publier": true })),
    );
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    for expected in 1..=5u64 {
        let response: LikeResponse = client
            .post(format!("{}/projects/{}/like", address, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response.likes, expected);
    }

    assert_eq!(
        store.get(tables::PROJECTS, &id).unwrap().u64_field(fields::LIKES),
        5
    );
}

#[tokio::test]
async fn unknown_project_detail_is_404_with_a_message() {
    let address = spawn_app(Arc::new(MockRecordStore::new())).await;
    let response = reqwest::get(format!("{}/projects/recMISSING0000000", address))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "project not found");
}

// --- Login ---

#[tokio::test]
async fn login_answers_distinct_messages_for_each_failure() {
    let store = Arc::new(MockRecordStore::new());
    let hash = bcrypt::hash("s3cret", 4).unwrap();
    store.seed(
        tables::USERS,
        obj(json!({ "Email": "admin@example.com", "Mot de passe Hash": hash, "Rôle": "admin" })),
    );
    let address = spawn_app(store).await;
    let client = reqwest::Client::new();

    let unknown = client
        .post(format!("{}/auth/login", address))
        .json(&json!({ "email": "nobody@example.com", "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 401);
    let body: serde_json::Value = unknown.json().await.unwrap();
    assert_eq!(body["error"], "unknown user");

    let wrong = client
        .post(format!("{}/auth/login", address))
        .json(&json!({ "email": "admin@example.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
    let body: serde_json::Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "invalid password");
}

#[tokio::test]
async fn login_token_opens_the_admin_surface() {
    let store = Arc::new(MockRecordStore::new());
    let hash = bcrypt::hash("s3cret", 4).unwrap();
    store.seed(
        tables::USERS,
        obj(json!({ "Email": "admin@example.com", "Mot de passe Hash": hash, "Rôle": "admin" })),
    );
    let address = spawn_app(store).await;
    let client = reqwest::Client::new();

    let login: serde_json::Value = client
        .post(format!("{}/auth/login", address))
        .json(&json!({ "email": "admin@example.com", "password": "s3cret" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["access_token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{}/admin/projects", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

// --- Admin Lifecycle ---

#[tokio::test]
async fn create_publish_list_delete_round_trip() {
    let store = Arc::new(MockRecordStore::new());
    let address = spawn_app(store).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    // Create: starts hidden, so the public listing stays empty.
    let created = client
        .post(format!("{}/admin/projects", address))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Site",
            "description": "A portfolio site",
            "students": ["Alice"],
            "technologies": ["Rust", "Vue"],
            "images": ["https://img.example/cover.png"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let record: Record = created.json().await.unwrap();

    let listing: Vec<ProjectSummary> = reqwest::get(format!("{}/projects", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listing.is_empty());

    // Publish, then the public listing carries the resolved names.
    let published = client
        .patch(format!("{}/admin/projects/{}/publish", address, record.id))
        .bearer_auth(&token)
        .json(&json!({ "publish": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(published.status(), 200);

    let listing: Vec<ProjectSummary> = reqwest::get(format!("{}/projects", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].students, vec!["Alice"]);
    assert_eq!(listing[0].technologies, vec!["Rust", "Vue"]);
    assert_eq!(listing[0].image, "https://img.example/cover.png");

    // Delete, and the record is gone.
    let deleted = client
        .delete(format!("{}/admin/projects/{}", address, record.id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 204);
}

#[tokio::test]
async fn publish_rejects_a_non_boolean_body() {
    let store = Arc::new(MockRecordStore::new());
    let id = store.seed(tables::PROJECTS, obj(json!({ "Titre": "Site" })));
    let address = spawn_app(store.clone()).await;

    let response = reqwest::Client::new()
        .patch(format!("{}/admin/projects/{}/publish", address, id))
        .bearer_auth(admin_token())
        .json(&json!({ "publish": "yes" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    // Nothing was written.
    assert!(!store.get(tables::PROJECTS, &id).unwrap().bool_field(fields::PUBLISHED));
}

#[tokio::test]
async fn deleting_an_unknown_project_surfaces_a_500() {
    let store = Arc::new(MockRecordStore::new());
    store.seed(tables::PROJECTS, obj(json!({ "Titre": "Site" })));
    let address = spawn_app(store).await;

    let response = reqwest::Client::new()
        .delete(format!("{}/admin/projects/recMISSING0000000", address))
        .bearer_auth(admin_token())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Record not found");
}
