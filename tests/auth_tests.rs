use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use vitrine::{
    AppState,
    auth::{AuthUser, Claims, TOKEN_TTL_SECS, issue_token},
    config::AppConfig,
    store::MockRecordStore,
};

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

// --- Helper Functions ---

fn test_state() -> AppState {
    let config = AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState::new(Arc::new(MockRecordStore::new()), config)
}

fn claims_expiring_in(offset_secs: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: "recUSER0000000001".to_string(),
        email: "admin@example.com".to_string(),
        role: "admin".to_string(),
        iat: now as usize,
        exp: (now + offset_secs) as usize,
    }
}

/// Builds the mutable Parts struct the extractor consumes.
fn request_parts(bearer: Option<&str>) -> Parts {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(Uri::from_static("/admin/projects"));
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(axum::body::Body::empty()).unwrap();
    let (parts, _) = request.into_parts();
    parts
}

// --- Token Issuance ---

#[test]
fn issued_tokens_decode_back_to_their_claims() {
    let claims = Claims::new(
        "recUSER0000000001".to_string(),
        "admin@example.com".to_string(),
        "admin".to_string(),
    );
    let token = issue_token(&claims, TEST_JWT_SECRET).unwrap();

    let decoded = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(decoded.claims.sub, "recUSER0000000001");
    assert_eq!(decoded.claims.email, "admin@example.com");
    assert_eq!(decoded.claims.role, "admin");
    assert_eq!(
        decoded.claims.exp - decoded.claims.iat,
        TOKEN_TTL_SECS as usize
    );
}

// --- Extractor Acceptance ---

#[tokio::test]
async fn valid_token_resolves_to_its_identity() {
    let token = issue_token(&claims_expiring_in(3600), TEST_JWT_SECRET).unwrap();
    let mut parts = request_parts(Some(&token));

    let auth_user = AuthUser::from_request_parts(&mut parts, &test_state())
        .await
        .unwrap();

    assert_eq!(auth_user.id, "recUSER0000000001");
    assert_eq!(auth_user.email, "admin@example.com");
    assert_eq!(auth_user.role, "admin");
}

// --- Extractor Rejection ---

#[tokio::test]
async fn missing_header_is_rejected() {
    let mut parts = request_parts(None);
    let result = AuthUser::from_request_parts(&mut parts, &test_state()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_bearer_header_is_rejected() {
    let mut parts = request_parts(None);
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic dXNlcjpwYXNz"),
    );
    let result = AuthUser::from_request_parts(&mut parts, &test_state()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    // Comfortably past the validator's default leeway.
    let token = issue_token(&claims_expiring_in(-7200), TEST_JWT_SECRET).unwrap();
    let mut parts = request_parts(Some(&token));

    let result = AuthUser::from_request_parts(&mut parts, &test_state()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let token = issue_token(&claims_expiring_in(3600), "some-other-secret").unwrap();
    let mut parts = request_parts(Some(&token));

    let result = AuthUser::from_request_parts(&mut parts, &test_state()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let mut parts = request_parts(Some("not-a-token"));
    let result = AuthUser::from_request_parts(&mut parts, &test_state()).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}
