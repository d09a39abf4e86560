mod common;

use std::time::Duration;

use common::{SECRET, device_config, form, harness};
use grantflow::AuthResult;
use grantflow::error::AuthError;
use grantflow::storage::TokenStorage;
use grantflow::strategy::{CoreStrategy, HmacCoreStrategy};
use grantflow::types::token_types::{ACCESS_TOKEN_TYPE, JWT_TOKEN_TYPE};
use grantflow::types::{AccessResponse, Client, GrantType, Request, Session, TokenKind};
use time::OffsetDateTime;

const EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

fn core_strategy() -> HmacCoreStrategy {
    HmacCoreStrategy::new(SECRET, Duration::from_secs(3600), Duration::from_secs(86400)).unwrap()
}

fn frontend() -> Client {
    Client::new("frontend", vec![GrantType::TokenExchange])
        .with_scopes(["photos"])
        .with_token_exchange_allowed_clients(["gateway"])
}

async fn setup() -> common::Harness {
    let h = harness(device_config(Duration::from_secs(5))).await;
    h.store.register_client(frontend(), Some("frontend-secret")).await;
    h.store
        .register_client(
            Client::new("gateway", vec![GrantType::TokenExchange])
                .with_scopes(["photos", "photos.read"])
                .with_audience(["https://photos.example.com"]),
            Some("gateway-secret"),
        )
        .await;
    h.store
        .register_client(
            Client::new("intruder", vec![GrantType::TokenExchange]).with_scopes(["photos"]),
            Some("intruder-secret"),
        )
        .await;
    h
}

/// Stores an access token issued to `frontend` on behalf of alice.
async fn issue_subject_token(h: &common::Harness) -> String {
    let strategy = core_strategy();
    let mut request = Request::new();
    request.client = Some(frontend());
    request.grant_scope("photos");
    request.session = Session::new("alice");
    request.session.extra.insert("tenant", "acme");
    request.session.set_expires_at(
        TokenKind::AccessToken,
        OffsetDateTime::now_utc() + time::Duration::hours(1),
    );
    let (token, signature) = strategy.generate_access_token(&request).unwrap();
    h.store
        .create_access_token_session(&h.ctx, &signature, &request)
        .await
        .unwrap();
    token
}

async fn exchange(
    h: &common::Harness,
    client_id: &str,
    secret: &str,
    extra: &[(&str, &str)],
) -> AuthResult<AccessResponse> {
    let mut pairs = vec![
        ("grant_type", EXCHANGE_GRANT),
        ("client_id", client_id),
        ("client_secret", secret),
    ];
    pairs.extend_from_slice(extra);
    let mut request = h
        .provider
        .new_access_request(&h.ctx, form(&pairs), Session::default())
        .await?;
    h.provider.new_access_response(&h.ctx, &mut request).await
}

#[tokio::test]
async fn test_gateway_exchanges_frontend_token() {
    let h = setup().await;
    let subject = issue_subject_token(&h).await;

    let response = exchange(
        &h,
        "gateway",
        "gateway-secret",
        &[
            ("subject_token", &subject),
            ("subject_token_type", ACCESS_TOKEN_TYPE),
            ("scope", "photos.read"),
            ("audience", "https://photos.example.com"),
        ],
    )
    .await
    .unwrap();

    assert!(!response.access_token.is_empty());
    assert_ne!(response.access_token, subject);
    assert_eq!(response.issued_token_type.as_deref(), Some(ACCESS_TOKEN_TYPE));
    assert_eq!(response.scope.as_deref(), Some("photos.read"));
    assert!(response.refresh_token.is_none());

    let signature = core_strategy().access_token_signature(&response.access_token);
    let stored = h
        .store
        .get_access_token_session(&h.ctx, &signature)
        .await
        .unwrap();
    assert_eq!(stored.session.subject, "alice");
    assert_eq!(stored.client.as_ref().unwrap().client_id, "gateway");
    assert_eq!(
        stored.granted_audience.as_slice(),
        ["https://photos.example.com".to_string()]
    );
    let claims = stored.session.subject_token().unwrap();
    assert_eq!(claims.get("client_id").and_then(|v| v.as_str()), Some("frontend"));
    assert_eq!(claims.get("sub").and_then(|v| v.as_str()), Some("alice"));
    assert_eq!(claims.get("tenant").and_then(|v| v.as_str()), Some("acme"));
}

#[tokio::test]
async fn test_self_exchange_is_forbidden() {
    let h = setup().await;
    let subject = issue_subject_token(&h).await;

    let err = exchange(
        &h,
        "frontend",
        "frontend-secret",
        &[("subject_token", &subject), ("subject_token_type", ACCESS_TOKEN_TYPE)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
}

#[tokio::test]
async fn test_client_not_on_allow_list_is_forbidden() {
    let h = setup().await;
    let subject = issue_subject_token(&h).await;

    let err = exchange(
        &h,
        "intruder",
        "intruder-secret",
        &[("subject_token", &subject), ("subject_token_type", ACCESS_TOKEN_TYPE)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden { .. }));
}

#[tokio::test]
async fn test_unknown_subject_token() {
    let h = setup().await;

    let err = exchange(
        &h,
        "gateway",
        "gateway-secret",
        &[
            ("subject_token", "gf_at_bogus.token"),
            ("subject_token_type", ACCESS_TOKEN_TYPE),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_scope_outside_client_registration() {
    let h = setup().await;
    let subject = issue_subject_token(&h).await;

    let err = exchange(
        &h,
        "gateway",
        "gateway-secret",
        &[
            ("subject_token", &subject),
            ("subject_token_type", ACCESS_TOKEN_TYPE),
            ("scope", "admin"),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::InvalidScope { .. }));
}

#[tokio::test]
async fn test_client_without_exchange_grant() {
    let h = setup().await;
    let subject = issue_subject_token(&h).await;

    let err = exchange(
        &h,
        "tv",
        common::TV_SECRET,
        &[("subject_token", &subject), ("subject_token_type", ACCESS_TOKEN_TYPE)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::UnauthorizedClient { .. }));
}

#[tokio::test]
async fn test_non_access_token_types_are_left_to_other_handlers() {
    let h = setup().await;

    let err = exchange(
        &h,
        "gateway",
        "gateway-secret",
        &[("subject_token", "eyJ.e30.sig"), ("subject_token_type", JWT_TOKEN_TYPE)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));
}
