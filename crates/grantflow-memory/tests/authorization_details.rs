mod common;

use std::time::Duration;

use common::{device_config, harness};
use grantflow::error::AuthError;
use grantflow::rar::AUTHORIZATION_DETAILS_PARAMETER;
use grantflow::types::{
    Arguments, AuthorizeRequest, Client, DeviceAuthorizationStatus, GrantType, Session,
};

const PAYMENT: &str = r#"[{"type":"payment_initiation","locations":["https://bank.example.com/payments"],"instructedAmount":{"currency":"EUR","amount":"123.50"}}]"#;

fn rar_config(ignore_unknown_types: bool) -> grantflow::FlowConfig {
    let mut config = device_config(Duration::ZERO);
    config.authorization_details.supported_types = vec!["payment_initiation".to_string()];
    config.authorization_details.ignore_unknown_types = ignore_unknown_types;
    config
}

async fn register_bank_app(h: &common::Harness) {
    h.store
        .register_client(
            Client::new(
                "bank-app",
                vec![GrantType::DeviceCode, GrantType::Implicit],
            )
            .with_scopes(["openid"])
            .with_authorization_detail_types(["payment_initiation"]),
            Some("bank-secret"),
        )
        .await;
}

#[tokio::test]
async fn test_details_flow_through_device_grant() {
    let h = harness(rar_config(false)).await;
    register_bank_app(&h).await;

    let issued = h
        .device_authorize(&[
            ("client_id", "bank-app"),
            (AUTHORIZATION_DETAILS_PARAMETER, PAYMENT),
        ])
        .await
        .unwrap();
    h.decide(&issued.user_code, DeviceAuthorizationStatus::Approved)
        .await
        .unwrap();

    let tokens = h
        .poll_as("bank-app", "bank-secret", &issued.device_code)
        .await
        .unwrap();
    assert_eq!(tokens.authorization_details.len(), 1);
    let detail = tokens.authorization_details.iter().next().unwrap();
    assert_eq!(detail.detail_type, "payment_initiation");
    assert_eq!(detail.locations, vec!["https://bank.example.com/payments"]);

    let body = serde_json::to_value(&tokens).unwrap();
    assert_eq!(
        body["authorization_details"][0]["instructedAmount"]["currency"],
        "EUR"
    );
}

#[tokio::test]
async fn test_unknown_type_is_rejected() {
    let h = harness(rar_config(false)).await;
    register_bank_app(&h).await;

    let err = h
        .device_authorize(&[
            ("client_id", "bank-app"),
            (
                AUTHORIZATION_DETAILS_PARAMETER,
                r#"[{"type":"account_information"}]"#,
            ),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidAuthorizationDetails { .. }));
}

#[tokio::test]
async fn test_unknown_type_is_dropped_when_ignored() {
    let h = harness(rar_config(true)).await;
    register_bank_app(&h).await;

    let issued = h
        .device_authorize(&[
            ("client_id", "bank-app"),
            (
                AUTHORIZATION_DETAILS_PARAMETER,
                r#"[{"type":"account_information"}]"#,
            ),
        ])
        .await
        .unwrap();
    h.decide(&issued.user_code, DeviceAuthorizationStatus::Approved)
        .await
        .unwrap();
    let tokens = h
        .poll_as("bank-app", "bank-secret", &issued.device_code)
        .await
        .unwrap();
    assert!(tokens.authorization_details.is_empty());
}

#[tokio::test]
async fn test_client_not_allowed_detail_type() {
    let h = harness(rar_config(false)).await;

    let err = h
        .device_authorize(&[("client_id", "tv"), (AUTHORIZATION_DETAILS_PARAMETER, PAYMENT)])
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidScope { .. }));
}

#[tokio::test]
async fn test_malformed_details() {
    let h = harness(rar_config(false)).await;
    register_bank_app(&h).await;

    for value in [r#"{"type":"payment_initiation"}"#, "not json", r#"[{"locations":[]}]"#] {
        let err = h
            .device_authorize(&[("client_id", "bank-app"), (AUTHORIZATION_DETAILS_PARAMETER, value)])
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::InvalidAuthorizationDetails { .. }),
            "{value}: {err:?}"
        );
    }
}

#[tokio::test]
async fn test_implicit_response_echoes_granted_details() {
    let h = harness(rar_config(false)).await;
    register_bank_app(&h).await;

    let mut request = AuthorizeRequest::new();
    request.request.client = Some(
        Client::new("bank-app", vec![GrantType::Implicit])
            .with_authorization_detail_types(["payment_initiation"]),
    );
    request.response_types = Arguments::from_space_delimited("token");
    request.state = "xyz".to_string();
    request
        .request
        .form
        .set(AUTHORIZATION_DETAILS_PARAMETER, PAYMENT);

    h.provider
        .validate_authorize_request(&h.ctx, &mut request)
        .await
        .unwrap();
    assert_eq!(request.request.requested_authorization_details.len(), 1);

    let requested = request.request.requested_authorization_details.clone();
    for detail in &requested {
        request.request.grant_authorization_detail(detail.clone());
    }
    let response = h
        .provider
        .new_authorize_response(&h.ctx, &mut request, Session::new("alice"))
        .await
        .unwrap();

    let echoed: serde_json::Value =
        serde_json::from_str(response.parameters.get(AUTHORIZATION_DETAILS_PARAMETER)).unwrap();
    assert_eq!(echoed[0]["type"], "payment_initiation");
    assert_eq!(response.parameters.get("state"), "xyz");
}
