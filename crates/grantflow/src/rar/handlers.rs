//! Pipeline participants for rich authorization requests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::error::AuthError;
use crate::pipeline::{
    AuthorizeEndpointHandler, DeviceAuthorizationValidationHandler, TokenEndpointHandler,
};
use crate::rar::policy::{AUTHORIZATION_DETAILS_PARAMETER, AuthorizationDetailsPolicy};
use crate::types::{
    AccessRequest, AccessResponse, AuthorizeRequest, AuthorizeResponse,
    DeviceAuthorizationRequest, GrantType, Request,
};

fn enrich(policy: &AuthorizationDetailsPolicy, request: &mut Request) -> AuthResult<()> {
    let param = request.form.get(AUTHORIZATION_DETAILS_PARAMETER).to_string();
    policy.validate_and_enrich(request, &param)
}

/// Validates details sent to the authorization and device authorization
/// endpoints, and echoes granted details on implicit responses.
#[derive(Debug, Clone)]
pub struct AuthorizeHandler {
    policy: Arc<AuthorizationDetailsPolicy>,
}

impl AuthorizeHandler {
    #[must_use]
    pub fn new(policy: Arc<AuthorizationDetailsPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl AuthorizeEndpointHandler for AuthorizeHandler {
    async fn validate_authorize_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        request: &mut AuthorizeRequest,
    ) -> AuthResult<()> {
        enrich(&self.policy, &mut request.request)
    }

    async fn handle_authorize_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        request: &mut AuthorizeRequest,
        response: &mut AuthorizeResponse,
    ) -> AuthResult<()> {
        if !request.response_types.has(&["token"]) {
            return Ok(());
        }

        if !request.request.client()?.is_grant_type_allowed(GrantType::Implicit) {
            return Err(AuthError::invalid_grant(
                "The OAuth 2.0 Client is not allowed to use the authorization grant 'implicit'.",
            ));
        }

        let granted = &request.request.granted_authorization_details;
        if !granted.is_empty() {
            response.add_parameter(AUTHORIZATION_DETAILS_PARAMETER, granted.to_json()?);
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceAuthorizationValidationHandler for AuthorizeHandler {
    async fn validate_device_authorization_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        enrich(&self.policy, &mut request.request)
    }
}

/// Validates details sent directly to the token endpoint by grants that have
/// no authorization leg.
#[derive(Debug, Clone)]
pub struct TokenRequestHandler {
    policy: Arc<AuthorizationDetailsPolicy>,
}

impl TokenRequestHandler {
    const GRANT_TYPES: [&'static str; 5] = [
        "client_credentials",
        "urn:ietf:params:oauth:grant-type:jwt-bearer",
        "password",
        "urn:ietf:params:oauth:grant-type:token-exchange",
        "refresh_token",
    ];

    #[must_use]
    pub fn new(policy: Arc<AuthorizationDetailsPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl TokenEndpointHandler for TokenRequestHandler {
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool {
        request.grant_types.has_one_of(&Self::GRANT_TYPES)
    }

    fn can_skip_client_auth(&self, _request: &AccessRequest) -> bool {
        true
    }

    async fn handle_token_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        request: &mut AccessRequest,
    ) -> AuthResult<()> {
        if !self.can_handle_token_endpoint_request(request) {
            return Err(AuthError::UnknownRequest);
        }
        enrich(&self.policy, &mut request.request)
    }

    async fn populate_token_endpoint_response(
        &self,
        _ctx: &CancellationToken,
        _request: &mut AccessRequest,
        _response: &mut AccessResponse,
    ) -> AuthResult<()> {
        Ok(())
    }
}

/// Copies granted details into every token response.
#[derive(Debug, Clone, Default)]
pub struct TokenResponseHandler;

impl TokenResponseHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenEndpointHandler for TokenResponseHandler {
    fn can_handle_token_endpoint_request(&self, _request: &AccessRequest) -> bool {
        true
    }

    fn can_skip_client_auth(&self, _request: &AccessRequest) -> bool {
        true
    }

    async fn handle_token_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        _request: &mut AccessRequest,
    ) -> AuthResult<()> {
        Ok(())
    }

    async fn populate_token_endpoint_response(
        &self,
        _ctx: &CancellationToken,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> AuthResult<()> {
        let granted = &request.request.granted_authorization_details;
        if !granted.is_empty() {
            response.authorization_details = granted.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorizationDetailsConfig;
    use crate::types::{Arguments, AuthorizationDetail, Client, Session};

    fn policy() -> Arc<AuthorizationDetailsPolicy> {
        Arc::new(AuthorizationDetailsPolicy::new(&AuthorizationDetailsConfig {
            supported_types: vec!["account_information".into()],
            ignore_unknown_types: false,
        }))
    }

    fn access_request(grant_type: &str) -> AccessRequest {
        let mut request = AccessRequest::new(Session::new("alice"));
        request.grant_types = Arguments::from_space_delimited(grant_type);
        request.request.client = Some(
            Client::new("svc", vec![GrantType::ClientCredentials])
                .with_authorization_detail_types(["account_information"]),
        );
        request.request.form.set(
            AUTHORIZATION_DETAILS_PARAMETER,
            r#"[{"type":"account_information","actions":["list"]}]"#,
        );
        request
    }

    #[tokio::test]
    async fn test_token_request_handler_enriches_client_credentials() {
        let handler = TokenRequestHandler::new(policy());
        let ctx = CancellationToken::new();

        let mut request = access_request("client_credentials");
        assert!(handler.can_handle_token_endpoint_request(&request));
        handler
            .handle_token_endpoint_request(&ctx, &mut request)
            .await
            .unwrap();
        assert_eq!(request.request.requested_authorization_details.len(), 1);
    }

    #[tokio::test]
    async fn test_token_request_handler_skips_device_code() {
        let handler = TokenRequestHandler::new(policy());
        let ctx = CancellationToken::new();

        let mut request = access_request("urn:ietf:params:oauth:grant-type:device_code");
        assert!(!handler.can_handle_token_endpoint_request(&request));
        let err = handler
            .handle_token_endpoint_request(&ctx, &mut request)
            .await
            .unwrap_err();
        assert!(err.is_unknown_request());
    }

    #[tokio::test]
    async fn test_token_response_handler_echoes_granted() {
        let handler = TokenResponseHandler::new();
        let ctx = CancellationToken::new();

        let mut request = access_request("client_credentials");
        let mut response = AccessResponse::new();
        handler
            .populate_token_endpoint_response(&ctx, &mut request, &mut response)
            .await
            .unwrap();
        assert!(response.authorization_details.is_empty());

        request
            .request
            .grant_authorization_detail(AuthorizationDetail::new("account_information"));
        handler
            .populate_token_endpoint_response(&ctx, &mut request, &mut response)
            .await
            .unwrap();
        assert_eq!(response.authorization_details.len(), 1);
    }

    fn authorize_request(grants: Vec<GrantType>) -> AuthorizeRequest {
        let mut request = AuthorizeRequest::new();
        request.response_types = Arguments::from_space_delimited("token");
        request.request.client = Some(Client::new("spa", grants));
        request
            .request
            .grant_authorization_detail(AuthorizationDetail::new("account_information"));
        request
    }

    #[tokio::test]
    async fn test_authorize_handler_echoes_on_implicit() {
        let handler = AuthorizeHandler::new(policy());
        let ctx = CancellationToken::new();

        let mut request = authorize_request(vec![GrantType::Implicit]);
        let mut response = AuthorizeResponse::new();
        handler
            .handle_authorize_endpoint_request(&ctx, &mut request, &mut response)
            .await
            .unwrap();
        assert_eq!(
            response.parameters.get(AUTHORIZATION_DETAILS_PARAMETER),
            r#"[{"type":"account_information"}]"#
        );
    }

    #[tokio::test]
    async fn test_authorize_handler_requires_implicit_grant() {
        let handler = AuthorizeHandler::new(policy());
        let ctx = CancellationToken::new();

        let mut request = authorize_request(vec![GrantType::AuthorizationCode]);
        let mut response = AuthorizeResponse::new();
        let err = handler
            .handle_authorize_endpoint_request(&ctx, &mut request, &mut response)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidGrant { .. }));

        request.response_types = Arguments::from_space_delimited("code");
        handler
            .handle_authorize_endpoint_request(&ctx, &mut request, &mut response)
            .await
            .unwrap();
        assert!(response.parameters.is_empty());
    }
}
