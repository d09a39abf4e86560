//! Endpoint handler contracts and their registration slots.
//!
//! Each endpoint has its own trait and its own closed set of handler
//! variants. Built-in handlers are listed by name; anything else is
//! registered through the `Custom` variant of the slot it belongs to.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::device::{DeviceAuthorizationIssuer, DeviceCodeTokenHandler, DeviceUserVerificationHandler};
use crate::exchange::AccessTokenTypeHandler;
use crate::rar::{AuthorizeHandler, TokenRequestHandler, TokenResponseHandler};
use crate::types::{
    AccessRequest, AccessResponse, AuthorizeRequest, AuthorizeResponse,
    DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceUserVerificationResponse,
};

/// A participant in the token endpoint.
///
/// Handlers that are not responsible for a request return
/// [`crate::AuthError::UnknownRequest`] from both phases; the provider skips
/// them. Any other error aborts the phase.
#[async_trait]
pub trait TokenEndpointHandler: Send + Sync {
    /// Returns `true` if this handler takes part in `request`.
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool;

    /// Returns `true` if the request may proceed without client authentication.
    fn can_skip_client_auth(&self, request: &AccessRequest) -> bool;

    /// Validates the request and copies state onto it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRequest` when not responsible, or the protocol error
    /// that rejects the request.
    async fn handle_token_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
    ) -> AuthResult<()>;

    /// Issues tokens and fills in the response.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRequest` when not responsible, or the error that
    /// stopped issuance.
    async fn populate_token_endpoint_response(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> AuthResult<()>;
}

/// Issues device and user codes at the device authorization endpoint.
#[async_trait]
pub trait DeviceAuthorizationEndpointHandler: Send + Sync {
    async fn handle_device_authorization_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
        response: &mut DeviceAuthorizationResponse,
    ) -> AuthResult<()>;
}

/// Extra validation run while building a device authorization request.
#[async_trait]
pub trait DeviceAuthorizationValidationHandler: Send + Sync {
    async fn validate_device_authorization_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
    ) -> AuthResult<()>;
}

/// The end-user side of the device flow.
#[async_trait]
pub trait UserVerificationEndpointHandler: Send + Sync {
    /// Resolves the user code in the form and merges the stored session
    /// into `request`.
    async fn validate_user_verification_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    /// Persists the decision recorded on `request`.
    async fn handle_user_verification_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
        response: &mut DeviceUserVerificationResponse,
    ) -> AuthResult<()>;
}

/// A participant in the authorization endpoint.
#[async_trait]
pub trait AuthorizeEndpointHandler: Send + Sync {
    async fn validate_authorize_endpoint_request(
        &self,
        _ctx: &CancellationToken,
        _request: &mut AuthorizeRequest,
    ) -> AuthResult<()> {
        Ok(())
    }

    async fn handle_authorize_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut AuthorizeRequest,
        response: &mut AuthorizeResponse,
    ) -> AuthResult<()>;
}

/// Token endpoint registration slot.
#[derive(Clone)]
pub enum TokenHandler {
    DeviceCode(Arc<DeviceCodeTokenHandler>),
    TokenExchange(Arc<AccessTokenTypeHandler>),
    AuthorizationDetailsRequest(Arc<TokenRequestHandler>),
    AuthorizationDetailsResponse(Arc<TokenResponseHandler>),
    Custom(Arc<dyn TokenEndpointHandler>),
}

impl TokenHandler {
    /// Short name used in log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceCode(_) => "device_code",
            Self::TokenExchange(_) => "token_exchange",
            Self::AuthorizationDetailsRequest(_) => "authorization_details_request",
            Self::AuthorizationDetailsResponse(_) => "authorization_details_response",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn handler(&self) -> &dyn TokenEndpointHandler {
        match self {
            Self::DeviceCode(h) => h.as_ref(),
            Self::TokenExchange(h) => h.as_ref(),
            Self::AuthorizationDetailsRequest(h) => h.as_ref(),
            Self::AuthorizationDetailsResponse(h) => h.as_ref(),
            Self::Custom(h) => h.as_ref(),
        }
    }
}

/// Device authorization endpoint registration slot.
#[derive(Clone)]
pub enum DeviceAuthorizationHandler {
    Issuer(Arc<DeviceAuthorizationIssuer>),
    Custom(Arc<dyn DeviceAuthorizationEndpointHandler>),
}

impl DeviceAuthorizationHandler {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Issuer(_) => "device_issuer",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn handler(&self) -> &dyn DeviceAuthorizationEndpointHandler {
        match self {
            Self::Issuer(h) => h.as_ref(),
            Self::Custom(h) => h.as_ref(),
        }
    }
}

/// Device authorization validation registration slot.
#[derive(Clone)]
pub enum DeviceAuthorizationValidator {
    AuthorizationDetails(Arc<AuthorizeHandler>),
    Custom(Arc<dyn DeviceAuthorizationValidationHandler>),
}

impl DeviceAuthorizationValidator {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationDetails(_) => "authorization_details",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn handler(&self) -> &dyn DeviceAuthorizationValidationHandler {
        match self {
            Self::AuthorizationDetails(h) => h.as_ref(),
            Self::Custom(h) => h.as_ref(),
        }
    }
}

/// User verification registration slot.
#[derive(Clone)]
pub enum UserVerificationHandler {
    DeviceUserVerification(Arc<DeviceUserVerificationHandler>),
    Custom(Arc<dyn UserVerificationEndpointHandler>),
}

impl UserVerificationHandler {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceUserVerification(_) => "device_user_verification",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn handler(&self) -> &dyn UserVerificationEndpointHandler {
        match self {
            Self::DeviceUserVerification(h) => h.as_ref(),
            Self::Custom(h) => h.as_ref(),
        }
    }
}

/// Authorization endpoint registration slot.
#[derive(Clone)]
pub enum AuthorizeEndpoint {
    AuthorizationDetails(Arc<AuthorizeHandler>),
    Custom(Arc<dyn AuthorizeEndpointHandler>),
}

impl AuthorizeEndpoint {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationDetails(_) => "authorization_details",
            Self::Custom(_) => "custom",
        }
    }

    pub(crate) fn handler(&self) -> &dyn AuthorizeEndpointHandler {
        match self {
            Self::AuthorizationDetails(h) => h.as_ref(),
            Self::Custom(h) => h.as_ref(),
        }
    }
}
