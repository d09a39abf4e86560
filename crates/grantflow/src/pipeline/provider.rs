//! The endpoint orchestrator.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::config::FlowConfig;
use crate::error::AuthError;
use crate::pipeline::handler::{
    AuthorizeEndpoint, DeviceAuthorizationHandler, DeviceAuthorizationValidator, TokenHandler,
    UserVerificationHandler,
};
use crate::storage::ClientAuthenticator;
use crate::strategy::{AudienceStrategy, ExactAudienceStrategy, ExactMatchingStrategy, MatchingStrategy};
use crate::types::{
    AccessRequest, AccessResponse, Arguments, AuthorizeRequest, AuthorizeResponse, Client,
    DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceUserVerificationResponse, Form,
    GrantType, Request, Session,
};

/// Runs the registered handlers for each endpoint.
///
/// Handlers run in registration order. A handler answering
/// [`AuthError::UnknownRequest`] is skipped; the first other error aborts the
/// phase and is returned as is.
pub struct Provider {
    config: Arc<FlowConfig>,
    clients: Arc<dyn ClientAuthenticator>,
    scope_strategy: Arc<dyn MatchingStrategy>,
    audience_strategy: Arc<dyn AudienceStrategy>,
    token_handlers: Vec<TokenHandler>,
    device_authorization_handlers: Vec<DeviceAuthorizationHandler>,
    device_authorization_validators: Vec<DeviceAuthorizationValidator>,
    user_verification_handlers: Vec<UserVerificationHandler>,
    authorize_handlers: Vec<AuthorizeEndpoint>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field(
                "token_handlers",
                &self.token_handlers.iter().map(TokenHandler::name).collect::<Vec<_>>(),
            )
            .field(
                "device_authorization_handlers",
                &self
                    .device_authorization_handlers
                    .iter()
                    .map(DeviceAuthorizationHandler::name)
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Builder for [`Provider`].
pub struct ProviderBuilder {
    provider: Provider,
}

impl ProviderBuilder {
    #[must_use]
    pub fn scope_strategy(mut self, strategy: Arc<dyn MatchingStrategy>) -> Self {
        self.provider.scope_strategy = strategy;
        self
    }

    #[must_use]
    pub fn audience_strategy(mut self, strategy: Arc<dyn AudienceStrategy>) -> Self {
        self.provider.audience_strategy = strategy;
        self
    }

    #[must_use]
    pub fn token_handler(mut self, handler: TokenHandler) -> Self {
        self.provider.token_handlers.push(handler);
        self
    }

    #[must_use]
    pub fn device_authorization_handler(mut self, handler: DeviceAuthorizationHandler) -> Self {
        self.provider.device_authorization_handlers.push(handler);
        self
    }

    #[must_use]
    pub fn device_authorization_validator(mut self, handler: DeviceAuthorizationValidator) -> Self {
        self.provider.device_authorization_validators.push(handler);
        self
    }

    #[must_use]
    pub fn user_verification_handler(mut self, handler: UserVerificationHandler) -> Self {
        self.provider.user_verification_handlers.push(handler);
        self
    }

    #[must_use]
    pub fn authorize_handler(mut self, handler: AuthorizeEndpoint) -> Self {
        self.provider.authorize_handlers.push(handler);
        self
    }

    #[must_use]
    pub fn build(self) -> Provider {
        self.provider
    }
}

/// Treats a cancelled context as an error before a handler runs.
fn ensure_active(ctx: &CancellationToken) -> AuthResult<()> {
    if ctx.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    Ok(())
}

/// Swallows the not-responsible outcome.
fn skip_unknown(result: AuthResult<()>, handler: &str, phase: &str) -> AuthResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(AuthError::UnknownRequest) => {
            tracing::debug!(handler, phase, "handler not responsible, skipping");
            Ok(false)
        }
        Err(err) => {
            tracing::debug!(handler, phase, error = %err, "handler rejected request");
            Err(err)
        }
    }
}

impl Provider {
    #[must_use]
    pub fn builder(config: Arc<FlowConfig>, clients: Arc<dyn ClientAuthenticator>) -> ProviderBuilder {
        ProviderBuilder {
            provider: Self {
                config,
                clients,
                scope_strategy: Arc::new(ExactMatchingStrategy),
                audience_strategy: Arc::new(ExactAudienceStrategy),
                token_handlers: Vec::new(),
                device_authorization_handlers: Vec::new(),
                device_authorization_validators: Vec::new(),
                user_verification_handlers: Vec::new(),
                authorize_handlers: Vec::new(),
            },
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Renders `err` as the body sent to the client, honouring
    /// `send_debug_messages_to_clients`.
    #[must_use]
    pub fn error_response(&self, err: &AuthError) -> crate::error::ErrorResponse {
        err.to_response(self.config.send_debug_messages_to_clients)
    }

    fn validate_scopes(&self, client: &Client, scopes: &Arguments) -> AuthResult<()> {
        for scope in scopes {
            if !self.scope_strategy.matches(&client.scopes, scope) {
                return Err(AuthError::invalid_scope(format!(
                    "The OAuth 2.0 Client is not allowed to request scope '{scope}'."
                )));
            }
        }
        Ok(())
    }

    fn parse_scopes_and_audience(request: &mut Request) {
        let scopes = Arguments::from_space_delimited(request.form.get("scope"));
        request.set_requested_scopes(scopes);
        let mut audience = Arguments::new();
        for value in request.form.get_all("audience") {
            audience.extend_from(Arguments::from_space_delimited(value).iter().cloned());
        }
        request.requested_audience = audience;
    }

    /// Builds a token endpoint request and runs the handle phase.
    ///
    /// The client is authenticated unless every handler responsible for the
    /// request allows skipping authentication.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `grant_type` is missing or no handler accepted
    ///   the grant type
    /// - the authentication error when authentication is required and fails
    /// - the first error reported by a handler
    pub async fn new_access_request(
        &self,
        ctx: &CancellationToken,
        form: Form,
        session: Session,
    ) -> AuthResult<AccessRequest> {
        let mut request = AccessRequest::new(session);
        request.request.form = form;

        let grant_type = request.request.form.get("grant_type").to_string();
        if grant_type.is_empty() {
            return Err(AuthError::invalid_request(
                "Request parameter 'grant_type' is missing",
            ));
        }
        request.grant_types = Arguments::from_space_delimited(&grant_type);
        Self::parse_scopes_and_audience(&mut request.request);

        let responsible: Vec<&TokenHandler> = self
            .token_handlers
            .iter()
            .filter(|h| h.handler().can_handle_token_endpoint_request(&request))
            .collect();
        let skip_client_auth = !responsible.is_empty()
            && responsible
                .iter()
                .all(|h| h.handler().can_skip_client_auth(&request));

        ensure_active(ctx)?;
        if skip_client_auth {
            tracing::debug!(grant_type = %grant_type, "client authentication skipped");
        } else {
            let client = self
                .clients
                .authenticate_client(ctx, &request.request.form)
                .await?;
            request.request.client = Some(client);
        }

        for handler in &self.token_handlers {
            ensure_active(ctx)?;
            if !handler.handler().can_handle_token_endpoint_request(&request) {
                tracing::debug!(handler = handler.name(), "handler not responsible, skipping");
                continue;
            }
            let result = handler
                .handler()
                .handle_token_endpoint_request(ctx, &mut request)
                .await;
            skip_unknown(result, handler.name(), "handle")?;
        }

        if request.handled_grant_types.is_empty() {
            return Err(AuthError::invalid_request(format!(
                "The handler for grant type '{grant_type}' was not found."
            )));
        }
        Ok(request)
    }

    /// Runs the populate phase for a handled token request.
    ///
    /// # Errors
    ///
    /// The first handler error, or `ServerError` if no handler issued an
    /// access token.
    pub async fn new_access_response(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
    ) -> AuthResult<AccessResponse> {
        let mut response = AccessResponse::new();
        for handler in &self.token_handlers {
            ensure_active(ctx)?;
            if !handler.handler().can_handle_token_endpoint_request(request) {
                continue;
            }
            let result = handler
                .handler()
                .populate_token_endpoint_response(ctx, request, &mut response)
                .await;
            skip_unknown(result, handler.name(), "populate")?;
        }

        if response.access_token.is_empty() || response.token_type.is_empty() {
            return Err(AuthError::server_error(
                "An internal server occurred while trying to complete the request.",
            ));
        }
        Ok(response)
    }

    /// Builds a device authorization request.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if the client cannot be authenticated or found
    /// - `InvalidGrant` if the client may not use the device code grant
    /// - `InvalidScope` / `InvalidRequest` for disallowed scopes or audiences
    /// - the first error reported by a validation handler
    pub async fn new_device_authorization_request(
        &self,
        ctx: &CancellationToken,
        form: Form,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        let mut request = DeviceAuthorizationRequest::new();
        request.request.form = form;

        ensure_active(ctx)?;
        let client = if self.config.device.authenticate_client {
            self.clients
                .authenticate_client(ctx, &request.request.form)
                .await
                .map_err(|err| {
                    tracing::debug!(error = %err, "device client authentication failed");
                    AuthError::invalid_client(
                        "The requested OAuth 2.0 Client could not be authenticated.",
                    )
                })?
        } else {
            let client_id = request.request.form.get("client_id").to_string();
            self.clients
                .get_client(ctx, &client_id)
                .await
                .map_err(|err| {
                    tracing::debug!(error = %err, client_id, "device client lookup failed");
                    AuthError::invalid_client("The requested OAuth 2.0 Client does not exist.")
                })?
        };

        if !client.is_grant_type_allowed(GrantType::DeviceCode) {
            return Err(AuthError::invalid_grant(
                "The requested OAuth 2.0 Client does not have the 'urn:ietf:params:oauth:grant-type:device_code' grant.",
            ));
        }

        Self::parse_scopes_and_audience(&mut request.request);
        self.validate_scopes(&client, &request.request.requested_scopes)?;
        self.audience_strategy
            .validate(&client.audience, &request.request.requested_audience)?;
        request.request.client = Some(client);

        for validator in &self.device_authorization_validators {
            ensure_active(ctx)?;
            let result = validator
                .handler()
                .validate_device_authorization_endpoint_request(ctx, &mut request)
                .await;
            skip_unknown(result, validator.name(), "validate")?;
        }
        Ok(request)
    }

    /// Issues the device code and user code for a validated request.
    ///
    /// # Errors
    ///
    /// The first handler error.
    pub async fn new_device_authorization_response(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
        session: Session,
    ) -> AuthResult<DeviceAuthorizationResponse> {
        request.request.session = session;
        let mut response = DeviceAuthorizationResponse::default();
        for handler in &self.device_authorization_handlers {
            ensure_active(ctx)?;
            let result = handler
                .handler()
                .handle_device_authorization_endpoint_request(ctx, request, &mut response)
                .await;
            skip_unknown(result, handler.name(), "handle")?;
        }
        Ok(response)
    }

    /// Resolves the user code submitted at the verification endpoint.
    ///
    /// # Errors
    ///
    /// The first handler error.
    pub async fn new_device_user_verification_request(
        &self,
        ctx: &CancellationToken,
        form: Form,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        let mut request = DeviceAuthorizationRequest::new();
        request.request.form = form;
        for handler in &self.user_verification_handlers {
            ensure_active(ctx)?;
            let result = handler
                .handler()
                .validate_user_verification_request(ctx, &mut request)
                .await;
            skip_unknown(result, handler.name(), "validate")?;
        }
        Ok(request)
    }

    /// Records the user's decision, previously set on `request.status`.
    ///
    /// # Errors
    ///
    /// The first handler error.
    pub async fn new_device_user_verification_response(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
    ) -> AuthResult<DeviceUserVerificationResponse> {
        let mut response = DeviceUserVerificationResponse::default();
        for handler in &self.user_verification_handlers {
            ensure_active(ctx)?;
            let result = handler
                .handler()
                .handle_user_verification_endpoint_request(ctx, request, &mut response)
                .await;
            skip_unknown(result, handler.name(), "handle")?;
        }
        Ok(response)
    }

    /// Runs the validation part of the authorization endpoint handlers.
    ///
    /// Parsing of `response_type`, `redirect_uri` and `state` is left to the
    /// caller; this enriches a prepared request.
    ///
    /// # Errors
    ///
    /// The first handler error.
    pub async fn validate_authorize_request(
        &self,
        ctx: &CancellationToken,
        request: &mut AuthorizeRequest,
    ) -> AuthResult<()> {
        for handler in &self.authorize_handlers {
            ensure_active(ctx)?;
            let result = handler
                .handler()
                .validate_authorize_endpoint_request(ctx, request)
                .await;
            skip_unknown(result, handler.name(), "validate")?;
        }
        Ok(())
    }

    /// Builds the authorization response for a granted request.
    ///
    /// # Errors
    ///
    /// The first handler error.
    pub async fn new_authorize_response(
        &self,
        ctx: &CancellationToken,
        request: &mut AuthorizeRequest,
        session: Session,
    ) -> AuthResult<AuthorizeResponse> {
        request.request.session = session;
        let mut response = AuthorizeResponse::new();
        for handler in &self.authorize_handlers {
            ensure_active(ctx)?;
            let result = handler
                .handler()
                .handle_authorize_endpoint_request(ctx, request, &mut response)
                .await;
            skip_unknown(result, handler.name(), "handle")?;
        }
        if !request.state.is_empty() {
            response.add_parameter("state", request.state.clone());
        }
        Ok(response)
    }
}
