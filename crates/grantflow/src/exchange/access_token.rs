//! Access tokens as subject and actor tokens.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::error::AuthError;
use crate::exchange::parameters::{
    ACTOR_TOKEN, ACTOR_TOKEN_TYPE, REQUESTED_TOKEN_TYPE, SUBJECT_TOKEN, SUBJECT_TOKEN_TYPE,
};
use crate::pipeline::TokenEndpointHandler;
use crate::pipeline::issuer::TokenIssuer;
use crate::pipeline::transaction::{finish, storage_failure};
use crate::storage::TokenExchangeStorage;
use crate::strategy::{AudienceStrategy, MatchingStrategy};
use crate::types::token_types::ACCESS_TOKEN_TYPE;
use crate::types::{AccessRequest, AccessResponse, ExtraMap, GrantType, Session};

/// Exchanges access tokens issued to other clients (RFC 8693).
pub struct AccessTokenTypeHandler {
    storage: Arc<dyn TokenExchangeStorage>,
    issuer: TokenIssuer,
    scope_strategy: Arc<dyn MatchingStrategy>,
    audience_strategy: Arc<dyn AudienceStrategy>,
    default_requested_token_type: String,
}

impl std::fmt::Debug for AccessTokenTypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenTypeHandler")
            .field("issuer", &self.issuer)
            .field(
                "default_requested_token_type",
                &self.default_requested_token_type,
            )
            .finish_non_exhaustive()
    }
}

impl AccessTokenTypeHandler {
    #[must_use]
    pub fn new(
        storage: Arc<dyn TokenExchangeStorage>,
        issuer: TokenIssuer,
        scope_strategy: Arc<dyn MatchingStrategy>,
        audience_strategy: Arc<dyn AudienceStrategy>,
        default_requested_token_type: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            issuer,
            scope_strategy,
            audience_strategy,
            default_requested_token_type: default_requested_token_type.into(),
        }
    }

    /// Resolves a presented access token and flattens its session into
    /// claims.
    async fn validate(
        &self,
        ctx: &CancellationToken,
        request: &AccessRequest,
        token: &str,
    ) -> AuthResult<(Session, ExtraMap)> {
        let strategy = self.issuer.strategy();
        let signature = strategy.access_token_signature(token);
        let original = self
            .storage
            .get_access_token_session(ctx, &signature)
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "exchanged token lookup failed");
                AuthError::invalid_request("Token is not valid or has expired.")
            })?;
        strategy.validate_access_token(&original, token)?;

        let client = request.request.client()?;
        let issued_to = original.client()?;
        if client.client_id == issued_to.client_id {
            return Err(AuthError::forbidden(
                "Clients are not allowed to perform a token exchange on their own tokens.",
            ));
        }
        if !issued_to.token_exchange_allowed(client) {
            return Err(AuthError::forbidden(format!(
                "The OAuth 2.0 client is not permitted to exchange a subject token issued to client {}",
                issued_to.client_id
            )));
        }

        let mut claims = original.session.extra.clone();
        if !original.session.subject.is_empty() {
            claims.insert("sub", original.session.subject.as_str());
        }
        claims.insert("client_id", issued_to.client_id.as_str());
        claims.insert("scope", original.granted_scopes.as_slice().to_vec());
        claims.insert("aud", original.granted_audience.as_slice().to_vec());

        Ok((original.session, claims))
    }

    fn grant_requested(&self, request: &mut AccessRequest) -> AuthResult<()> {
        let client = request.request.client()?.clone();
        for scope in &request.request.requested_scopes {
            if !self.scope_strategy.matches(&client.scopes, scope) {
                return Err(AuthError::invalid_scope(format!(
                    "The OAuth 2.0 Client is not allowed to request scope '{scope}'."
                )));
            }
        }
        self.audience_strategy
            .validate(&client.audience, &request.request.requested_audience)?;

        let target = &mut request.request;
        let scopes = target.requested_scopes.clone();
        for scope in &scopes {
            target.grant_scope(scope.clone());
        }
        let audience = target.requested_audience.clone();
        for aud in &audience {
            target.grant_audience(aud.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl TokenEndpointHandler for AccessTokenTypeHandler {
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool {
        request.grant_types.exact_one(GrantType::TokenExchange.as_str())
    }

    fn can_skip_client_auth(&self, _request: &AccessRequest) -> bool {
        false
    }

    async fn handle_token_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
    ) -> AuthResult<()> {
        if !self.can_handle_token_endpoint_request(request) {
            return Err(AuthError::UnknownRequest);
        }

        if !request
            .request
            .client()?
            .is_grant_type_allowed(GrantType::TokenExchange)
        {
            return Err(AuthError::unauthorized_client(
                "The OAuth 2.0 Client is not allowed to use authorization grant \"urn:ietf:params:oauth:grant-type:token-exchange\".",
            ));
        }

        let form = &request.request.form;
        let subject_is_access_token = form.get(SUBJECT_TOKEN_TYPE) == ACCESS_TOKEN_TYPE;
        let actor_is_access_token = form.get(ACTOR_TOKEN_TYPE) == ACCESS_TOKEN_TYPE;
        if !subject_is_access_token && !actor_is_access_token {
            return Ok(());
        }
        let subject_token = form.get(SUBJECT_TOKEN).to_string();
        let actor_token = form.get(ACTOR_TOKEN).to_string();

        if actor_is_access_token {
            let (_, claims) = self.validate(ctx, request, &actor_token).await?;
            request.request.session.set_actor_token(claims);
        }

        if subject_is_access_token {
            let (subject_session, claims) = self.validate(ctx, request, &subject_token).await?;
            request.request.session.set_subject_token(claims);
            request.request.session.subject = subject_session.subject;
        }

        self.grant_requested(request)?;
        request
            .handled_grant_types
            .append(GrantType::TokenExchange.as_str());

        tracing::debug!(
            client_id = %request.request.client()?.client_id,
            subject = %request.request.session.subject,
            "validated access token for exchange"
        );
        Ok(())
    }

    async fn populate_token_endpoint_response(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
    ) -> AuthResult<()> {
        if !self.can_handle_token_endpoint_request(request) {
            return Err(AuthError::UnknownRequest);
        }

        let requested_token_type = match request.request.form.get(REQUESTED_TOKEN_TYPE) {
            "" => self.default_requested_token_type.clone(),
            other => other.to_string(),
        };
        if requested_token_type != ACCESS_TOKEN_TYPE {
            return Ok(());
        }

        let mut tx = self
            .storage
            .begin_tx(ctx)
            .await
            .map_err(storage_failure)?;
        let outcome = self
            .issuer
            .issue(ctx, tx.as_mut(), &mut request.request, response)
            .await;
        finish(ctx, tx, outcome).await?;

        response.issued_token_type = Some(ACCESS_TOKEN_TYPE.to_string());
        tracing::info!(
            client_id = %request.request.client()?.client_id,
            refresh_token = response.refresh_token.is_some(),
            "issued access token by exchange"
        );
        Ok(())
    }
}
