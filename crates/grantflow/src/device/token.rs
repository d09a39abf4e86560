//! Device code exchange at the token endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::device::{DEVICE_CODE_PARAMETER, signature_prefix};
use crate::error::AuthError;
use crate::pipeline::TokenEndpointHandler;
use crate::pipeline::issuer::TokenIssuer;
use crate::pipeline::transaction::{abort, finish, storage_failure};
use crate::storage::{DeviceFlowStorage, StorageTransaction};
use crate::strategy::DeviceCodeStrategy;
use crate::types::{
    AccessRequest, AccessResponse, DeviceAuthorizationRequest, DeviceAuthorizationStatus,
    GrantType,
};

/// A device code resolved against storage.
struct ResolvedCode {
    signature: String,
    authorization: DeviceAuthorizationRequest,
}

/// Result of applying the polling rules to a device code.
enum PollOutcome {
    /// The user approved; the merged authorization is ready for issuance.
    Approved(ResolvedCode),
    /// The device must keep waiting or give up. The recorded poll time is
    /// committed before the error reaches the client.
    Rejected(AuthError),
}

/// Answers device polling and exchanges approved device codes for tokens.
pub struct DeviceCodeTokenHandler {
    storage: Arc<dyn DeviceFlowStorage>,
    strategy: Arc<dyn DeviceCodeStrategy>,
    issuer: TokenIssuer,
    polling_interval: Duration,
}

impl std::fmt::Debug for DeviceCodeTokenHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeTokenHandler")
            .field("issuer", &self.issuer)
            .field("polling_interval", &self.polling_interval)
            .finish_non_exhaustive()
    }
}

impl DeviceCodeTokenHandler {
    #[must_use]
    pub fn new(
        storage: Arc<dyn DeviceFlowStorage>,
        strategy: Arc<dyn DeviceCodeStrategy>,
        issuer: TokenIssuer,
        polling_interval: Duration,
    ) -> Self {
        Self {
            storage,
            strategy,
            issuer,
            polling_interval,
        }
    }

    /// Returns the presented device code and its signature.
    fn presented_code(&self, request: &AccessRequest) -> AuthResult<(String, String)> {
        let code = request.request.form.get(DEVICE_CODE_PARAMETER).to_string();
        if code.is_empty() {
            return Err(AuthError::invalid_request(
                "The device_code parameter is missing.",
            ));
        }
        let signature = self
            .strategy
            .device_code_signature(&code)
            .map_err(|e| AuthError::server_error_from("Unable to sign the device code", e))?;
        Ok((code, signature))
    }

    /// Loads the device authorization behind the presented device code and
    /// applies the polling rules.
    ///
    /// The device-code session is read and its poll time written back inside
    /// one transaction. When another poll of the same code commits first,
    /// this one loses with `SlowDown`.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the code is unknown or already consumed
    /// - `ServerError` if the code was issued to another client
    /// - `ExpiredToken` if the code has expired, whatever the user decided
    /// - `SlowDown` if the device polls faster than the configured interval
    /// - `AuthorizationPending` while the user has not decided
    /// - `AccessDenied` if the user denied the request
    async fn get_code_and_session(
        &self,
        ctx: &CancellationToken,
        request: &mut AccessRequest,
    ) -> AuthResult<ResolvedCode> {
        let (code, signature) = self.presented_code(request)?;
        let mut tx = self
            .storage
            .begin_tx(ctx)
            .await
            .map_err(storage_failure)?;

        match self
            .poll_within(ctx, tx.as_mut(), request, &code, signature, true)
            .await
        {
            Ok(PollOutcome::Approved(resolved)) => {
                record_poll(ctx, tx).await?;
                Ok(resolved)
            }
            Ok(PollOutcome::Rejected(err)) => {
                record_poll(ctx, tx).await?;
                Err(err)
            }
            Err(err) => Err(abort(tx, err).await),
        }
    }

    /// Applies the polling rules to `code` through `tx`.
    ///
    /// Expiry is checked before the rate limit so an expired code is
    /// reported as such regardless of its status. With `throttle` unset the
    /// rate limit is skipped; the exchange uses this to re-read a code the
    /// same request already polled.
    async fn poll_within(
        &self,
        ctx: &CancellationToken,
        tx: &mut dyn StorageTransaction,
        request: &mut AccessRequest,
        code: &str,
        signature: String,
        throttle: bool,
    ) -> AuthResult<PollOutcome> {
        let mut authorization = tx
            .get_device_code_session(ctx, &signature)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    AuthError::invalid_grant(
                        "The device code is invalid, expired or has already been used.",
                    )
                } else {
                    storage_failure(err)
                }
            })?;

        let presenting = request.request.client()?;
        let issued_to = authorization.request.client()?;
        if presenting.client_id != issued_to.client_id {
            tracing::warn!(
                client_id = %presenting.client_id,
                issued_to = %issued_to.client_id,
                "device code presented by a different client"
            );
            return Err(AuthError::server_error(
                "The OAuth 2.0 Client ID from this request does not match the one from the device authorization request.",
            ));
        }

        self.strategy
            .validate_device_code(&authorization.request, code)?;

        let requested_at = request.request.requested_at;
        if throttle
            && let Some(last_checked) = authorization.last_checked
            && last_checked + self.polling_interval > requested_at
        {
            stage_poll(ctx, tx, &signature, requested_at, &mut authorization).await?;
            tracing::debug!(
                device_code_signature = %signature_prefix(&signature),
                "device polled too fast"
            );
            return Ok(PollOutcome::Rejected(AuthError::SlowDown));
        }

        let decision = match self
            .storage
            .get_user_code_session(ctx, &authorization.user_code_signature)
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                stage_poll(ctx, tx, &signature, requested_at, &mut authorization).await?;
                return Ok(PollOutcome::Rejected(if err.is_not_found() {
                    AuthError::invalid_grant("The device authorization is no longer available.")
                } else {
                    storage_failure(err)
                }));
            }
        };

        match decision.status {
            DeviceAuthorizationStatus::New => {
                stage_poll(ctx, tx, &signature, requested_at, &mut authorization).await?;
                tracing::debug!(
                    device_code_signature = %signature_prefix(&signature),
                    "device authorization pending"
                );
                Ok(PollOutcome::Rejected(AuthError::AuthorizationPending))
            }
            DeviceAuthorizationStatus::Denied => {
                stage_poll(ctx, tx, &signature, requested_at, &mut authorization).await?;
                tracing::debug!(
                    device_code_signature = %signature_prefix(&signature),
                    "device authorization denied"
                );
                Ok(PollOutcome::Rejected(AuthError::access_denied(
                    "The user has denied the request.",
                )))
            }
            DeviceAuthorizationStatus::Approved => {
                authorization.merge(&decision);
                request.request.session = authorization.request.session.clone();
                request.request.set_id(authorization.request.id());
                Ok(PollOutcome::Approved(ResolvedCode {
                    signature,
                    authorization,
                }))
            }
        }
    }

    /// Copies what the user granted onto the token request.
    fn copy_grants(request: &mut AccessRequest, authorization: &DeviceAuthorizationRequest) {
        let granted = &authorization.request;
        let target = &mut request.request;
        target.set_requested_scopes(granted.requested_scopes.clone());
        target
            .requested_audience
            .extend_from(granted.requested_audience.iter().cloned());
        for scope in &granted.granted_scopes {
            target.grant_scope(scope.clone());
        }
        for audience in &granted.granted_audience {
            target.grant_audience(audience.clone());
        }
        target
            .requested_authorization_details
            .extend_from(&granted.requested_authorization_details);
        target
            .granted_authorization_details
            .extend_from(&granted.granted_authorization_details);
    }

    /// Re-reads the approved authorization and issues tokens, consuming both
    /// code sessions in the same transaction.
    async fn exchange_within(
        &self,
        ctx: &CancellationToken,
        tx: &mut dyn StorageTransaction,
        request: &mut AccessRequest,
        response: &mut AccessResponse,
        code: &str,
        signature: String,
    ) -> AuthResult<()> {
        let resolved = match self
            .poll_within(ctx, tx, request, code, signature, false)
            .await?
        {
            PollOutcome::Approved(resolved) => resolved,
            PollOutcome::Rejected(err) => return Err(err),
        };
        Self::copy_grants(request, &resolved.authorization);

        tx.invalidate_device_code_session(ctx, &resolved.signature)
            .await
            .map_err(storage_failure)?;
        tx.invalidate_user_code_session(ctx, &resolved.authorization.user_code_signature)
            .await
            .map_err(storage_failure)?;
        self.issuer
            .issue(ctx, tx, &mut request.request, response)
            .await
    }
}

/// Records a poll of `signature` in `tx`.
async fn stage_poll(
    ctx: &CancellationToken,
    tx: &mut dyn StorageTransaction,
    signature: &str,
    requested_at: OffsetDateTime,
    authorization: &mut DeviceAuthorizationRequest,
) -> AuthResult<()> {
    authorization.last_checked = Some(requested_at);
    tx.update_device_code_session(ctx, signature, authorization)
        .await
        .map_err(storage_failure)
}

/// Commits a poll transaction. Losing against a concurrent poll of the same
/// code means the device polled too fast.
async fn record_poll(ctx: &CancellationToken, tx: Box<dyn StorageTransaction>) -> AuthResult<()> {
    if ctx.is_cancelled() {
        return Err(abort(tx, AuthError::Cancelled).await);
    }
    tx.commit().await.map_err(|err| {
        if err.is_conflict() {
            tracing::debug!("device code polled concurrently");
            AuthError::SlowDown
        } else {
            tracing::warn!(error = %err, "unable to record device poll");
            storage_failure(err)
        }
    })
}

#[async_trait]
impl TokenEndpointHandler for DeviceCodeTokenHandler {
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool {
        request.grant_types.exact_one(GrantType::DeviceCode.as_str())
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
            .is_grant_type_allowed(GrantType::DeviceCode)
        {
            return Err(AuthError::unauthorized_client(
                "The OAuth 2.0 Client is not allowed to use authorization grant \"urn:ietf:params:oauth:grant-type:device_code\".",
            ));
        }

        let resolved = self.get_code_and_session(ctx, request).await?;
        Self::copy_grants(request, &resolved.authorization);
        self.issuer.stamp_access_token_expiry(&mut request.request);
        self.issuer.stamp_refresh_token_expiry(&mut request.request);
        request
            .handled_grant_types
            .append(GrantType::DeviceCode.as_str());
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

        let (code, signature) = self.presented_code(request)?;
        let mut tx = self
            .storage
            .begin_tx(ctx)
            .await
            .map_err(storage_failure)?;
        let outcome = self
            .exchange_within(ctx, tx.as_mut(), request, response, &code, signature.clone())
            .await;
        finish(ctx, tx, outcome).await?;

        tracing::info!(
            client_id = %request.request.client()?.client_id,
            device_code_signature = %signature_prefix(&signature),
            refresh_token = response.refresh_token.is_some(),
            "exchanged device code"
        );
        Ok(())
    }
}
