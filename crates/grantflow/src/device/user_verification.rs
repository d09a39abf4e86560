//! End-user verification of a device authorization.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::device::{USER_CODE_PARAMETER, signature_prefix};
use crate::error::AuthError;
use crate::pipeline::UserVerificationEndpointHandler;
use crate::pipeline::transaction::storage_failure;
use crate::storage::DeviceCodeStorage;
use crate::strategy::DeviceCodeStrategy;
use crate::types::{
    DeviceAuthorizationRequest, DeviceAuthorizationStatus, DeviceUserVerificationResponse,
    GrantType,
};

const INVALID_OR_EXPIRED: &str =
    "Cannot process the request, the user_code is either invalid or expired.";

/// Looks up the user code and records the end user's decision.
///
/// Only the user-code session is written; the device learns about the
/// decision when its next poll reads that session.
pub struct DeviceUserVerificationHandler {
    storage: Arc<dyn DeviceCodeStorage>,
    strategy: Arc<dyn DeviceCodeStrategy>,
}

impl std::fmt::Debug for DeviceUserVerificationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceUserVerificationHandler")
            .finish_non_exhaustive()
    }
}

impl DeviceUserVerificationHandler {
    #[must_use]
    pub fn new(storage: Arc<dyn DeviceCodeStorage>, strategy: Arc<dyn DeviceCodeStrategy>) -> Self {
        Self { storage, strategy }
    }
}

#[async_trait]
impl UserVerificationEndpointHandler for DeviceUserVerificationHandler {
    async fn validate_user_verification_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        let user_code = request.request.form.get(USER_CODE_PARAMETER).to_string();
        if user_code.is_empty() {
            return Err(AuthError::invalid_request(
                "Cannot process the request, user_code is missing.",
            ));
        }

        let signature = self
            .strategy
            .user_code_signature(&user_code)
            .map_err(|e| AuthError::server_error_from("Unable to sign the user code", e))?;

        let stored = match self.storage.get_user_code_session(ctx, &signature).await {
            Ok(stored) => stored,
            Err(err) if err.is_not_found() => {
                tracing::debug!(
                    user_code_signature = %signature_prefix(&signature),
                    "unknown user code"
                );
                return Err(AuthError::invalid_grant(INVALID_OR_EXPIRED));
            }
            Err(err) => return Err(storage_failure(err)),
        };
        request.merge(&stored);

        if !request.request.client()?.is_grant_type_allowed(GrantType::DeviceCode) {
            return Err(AuthError::invalid_grant(
                "The requested OAuth 2.0 Client does not have the 'urn:ietf:params:oauth:grant-type:device_code' grant.",
            ));
        }

        if request.user_code_signature != signature {
            return Err(AuthError::invalid_request(
                "Cannot process the request, user code signature mismatching.",
            ));
        }

        if self
            .strategy
            .validate_user_code(&request.request, &user_code)
            .is_err()
            || request.status != DeviceAuthorizationStatus::New
        {
            return Err(AuthError::invalid_grant(INVALID_OR_EXPIRED));
        }

        Ok(())
    }

    async fn handle_user_verification_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
        response: &mut DeviceUserVerificationResponse,
    ) -> AuthResult<()> {
        if !matches!(
            request.status,
            DeviceAuthorizationStatus::Approved | DeviceAuthorizationStatus::Denied
        ) {
            return Err(AuthError::invalid_request(
                "Failed to perform device authorization because the request status is invalid.",
            ));
        }

        response.status = request.status.to_string();

        self.storage
            .update_user_code_session(ctx, &request.user_code_signature, request)
            .await
            .map_err(storage_failure)?;

        tracing::info!(
            status = %request.status,
            user_code_signature = %signature_prefix(&request.user_code_signature),
            "recorded device authorization decision"
        );
        Ok(())
    }
}
