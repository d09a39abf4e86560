//! Device and user code issuance.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::config::DeviceConfig;
use crate::device::{USER_CODE_PARAMETER, signature_prefix};
use crate::error::AuthError;
use crate::pipeline::DeviceAuthorizationEndpointHandler;
use crate::pipeline::issuer::round_to_second;
use crate::pipeline::transaction::storage_failure;
use crate::storage::DeviceCodeStorage;
use crate::strategy::DeviceCodeStrategy;
use crate::types::{
    DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceAuthorizationStatus, TokenKind,
};

/// Issues the device code / user code pair.
pub struct DeviceAuthorizationIssuer {
    storage: Arc<dyn DeviceCodeStorage>,
    strategy: Arc<dyn DeviceCodeStrategy>,
    config: DeviceConfig,
}

impl std::fmt::Debug for DeviceAuthorizationIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAuthorizationIssuer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DeviceAuthorizationIssuer {
    #[must_use]
    pub fn new(
        storage: Arc<dyn DeviceCodeStorage>,
        strategy: Arc<dyn DeviceCodeStrategy>,
        config: DeviceConfig,
    ) -> Self {
        Self {
            storage,
            strategy,
            config,
        }
    }

    /// Builds `verification_uri_complete` by setting the `user_code` query
    /// parameter on the verification URI.
    fn complete_uri(&self, user_code: &str) -> String {
        let base = &self.config.verification_uri;
        match url::Url::parse(base) {
            Ok(mut uri) => {
                let kept: Vec<(String, String)> = uri
                    .query_pairs()
                    .filter(|(key, _)| *key != USER_CODE_PARAMETER)
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                uri.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair(USER_CODE_PARAMETER, user_code);
                uri.to_string()
            }
            Err(_) => format!("{base}?{USER_CODE_PARAMETER}={user_code}"),
        }
    }
}

#[async_trait]
impl DeviceAuthorizationEndpointHandler for DeviceAuthorizationIssuer {
    async fn handle_device_authorization_endpoint_request(
        &self,
        ctx: &CancellationToken,
        request: &mut DeviceAuthorizationRequest,
        response: &mut DeviceAuthorizationResponse,
    ) -> AuthResult<()> {
        let (device_code, device_code_signature) = self
            .strategy
            .generate_device_code()
            .map_err(|e| AuthError::server_error_from("Unable to generate a device code", e))?;
        let (user_code, user_code_signature) = self
            .strategy
            .generate_user_code()
            .map_err(|e| AuthError::server_error_from("Unable to generate a user code", e))?;

        request.status = DeviceAuthorizationStatus::New;
        request.device_code_signature = device_code_signature.clone();
        request.user_code_signature = user_code_signature.clone();

        let expires_at = round_to_second(OffsetDateTime::now_utc() + self.config.code_lifespan);
        let session = &mut request.request.session;
        session.set_expires_at(TokenKind::DeviceCode, expires_at);
        session.set_expires_at(TokenKind::UserCode, expires_at);

        self.storage
            .create_device_code_session(ctx, &device_code_signature, request)
            .await
            .map_err(storage_failure)?;
        self.storage
            .create_user_code_session(ctx, &user_code_signature, request)
            .await
            .map_err(storage_failure)?;

        tracing::info!(
            client_id = request.request.client.as_ref().map_or("", |c| c.client_id.as_str()),
            device_code_signature = %signature_prefix(&device_code_signature),
            "issued device authorization"
        );

        response.verification_uri = self.config.verification_uri.clone();
        if self.config.include_verification_uri_complete {
            response.verification_uri_complete = self.complete_uri(&user_code);
        }
        response.device_code = device_code;
        response.user_code = user_code;
        response.expires_in = (expires_at - OffsetDateTime::now_utc()).whole_seconds().max(0);
        response.interval = self.config.polling_interval.as_secs();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::Recorder;
    use crate::strategy::DefaultDeviceStrategy;
    use crate::strategy::device::{DEVICE_CODE_PREFIX, USER_CODE_LENGTH};
    use std::time::Duration;

    const SECRET: &[u8] = b"foobarfoobarfoobarfoobarfoobarfoobarfoobarfoobar";

    fn issuer(storage: Arc<Recorder>, config: DeviceConfig) -> DeviceAuthorizationIssuer {
        let strategy = DefaultDeviceStrategy::new(SECRET, config.code_lifespan).unwrap();
        DeviceAuthorizationIssuer::new(storage, Arc::new(strategy), config)
    }

    #[tokio::test]
    async fn test_issues_two_independent_sessions() {
        let storage = Arc::new(Recorder::default());
        let config = DeviceConfig {
            code_lifespan: Duration::from_secs(600),
            polling_interval: Duration::from_secs(10),
            verification_uri: "https://auth.example.com/device".to_string(),
            ..DeviceConfig::default()
        };
        let issuer = issuer(storage.clone(), config);
        let ctx = CancellationToken::new();

        let mut request = DeviceAuthorizationRequest::new();
        let mut response = DeviceAuthorizationResponse::default();
        issuer
            .handle_device_authorization_endpoint_request(&ctx, &mut request, &mut response)
            .await
            .unwrap();

        assert!(response.device_code.starts_with(DEVICE_CODE_PREFIX));
        assert_eq!(response.user_code.len(), USER_CODE_LENGTH);
        assert_ne!(request.device_code_signature, request.user_code_signature);
        assert!((599..=600).contains(&response.expires_in));
        assert_eq!(response.interval, 10);
        assert_eq!(
            response.verification_uri_complete,
            format!("https://auth.example.com/device?user_code={}", response.user_code)
        );

        let device = storage.device.lock().unwrap();
        let user = storage.user.lock().unwrap();
        let stored = device.get(&request.device_code_signature).unwrap();
        assert!(user.contains_key(&request.user_code_signature));
        assert_eq!(stored.status, DeviceAuthorizationStatus::New);

        let expires_at = stored.request.session.expires_at(TokenKind::DeviceCode).unwrap();
        assert_eq!(expires_at.nanosecond(), 0);
        assert_eq!(
            stored.request.session.expires_at(TokenKind::UserCode),
            Some(expires_at)
        );
    }

    #[tokio::test]
    async fn test_complete_uri_replaces_existing_user_code() {
        let storage = Arc::new(Recorder::default());
        let config = DeviceConfig {
            verification_uri: "https://auth.example.com/device?lang=en&user_code=OLD".to_string(),
            ..DeviceConfig::default()
        };
        let issuer = issuer(storage, config);
        let uri = issuer.complete_uri("BCDFGHJK");
        assert_eq!(
            uri,
            "https://auth.example.com/device?lang=en&user_code=BCDFGHJK"
        );
    }

    #[tokio::test]
    async fn test_complete_uri_can_be_disabled() {
        let storage = Arc::new(Recorder::default());
        let config = DeviceConfig {
            include_verification_uri_complete: false,
            ..DeviceConfig::default()
        };
        let issuer = issuer(storage, config);
        let ctx = CancellationToken::new();

        let mut request = DeviceAuthorizationRequest::new();
        let mut response = DeviceAuthorizationResponse::default();
        issuer
            .handle_device_authorization_endpoint_request(&ctx, &mut request, &mut response)
            .await
            .unwrap();
        assert!(response.verification_uri_complete.is_empty());
    }
}
