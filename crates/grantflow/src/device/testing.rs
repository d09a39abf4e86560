//! Device session storage double recording every write.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::DeviceCodeStorage;
use crate::types::DeviceAuthorizationRequest;

#[derive(Default)]
pub(crate) struct Recorder {
    pub(crate) device: Mutex<HashMap<String, DeviceAuthorizationRequest>>,
    pub(crate) user: Mutex<HashMap<String, DeviceAuthorizationRequest>>,
}

#[async_trait]
impl DeviceCodeStorage for Recorder {
    async fn create_device_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.device
            .lock()
            .unwrap()
            .insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_device_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        self.device
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .ok_or_else(|| AuthError::not_found(signature))
    }

    async fn update_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.create_device_code_session(ctx, signature, request).await
    }

    async fn invalidate_device_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.device.lock().unwrap().remove(signature);
        Ok(())
    }

    async fn create_user_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.user
            .lock()
            .unwrap()
            .insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_user_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        self.user
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .ok_or_else(|| AuthError::not_found(signature))
    }

    async fn update_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.create_user_code_session(ctx, signature, request).await
    }

    async fn invalidate_user_code_session(
        &self,
        _ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.user.lock().unwrap().remove(signature);
        Ok(())
    }
}
