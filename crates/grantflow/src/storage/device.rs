//! Device and user code session storage.
//!
//! A device authorization is persisted twice: once keyed by the device-code
//! signature (polled by the device) and once keyed by the user-code signature
//! (approved or denied by the end user). The two records are independent;
//! updating one never touches the other.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::types::DeviceAuthorizationRequest;

/// Storage trait for device authorization sessions.
///
/// Lookups of unknown signatures must fail with [`crate::AuthError::NotFound`];
/// handlers rely on that kind to tell a missing session from a broken store.
///
/// # Implementations
///
/// - `grantflow-memory` - in-memory backend with transactional staging
#[async_trait]
pub trait DeviceCodeStorage: Send + Sync {
    /// Stores the session polled by the device.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancellation token of the calling request
    /// * `signature` - Signature of the device code
    /// * `request` - The device authorization to persist
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    async fn create_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    /// Loads the session stored under a device-code signature.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or invalidated signatures.
    async fn get_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest>;

    /// Replaces the session stored under a device-code signature.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such session exists.
    async fn update_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    /// Marks a device code as consumed; later lookups fail with `NotFound`.
    async fn invalidate_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;

    /// Stores the session the end user approves or denies.
    async fn create_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    /// Loads the session stored under a user-code signature.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or invalidated signatures.
    async fn get_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest>;

    /// Replaces the session stored under a user-code signature.
    async fn update_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    /// Marks a user code as consumed.
    async fn invalidate_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;
}
