//! Transactional storage contract.
//!
//! Issuing tokens for a device code touches four records. They are written
//! through a [`StorageTransaction`] so that either all of them land or none
//! do.
//!
//! Polls of a device code also go through a transaction: the device-code
//! session is read and its last poll time written back in one unit, so two
//! devices polling the same code cannot both pass the rate limit.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::types::{DeviceAuthorizationRequest, Request};

/// Storage that can open transactions.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Opens a new transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction or `ctx`
    /// is already cancelled.
    async fn begin_tx(&self, ctx: &CancellationToken) -> AuthResult<Box<dyn StorageTransaction>>;
}

/// Writes staged inside a transaction.
///
/// Nothing is visible to other callers until [`StorageTransaction::commit`]
/// succeeds.
#[async_trait]
pub trait StorageTransaction: Send + Sync {
    /// Loads a device-code session and remembers the version that was read.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or invalidated signatures. If the
    /// session is replaced or invalidated by anyone else before this
    /// transaction commits, [`StorageTransaction::commit`] fails with
    /// `Conflict`.
    async fn get_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest>;

    /// Stages a replacement of a device-code session.
    async fn update_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()>;

    async fn invalidate_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;

    async fn invalidate_user_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;

    async fn create_access_token_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()>;

    async fn create_refresh_token_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()>;

    /// Commits all staged writes.
    ///
    /// After commit, the transaction is consumed and cannot be used again.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a session read through this transaction changed
    /// in the meantime, or another error if the commit fails. Nothing is
    /// applied in either case.
    async fn commit(self: Box<Self>) -> AuthResult<()>;

    /// Discards all staged writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to roll back.
    async fn rollback(self: Box<Self>) -> AuthResult<()>;
}
