//! Staged writes applied atomically on commit.

use std::sync::Arc;

use async_trait::async_trait;
use grantflow::AuthResult;
use grantflow::error::AuthError;
use grantflow::storage::StorageTransaction;
use grantflow::types::{DeviceAuthorizationRequest, Request};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::store::{
    FailurePoint, Faults, Tables, device_version, ensure_active, invalidate_device,
    invalidate_user, is_live, read_device, replace_device,
};

#[derive(Debug)]
enum Staged {
    UpdateDeviceCode(String, DeviceAuthorizationRequest),
    InvalidateDeviceCode(String),
    InvalidateUserCode(String),
    CreateAccessToken(String, Request),
    CreateRefreshToken(String, Request),
}

/// A transaction over a [`crate::MemoryStore`].
///
/// Nothing touches the shared tables until [`StorageTransaction::commit`].
/// Commit re-checks that every device-code session read through the
/// transaction still has the version that was read, and that every session
/// being written is still live. Two racing polls or exchanges of the same
/// device code therefore cannot both succeed.
#[derive(Debug)]
pub struct MemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
    reads: Vec<(String, u64)>,
    staged: Vec<Staged>,
}

impl MemoryTransaction {
    pub(crate) fn new(tables: Arc<RwLock<Tables>>, faults: Arc<Faults>) -> Self {
        Self {
            tables,
            faults,
            reads: Vec::new(),
            staged: Vec::new(),
        }
    }
}

#[async_trait]
impl StorageTransaction for MemoryTransaction {
    async fn get_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        ensure_active(ctx)?;
        let (request, version) = read_device(&*self.tables.read().await, signature)?;
        self.reads.push((signature.to_string(), version));
        Ok(request)
    }

    async fn update_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        if !is_live(&self.tables.read().await.device_codes, signature) {
            return Err(AuthError::not_found("device code session not found"));
        }
        self.staged.push(Staged::UpdateDeviceCode(
            signature.to_string(),
            request.clone(),
        ));
        Ok(())
    }

    async fn invalidate_device_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        if !is_live(&self.tables.read().await.device_codes, signature) {
            return Err(AuthError::not_found("device code session not found"));
        }
        self.staged
            .push(Staged::InvalidateDeviceCode(signature.to_string()));
        Ok(())
    }

    async fn invalidate_user_code_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        if !is_live(&self.tables.read().await.user_codes, signature) {
            return Err(AuthError::not_found("user code session not found"));
        }
        self.staged
            .push(Staged::InvalidateUserCode(signature.to_string()));
        Ok(())
    }

    async fn create_access_token_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        self.staged.push(Staged::CreateAccessToken(
            signature.to_string(),
            request.clone(),
        ));
        Ok(())
    }

    async fn create_refresh_token_session(
        &mut self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        if self.faults.is_set(FailurePoint::CreateRefreshToken) {
            return Err(AuthError::server_error("injected refresh token failure"));
        }
        self.staged.push(Staged::CreateRefreshToken(
            signature.to_string(),
            request.clone(),
        ));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        let Self {
            tables,
            faults,
            reads,
            staged,
        } = *self;
        if faults.is_set(FailurePoint::Commit) {
            return Err(AuthError::server_error("injected commit failure"));
        }

        let mut tables = tables.write().await;
        for (sig, version) in &reads {
            if device_version(&tables, sig) != Some(*version) {
                tracing::debug!("transaction read a device code session that has since changed");
                return Err(AuthError::conflict(
                    "device code session was changed by a concurrent writer",
                ));
            }
        }
        for staged in &staged {
            let live = match staged {
                Staged::UpdateDeviceCode(sig, _) | Staged::InvalidateDeviceCode(sig) => {
                    is_live(&tables.device_codes, sig)
                }
                Staged::InvalidateUserCode(sig) => is_live(&tables.user_codes, sig),
                Staged::CreateAccessToken(..) | Staged::CreateRefreshToken(..) => true,
            };
            if !live {
                tracing::debug!("transaction conflicts with a concurrent invalidation");
                return Err(AuthError::not_found(
                    "session was invalidated by a concurrent transaction",
                ));
            }
        }

        let applied = staged.len();
        for staged in staged {
            match staged {
                Staged::UpdateDeviceCode(sig, request) => replace_device(&mut tables, &sig, request)?,
                Staged::InvalidateDeviceCode(sig) => invalidate_device(&mut tables, &sig)?,
                Staged::InvalidateUserCode(sig) => invalidate_user(&mut tables, &sig)?,
                Staged::CreateAccessToken(sig, request) => {
                    tables.access_tokens.insert(sig, request);
                }
                Staged::CreateRefreshToken(sig, request) => {
                    tables.refresh_tokens.insert(sig, request);
                }
            }
        }
        tracing::debug!(operations = applied, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AuthResult<()> {
        if self.faults.is_set(FailurePoint::Rollback) {
            return Err(AuthError::server_error("injected rollback failure"));
        }
        tracing::debug!(operations = self.staged.len(), "transaction rolled back");
        Ok(())
    }
}
