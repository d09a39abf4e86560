use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use grantflow::AuthResult;
use grantflow::error::AuthError;
use grantflow::storage::{
    DeviceCodeStorage, StorageTransaction, TokenStorage, Transactional,
};
use grantflow::types::{DeviceAuthorizationRequest, Request};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::clients::ClientRegistry;
use crate::transaction::MemoryTransaction;

/// A stored record. Invalidated records stay in the table but are no longer
/// returned by lookups. `version` grows with every write so transactions can
/// tell whether a record they read has changed since.
#[derive(Debug, Clone)]
pub(crate) struct Slot<T> {
    pub(crate) value: T,
    pub(crate) active: bool,
    pub(crate) version: u64,
}

impl<T> Slot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            active: true,
            version: 0,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) device_codes: HashMap<String, Slot<DeviceAuthorizationRequest>>,
    pub(crate) user_codes: HashMap<String, Slot<DeviceAuthorizationRequest>>,
    pub(crate) access_tokens: HashMap<String, Request>,
    pub(crate) refresh_tokens: HashMap<String, Request>,
}

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Staging a refresh token session inside a transaction.
    CreateRefreshToken,
    /// Committing a transaction.
    Commit,
    /// Rolling back a transaction.
    Rollback,
}

#[derive(Debug, Default)]
pub(crate) struct Faults {
    create_refresh_token: AtomicBool,
    commit: AtomicBool,
    rollback: AtomicBool,
}

impl Faults {
    fn flag(&self, point: FailurePoint) -> &AtomicBool {
        match point {
            FailurePoint::CreateRefreshToken => &self.create_refresh_token,
            FailurePoint::Commit => &self.commit,
            FailurePoint::Rollback => &self.rollback,
        }
    }

    pub(crate) fn is_set(&self, point: FailurePoint) -> bool {
        self.flag(point).load(Ordering::SeqCst)
    }
}

/// Active record counts, for assertions and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub device_codes: usize,
    pub user_codes: usize,
    pub access_tokens: usize,
    pub refresh_tokens: usize,
}

/// In-memory storage for device sessions, token sessions and clients.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub(crate) tables: Arc<RwLock<Tables>>,
    pub(crate) clients: Arc<ClientRegistry>,
    pub(crate) faults: Arc<Faults>,
}

pub(crate) fn ensure_active(ctx: &CancellationToken) -> AuthResult<()> {
    if ctx.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    Ok(())
}

fn lookup<T: Clone>(
    table: &HashMap<String, Slot<T>>,
    signature: &str,
    what: &str,
) -> AuthResult<T> {
    match table.get(signature) {
        Some(slot) if slot.active => Ok(slot.value.clone()),
        _ => Err(AuthError::not_found(format!("{what} session not found"))),
    }
}

fn replace<T>(
    table: &mut HashMap<String, Slot<T>>,
    signature: &str,
    value: T,
    what: &str,
) -> AuthResult<()> {
    match table.get_mut(signature) {
        Some(slot) if slot.active => {
            slot.value = value;
            slot.version += 1;
            Ok(())
        }
        _ => Err(AuthError::not_found(format!("{what} session not found"))),
    }
}

fn deactivate<T>(
    table: &mut HashMap<String, Slot<T>>,
    signature: &str,
    what: &str,
) -> AuthResult<()> {
    match table.get_mut(signature) {
        Some(slot) if slot.active => {
            slot.active = false;
            slot.version += 1;
            Ok(())
        }
        _ => Err(AuthError::not_found(format!("{what} session not found"))),
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `point` fail until [`MemoryStore::clear_failure`] is called.
    pub fn inject_failure(&self, point: FailurePoint) {
        self.faults.flag(point).store(true, Ordering::SeqCst);
    }

    pub fn clear_failure(&self, point: FailurePoint) {
        self.faults.flag(point).store(false, Ordering::SeqCst);
    }

    pub async fn stats(&self) -> StoreStats {
        let tables = self.tables.read().await;
        StoreStats {
            device_codes: tables.device_codes.values().filter(|s| s.active).count(),
            user_codes: tables.user_codes.values().filter(|s| s.active).count(),
            access_tokens: tables.access_tokens.len(),
            refresh_tokens: tables.refresh_tokens.len(),
        }
    }
}

#[async_trait]
impl DeviceCodeStorage for MemoryStore {
    async fn create_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .device_codes
            .insert(signature.to_string(), Slot::new(request.clone()));
        Ok(())
    }

    async fn get_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        ensure_active(ctx)?;
        let tables = self.tables.read().await;
        lookup(&tables.device_codes, signature, "device code")
    }

    async fn update_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        replace(&mut tables.device_codes, signature, request.clone(), "device code")
    }

    async fn invalidate_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        deactivate(&mut tables.device_codes, signature, "device code")
    }

    async fn create_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .user_codes
            .insert(signature.to_string(), Slot::new(request.clone()));
        Ok(())
    }

    async fn get_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        ensure_active(ctx)?;
        let tables = self.tables.read().await;
        lookup(&tables.user_codes, signature, "user code")
    }

    async fn update_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        replace(&mut tables.user_codes, signature, request.clone(), "user code")
    }

    async fn invalidate_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        deactivate(&mut tables.user_codes, signature, "user code")
    }
}

#[async_trait]
impl TokenStorage for MemoryStore {
    async fn create_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .access_tokens
            .insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request> {
        ensure_active(ctx)?;
        let tables = self.tables.read().await;
        tables
            .access_tokens
            .get(signature)
            .cloned()
            .ok_or_else(|| AuthError::not_found("access token session not found"))
    }

    async fn delete_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .access_tokens
            .remove(signature)
            .map(|_| ())
            .ok_or_else(|| AuthError::not_found("access token session not found"))
    }

    async fn create_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .refresh_tokens
            .insert(signature.to_string(), request.clone());
        Ok(())
    }

    async fn get_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request> {
        ensure_active(ctx)?;
        let tables = self.tables.read().await;
        tables
            .refresh_tokens
            .get(signature)
            .cloned()
            .ok_or_else(|| AuthError::not_found("refresh token session not found"))
    }

    async fn delete_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        ensure_active(ctx)?;
        let mut tables = self.tables.write().await;
        tables
            .refresh_tokens
            .remove(signature)
            .map(|_| ())
            .ok_or_else(|| AuthError::not_found("refresh token session not found"))
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    async fn begin_tx(&self, ctx: &CancellationToken) -> AuthResult<Box<dyn StorageTransaction>> {
        ensure_active(ctx)?;
        Ok(Box::new(MemoryTransaction::new(
            self.tables.clone(),
            self.faults.clone(),
        )))
    }
}

/// Applies a staged invalidation while holding the write lock.
pub(crate) fn invalidate_device(tables: &mut Tables, signature: &str) -> AuthResult<()> {
    deactivate(&mut tables.device_codes, signature, "device code")
}

pub(crate) fn invalidate_user(tables: &mut Tables, signature: &str) -> AuthResult<()> {
    deactivate(&mut tables.user_codes, signature, "user code")
}

/// Reads a live device-code session together with its version.
pub(crate) fn read_device(
    tables: &Tables,
    signature: &str,
) -> AuthResult<(DeviceAuthorizationRequest, u64)> {
    match tables.device_codes.get(signature) {
        Some(slot) if slot.active => Ok((slot.value.clone(), slot.version)),
        _ => Err(AuthError::not_found("device code session not found")),
    }
}

/// Version of a live device-code session, `None` once it is gone.
pub(crate) fn device_version(tables: &Tables, signature: &str) -> Option<u64> {
    tables
        .device_codes
        .get(signature)
        .filter(|slot| slot.active)
        .map(|slot| slot.version)
}

pub(crate) fn replace_device(
    tables: &mut Tables,
    signature: &str,
    request: DeviceAuthorizationRequest,
) -> AuthResult<()> {
    replace(&mut tables.device_codes, signature, request, "device code")
}

pub(crate) fn is_live<T>(table: &HashMap<String, Slot<T>>, signature: &str) -> bool {
    table.get(signature).is_some_and(|slot| slot.active)
}
