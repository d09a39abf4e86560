//! A [`MemoryStore`] wrapper that counts user-code lookups and can hold
//! concurrent callers at a rendezvous point.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use grantflow::AuthResult;
use grantflow::storage::{DeviceCodeStorage, StorageTransaction, TokenStorage, Transactional};
use grantflow::types::{DeviceAuthorizationRequest, Request};
use grantflow_memory::MemoryStore;
use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

pub struct ObservedStore {
    inner: Arc<MemoryStore>,
    user_code_reads: AtomicUsize,
    rendezvous: Option<Barrier>,
}

impl ObservedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            user_code_reads: AtomicUsize::new(0),
            rendezvous: None,
        }
    }

    /// Every user-code lookup waits until `parties` lookups are in flight.
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Barrier::new(parties));
        self
    }

    pub fn user_code_reads(&self) -> usize {
        self.user_code_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceCodeStorage for ObservedStore {
    async fn create_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.inner
            .create_device_code_session(ctx, signature, request)
            .await
    }

    async fn get_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        self.inner.get_device_code_session(ctx, signature).await
    }

    async fn update_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.inner
            .update_device_code_session(ctx, signature, request)
            .await
    }

    async fn invalidate_device_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.inner.invalidate_device_code_session(ctx, signature).await
    }

    async fn create_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.inner
            .create_user_code_session(ctx, signature, request)
            .await
    }

    async fn get_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<DeviceAuthorizationRequest> {
        self.user_code_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.wait().await;
        }
        self.inner.get_user_code_session(ctx, signature).await
    }

    async fn update_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &DeviceAuthorizationRequest,
    ) -> AuthResult<()> {
        self.inner
            .update_user_code_session(ctx, signature, request)
            .await
    }

    async fn invalidate_user_code_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.inner.invalidate_user_code_session(ctx, signature).await
    }
}

#[async_trait]
impl TokenStorage for ObservedStore {
    async fn create_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        self.inner
            .create_access_token_session(ctx, signature, request)
            .await
    }

    async fn get_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request> {
        self.inner.get_access_token_session(ctx, signature).await
    }

    async fn delete_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.inner.delete_access_token_session(ctx, signature).await
    }

    async fn create_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()> {
        self.inner
            .create_refresh_token_session(ctx, signature, request)
            .await
    }

    async fn get_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request> {
        self.inner.get_refresh_token_session(ctx, signature).await
    }

    async fn delete_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()> {
        self.inner.delete_refresh_token_session(ctx, signature).await
    }
}

#[async_trait]
impl Transactional for ObservedStore {
    async fn begin_tx(&self, ctx: &CancellationToken) -> AuthResult<Box<dyn StorageTransaction>> {
        self.inner.begin_tx(ctx).await
    }
}
