#![allow(dead_code)]

mod observed;

use std::sync::Arc;
use std::time::Duration;

use grantflow::AuthResult;
use grantflow::config::FlowConfig;
use grantflow::pipeline::{Provider, compose};
use grantflow::storage::DeviceCodeStorage;
use grantflow::strategy::{DefaultDeviceStrategy, DeviceCodeStrategy};
use grantflow::types::{
    AccessResponse, Client, DeviceAuthorizationResponse, DeviceAuthorizationStatus,
    DeviceUserVerificationResponse, Form, GrantType, Session,
};
use grantflow_memory::MemoryStore;
use tokio_util::sync::CancellationToken;

pub use observed::ObservedStore;

pub const SECRET: &[u8] = b"integration-secret-integration-secret-0123456789";
pub const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub const TV_SECRET: &str = "tv-secret";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub observed: Arc<ObservedStore>,
    pub provider: Provider,
    pub ctx: CancellationToken,
    pub device_strategy: DefaultDeviceStrategy,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("grantflow=debug")
        .try_init();
}

pub fn device_config(polling_interval: Duration) -> FlowConfig {
    let mut config = FlowConfig::default();
    config.device.code_lifespan = Duration::from_secs(600);
    config.device.polling_interval = polling_interval;
    config.device.verification_uri = "https://auth.example.com/device".to_string();
    config
}

pub fn tv_client() -> Client {
    Client::new("tv", vec![GrantType::DeviceCode, GrantType::RefreshToken])
        .with_scopes(["openid", "offline_access", "photos"])
}

pub async fn harness(config: FlowConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let observed = ObservedStore::new(store.clone());
    harness_over(config, store, observed).await
}

/// Like [`harness`], but every user-code lookup waits until `parties`
/// lookups are in flight.
pub async fn harness_with_rendezvous(config: FlowConfig, parties: usize) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let observed = ObservedStore::new(store.clone()).with_rendezvous(parties);
    harness_over(config, store, observed).await
}

async fn harness_over(config: FlowConfig, store: Arc<MemoryStore>, observed: ObservedStore) -> Harness {
    init_tracing();
    let device_strategy =
        DefaultDeviceStrategy::new(SECRET, config.device.code_lifespan).expect("device strategy");
    store.register_client(tv_client(), Some(TV_SECRET)).await;
    let observed = Arc::new(observed);
    let provider = compose(config, SECRET, observed.clone(), store.clone()).expect("valid config");
    Harness {
        store,
        observed,
        provider,
        ctx: CancellationToken::new(),
        device_strategy,
    }
}

pub fn form(pairs: &[(&str, &str)]) -> Form {
    pairs.iter().copied().collect()
}

impl Harness {
    pub async fn device_authorize(&self, pairs: &[(&str, &str)]) -> AuthResult<DeviceAuthorizationResponse> {
        let mut request = self
            .provider
            .new_device_authorization_request(&self.ctx, form(pairs))
            .await?;
        self.provider
            .new_device_authorization_response(&self.ctx, &mut request, Session::default())
            .await
    }

    /// Resolves `user_code` and records the decision, granting everything
    /// that was requested when approving.
    pub async fn decide(
        &self,
        user_code: &str,
        status: DeviceAuthorizationStatus,
    ) -> AuthResult<DeviceUserVerificationResponse> {
        let mut request = self
            .provider
            .new_device_user_verification_request(&self.ctx, form(&[("user_code", user_code)]))
            .await?;
        request.status = status;
        if status == DeviceAuthorizationStatus::Approved {
            request.request.session.subject = "alice".to_string();
            let scopes = request.request.requested_scopes.clone();
            for scope in &scopes {
                request.request.grant_scope(scope.clone());
            }
            let details = request.request.requested_authorization_details.clone();
            for detail in &details {
                request.request.grant_authorization_detail(detail.clone());
            }
        }
        self.provider
            .new_device_user_verification_response(&self.ctx, &mut request)
            .await
    }

    pub async fn poll_as(
        &self,
        client_id: &str,
        secret: &str,
        device_code: &str,
    ) -> AuthResult<AccessResponse> {
        let form = form(&[
            ("grant_type", DEVICE_GRANT),
            ("device_code", device_code),
            ("client_id", client_id),
            ("client_secret", secret),
        ]);
        let mut request = self
            .provider
            .new_access_request(&self.ctx, form, Session::default())
            .await?;
        self.provider.new_access_response(&self.ctx, &mut request).await
    }

    pub async fn poll(&self, device_code: &str) -> AuthResult<AccessResponse> {
        self.poll_as("tv", TV_SECRET, device_code).await
    }

    /// Moves the recorded last poll into the past so the next poll is not
    /// throttled.
    pub async fn rewind_last_poll(&self, device_code: &str, by: Duration) {
        let signature = self
            .device_strategy
            .device_code_signature(device_code)
            .expect("signature");
        let mut stored = self
            .store
            .get_device_code_session(&self.ctx, &signature)
            .await
            .expect("device session");
        if let Some(last_checked) = stored.last_checked {
            stored.last_checked = Some(last_checked - by);
        }
        self.store
            .update_device_code_session(&self.ctx, &signature, &stored)
            .await
            .expect("update device session");
    }
}
