//! Registered clients and their secrets.

use std::collections::HashMap;

use async_trait::async_trait;
use grantflow::AuthResult;
use grantflow::error::AuthError;
use grantflow::storage::ClientAuthenticator;
use grantflow::types::{Client, Form};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::store::{MemoryStore, ensure_active};

#[derive(Debug, Clone)]
struct Registration {
    client: Client,
    secret: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ClientRegistry {
    clients: RwLock<HashMap<String, Registration>>,
}

impl MemoryStore {
    /// Registers `client`. Public clients pass `None` and authenticate with
    /// their `client_id` alone.
    pub async fn register_client(&self, client: Client, secret: Option<&str>) {
        let mut clients = self.clients.clients.write().await;
        clients.insert(
            client.client_id.clone(),
            Registration {
                client,
                secret: secret.map(str::to_string),
            },
        );
    }
}

fn invalid_client() -> AuthError {
    AuthError::invalid_client("Client authentication failed.")
}

#[async_trait]
impl ClientAuthenticator for MemoryStore {
    async fn authenticate_client(&self, ctx: &CancellationToken, form: &Form) -> AuthResult<Client> {
        ensure_active(ctx)?;
        let client_id = form.get("client_id");
        if client_id.is_empty() {
            return Err(invalid_client());
        }

        let clients = self.clients.clients.read().await;
        let Some(registration) = clients.get(client_id) else {
            tracing::debug!(client_id, "unknown client");
            return Err(invalid_client());
        };

        match registration.secret.as_deref() {
            None => Ok(registration.client.clone()),
            Some(secret) if secret == form.get("client_secret") => Ok(registration.client.clone()),
            Some(_) => {
                tracing::debug!(client_id, "client secret mismatch");
                Err(invalid_client())
            }
        }
    }

    async fn get_client(&self, ctx: &CancellationToken, client_id: &str) -> AuthResult<Client> {
        ensure_active(ctx)?;
        let clients = self.clients.clients.read().await;
        clients
            .get(client_id)
            .map(|r| r.client.clone())
            .ok_or_else(|| AuthError::not_found(format!("client '{client_id}' not found")))
    }
}
