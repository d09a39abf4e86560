//! Client lookup and authentication.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::types::{Client, Form};

/// Resolves the client behind a request.
///
/// Credential checks (secrets, assertions, mTLS) live behind this trait; the
/// protocol core only asks "who is this?".
#[async_trait]
pub trait ClientAuthenticator: Send + Sync {
    /// Authenticates the client from the request parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` when credentials are missing or wrong.
    async fn authenticate_client(&self, ctx: &CancellationToken, form: &Form) -> AuthResult<Client>;

    /// Looks up a client by id without checking credentials.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown clients.
    async fn get_client(&self, ctx: &CancellationToken, client_id: &str) -> AuthResult<Client>;
}
