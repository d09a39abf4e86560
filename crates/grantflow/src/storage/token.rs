//! Access and refresh token session storage.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::types::Request;

/// Storage trait for issued tokens.
///
/// Sessions are keyed by token signature; the plaintext token is never
/// passed to storage.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Stores the request an access token was issued for.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    async fn create_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()>;

    /// Loads the request an access token was issued for.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or revoked signatures.
    async fn get_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request>;

    /// Revokes an access token.
    async fn delete_access_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;

    /// Stores the request a refresh token was issued for.
    async fn create_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
        request: &Request,
    ) -> AuthResult<()>;

    /// Loads the request a refresh token was issued for.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown or revoked signatures.
    async fn get_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<Request>;

    /// Revokes a refresh token.
    async fn delete_refresh_token_session(
        &self,
        ctx: &CancellationToken,
        signature: &str,
    ) -> AuthResult<()>;
}
