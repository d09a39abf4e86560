//! Access and refresh token strategy.

use std::time::Duration;

use crate::AuthResult;
use crate::config::ConfigError;
use crate::strategy::check_expiry;
use crate::strategy::hmac::HmacStrategy;
use crate::types::{Request, TokenKind};

pub const ACCESS_TOKEN_PREFIX: &str = "gf_at_";
pub const REFRESH_TOKEN_PREFIX: &str = "gf_rt_";

/// Generates, signs and validates access and refresh tokens.
pub trait CoreStrategy: Send + Sync {
    /// Returns `(access_token, signature)`.
    fn generate_access_token(&self, request: &Request) -> AuthResult<(String, String)>;
    fn access_token_signature(&self, token: &str) -> String;
    fn validate_access_token(&self, request: &Request, token: &str) -> AuthResult<()>;

    /// Returns `(refresh_token, signature)`.
    fn generate_refresh_token(&self, request: &Request) -> AuthResult<(String, String)>;
    fn refresh_token_signature(&self, token: &str) -> String;
    fn validate_refresh_token(&self, request: &Request, token: &str) -> AuthResult<()>;
}

/// Opaque HMAC tokens with distinct keyspaces for access and refresh tokens.
#[derive(Debug, Clone)]
pub struct HmacCoreStrategy {
    access: HmacStrategy,
    refresh: HmacStrategy,
    access_token_lifespan: Duration,
    refresh_token_lifespan: Duration,
}

impl HmacCoreStrategy {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `secret` is too short.
    pub fn new(
        secret: &[u8],
        access_token_lifespan: Duration,
        refresh_token_lifespan: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            access: HmacStrategy::new("access_token", secret)?,
            refresh: HmacStrategy::new("refresh_token", secret)?,
            access_token_lifespan,
            refresh_token_lifespan,
        })
    }
}

fn strip<'a>(token: &'a str, prefix: &str) -> &'a str {
    token.strip_prefix(prefix).unwrap_or(token)
}

impl CoreStrategy for HmacCoreStrategy {
    fn generate_access_token(&self, _request: &Request) -> AuthResult<(String, String)> {
        let (token, signature) = self.access.generate()?;
        Ok((format!("{ACCESS_TOKEN_PREFIX}{token}"), signature))
    }

    fn access_token_signature(&self, token: &str) -> String {
        self.access.signature(strip(token, ACCESS_TOKEN_PREFIX))
    }

    fn validate_access_token(&self, request: &Request, token: &str) -> AuthResult<()> {
        check_expiry(
            request,
            TokenKind::AccessToken,
            self.access_token_lifespan,
            "Access token",
        )?;
        self.access.validate(strip(token, ACCESS_TOKEN_PREFIX))
    }

    fn generate_refresh_token(&self, _request: &Request) -> AuthResult<(String, String)> {
        let (token, signature) = self.refresh.generate()?;
        Ok((format!("{REFRESH_TOKEN_PREFIX}{token}"), signature))
    }

    fn refresh_token_signature(&self, token: &str) -> String {
        self.refresh.signature(strip(token, REFRESH_TOKEN_PREFIX))
    }

    fn validate_refresh_token(&self, request: &Request, token: &str) -> AuthResult<()> {
        check_expiry(
            request,
            TokenKind::RefreshToken,
            self.refresh_token_lifespan,
            "Refresh token",
        )?;
        self.refresh.validate(strip(token, REFRESH_TOKEN_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"foobarfoobarfoobarfoobarfoobarfoobarfoobarfoobar";

    fn strategy() -> HmacCoreStrategy {
        HmacCoreStrategy::new(
            SECRET,
            Duration::from_secs(3600),
            Duration::from_secs(86400),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_roundtrip() {
        let strategy = strategy();
        let request = Request::new();
        let (token, signature) = strategy.generate_access_token(&request).unwrap();

        assert!(token.starts_with(ACCESS_TOKEN_PREFIX));
        assert_eq!(strategy.access_token_signature(&token), signature);
        assert!(strategy.validate_access_token(&request, &token).is_ok());
    }

    #[test]
    fn test_refresh_token_not_valid_as_access_token() {
        let strategy = strategy();
        let request = Request::new();
        let (refresh, _) = strategy.generate_refresh_token(&request).unwrap();

        assert!(strategy.validate_refresh_token(&request, &refresh).is_ok());
        assert!(strategy.validate_access_token(&request, &refresh).is_err());
    }

    #[test]
    fn test_expired_access_token() {
        let strategy = strategy();
        let mut request = Request::new();
        let (token, _) = strategy.generate_access_token(&request).unwrap();
        request.session.set_expires_at(
            TokenKind::AccessToken,
            OffsetDateTime::now_utc() - Duration::from_secs(5),
        );

        assert!(matches!(
            strategy.validate_access_token(&request, &token),
            Err(AuthError::ExpiredToken { .. })
        ));
    }
}
