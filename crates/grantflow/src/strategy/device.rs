//! Device and user code strategy (RFC 8628).

use std::time::Duration;

use rand::Rng;

use crate::AuthResult;
use crate::config::ConfigError;
use crate::strategy::check_expiry;
use crate::strategy::hmac::HmacStrategy;
use crate::types::{Request, TokenKind};

/// Marker prepended to every device code.
pub const DEVICE_CODE_PREFIX: &str = "gf_dc_";

/// Characters user codes are drawn from: consonants only, no vowels or
/// look-alike digits, so codes are easy to type and never spell words.
pub const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";

pub const USER_CODE_LENGTH: usize = 8;

/// Generates, signs and validates device and user codes.
pub trait DeviceCodeStrategy: Send + Sync {
    /// Returns `(device_code, signature)`.
    fn generate_device_code(&self) -> AuthResult<(String, String)>;

    fn device_code_signature(&self, code: &str) -> AuthResult<String>;

    /// Checks expiry against `request` and the code's own signature.
    fn validate_device_code(&self, request: &Request, code: &str) -> AuthResult<()>;

    /// Returns `(user_code, signature)`.
    fn generate_user_code(&self) -> AuthResult<(String, String)>;

    fn user_code_signature(&self, code: &str) -> AuthResult<String>;

    /// Checks expiry against `request`.
    fn validate_user_code(&self, request: &Request, code: &str) -> AuthResult<()>;
}

/// HMAC-backed [`DeviceCodeStrategy`].
#[derive(Debug, Clone)]
pub struct DefaultDeviceStrategy {
    device: HmacStrategy,
    user: HmacStrategy,
    lifespan: Duration,
}

impl DefaultDeviceStrategy {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `secret` is too short.
    pub fn new(secret: &[u8], lifespan: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            device: HmacStrategy::new("device_code", secret)?,
            user: HmacStrategy::new("user_code", secret)?,
            lifespan,
        })
    }
}

impl DeviceCodeStrategy for DefaultDeviceStrategy {
    fn generate_device_code(&self) -> AuthResult<(String, String)> {
        let (token, signature) = self.device.generate()?;
        Ok((format!("{DEVICE_CODE_PREFIX}{token}"), signature))
    }

    fn device_code_signature(&self, code: &str) -> AuthResult<String> {
        Ok(self
            .device
            .signature(code.strip_prefix(DEVICE_CODE_PREFIX).unwrap_or(code)))
    }

    fn validate_device_code(&self, request: &Request, code: &str) -> AuthResult<()> {
        check_expiry(request, TokenKind::DeviceCode, self.lifespan, "Device code")?;
        self.device
            .validate(code.strip_prefix(DEVICE_CODE_PREFIX).unwrap_or(code))
    }

    fn generate_user_code(&self) -> AuthResult<(String, String)> {
        let mut rng = rand::thread_rng();
        let code: String = (0..USER_CODE_LENGTH)
            .map(|_| USER_CODE_ALPHABET[rng.gen_range(0..USER_CODE_ALPHABET.len())] as char)
            .collect();
        let signature = self.user_code_signature(&code)?;
        Ok((code, signature))
    }

    fn user_code_signature(&self, code: &str) -> AuthResult<String> {
        self.user.generate_hmac_for_string(code)
    }

    fn validate_user_code(&self, request: &Request, _code: &str) -> AuthResult<()> {
        check_expiry(request, TokenKind::UserCode, self.lifespan, "User code")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use time::OffsetDateTime;

    const SECRET: &[u8] = b"foobarfoobarfoobarfoobarfoobarfoobarfoobarfoobar";

    fn strategy() -> DefaultDeviceStrategy {
        DefaultDeviceStrategy::new(SECRET, Duration::from_secs(600)).unwrap()
    }

    #[test]
    fn test_user_code_shape() {
        let strategy = strategy();
        for _ in 0..50 {
            let (code, signature) = strategy.generate_user_code().unwrap();
            assert_eq!(code.len(), USER_CODE_LENGTH);
            assert!(code.bytes().all(|b| USER_CODE_ALPHABET.contains(&b)));
            assert_eq!(strategy.user_code_signature(&code).unwrap(), signature);
        }
    }

    #[test]
    fn test_device_code_shape() {
        let strategy = strategy();
        let (code, signature) = strategy.generate_device_code().unwrap();
        assert!(code.starts_with(DEVICE_CODE_PREFIX));
        assert_eq!(strategy.device_code_signature(&code).unwrap(), signature);

        let (other, other_sig) = strategy.generate_device_code().unwrap();
        assert_ne!(code, other);
        assert_ne!(signature, other_sig);
    }

    #[test]
    fn test_validate_device_code() {
        let strategy = strategy();
        let (code, _) = strategy.generate_device_code().unwrap();
        let mut request = Request::new();
        request.session.set_expires_at(
            TokenKind::DeviceCode,
            OffsetDateTime::now_utc() + Duration::from_secs(60),
        );
        assert!(strategy.validate_device_code(&request, &code).is_ok());
        assert!(
            strategy
                .validate_device_code(&request, "gf_dc_forged.signature")
                .is_err()
        );
    }

    #[test]
    fn test_expired_by_session_expiry() {
        let strategy = strategy();
        let (code, _) = strategy.generate_device_code().unwrap();
        let mut request = Request::new();
        let expired_at = OffsetDateTime::now_utc() - Duration::from_secs(1);
        request
            .session
            .set_expires_at(TokenKind::DeviceCode, expired_at);

        match strategy.validate_device_code(&request, &code) {
            Err(AuthError::ExpiredToken {
                expired_at: at,
                message,
            }) => {
                assert_eq!(at, expired_at);
                assert!(message.starts_with("Device code expired at"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_expired_by_lifespan_fallback() {
        let strategy = strategy();
        let mut request = Request::new();
        request.requested_at = OffsetDateTime::now_utc() - Duration::from_secs(601);

        let err = strategy.validate_user_code(&request, "BCDFGHJK").unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken { .. }));

        request.requested_at = OffsetDateTime::now_utc();
        assert!(strategy.validate_user_code(&request, "BCDFGHJK").is_ok());
    }
}
