//! HMAC-signed opaque tokens.
//!
//! A token is `<key>.<signature>` where `key` is 32 random bytes and
//! `signature` is an HMAC-SHA256 over the key, both base64url without
//! padding. Only the signature is persisted, so a leaked store does not
//! reveal usable tokens.
//!
//! Every strategy instance is bound to a domain label ("device_code",
//! "access_token", ...). The signing key is derived from the secret and the
//! label, so a token minted for one keyspace never validates in another even
//! when all of them share a global secret.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::AuthResult;
use crate::config::ConfigError;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

const KEY_ENTROPY: usize = 32;

/// Generates and validates `<key>.<signature>` tokens for one keyspace.
#[derive(Clone)]
pub struct HmacStrategy {
    domain: String,
    signing_key: Vec<u8>,
}

impl fmt::Debug for HmacStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacStrategy")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

fn derive_key(domain: &str, secret: &[u8]) -> Result<Vec<u8>, ConfigError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InvalidValue(format!(
            "HMAC secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
            secret.len()
        )));
    }
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ConfigError::InvalidValue(format!("unusable HMAC secret: {e}")))?;
    mac.update(b"grantflow:");
    mac.update(domain.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

impl HmacStrategy {
    /// Creates a strategy for `domain` signing with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the secret is shorter than
    /// [`MIN_SECRET_LENGTH`].
    pub fn new(domain: impl Into<String>, secret: &[u8]) -> Result<Self, ConfigError> {
        let domain = domain.into();
        let signing_key = derive_key(&domain, secret)?;
        Ok(Self {
            domain,
            signing_key,
        })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    fn mac(key: &[u8]) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(key)
            .map_err(|e| AuthError::server_error_from("failed to initialise HMAC", e))
    }

    /// Generates a fresh token and returns `(token, signature)`.
    ///
    /// # Errors
    ///
    /// Returns a server error if the HMAC cannot be initialised.
    pub fn generate(&self) -> AuthResult<(String, String)> {
        let mut key = [0u8; KEY_ENTROPY];
        rand::thread_rng().fill(&mut key);

        let mut mac = Self::mac(&self.signing_key)?;
        mac.update(&key);
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok((
            format!("{}.{}", URL_SAFE_NO_PAD.encode(key), signature),
            signature,
        ))
    }

    /// Extracts the signature part of a token. Returns `""` for malformed input.
    #[must_use]
    pub fn signature(&self, token: &str) -> String {
        token
            .split_once('.')
            .map(|(_, signature)| signature.to_string())
            .unwrap_or_default()
    }

    /// Checks that `token` was minted by this strategy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` for malformed tokens and signature mismatches.
    pub fn validate(&self, token: &str) -> AuthResult<()> {
        let (key, signature) = token
            .split_once('.')
            .filter(|(k, s)| !k.is_empty() && !s.is_empty())
            .ok_or_else(|| AuthError::invalid_grant("The token format is invalid."))?;

        let key = URL_SAFE_NO_PAD
            .decode(key)
            .map_err(|_| AuthError::invalid_grant("The token format is invalid."))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::invalid_grant("The token format is invalid."))?;

        let mut mac = Self::mac(&self.signing_key)?;
        mac.update(&key);
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::invalid_grant("The token signature does not match."))
    }

    /// Signs arbitrary text, used for codes that carry no embedded signature.
    ///
    /// # Errors
    ///
    /// Returns a server error if the HMAC cannot be initialised.
    pub fn generate_hmac_for_string(&self, text: &str) -> AuthResult<String> {
        let mut mac = Self::mac(&self.signing_key)?;
        mac.update(text.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"foobarfoobarfoobarfoobarfoobarfoobarfoobarfoobar";

    #[test]
    fn test_generate_and_validate() {
        let strategy = HmacStrategy::new("device_code", SECRET).unwrap();
        let (token, signature) = strategy.generate().unwrap();

        assert_eq!(strategy.signature(&token), signature);
        assert!(strategy.validate(&token).is_ok());
    }

    #[test]
    fn test_tampered_token_fails() {
        let strategy = HmacStrategy::new("device_code", SECRET).unwrap();
        let (token, _) = strategy.generate().unwrap();
        let (key, _) = token.split_once('.').unwrap();
        let (other, _) = strategy.generate().unwrap();
        let (_, other_sig) = other.split_once('.').unwrap();

        let forged = format!("{key}.{other_sig}");
        assert!(matches!(
            strategy.validate(&forged),
            Err(AuthError::InvalidGrant { .. })
        ));
        assert!(strategy.validate("no-dot").is_err());
        assert!(strategy.validate(".sig").is_err());
        assert!(strategy.validate("key.%%%").is_err());
    }

    #[test]
    fn test_domains_are_independent() {
        let device = HmacStrategy::new("device_code", SECRET).unwrap();
        let access = HmacStrategy::new("access_token", SECRET).unwrap();
        let (token, _) = device.generate().unwrap();

        assert!(device.validate(&token).is_ok());
        assert!(access.validate(&token).is_err());
        assert_ne!(
            device.generate_hmac_for_string("BCDFGHJK").unwrap(),
            access.generate_hmac_for_string("BCDFGHJK").unwrap()
        );
    }

    #[test]
    fn test_hmac_for_string_is_deterministic() {
        let strategy = HmacStrategy::new("user_code", SECRET).unwrap();
        assert_eq!(
            strategy.generate_hmac_for_string("BCDFGHJK").unwrap(),
            strategy.generate_hmac_for_string("BCDFGHJK").unwrap()
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = HmacStrategy::new("device_code", b"short").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
