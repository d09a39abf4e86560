//! Code and token strategies.
//!
//! - [`hmac`] - the signed `<key>.<signature>` token primitive
//! - [`device`] - device codes and user codes (RFC 8628)
//! - [`token`] - access and refresh tokens
//! - [`matching`] - scope, audience and authorization detail type predicates

pub mod device;
pub mod hmac;
pub mod matching;
pub mod token;

use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{Request, TokenKind};

pub use device::{DefaultDeviceStrategy, DeviceCodeStrategy};
pub use self::hmac::HmacStrategy;
pub use matching::{
    AudienceStrategy, ExactAudienceStrategy, ExactMatchingStrategy, MatchingStrategy,
};
pub use token::{CoreStrategy, HmacCoreStrategy};

/// Fails with `ExpiredToken` once the artifact of `kind` has expired.
///
/// The session's expiry for `kind` wins; when none is recorded the request
/// timestamp plus `lifespan` is used instead.
pub(crate) fn check_expiry(
    request: &Request,
    kind: TokenKind,
    lifespan: Duration,
    label: &str,
) -> AuthResult<()> {
    let expires_at = request
        .session
        .expires_at(kind)
        .unwrap_or_else(|| request.requested_at + lifespan);

    if expires_at < OffsetDateTime::now_utc() {
        let formatted = expires_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| expires_at.to_string());
        return Err(AuthError::expired_token(
            format!("{label} expired at '{formatted}'."),
            expires_at,
        ));
    }
    Ok(())
}
