//! Device authorization grant (RFC 8628).
//!
//! The flow runs across three endpoints:
//!
//! 1. [`DeviceAuthorizationIssuer`] issues a device code and a user code and
//!    stores one session under each signature.
//! 2. [`DeviceUserVerificationHandler`] resolves the user code entered by the
//!    end user and records the approve or deny decision on the user-code
//!    session.
//! 3. [`DeviceCodeTokenHandler`] answers the device's polling at the token
//!    endpoint with `slow_down`, `authorization_pending` or `access_denied`
//!    until the user approves, then exchanges the device code for tokens and
//!    consumes both sessions in one transaction.
//!
//! ```text
//!            issue              approve / deny
//!   (none) ───────▶ New ──────────────────────▶ Approved | Denied
//! ```

mod authorization;
#[cfg(test)]
mod testing;
mod token;
mod user_verification;

pub use authorization::DeviceAuthorizationIssuer;
pub use token::DeviceCodeTokenHandler;
pub use user_verification::DeviceUserVerificationHandler;

/// Form parameter carrying the device code at the token endpoint.
pub const DEVICE_CODE_PARAMETER: &str = "device_code";

/// Form parameter carrying the user code at the verification endpoint.
pub const USER_CODE_PARAMETER: &str = "user_code";

/// Leading characters of a signature, safe to put in logs.
pub(crate) fn signature_prefix(signature: &str) -> &str {
    signature.get(..8).unwrap_or(signature)
}
