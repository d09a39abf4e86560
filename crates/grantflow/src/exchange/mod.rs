//! Token exchange (RFC 8693).
//!
//! [`AccessTokenTypeHandler`] accepts access tokens as `subject_token` or
//! `actor_token`, checks that the calling client may act on them, and issues
//! a new access token carrying the original claims.

mod access_token;

pub use access_token::AccessTokenTypeHandler;

/// Form parameters defined by RFC 8693.
pub mod parameters {
    pub const SUBJECT_TOKEN: &str = "subject_token";
    pub const SUBJECT_TOKEN_TYPE: &str = "subject_token_type";
    pub const ACTOR_TOKEN: &str = "actor_token";
    pub const ACTOR_TOKEN_TYPE: &str = "actor_token_type";
    pub const REQUESTED_TOKEN_TYPE: &str = "requested_token_type";
}
