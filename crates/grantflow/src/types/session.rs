//! Session state attached to a request.
//!
//! A session travels with every request and is persisted next to each code
//! and token. It records the subject, per-token-kind expiry and free-form
//! claims, plus the token exchange snapshots of the subject and actor tokens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::extra::ExtraMap;

/// Kinds of artifacts whose expiry a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    AccessToken,
    RefreshToken,
    AuthorizeCode,
    IdToken,
    DeviceCode,
    UserCode,
}

impl TokenKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::AuthorizeCode => "authorize_code",
            Self::IdToken => "id_token",
            Self::DeviceCode => "device_code",
            Self::UserCode => "user_code",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The resource owner the request acts for.
    #[serde(default)]
    pub subject: String,

    /// Human-readable name of the subject.
    #[serde(default)]
    pub username: String,

    /// Additional claims to embed in issued tokens.
    #[serde(default)]
    pub extra: ExtraMap,

    #[serde(default)]
    expires_at: BTreeMap<TokenKind, OffsetDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_token: Option<ExtraMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_token: Option<ExtraMap>,
}

impl Session {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Returns the expiry recorded for `kind`, if any.
    #[must_use]
    pub fn expires_at(&self, kind: TokenKind) -> Option<OffsetDateTime> {
        self.expires_at.get(&kind).copied()
    }

    /// Records the expiry for `kind`.
    pub fn set_expires_at(&mut self, kind: TokenKind, at: OffsetDateTime) {
        self.expires_at.insert(kind, at);
    }

    /// Claims snapshot of the token being exchanged.
    #[must_use]
    pub fn subject_token(&self) -> Option<&ExtraMap> {
        self.subject_token.as_ref()
    }

    pub fn set_subject_token(&mut self, claims: ExtraMap) {
        self.subject_token = Some(claims);
    }

    /// Claims snapshot of the acting party's token.
    #[must_use]
    pub fn actor_token(&self) -> Option<&ExtraMap> {
        self.actor_token.as_ref()
    }

    pub fn set_actor_token(&mut self, claims: ExtraMap) {
        self.actor_token = Some(claims);
    }
}
