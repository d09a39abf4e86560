//! Protocol error types.
//!
//! Every failure a handler, strategy or storage backend can report is an
//! [`AuthError`]. Each variant maps to exactly one OAuth 2.0 error code, and
//! [`AuthError::to_response`] renders the body a transport layer would send.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Boxed cause attached to server errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while processing authorization and token requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The handler is not responsible for this request.
    ///
    /// The orchestrator swallows this outcome and moves on to the next handler.
    #[error("The handler is not responsible for this request")]
    UnknownRequest,

    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Client authentication failed or the client is unknown.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The grant (device code, user code, token) is invalid, expired or revoked.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested scope is invalid, unknown, or not allowed for the client.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The `authorization_details` parameter is malformed or unsupported.
    #[error("Invalid authorization details: {message}")]
    InvalidAuthorizationDetails {
        /// Description of the offending detail.
        message: String,
    },

    /// The client is not allowed to use this grant type.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of the missing permission.
        message: String,
    },

    /// The request is understood but refused.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why the request is forbidden.
        message: String,
    },

    /// The end user has not yet approved or denied the device authorization.
    #[error("The authorization request is still pending")]
    AuthorizationPending,

    /// The device is polling faster than the configured interval allows.
    #[error("The client is polling too quickly and should slow down")]
    SlowDown,

    /// The resource owner denied the request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The code or token is past its expiry.
    #[error("Expired token: {message}")]
    ExpiredToken {
        /// Description naming the expired artifact.
        message: String,
        /// The instant the artifact expired.
        expired_at: OffsetDateTime,
    },

    /// A storage lookup found no record.
    ///
    /// Only storage backends return this; handlers translate it into a
    /// protocol error before it reaches a client.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of the missing record.
        message: String,
    },

    /// A transaction read a record that another writer changed before the
    /// transaction committed. Nothing was applied.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflicting record.
        message: String,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// An unexpected condition prevented the request from being fulfilled.
    #[error("Server error: {message}")]
    ServerError {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidAuthorizationDetails` error.
    #[must_use]
    pub fn invalid_authorization_details(message: impl Into<String>) -> Self {
        Self::InvalidAuthorizationDetails {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `ExpiredToken` error.
    #[must_use]
    pub fn expired_token(message: impl Into<String>, expired_at: OffsetDateTime) -> Self {
        Self::ExpiredToken {
            message: message.into(),
            expired_at,
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `ServerError` without an underlying cause.
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::ServerError {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an arbitrary error as a `ServerError`.
    #[must_use]
    pub fn server_error_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ServerError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` for the handler-not-responsible outcome.
    #[must_use]
    pub fn is_unknown_request(&self) -> bool {
        matches!(self, Self::UnknownRequest)
    }

    /// Returns `true` if a storage lookup found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if a commit lost against a concurrent writer.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidGrant { .. }
                | Self::InvalidScope { .. }
                | Self::InvalidAuthorizationDetails { .. }
                | Self::UnauthorizedClient { .. }
                | Self::Forbidden { .. }
                | Self::AuthorizationPending
                | Self::SlowDown
                | Self::AccessDenied { .. }
                | Self::ExpiredToken { .. }
                | Self::NotFound { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::ServerError { .. }
                | Self::Conflict { .. }
                | Self::Cancelled
                | Self::UnknownRequest
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownRequest => ErrorCategory::Dispatch,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::InvalidClient { .. } => ErrorCategory::Authentication,
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::InvalidAuthorizationDetails { .. } => ErrorCategory::Validation,
            Self::UnauthorizedClient { .. } => ErrorCategory::Authorization,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::AuthorizationPending => ErrorCategory::Polling,
            Self::SlowDown => ErrorCategory::Polling,
            Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::ExpiredToken { .. } => ErrorCategory::Grant,
            Self::NotFound { .. } | Self::Conflict { .. } => ErrorCategory::Storage,
            Self::Cancelled => ErrorCategory::Internal,
            Self::ServerError { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnknownRequest => "server_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidAuthorizationDetails { .. } => "invalid_authorization_details",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::Forbidden { .. } => "request_forbidden",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied { .. } => "access_denied",
            Self::ExpiredToken { .. } => "expired_token",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "server_error",
            Self::Cancelled => "server_error",
            Self::ServerError { .. } => "server_error",
        }
    }

    /// Returns the HTTP status a transport should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidClient { .. } => 401,
            Self::Forbidden { .. } | Self::AccessDenied { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::UnknownRequest
            | Self::Conflict { .. }
            | Self::Cancelled
            | Self::ServerError { .. } => 500,
            _ => 400,
        }
    }

    /// Generic, client-safe description of the error kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownRequest => "The handler is not responsible for this request.",
            Self::InvalidRequest { .. } => {
                "The request is missing a required parameter, includes an invalid parameter value, includes a parameter more than once, or is otherwise malformed."
            }
            Self::InvalidClient { .. } => {
                "Client authentication failed (e.g., unknown client, no client authentication included, or unsupported authentication method)."
            }
            Self::InvalidGrant { .. } => {
                "The provided authorization grant or refresh token is invalid, expired, revoked, does not match the redirection URI used in the authorization request, or was issued to another client."
            }
            Self::InvalidScope { .. } => {
                "The requested scope is invalid, unknown, or malformed."
            }
            Self::InvalidAuthorizationDetails { .. } => {
                "The authorization details contain an unknown authorization details type value, an object of known type but containing or missing fields, or an object of known type that is not allowed for the client."
            }
            Self::UnauthorizedClient { .. } => {
                "The client is not authorized to request a token using this method."
            }
            Self::Forbidden { .. } => "The request is not allowed.",
            Self::AuthorizationPending => {
                "The authorization request is still pending as the end user hasn't yet completed the user-interaction steps."
            }
            Self::SlowDown => {
                "The authorization request was rate-limited to prevent system overload."
            }
            Self::AccessDenied { .. } => {
                "The resource owner or authorization server denied the request."
            }
            Self::ExpiredToken { .. } => {
                "The device_code has expired, and the device authorization session has concluded."
            }
            Self::NotFound { .. } => "Could not find the requested resource(s).",
            Self::Conflict { .. } | Self::Cancelled | Self::ServerError { .. } => {
                "The authorization server encountered an unexpected condition that prevented it from fulfilling the request."
            }
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::InvalidScope { message }
            | Self::InvalidAuthorizationDetails { message }
            | Self::UnauthorizedClient { message }
            | Self::Forbidden { message }
            | Self::AccessDenied { message }
            | Self::ExpiredToken { message, .. }
            | Self::NotFound { message } => Some(message.clone()),
            _ => None,
        }
    }

    fn debug_detail(&self) -> Option<String> {
        match self {
            Self::ServerError { message, source } => Some(match source {
                Some(source) => format!("{message}: {source}"),
                None => message.clone(),
            }),
            Self::Conflict { message } => Some(message.clone()),
            Self::Cancelled => Some("the operation was cancelled".to_string()),
            _ => None,
        }
    }

    /// Renders the error body.
    ///
    /// Server-side detail is only included when `expose_debug` is set; client
    /// errors always carry their hint.
    #[must_use]
    pub fn to_response(&self, expose_debug: bool) -> ErrorResponse {
        ErrorResponse {
            error: self.oauth_error_code().to_string(),
            error_description: self.description().to_string(),
            error_hint: self.hint(),
            error_debug: if expose_debug {
                self.debug_detail()
            } else {
                None
            },
        }
    }
}

/// Error body as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// OAuth 2.0 error code.
    pub error: String,
    /// Generic description of the error kind.
    pub error_description: String,
    /// Request-specific hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_hint: Option<String>,
    /// Server-side detail, only present when debug exposure is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_debug: Option<String>,
}

/// Categories of protocol errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Handler dispatch outcomes.
    Dispatch,
    /// Malformed requests.
    Validation,
    /// Client authentication failures.
    Authentication,
    /// Permission and scope checks.
    Authorization,
    /// Invalid or expired grants.
    Grant,
    /// Device polling outcomes.
    Polling,
    /// Storage lookups.
    Storage,
    /// Unexpected internal failures.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => write!(f, "dispatch"),
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Grant => write!(f, "grant"),
            Self::Polling => write!(f, "polling"),
            Self::Storage => write!(f, "storage"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
