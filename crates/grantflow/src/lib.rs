//! # grantflow
//!
//! OAuth 2.0 protocol core: a handler pipeline for the token, authorization
//! and device endpoints, with the grants built on top of it.
//!
//! This crate provides:
//! - The device authorization grant (RFC 8628) with polling rules
//! - Token exchange of access tokens (RFC 8693)
//! - Rich authorization requests (RFC 9396)
//! - HMAC-signed device codes, access tokens and refresh tokens
//!
//! Transport, persistence and client credential checks stay outside; the
//! crate talks to them through the traits in [`storage`].
//!
//! ## Modules
//!
//! - [`config`] - Flow configuration
//! - [`error`] - Protocol errors and their OAuth 2.0 error codes
//! - [`types`] - Request model shared by all endpoints
//! - [`strategy`] - Code and token generation, scope and audience matching
//! - [`storage`] - Storage traits consumed by the handlers
//! - [`pipeline`] - Handler traits and the [`Provider`] that runs them
//! - [`device`] - Device authorization grant handlers
//! - [`rar`] - Authorization details validation handlers
//! - [`exchange`] - Token exchange handler

pub mod config;
pub mod device;
pub mod error;
pub mod exchange;
pub mod pipeline;
pub mod rar;
pub mod storage;
pub mod strategy;
pub mod types;

pub use config::{ConfigError, FlowConfig};
pub use error::{AuthError, ErrorCategory, ErrorResponse};
pub use pipeline::{Provider, ProviderBuilder, compose};
pub use types::{
    AccessRequest, AccessResponse, Client, DeviceAuthorizationRequest, DeviceAuthorizationStatus,
    Form, GrantType, Request, Session,
};

/// Type alias for protocol results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use grantflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{
        AuthorizationDetailsConfig, ConfigError, DeviceConfig, FlowConfig, TokenConfig,
        TokenExchangeConfig,
    };
    pub use crate::error::{AuthError, ErrorCategory, ErrorResponse};
    pub use crate::pipeline::{
        AuthorizeEndpointHandler, DeviceAuthorizationEndpointHandler,
        DeviceAuthorizationValidationHandler, Provider, ProviderBuilder, TokenEndpointHandler,
        UserVerificationEndpointHandler, compose, compose_builder,
    };
    pub use crate::storage::{
        ClientAuthenticator, DeviceCodeStorage, DeviceFlowStorage, StorageTransaction,
        TokenExchangeStorage, TokenStorage, Transactional,
    };
    pub use crate::types::{
        AccessRequest, AccessResponse, Arguments, AuthorizationDetail, AuthorizationDetails,
        AuthorizeRequest, AuthorizeResponse, Client, DeviceAuthorizationRequest,
        DeviceAuthorizationResponse, DeviceAuthorizationStatus, DeviceUserVerificationResponse,
        ExtraMap, ExtraValue, Form, GrantType, Request, Session, TokenKind,
    };
}
