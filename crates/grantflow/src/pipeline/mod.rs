//! Handler pipeline.
//!
//! Each endpoint owns an ordered list of handlers. The [`Provider`] builds the
//! request, then walks the list for that endpoint:
//!
//! - a handler that is not responsible answers [`crate::AuthError::UnknownRequest`]
//!   and is skipped
//! - any other error aborts the walk and is returned unchanged
//! - the token endpoint runs a handle phase over every handler, then a
//!   populate phase, so handlers can depend on each other's results
//!
//! Built-in handlers are registered through closed enums such as
//! [`TokenHandler`]; application handlers use their `Custom` variant.

pub mod compose;
mod handler;
pub mod issuer;
mod provider;
pub(crate) mod transaction;

pub use compose::{compose, compose_builder};
pub use handler::{
    AuthorizeEndpoint, AuthorizeEndpointHandler, DeviceAuthorizationEndpointHandler,
    DeviceAuthorizationHandler, DeviceAuthorizationValidationHandler, DeviceAuthorizationValidator,
    TokenEndpointHandler, TokenHandler, UserVerificationEndpointHandler, UserVerificationHandler,
};
pub use issuer::TokenIssuer;
pub use provider::{Provider, ProviderBuilder};
