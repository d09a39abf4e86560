//! Value types shared by every endpoint.
//!
//! ## Request model
//!
//! - [`Request`] - the in-flight request common to all endpoints
//! - [`AccessRequest`] - token endpoint request
//! - [`DeviceAuthorizationRequest`] - device flow state, stored per code
//! - [`AuthorizeRequest`] - authorization endpoint request
//!
//! ## Supporting types
//!
//! - [`Arguments`] - deduplicated ordered string sequences
//! - [`Form`] - raw request parameters
//! - [`ExtraMap`] - open extension bags with safe accessors
//! - [`AuthorizationDetail`] - RFC 9396 objects
//! - [`Session`] - subject, expiry and claims carried with a request

pub mod access_request;
pub mod arguments;
pub mod authorization_details;
pub mod authorize_request;
pub mod client;
pub mod device_request;
pub mod extra;
pub mod form;
pub mod request;
pub mod response;
pub mod session;
pub mod token_types;

pub use access_request::AccessRequest;
pub use arguments::Arguments;
pub use authorization_details::{
    AuthorizationDetail, AuthorizationDetails, AuthorizationDetailsTypeHandler, DefaultTypeHandler,
};
pub use authorize_request::AuthorizeRequest;
pub use client::{Client, GrantType};
pub use device_request::{DeviceAuthorizationRequest, DeviceAuthorizationStatus};
pub use extra::{ExtraMap, ExtraValue};
pub use form::Form;
pub use request::{Request, Requester};
pub use response::{
    AccessResponse, AuthorizeResponse, DeviceAuthorizationResponse, DeviceUserVerificationResponse,
};
pub use session::{Session, TokenKind};
