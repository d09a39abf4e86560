//! Rich authorization requests (RFC 9396).
//!
//! [`AuthorizationDetailsPolicy`] parses and validates the
//! `authorization_details` parameter. The handlers plug that validation into
//! the authorization, device authorization and token endpoints, and echo the
//! granted details back to the client.

mod handlers;
mod policy;

pub use handlers::{AuthorizeHandler, TokenRequestHandler, TokenResponseHandler};
pub use policy::{AUTHORIZATION_DETAILS_PARAMETER, AuthorizationDetailsPolicy};
