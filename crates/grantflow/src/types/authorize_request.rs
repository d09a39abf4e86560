//! Authorization endpoint requests.

use crate::types::arguments::Arguments;
use crate::types::request::{Request, Requester};

/// A request to the authorization endpoint.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeRequest {
    pub request: Request,
    /// Response types named by `response_type`.
    pub response_types: Arguments,
    pub redirect_uri: Option<url::Url>,
    pub state: String,
}

impl AuthorizeRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Requester for AuthorizeRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }
}
