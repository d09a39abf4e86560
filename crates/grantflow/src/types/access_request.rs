//! Token endpoint requests.

use crate::types::arguments::Arguments;
use crate::types::authorization_details::AuthorizationDetails;
use crate::types::request::{Request, Requester};
use crate::types::session::Session;

/// A request to the token endpoint.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    pub request: Request,
    /// Grant types named by `grant_type`.
    pub grant_types: Arguments,
    /// Grant types a handler has taken responsibility for.
    pub handled_grant_types: Arguments,
}

impl AccessRequest {
    #[must_use]
    pub fn new(session: Session) -> Self {
        let mut request = Request::new();
        request.session = session;
        Self {
            request,
            grant_types: Arguments::new(),
            handled_grant_types: Arguments::new(),
        }
    }

    pub fn set_granted_scopes(&mut self, scopes: Arguments) {
        self.request.granted_scopes = scopes;
    }

    pub fn set_granted_authorization_details(&mut self, details: AuthorizationDetails) {
        self.request.granted_authorization_details = details;
    }

    /// Builds a sanitized copy that carries the identity, scopes and
    /// authorization details of the request a refresh token was issued for.
    #[must_use]
    pub fn sanitize_restore_refresh_token_original_requester(&self, original: &Request) -> Self {
        let mut restored = Self {
            request: self.request.sanitize(&[]),
            grant_types: Arguments::new(),
            handled_grant_types: Arguments::new(),
        };

        restored.request.set_id(original.id());
        restored
            .request
            .set_requested_scopes(original.requested_scopes.clone());
        restored.set_granted_scopes(original.granted_scopes.clone());
        restored.set_granted_authorization_details(original.granted_authorization_details.clone());
        restored.request.requested_authorization_details = AuthorizationDetails::new();
        restored
            .request
            .requested_authorization_details
            .extend_from(&original.requested_authorization_details);
        restored
    }
}

impl Requester for AccessRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::authorization_details::AuthorizationDetail;

    #[test]
    fn test_restore_original_requester() {
        let mut refresh = AccessRequest::new(Session::new("alice"));
        refresh.grant_types.append("refresh_token");
        refresh.request.requested_scopes = ["narrow"].into_iter().collect();
        refresh.request.form.set("refresh_token", "gf_rt_secret");
        refresh.request.form.set("grant_type", "refresh_token");

        let mut original = Request::new();
        original.set_id("original-id");
        original.requested_scopes = ["openid", "offline"].into_iter().collect();
        original.granted_scopes = ["openid"].into_iter().collect();
        original.grant_authorization_detail(AuthorizationDetail::new("payment"));

        let restored = refresh.sanitize_restore_refresh_token_original_requester(&original);

        assert_eq!(restored.request.id(), "original-id");
        assert_eq!(restored.request.requested_scopes.as_slice(), &["openid", "offline"]);
        assert_eq!(restored.request.granted_scopes.as_slice(), &["openid"]);
        assert_eq!(restored.request.granted_authorization_details.len(), 1);
        assert!(!restored.request.form.contains_key("refresh_token"));
        assert_eq!(restored.request.form.get("grant_type"), "refresh_token");
        assert_eq!(restored.request.session.subject, "alice");
    }
}
