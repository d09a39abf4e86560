//! The in-flight request model shared by every endpoint.

use std::sync::OnceLock;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::arguments::Arguments;
use crate::types::authorization_details::{AuthorizationDetail, AuthorizationDetails};
use crate::types::client::Client;
use crate::types::form::Form;
use crate::types::session::Session;

/// Form keys that survive [`Request::sanitize`] regardless of the allow-list.
pub const DEFAULT_ALLOWED_PARAMETERS: [&str; 4] =
    ["grant_type", "response_type", "scope", "client_id"];

/// An authorization or token request.
#[derive(Debug, Clone)]
pub struct Request {
    id: OnceLock<String>,
    pub requested_at: OffsetDateTime,
    pub client: Option<Client>,
    pub requested_scopes: Arguments,
    pub granted_scopes: Arguments,
    pub requested_audience: Arguments,
    pub granted_audience: Arguments,
    pub requested_authorization_details: AuthorizationDetails,
    pub granted_authorization_details: AuthorizationDetails,
    pub form: Form,
    pub session: Session,
    /// Preferred language tag of the end user.
    pub lang: String,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Creates an empty request stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: OnceLock::new(),
            requested_at: OffsetDateTime::now_utc(),
            client: None,
            requested_scopes: Arguments::new(),
            granted_scopes: Arguments::new(),
            requested_audience: Arguments::new(),
            granted_audience: Arguments::new(),
            requested_authorization_details: AuthorizationDetails::new(),
            granted_authorization_details: AuthorizationDetails::new(),
            form: Form::new(),
            session: Session::default(),
            lang: String::new(),
        }
    }

    /// Returns the request identifier, generating one on first access.
    pub fn id(&self) -> &str {
        self.id.get_or_init(|| Uuid::new_v4().to_string())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = OnceLock::from(id.into());
    }

    /// Returns the client or a server error when none was attached.
    ///
    /// # Errors
    ///
    /// A request reaching a handler without a client is a wiring bug.
    pub fn client(&self) -> AuthResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| AuthError::server_error("request has no client attached"))
    }

    pub fn set_requested_scopes(&mut self, scopes: Arguments) {
        self.requested_scopes = Arguments::new();
        self.requested_scopes.extend_from(scopes.iter().cloned());
    }

    pub fn grant_scope(&mut self, scope: impl Into<String>) {
        self.granted_scopes.append(scope);
    }

    pub fn grant_audience(&mut self, audience: impl Into<String>) {
        self.granted_audience.append(audience);
    }

    pub fn append_requested_authorization_detail(&mut self, detail: AuthorizationDetail) {
        self.requested_authorization_details.append(detail);
    }

    pub fn grant_authorization_detail(&mut self, detail: AuthorizationDetail) {
        self.granted_authorization_details.append(detail);
    }

    /// Folds `other` into this request.
    ///
    /// Scopes, audiences and authorization details are unioned; identifier,
    /// timestamp, client and session are taken from `other`; form keys from
    /// `other` replace existing ones.
    pub fn merge(&mut self, other: &Request) {
        self.requested_scopes
            .extend_from(other.requested_scopes.iter().cloned());
        self.granted_scopes.extend_from(other.granted_scopes.iter().cloned());
        self.requested_audience
            .extend_from(other.requested_audience.iter().cloned());
        self.granted_audience
            .extend_from(other.granted_audience.iter().cloned());
        self.requested_authorization_details
            .extend_from(&other.requested_authorization_details);
        self.granted_authorization_details
            .extend_from(&other.granted_authorization_details);

        self.set_id(other.id());
        self.requested_at = other.requested_at;
        self.client = other.client.clone();
        self.session = other.session.clone();
        self.form.merge_from(&other.form);
    }

    /// Returns a copy that keeps only `allowed` form keys plus
    /// [`DEFAULT_ALLOWED_PARAMETERS`].
    ///
    /// The identifier is materialized first so the copy and the original agree.
    #[must_use]
    pub fn sanitize(&self, allowed: &[&str]) -> Request {
        let mut copy = self.clone();
        copy.set_id(self.id());
        copy.form.retain(|key| {
            allowed.contains(&key) || DEFAULT_ALLOWED_PARAMETERS.contains(&key)
        });
        copy
    }
}

/// Access to the shared [`Request`] inside endpoint-specific request types.
pub trait Requester {
    fn request(&self) -> &Request;
    fn request_mut(&mut self) -> &mut Request;
}

impl Requester for Request {
    fn request(&self) -> &Request {
        self
    }

    fn request_mut(&mut self) -> &mut Request {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::client::GrantType;

    fn sample() -> Request {
        let mut req = Request::new();
        req.client = Some(Client::new("tv", vec![GrantType::DeviceCode]));
        req.requested_scopes = ["openid", "offline"].into_iter().collect();
        req.form.set("client_id", "tv");
        req.form.set("client_secret", "s3cr3t");
        req.form.set("device_code", "gf_dc_x");
        req
    }

    #[test]
    fn test_id_is_stable() {
        let req = Request::new();
        let first = req.id().to_string();
        assert_eq!(req.id(), first);

        let mut req = Request::new();
        req.set_id("fixed");
        assert_eq!(req.id(), "fixed");
    }

    #[test]
    fn test_merge() {
        let mut target = Request::new();
        target.requested_scopes.append("profile");
        target.form.set("client_id", "old");
        target.form.set("keep", "1");

        let mut source = sample();
        source.granted_scopes.append("openid");
        source.session.subject = "alice".to_string();
        source.grant_authorization_detail(AuthorizationDetail::new("payment"));

        target.merge(&source);

        assert_eq!(target.id(), source.id());
        assert_eq!(target.requested_at, source.requested_at);
        assert_eq!(target.session.subject, "alice");
        assert_eq!(target.client().unwrap().client_id, "tv");
        assert_eq!(
            target.requested_scopes.as_slice(),
            &["profile", "openid", "offline"]
        );
        assert!(target.granted_scopes.has(&["openid"]));
        assert_eq!(target.granted_authorization_details.len(), 1);
        assert_eq!(target.form.get("client_id"), "tv");
        assert_eq!(target.form.get("keep"), "1");
    }

    #[test]
    fn test_sanitize() {
        let req = sample();
        let clean = req.sanitize(&["device_code"]);

        assert_eq!(clean.id(), req.id());
        assert_eq!(clean.form.get("client_id"), "tv");
        assert_eq!(clean.form.get("device_code"), "gf_dc_x");
        assert!(!clean.form.contains_key("client_secret"));
        // original untouched
        assert_eq!(req.form.get("client_secret"), "s3cr3t");
    }

    #[test]
    fn test_client_missing_is_server_error() {
        let req = Request::new();
        assert!(req.client().unwrap_err().is_server_error());
    }
}
