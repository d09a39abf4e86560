//! Matching predicates for scopes, audiences and authorization detail types.

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::Arguments;

/// Decides whether `needle` is covered by the allowed `haystack`.
pub trait MatchingStrategy: Send + Sync {
    fn matches(&self, haystack: &[String], needle: &str) -> bool;
}

/// Plain string equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatchingStrategy;

impl MatchingStrategy for ExactMatchingStrategy {
    fn matches(&self, haystack: &[String], needle: &str) -> bool {
        haystack.iter().any(|allowed| allowed == needle)
    }
}

/// Validates requested audiences against a client's allowed audiences.
pub trait AudienceStrategy: Send + Sync {
    /// # Errors
    ///
    /// Returns `InvalidRequest` naming the first audience that is not allowed.
    fn validate(&self, allowed: &[String], requested: &Arguments) -> AuthResult<()>;
}

/// Requested audiences must be URLs whose scheme, host, port and path match
/// an allowed audience exactly; the query string is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactAudienceStrategy;

impl AudienceStrategy for ExactAudienceStrategy {
    fn validate(&self, allowed: &[String], requested: &Arguments) -> AuthResult<()> {
        for audience in requested {
            let found = match url::Url::parse(audience) {
                Ok(requested_url) => allowed.iter().any(|a| match url::Url::parse(a) {
                    Ok(allowed_url) => {
                        allowed_url.scheme() == requested_url.scheme()
                            && allowed_url.host_str() == requested_url.host_str()
                            && allowed_url.port_or_known_default()
                                == requested_url.port_or_known_default()
                            && allowed_url.path().trim_end_matches('/')
                                == requested_url.path().trim_end_matches('/')
                    }
                    Err(_) => a == audience,
                }),
                Err(_) => allowed.iter().any(|a| a == audience),
            };
            if !found {
                return Err(AuthError::invalid_request(format!(
                    "Requested audience '{audience}' has not been whitelisted by the OAuth 2.0 Client."
                )));
            }
        }
        Ok(())
    }
}
