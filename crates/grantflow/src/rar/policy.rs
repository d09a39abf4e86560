//! Validation of the `authorization_details` request parameter.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::AuthResult;
use crate::config::AuthorizationDetailsConfig;
use crate::error::AuthError;
use crate::strategy::{ExactMatchingStrategy, MatchingStrategy};
use crate::types::{
    AuthorizationDetail, AuthorizationDetailsTypeHandler, DefaultTypeHandler, Request,
};

/// Form parameter carrying the serialized details.
pub const AUTHORIZATION_DETAILS_PARAMETER: &str = "authorization_details";

/// Which detail types are accepted, how they are compared and validated, and
/// how client allow-lists are matched.
#[derive(Clone)]
pub struct AuthorizationDetailsPolicy {
    supported_types: Vec<String>,
    ignore_unknown_types: bool,
    type_handlers: HashMap<String, Arc<dyn AuthorizationDetailsTypeHandler>>,
    default_handler: Arc<dyn AuthorizationDetailsTypeHandler>,
    matching: Arc<dyn MatchingStrategy>,
}

impl fmt::Debug for AuthorizationDetailsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handled: Vec<&String> = self.type_handlers.keys().collect();
        handled.sort();
        f.debug_struct("AuthorizationDetailsPolicy")
            .field("supported_types", &self.supported_types)
            .field("ignore_unknown_types", &self.ignore_unknown_types)
            .field("type_handlers", &handled)
            .finish_non_exhaustive()
    }
}

impl Default for AuthorizationDetailsPolicy {
    fn default() -> Self {
        Self::new(&AuthorizationDetailsConfig::default())
    }
}

impl AuthorizationDetailsPolicy {
    #[must_use]
    pub fn new(config: &AuthorizationDetailsConfig) -> Self {
        Self {
            supported_types: config.supported_types.clone(),
            ignore_unknown_types: config.ignore_unknown_types,
            type_handlers: HashMap::new(),
            default_handler: Arc::new(DefaultTypeHandler),
            matching: Arc::new(ExactMatchingStrategy),
        }
    }

    /// Registers the handler used for details of `detail_type`.
    #[must_use]
    pub fn with_type_handler(
        mut self,
        detail_type: impl Into<String>,
        handler: Arc<dyn AuthorizationDetailsTypeHandler>,
    ) -> Self {
        self.type_handlers.insert(detail_type.into(), handler);
        self
    }

    /// Replaces the strategy matching requested types against a client's
    /// allowed types.
    #[must_use]
    pub fn with_matching_strategy(mut self, matching: Arc<dyn MatchingStrategy>) -> Self {
        self.matching = matching;
        self
    }

    #[must_use]
    pub fn is_supported(&self, detail_type: &str) -> bool {
        self.supported_types.iter().any(|t| t == detail_type)
    }

    pub fn ignore_unknown_types(&self) -> bool {
        self.ignore_unknown_types
    }

    /// Returns the handler for `detail_type`, falling back to the default.
    #[must_use]
    pub fn handler_for(&self, detail_type: &str) -> Arc<dyn AuthorizationDetailsTypeHandler> {
        self.type_handlers
            .get(detail_type)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_handler))
    }

    /// Parses `param`, validates every entry and appends the survivors to the
    /// request's requested details.
    ///
    /// An empty parameter is accepted and leaves the request unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidAuthorizationDetails` for malformed JSON, a missing `type`,
    ///   or an unsupported type when unknown types are not ignored
    /// - `InvalidScope` when the client may not request the type
    /// - whatever the type handler reports for an invalid entry
    pub fn validate_and_enrich(&self, request: &mut Request, param: &str) -> AuthResult<()> {
        if param.is_empty() {
            return Ok(());
        }

        let details: Vec<AuthorizationDetail> = serde_json::from_str(param).map_err(|e| {
            tracing::debug!(error = %e, "authorization_details is not valid JSON");
            AuthError::invalid_authorization_details("Invalid authorization_details value.")
        })?;

        let mut accepted = Vec::with_capacity(details.len());
        for mut detail in details {
            if detail.detail_type.is_empty() {
                return Err(AuthError::invalid_authorization_details(
                    "Missing 'type' in the authorization details object.",
                ));
            }

            if !self.is_supported(&detail.detail_type) {
                if self.ignore_unknown_types {
                    tracing::debug!(
                        detail_type = %detail.detail_type,
                        "dropping unsupported authorization detail type"
                    );
                    continue;
                }
                return Err(AuthError::invalid_authorization_details(format!(
                    "Unknown authorization detail type {}",
                    detail.detail_type
                )));
            }

            if let Some(client) = &request.client
                && !self
                    .matching
                    .matches(&client.authorization_detail_types, &detail.detail_type)
            {
                return Err(AuthError::invalid_scope(format!(
                    "The OAuth 2.0 Client is not allowed to request authorization details of type '{}'.",
                    detail.detail_type
                )));
            }

            detail.decorate(self.handler_for(&detail.detail_type));
            detail.validate()?;
            accepted.push(detail);
        }

        for detail in accepted {
            request.append_requested_authorization_detail(detail);
        }
        Ok(())
    }
}
