//! Rich authorization request objects (RFC 9396).
//!
//! An [`AuthorizationDetail`] carries the common fields defined by the RFC and
//! an open bag for type-specific members. Equality and validation are
//! delegated to an [`AuthorizationDetailsTypeHandler`] chosen by `type` when
//! the detail is validated; until then the [`DefaultTypeHandler`] applies.

use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::extra::{ExtraMap, ExtraValue};

const DECLARED_FIELDS: [&str; 6] = [
    "type",
    "actions",
    "datatypes",
    "identifier",
    "locations",
    "privileges",
];

/// Per-type equality and validation rules.
pub trait AuthorizationDetailsTypeHandler: Send + Sync + fmt::Debug {
    /// Returns `true` if both details describe the same authorization.
    fn equals(&self, a: &AuthorizationDetail, b: &AuthorizationDetail) -> bool;

    /// Checks a detail of this handler's type.
    ///
    /// # Errors
    ///
    /// The returned error is surfaced to the client unchanged.
    fn validate(&self, detail: &AuthorizationDetail) -> AuthResult<()>;
}

/// Compares the declared fields and ignores the extension bag.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTypeHandler;

impl AuthorizationDetailsTypeHandler for DefaultTypeHandler {
    fn equals(&self, a: &AuthorizationDetail, b: &AuthorizationDetail) -> bool {
        a.detail_type == b.detail_type
            && a.identifier == b.identifier
            && a.actions == b.actions
            && a.datatypes == b.datatypes
            && a.locations == b.locations
            && a.privileges == b.privileges
    }

    fn validate(&self, detail: &AuthorizationDetail) -> AuthResult<()> {
        if detail.detail_type.is_empty() {
            return Err(AuthError::invalid_authorization_details(
                "Missing 'type' in the authorization details object.",
            ));
        }
        Ok(())
    }
}

/// A single `authorization_details` entry.
#[derive(Clone, Default)]
pub struct AuthorizationDetail {
    /// The mandatory `type` member.
    pub detail_type: String,
    pub locations: Vec<String>,
    pub actions: Vec<String>,
    pub datatypes: Vec<String>,
    pub identifier: String,
    pub privileges: Vec<String>,
    /// Members not defined by RFC 9396.
    pub extra: ExtraMap,
    handler: Option<Arc<dyn AuthorizationDetailsTypeHandler>>,
}

impl AuthorizationDetail {
    #[must_use]
    pub fn new(detail_type: impl Into<String>) -> Self {
        Self {
            detail_type: detail_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_actions<I: IntoIterator<Item = S>, S: Into<String>>(mut self, actions: I) -> Self {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_locations<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        locations: I,
    ) -> Self {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Attaches the handler responsible for this detail's type.
    pub fn decorate(&mut self, handler: Arc<dyn AuthorizationDetailsTypeHandler>) {
        self.handler = Some(handler);
    }

    fn handler(&self) -> &dyn AuthorizationDetailsTypeHandler {
        match &self.handler {
            Some(handler) => handler.as_ref(),
            None => &DefaultTypeHandler,
        }
    }

    /// Type-aware equality.
    #[must_use]
    pub fn equals(&self, other: &AuthorizationDetail) -> bool {
        self.handler().equals(self, other)
    }

    /// Validates the detail with its handler.
    ///
    /// # Errors
    ///
    /// Whatever the type handler reports.
    pub fn validate(&self) -> AuthResult<()> {
        self.handler().validate(self)
    }

    fn from_extra(mut map: ExtraMap) -> Self {
        let mut detail = Self {
            detail_type: map.get("type").and_then(ExtraValue::as_str).unwrap_or("").to_string(),
            actions: map.safe_string_slice("actions", &[]),
            datatypes: map.safe_string_slice("datatypes", &[]),
            identifier: map
                .get("identifier")
                .and_then(ExtraValue::as_str)
                .unwrap_or("")
                .to_string(),
            locations: map.safe_string_slice("locations", &[]),
            privileges: map.safe_string_slice("privileges", &[]),
            ..Self::default()
        };
        for field in DECLARED_FIELDS {
            map.remove(field);
        }
        detail.extra = map;
        detail
    }
}

impl fmt::Debug for AuthorizationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationDetail")
            .field("type", &self.detail_type)
            .field("locations", &self.locations)
            .field("actions", &self.actions)
            .field("datatypes", &self.datatypes)
            .field("identifier", &self.identifier)
            .field("privileges", &self.privileges)
            .field("extra", &self.extra)
            .finish()
    }
}

impl Serialize for AuthorizationDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.detail_type)?;
        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }
        if !self.actions.is_empty() {
            map.serialize_entry("actions", &self.actions)?;
        }
        if !self.datatypes.is_empty() {
            map.serialize_entry("datatypes", &self.datatypes)?;
        }
        if !self.identifier.is_empty() {
            map.serialize_entry("identifier", &self.identifier)?;
        }
        if !self.privileges.is_empty() {
            map.serialize_entry("privileges", &self.privileges)?;
        }
        for (key, value) in self.extra.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AuthorizationDetail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ExtraValue::deserialize(deserializer)? {
            ExtraValue::Map(map) => Ok(Self::from_extra(map)),
            _ => Err(D::Error::custom(
                "authorization details entries must be JSON objects",
            )),
        }
    }
}

/// An ordered list of authorization details without duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationDetails(Vec<AuthorizationDetail>);

impl AuthorizationDetails {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `detail` unless an equal detail is already present.
    pub fn append(&mut self, detail: AuthorizationDetail) {
        if !self.0.iter().any(|existing| existing.equals(&detail)) {
            self.0.push(detail);
        }
    }

    pub fn extend_from(&mut self, details: &AuthorizationDetails) {
        for detail in &details.0 {
            self.append(detail.clone());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuthorizationDetail> {
        self.0.iter()
    }

    /// Renders the list as the JSON text sent in `authorization_details`.
    ///
    /// # Errors
    ///
    /// Returns a server error if serialization fails.
    pub fn to_json(&self) -> AuthResult<String> {
        serde_json::to_string(&self.0)
            .map_err(|e| AuthError::server_error_from("failed to encode authorization details", e))
    }
}

impl FromIterator<AuthorizationDetail> for AuthorizationDetails {
    fn from_iter<T: IntoIterator<Item = AuthorizationDetail>>(iter: T) -> Self {
        let mut details = Self::new();
        for detail in iter {
            details.append(detail);
        }
        details
    }
}

impl<'a> IntoIterator for &'a AuthorizationDetails {
    type Item = &'a AuthorizationDetail;
    type IntoIter = std::slice::Iter<'a, AuthorizationDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
