//! Endpoint responses.
//!
//! Each response serializes to the JSON body (or, for authorize responses,
//! the query parameters) the transport sends back to the client.

use serde::{Deserialize, Serialize};

use crate::types::authorization_details::AuthorizationDetails;
use crate::types::extra::{ExtraMap, ExtraValue};
use crate::types::form::Form;

/// Device authorization endpoint response (RFC 8628 section 3.2).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub verification_uri_complete: String,
    /// Remaining lifetime of both codes, in seconds.
    pub expires_in: i64,
    /// Minimum polling interval, in seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub interval: u64,
    #[serde(flatten, default)]
    pub extra: ExtraMap,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Device user verification endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUserVerificationResponse {
    /// `approved` or `denied`.
    pub status: String,
}

/// Token endpoint response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Set by token exchange (RFC 8693 section 2.2.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_token_type: Option<String>,
    #[serde(default, skip_serializing_if = "AuthorizationDetails::is_empty")]
    pub authorization_details: AuthorizationDetails,
    #[serde(flatten, default)]
    pub extra: ExtraMap,
}

impl AccessResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        self.extra.insert(key, value);
    }
}

/// Authorization endpoint response parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeResponse {
    /// Parameters appended to the redirect URI (query or fragment).
    pub parameters: Form,
}

impl AuthorizeResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.add(key, value);
    }
}
