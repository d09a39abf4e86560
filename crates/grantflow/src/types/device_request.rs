//! Device authorization requests (RFC 8628).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::request::{Request, Requester};

/// Lifecycle of a device authorization.
///
/// A device authorization starts `New` and is moved exactly once to either
/// `Approved` or `Denied` by the end user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAuthorizationStatus {
    #[default]
    New,
    Approved,
    Denied,
}

impl DeviceAuthorizationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for DeviceAuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device authorization as stored under both its device-code and
/// user-code signatures.
#[derive(Debug, Clone, Default)]
pub struct DeviceAuthorizationRequest {
    pub request: Request,
    pub device_code_signature: String,
    pub user_code_signature: String,
    pub status: DeviceAuthorizationStatus,
    /// Last time the device polled the token endpoint.
    pub last_checked: Option<OffsetDateTime>,
}

impl DeviceAuthorizationRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `other` into this request, including the device-specific fields.
    pub fn merge(&mut self, other: &DeviceAuthorizationRequest) {
        self.request.merge(&other.request);
        self.status = other.status;
        self.device_code_signature = other.device_code_signature.clone();
        self.user_code_signature = other.user_code_signature.clone();
        self.last_checked = other.last_checked;
    }
}

impl Requester for DeviceAuthorizationRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }
}
