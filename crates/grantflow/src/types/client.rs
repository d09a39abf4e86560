//! OAuth 2.0 client registrations.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    /// Authorization Code flow.
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    /// Implicit flow; needed to echo authorization details on authorize responses.
    #[serde(rename = "implicit")]
    Implicit,
    /// Client Credentials flow.
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    /// Refresh Token flow.
    #[serde(rename = "refresh_token")]
    RefreshToken,
    /// Resource Owner Password Credentials flow.
    #[serde(rename = "password")]
    Password,
    /// Device Authorization Grant (RFC 8628).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,
    /// Token Exchange (RFC 8693).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:token-exchange")]
    TokenExchange,
    /// JWT Bearer assertion grant (RFC 7523).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::Password => "password",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered client as seen by the protocol core.
///
/// Credentials are not part of this type; authentication is the job of the
/// [`crate::storage::ClientAuthenticator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub client_id: String,

    /// Grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// Scopes this client is allowed to request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Audiences this client is allowed to request.
    #[serde(default)]
    pub audience: Vec<String>,

    /// Authorization detail types this client is allowed to request.
    #[serde(default)]
    pub authorization_detail_types: Vec<String>,

    /// Clients that may exchange tokens issued to this client.
    #[serde(default)]
    pub token_exchange_allowed_clients: Vec<String>,

    /// Public clients hold no secret.
    #[serde(default)]
    pub public: bool,
}

impl Client {
    /// Creates a client allowed to use the given grant types.
    #[must_use]
    pub fn new(client_id: impl Into<String>, grant_types: Vec<GrantType>) -> Self {
        Self {
            client_id: client_id.into(),
            grant_types,
            scopes: Vec::new(),
            audience: Vec::new(),
            authorization_detail_types: Vec::new(),
            token_exchange_allowed_clients: Vec::new(),
            public: false,
        }
    }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_audience<I, S>(mut self, audience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = audience.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_authorization_detail_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorization_detail_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_token_exchange_allowed_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_exchange_allowed_clients = clients.into_iter().map(Into::into).collect();
        self
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns `true` if `other` may exchange tokens issued to this client.
    #[must_use]
    pub fn token_exchange_allowed(&self, other: &Client) -> bool {
        self.token_exchange_allowed_clients
            .iter()
            .any(|id| id == &other.client_id)
    }
}
