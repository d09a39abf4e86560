//! Access and refresh token issuance shared by grant handlers.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::AuthResult;
use crate::config::TokenConfig;
use crate::pipeline::transaction::storage_failure;
use crate::storage::StorageTransaction;
use crate::types::token_types::BEARER;
use crate::types::{AccessResponse, GrantType, Request, TokenKind};
use crate::strategy::CoreStrategy;

/// Mints tokens for a granted request and stages their sessions.
#[derive(Clone)]
pub struct TokenIssuer {
    strategy: Arc<dyn CoreStrategy>,
    access_token_lifespan: Duration,
    refresh_token_lifespan: Duration,
    refresh_token_scopes: Vec<String>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_token_lifespan", &self.access_token_lifespan)
            .field("refresh_token_lifespan", &self.refresh_token_lifespan)
            .field("refresh_token_scopes", &self.refresh_token_scopes)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(strategy: Arc<dyn CoreStrategy>, config: &TokenConfig) -> Self {
        Self {
            strategy,
            access_token_lifespan: config.access_token_lifespan,
            refresh_token_lifespan: config.refresh_token_lifespan,
            refresh_token_scopes: config.refresh_token_scopes.clone(),
        }
    }

    pub fn strategy(&self) -> &dyn CoreStrategy {
        self.strategy.as_ref()
    }

    pub fn access_token_lifespan(&self) -> Duration {
        self.access_token_lifespan
    }

    /// A refresh token is issued only when one of the configured refresh
    /// scopes was granted (if any are configured) and the client may use the
    /// `refresh_token` grant.
    #[must_use]
    pub fn can_issue_refresh_token(&self, request: &Request) -> bool {
        if !self.refresh_token_scopes.is_empty() {
            let scopes: Vec<&str> = self.refresh_token_scopes.iter().map(String::as_str).collect();
            if !request.granted_scopes.has_one_of(&scopes) {
                return false;
            }
        }
        request
            .client
            .as_ref()
            .is_some_and(|client| client.is_grant_type_allowed(GrantType::RefreshToken))
    }

    /// Stamps the access token expiry on the session, rounded to the second.
    pub fn stamp_access_token_expiry(&self, request: &mut Request) {
        let at = round_to_second(OffsetDateTime::now_utc() + self.access_token_lifespan);
        request.session.set_expires_at(TokenKind::AccessToken, at);
    }

    /// Stamps the refresh token expiry when one will be issued.
    pub fn stamp_refresh_token_expiry(&self, request: &mut Request) {
        if self.can_issue_refresh_token(request) {
            let at = round_to_second(OffsetDateTime::now_utc() + self.refresh_token_lifespan);
            request.session.set_expires_at(TokenKind::RefreshToken, at);
        }
    }

    /// Generates the tokens for `request`, stages their sessions in `tx` and
    /// writes them to `response`.
    ///
    /// Sessions are stored sanitized so that request parameters such as
    /// codes and secrets never reach the token store.
    ///
    /// # Errors
    ///
    /// Generation and storage failures are reported as server errors.
    pub async fn issue(
        &self,
        ctx: &CancellationToken,
        tx: &mut dyn StorageTransaction,
        request: &mut Request,
        response: &mut AccessResponse,
    ) -> AuthResult<()> {
        self.stamp_access_token_expiry(request);
        let (access_token, access_signature) = self.strategy.generate_access_token(request)?;

        let refresh = if self.can_issue_refresh_token(request) {
            self.stamp_refresh_token_expiry(request);
            Some(self.strategy.generate_refresh_token(request)?)
        } else {
            None
        };

        let stored = request.sanitize(&[]);
        tx.create_access_token_session(ctx, &access_signature, &stored)
            .await
            .map_err(storage_failure)?;

        if let Some((_, refresh_signature)) = &refresh {
            tx.create_refresh_token_session(ctx, refresh_signature, &stored)
                .await
                .map_err(storage_failure)?;
        }

        response.access_token = access_token;
        response.token_type = BEARER.to_string();
        response.expires_in = Some(self.expires_in(request, TokenKind::AccessToken));
        response.scope = (!request.granted_scopes.is_empty())
            .then(|| request.granted_scopes.to_space_delimited());
        response.refresh_token = refresh.map(|(token, _)| token);
        Ok(())
    }

    fn expires_in(&self, request: &Request, kind: TokenKind) -> i64 {
        match request.session.expires_at(kind) {
            Some(at) => (at - OffsetDateTime::now_utc()).whole_seconds().max(0),
            None => i64::try_from(self.access_token_lifespan.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

pub(crate) fn round_to_second(at: OffsetDateTime) -> OffsetDateTime {
    let rounded = at.replace_nanosecond(0).unwrap_or(at);
    if at.nanosecond() >= 500_000_000 {
        rounded + time::Duration::SECOND
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::HmacCoreStrategy;
    use crate::types::Client;

    const SECRET: &[u8] = b"foobarfoobarfoobarfoobarfoobarfoobarfoobarfoobar";

    fn issuer(refresh_scopes: &[&str]) -> TokenIssuer {
        let config = TokenConfig {
            refresh_token_scopes: refresh_scopes.iter().map(ToString::to_string).collect(),
            ..TokenConfig::default()
        };
        let strategy = HmacCoreStrategy::new(
            SECRET,
            config.access_token_lifespan,
            config.refresh_token_lifespan,
        )
        .unwrap();
        TokenIssuer::new(Arc::new(strategy), &config)
    }

    fn request(grants: Vec<GrantType>, scopes: &[&str]) -> Request {
        let mut request = Request::new();
        request.client = Some(Client::new("tv", grants));
        for scope in scopes {
            request.grant_scope(*scope);
        }
        request
    }

    #[test]
    fn test_refresh_requires_offline_scope() {
        let issuer = issuer(&["offline"]);
        let grants = vec![GrantType::DeviceCode, GrantType::RefreshToken];

        assert!(!issuer.can_issue_refresh_token(&request(grants.clone(), &["openid"])));
        assert!(issuer.can_issue_refresh_token(&request(grants, &["openid", "offline"])));
    }

    #[test]
    fn test_refresh_requires_grant_type() {
        let issuer = issuer(&[]);
        assert!(!issuer.can_issue_refresh_token(&request(vec![GrantType::DeviceCode], &[])));
        assert!(issuer.can_issue_refresh_token(&request(vec![GrantType::RefreshToken], &[])));
    }

    #[test]
    fn test_refresh_without_client() {
        let issuer = issuer(&[]);
        assert!(!issuer.can_issue_refresh_token(&Request::new()));
    }

    #[test]
    fn test_round_to_second() {
        let base = OffsetDateTime::UNIX_EPOCH;
        let down = base + time::Duration::milliseconds(1_400);
        let up = base + time::Duration::milliseconds(1_600);
        assert_eq!(round_to_second(down), base + time::Duration::SECOND);
        assert_eq!(round_to_second(up), base + time::Duration::seconds(2));
    }
}
