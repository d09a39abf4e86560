//! Wiring of the built-in handlers.

use std::sync::Arc;

use crate::config::{ConfigError, FlowConfig};
use crate::device::{DeviceAuthorizationIssuer, DeviceCodeTokenHandler, DeviceUserVerificationHandler};
use crate::exchange::AccessTokenTypeHandler;
use crate::pipeline::handler::{
    AuthorizeEndpoint, DeviceAuthorizationHandler, DeviceAuthorizationValidator, TokenHandler,
    UserVerificationHandler,
};
use crate::pipeline::issuer::TokenIssuer;
use crate::pipeline::provider::{Provider, ProviderBuilder};
use crate::rar::{AuthorizationDetailsPolicy, AuthorizeHandler, TokenRequestHandler, TokenResponseHandler};
use crate::storage::{ClientAuthenticator, DeviceFlowStorage, TokenExchangeStorage};
use crate::strategy::{
    AudienceStrategy, DefaultDeviceStrategy, ExactAudienceStrategy, ExactMatchingStrategy,
    HmacCoreStrategy, MatchingStrategy,
};

/// Builds a [`Provider`] with every built-in handler registered.
///
/// Token handlers run in this order: device code, token exchange, then the
/// authorization details request and response handlers.
///
/// # Errors
///
/// Returns a [`ConfigError`] if `config` is invalid or `secret` is too short.
pub fn compose<S>(
    config: FlowConfig,
    secret: &[u8],
    storage: Arc<S>,
    clients: Arc<dyn ClientAuthenticator>,
) -> Result<Provider, ConfigError>
where
    S: DeviceFlowStorage + TokenExchangeStorage + 'static,
{
    Ok(compose_builder(config, secret, storage, clients)?.build())
}

/// Like [`compose`] but returns the builder so callers can append their own
/// handlers or swap strategies.
///
/// # Errors
///
/// Same as [`compose`].
pub fn compose_builder<S>(
    config: FlowConfig,
    secret: &[u8],
    storage: Arc<S>,
    clients: Arc<dyn ClientAuthenticator>,
) -> Result<ProviderBuilder, ConfigError>
where
    S: DeviceFlowStorage + TokenExchangeStorage + 'static,
{
    config.validate()?;

    let device_strategy = Arc::new(DefaultDeviceStrategy::new(
        secret,
        config.device.code_lifespan,
    )?);
    let core_strategy = Arc::new(HmacCoreStrategy::new(
        secret,
        config.token.access_token_lifespan,
        config.token.refresh_token_lifespan,
    )?);
    let issuer = TokenIssuer::new(core_strategy, &config.token);
    let scope_strategy: Arc<dyn MatchingStrategy> = Arc::new(ExactMatchingStrategy);
    let audience_strategy: Arc<dyn AudienceStrategy> = Arc::new(ExactAudienceStrategy);
    let policy = Arc::new(
        AuthorizationDetailsPolicy::new(&config.authorization_details)
            .with_matching_strategy(scope_strategy.clone()),
    );
    let rar_authorize = Arc::new(AuthorizeHandler::new(policy.clone()));

    let device_token = DeviceCodeTokenHandler::new(
        storage.clone(),
        device_strategy.clone(),
        issuer.clone(),
        config.device.polling_interval,
    );
    let exchange = AccessTokenTypeHandler::new(
        storage.clone(),
        issuer,
        scope_strategy.clone(),
        audience_strategy.clone(),
        config.token_exchange.default_requested_token_type.clone(),
    );
    let device_issuer =
        DeviceAuthorizationIssuer::new(storage.clone(), device_strategy.clone(), config.device.clone());
    let verification = DeviceUserVerificationHandler::new(storage, device_strategy);

    let builder = Provider::builder(Arc::new(config), clients)
        .scope_strategy(scope_strategy)
        .audience_strategy(audience_strategy)
        .token_handler(TokenHandler::DeviceCode(Arc::new(device_token)))
        .token_handler(TokenHandler::TokenExchange(Arc::new(exchange)))
        .token_handler(TokenHandler::AuthorizationDetailsRequest(Arc::new(
            TokenRequestHandler::new(policy),
        )))
        .token_handler(TokenHandler::AuthorizationDetailsResponse(Arc::new(
            TokenResponseHandler::new(),
        )))
        .device_authorization_handler(DeviceAuthorizationHandler::Issuer(Arc::new(device_issuer)))
        .device_authorization_validator(DeviceAuthorizationValidator::AuthorizationDetails(
            rar_authorize.clone(),
        ))
        .user_verification_handler(UserVerificationHandler::DeviceUserVerification(Arc::new(
            verification,
        )))
        .authorize_handler(AuthorizeEndpoint::AuthorizationDetails(rar_authorize));

    tracing::debug!("composed provider with built-in handlers");
    Ok(builder)
}
