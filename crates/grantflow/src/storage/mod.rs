//! Storage traits consumed by the protocol core.
//!
//! This module defines storage interfaces for:
//!
//! - Device and user code sessions
//! - Access and refresh token sessions
//! - Transactions spanning several of the above
//! - Client lookup and authentication
//!
//! # Implementations
//!
//! - `grantflow-memory` - in-memory backend used by tests and embedders

pub mod client;
pub mod device;
pub mod token;
pub mod transaction;

pub use client::ClientAuthenticator;
pub use device::DeviceCodeStorage;
pub use token::TokenStorage;
pub use transaction::{StorageTransaction, Transactional};

/// Storage needed by the device flow handlers.
pub trait DeviceFlowStorage: DeviceCodeStorage + Transactional {}

impl<T: DeviceCodeStorage + Transactional + ?Sized> DeviceFlowStorage for T {}

/// Storage needed by the token exchange handler.
pub trait TokenExchangeStorage: TokenStorage + Transactional {}

impl<T: TokenStorage + Transactional + ?Sized> TokenExchangeStorage for T {}
