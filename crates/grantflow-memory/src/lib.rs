//! In-memory storage backend for grantflow.
//!
//! [`MemoryStore`] implements every storage trait the protocol core consumes,
//! including transactions: writes made through a [`MemoryTransaction`] are
//! staged and applied under a single write lock on commit.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use grantflow::{FlowConfig, compose};
//! use grantflow_memory::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let provider = compose(FlowConfig::default(), &secret, store.clone(), store)?;
//! ```

mod clients;
pub mod store;
pub mod transaction;

pub use store::{FailurePoint, MemoryStore, StoreStats};
pub use transaction::MemoryTransaction;
