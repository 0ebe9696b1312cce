//! In-memory session registry with sliding expiration.
//!
//! This crate provides:
//! - [`Session`]: concurrency-safe per-client key/value state that expires
//!   after a window of inactivity
//! - [`SessionRegistry`]: creates, looks up and deletes sessions, and runs a
//!   cancellable background sweep that evicts expired ones
//! - [`SharedDataStore`]: application-wide key/value data with no expiration
//! - [`SessionBinder`]: maps a presented token to a live session on each
//!   request, independent of any transport
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_session::{RegistryConfig, SessionRegistry};
//!
//! let config = RegistryConfig::default()
//!     .with_default_expiration(Duration::from_secs(1800))
//!     .with_sweep_interval(Duration::from_secs(300));
//!
//! let registry = SessionRegistry::start(config);
//! let session = registry.create();
//! session.set("user", "alice");
//!
//! // On shutdown
//! registry.stop().await;
//! ```

mod binding;
mod config;
mod error;
mod registry;
mod session;
mod shared;
mod store;
mod sweep;

pub use binding::{BoundSession, SessionBinder, SessionToken};
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use registry::{MAX_SWEEP_INTERVAL, MIN_SWEEP_INTERVAL, RegistryStats, SessionRegistry};
pub use session::{Session, Value, generate_session_id};
pub use shared::SharedDataStore;
pub use store::{SessionStore, SharedSessionStore};
pub use sweep::SweepStatus;
