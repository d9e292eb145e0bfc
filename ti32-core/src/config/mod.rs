//! Device configuration
//!
//! Raw values come from compiled-in constants or from the provisioning
//! partition. They are validated exactly once by [`ConfigStore::load`] and
//! are immutable afterwards.

pub mod error;
pub mod placeholder;
pub mod slot;
pub mod store;
pub mod types;
pub mod url;
pub mod validate;

pub use error::{ConfigError, LengthConstraint, UrlError};
pub use slot::ConfigSlot;
pub use store::ConfigStore;
pub use types::*;
pub use url::{Scheme, ServerUrl};
pub use validate::validate;
