// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod credentials;
pub mod identity;
pub mod logging;
pub mod persistence;
pub mod types;

pub use credentials::*;
pub use identity::*;
pub use logging::*;
pub use persistence::*;
pub use types::*;
