//! Library exports for prismauth, shared between the binary and tests.

pub mod config;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod session;
pub mod store;
pub mod transport;
pub mod utils;

pub use error::{SessionError, SessionResult};
pub use models::{SessionState, UserRecord};
pub use session::{Redirect, Session};
pub use transport::ApiRequest;
