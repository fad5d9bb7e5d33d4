pub mod auth;
pub mod bootstrap;
pub mod interceptor;
pub mod persisted;
pub mod store;

// Re-export from auth.rs so we can do "use crate::session::*;"
pub use auth::{Redirect, Session};
pub use interceptor::{decide, Attempt, Decision};
pub use persisted::{PersistedSession, PersistedUser};
pub use store::SessionStore;
