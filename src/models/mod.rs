pub mod session;
pub mod user;

pub use session::SessionState;
pub use user::UserRecord;
