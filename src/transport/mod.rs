//! Outbound HTTP: request descriptions, the credential table and the
//! request stage of the interceptor pair.

pub mod http;
pub mod policy;
pub mod request;

pub use http::HttpTransport;
pub use policy::CredentialPolicy;
pub use request::ApiRequest;
