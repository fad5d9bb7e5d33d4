pub mod client;

pub use client::{HttpIdentityClient, IdentityEndpoint};
