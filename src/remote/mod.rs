//! Target workspace API
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `RemoteApi` trait: async interface for every create/attach call
//! - `HttpRemoteApi`: real implementation over the REST API
//! - `MockRemoteApi`: in-memory implementation that records every call

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpRemoteApi;
pub use mock::{MockRemoteApi, RemoteCall};
pub use traits::{ExistingTag, RemoteApi};
