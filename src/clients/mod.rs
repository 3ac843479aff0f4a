//! Ways to reach a backend outside of the command flow.
//!
//! - [`ApiClient`] - One-shot requests that return their result directly
//! - `HttpTransport` - reqwest-backed [`Transport`](crate::framework::Transport)
//!   (feature `http`)

pub mod api_client;
#[cfg(feature = "http")]
pub mod http;

pub use api_client::*;
#[cfg(feature = "http")]
pub use http::*;
