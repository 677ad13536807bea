//! Control-plane client.
//!
//! - [`Transport`] is the seam between retry logic and the network; [`HttpTransport`] is the
//!   production implementation.
//! - [`ApiClient`] wraps a transport with the deterministic [`ghr_model::RetryPolicy`].
//! - [`Endpoints`] derives every control-plane URL from a [`ghr_model::TargetRef`].
mod error;
pub use error::ApiError;

mod transport;
pub use transport::{ApiRequest, Method, RawResponse, RequestKind, Transport};

mod http;
pub use http::HttpTransport;

mod client;
pub use client::{ApiClient, ApiResponse};

mod endpoints;
pub use endpoints::{Endpoints, LATEST_RELEASE_URL, RUNNERS_PAGE_SIZE};

#[cfg(feature = "mock")]
pub mod mock;
