//! Transport implementations.

mod http;

pub use http::{HttpTransport, RetryPolicy};

// Re-export from traits for convenience
pub use crate::traits::transport::{FetchedPage, SessionToken, Transport};
