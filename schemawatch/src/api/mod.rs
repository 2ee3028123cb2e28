//! Clients for the remote schema-review service.
//!
//! Provides a trait-based interface over the service's three operations:
//! - HTTP implementation backed by reqwest
//! - Mock implementation for testing

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpReviewApi;
pub use mock::MockReviewApi;
pub use traits::{ApiError, SchemaChange, SchemaReviewApi, TableDetails};
