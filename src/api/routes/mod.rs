//! Route handlers for the REST API
//!
//! - [`resolve`] - batch submission and the progress stream
//! - [`system`] - health and OpenAPI

mod resolve;
mod system;

pub use resolve::*;
pub use system::*;
