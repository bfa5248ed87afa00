//! Application state for the API server

use crate::Resolver;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; the resolver itself is a bundle of Arcs.
#[derive(Clone)]
pub struct AppState {
    /// The resolver every batch is handed to
    pub resolver: Resolver,
}

impl AppState {
    /// Create a new AppState
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }
}
