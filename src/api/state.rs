//! Application state for the API server

use crate::{AttachmentManager, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the manager instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The attachment manager serving all notification operations
    pub manager: Arc<AttachmentManager>,

    /// Configuration (read-only; persisted settings go through the manager)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<AttachmentManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
