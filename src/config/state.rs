// Application state module
// Everything a request handler needs, shared read-only across connections

use super::types::Config;
use crate::wiki::{FileStore, Templates};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: FileStore,
    /// Parsed once at startup, read-only afterwards
    pub templates: Templates,
}

impl AppState {
    pub const fn new(config: Config, store: FileStore, templates: Templates) -> Self {
        Self {
            config,
            store,
            templates,
        }
    }
}
