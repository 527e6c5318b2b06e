//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::MapStorage;
use crate::application::Session;
use crate::config::Settings;
use crate::infrastructure::traits::{
    FileSystem, Prompter, RealFileSystem, Selector, SkimSelector, StdinPrompter,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// File picker for `load` without a path
    pub selector: Arc<dyn Selector>,

    /// Line input for the shell and confirmations
    pub prompter: Arc<dyn Prompter>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(SkimSelector),
            Arc::new(StdinPrompter),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        selector: Arc<dyn Selector>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            selector,
            prompter,
        }
    }

    /// Storage service over this container's filesystem.
    pub fn storage(&self) -> MapStorage {
        MapStorage::new(Arc::clone(&self.fs))
    }

    /// Fresh session with nothing loaded; autosave follows the settings.
    pub fn session(&self) -> Session {
        Session::new(self.storage(), self.settings.autosave)
    }
}
