//! Module loader
//!
//! Composes the artifact reader and the binder into one blocking operation:
//!
//! ```text
//! Unloaded → Reading → Binding → Bound
//!               │          │
//!               └──────────┴────→ Failed
//! ```
//!
//! Intermediate states are only visible in logs. Callers see a bound
//! [`AotModule`] or an error, never a partially loaded module.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::binder::bind_with;
use crate::error::LoadResult;
use crate::module::AotModule;
use crate::options::LoaderOptions;
use crate::registry::{BackendId, BackendRegistry};

/// What to load and which backend to bind it against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub artifact_path: PathBuf,

    /// The backend is referenced, not owned; it must outlive the module.
    pub backend: BackendId,
}

impl LoadConfig {
    pub fn new(artifact_path: impl Into<PathBuf>, backend: BackendId) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            backend,
        }
    }
}

/// Progress of one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Reading,
    Binding,
    Bound,
    Failed,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Bound | LoadState::Failed)
    }
}

/// Tracks and logs state transitions of a single load.
struct LoadTrace<'a> {
    path: &'a Path,
    state: LoadState,
}

impl<'a> LoadTrace<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            state: LoadState::Unloaded,
        }
    }

    fn advance(&mut self, next: LoadState) {
        debug!("{}: {:?} -> {:?}", self.path.display(), self.state, next);
        self.state = next;
    }
}

/// Loads artifacts against backends in one registry.
#[derive(Debug)]
pub struct ModuleLoader<'r> {
    registry: &'r BackendRegistry,
    options: LoaderOptions,
}

impl<'r> ModuleLoader<'r> {
    pub fn new(registry: &'r BackendRegistry) -> Self {
        Self {
            registry,
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Read the artifact named by `config` and bind it.
    pub fn load(&self, config: LoadConfig) -> LoadResult<AotModule> {
        let mut trace = LoadTrace::new(&config.artifact_path);

        let result = self.run(&config, &mut trace);
        match &result {
            Ok(module) => {
                trace.advance(LoadState::Bound);
                info!(
                    "loaded {} ({} kernel(s), {} field(s)) on backend {}",
                    config.artifact_path.display(),
                    module.kernels().len(),
                    module.fields().len(),
                    config.backend
                );
            }
            Err(e) => {
                trace.advance(LoadState::Failed);
                warn!("failed to load {}: {}", config.artifact_path.display(), e);
            }
        }
        result
    }

    fn run(&self, config: &LoadConfig, trace: &mut LoadTrace<'_>) -> LoadResult<AotModule> {
        self.options.validate()?;

        trace.advance(LoadState::Reading);
        let metadata = self.options.reader().read(&config.artifact_path)?;

        trace.advance(LoadState::Binding);
        bind_with(metadata, config.backend, self.registry, &self.options)
    }
}

/// Load with default options.
pub fn load(config: LoadConfig, registry: &BackendRegistry) -> LoadResult<AotModule> {
    ModuleLoader::new(registry).load(config)
}
