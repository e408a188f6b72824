//! Store lifecycle: opened once at startup, closed once at shutdown.

use tessera_foundation::Result;
use tessera_storage::{Engine, Store};
use tracing::info;

use crate::config::Config;

/// A running process: the store handle and the engine over it.
#[derive(Debug)]
pub struct Runtime {
    config: Config,
    engine: Engine,
}

impl Runtime {
    /// Opens the store described by `config` and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn start(config: Config) -> Result<Self> {
        let store = Store::open(config.store_options())?;
        let engine = Engine::with_options(store, config.engine_options());
        info!(
            dir = %config.dir.display(),
            in_memory = config.in_memory,
            "runtime started"
        );
        Ok(Self { config, engine })
    }

    /// The configuration this runtime started with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The engine. Clones share the same store.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Closes the store. Engines cloned from this runtime fail afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn shutdown(self) -> Result<()> {
        self.engine.store().close()?;
        info!("runtime stopped");
        Ok(())
    }
}
