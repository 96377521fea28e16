//! Shared application context.
//!
//! [`AppContext`] is the one struct handed to route handlers (via axum
//! state) and worker loops. Registry, router, and tool locations are built
//! once at startup and never mutated afterwards; the task manager clones
//! cheaply around its pool.

use std::sync::Arc;

use fr_convert::{build_registry, ToolRegistry};
use fr_core::config::Config;
use fr_core::Result;
use fr_router::Router;
use fr_store::{init_memory_pool, init_pool, TaskManager};

use crate::artifacts::{ArtifactStore, FsArtifactStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub tasks: TaskManager,
    pub router: Arc<Router>,
    pub tools: Arc<ToolRegistry>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl AppContext {
    /// Build the full context: database pool, tool discovery, converter
    /// registry, and format router.
    pub fn init(config: Config) -> Result<Self> {
        let pool = init_pool(&config.store.db_path.to_string_lossy())?;
        Self::with_pool(config, pool)
    }

    /// Context over an in-memory database (tests, one-shot commands).
    pub fn init_ephemeral(config: Config) -> Result<Self> {
        let pool = init_memory_pool()?;
        Self::with_pool(config, pool)
    }

    fn with_pool(config: Config, pool: fr_store::DbPool) -> Result<Self> {
        let tools = ToolRegistry::discover(&config.tools);
        let registry = build_registry(&tools, &config.converters);
        tracing::info!(
            converters = registry.len(),
            formats = registry.all_formats().len(),
            "Converter registry built"
        );

        let router = Router::new(registry, config.router.max_hops);
        let tasks = TaskManager::new(pool, config.store.clone());
        let artifacts = FsArtifactStore::new(config.artifacts.clone());

        Ok(Self {
            config: Arc::new(config),
            tasks,
            router: Arc::new(router),
            tools: Arc::new(tools),
            artifacts: Arc::new(artifacts),
        })
    }
}
