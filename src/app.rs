use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::browser::ChromeLauncher;
use crate::config::Config;
use crate::orchestrator::CheckCoordinator;
use crate::store::{self, StatusStore};
use crate::utils::logging::log_startup;
use crate::web::{self, AppState};

/// Application root
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Open the store and wire the coordinator
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        info!("🗄️ connecting to {}", config.database_url);
        let pool = store::init_pool(&config.database_url)
            .await
            .with_context(|| format!("cannot open database {}", config.database_url))?;
        store::run_migrations(&pool)
            .await
            .context("cannot create schema")?;

        let store = StatusStore::new(pool);
        let launcher = Arc::new(ChromeLauncher::new(&config));
        let coordinator = CheckCoordinator::new(&config, store.clone(), launcher);

        Ok(Self {
            state: AppState::new(store, coordinator),
            config,
        })
    }

    /// Serve the web boundary until the process stops
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {}", addr))?;
        info!("👂 listening on {}", addr);

        axum::serve(listener, web::router(self.state))
            .await
            .context("server error")?;
        Ok(())
    }
}
