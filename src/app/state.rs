//! Application state shared across routes

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::race::{RaceError, RaceService, RaceSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub races: Arc<RaceService>,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog) -> Result<Self, RaceError> {
        let config = Arc::new(config);

        // Every race created by the registry ticks at the configured period
        let settings = RaceSettings::new(config.tick_period)?;
        let races = Arc::new(RaceService::new(catalog, settings));

        Ok(Self { config, races })
    }
}
