//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    auth::JwtVerifier, catalog::CatalogStore, config::Config, error::Result,
    pagination::Paginator,
};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    config: Arc<Config>,
    store: CatalogStore,
    paginator: Paginator,
    verifier: JwtVerifier,
}

impl AppState {
    /// Create state with an empty store
    pub fn new(config: Config) -> Result<Self> {
        Self::with_store(config, CatalogStore::new())
    }

    /// Create state around an existing store
    pub fn with_store(config: Config, store: CatalogStore) -> Result<Self> {
        let verifier = JwtVerifier::new(&config.jwt)?;
        let paginator = Paginator::from_config(&config.pagination);
        Ok(Self {
            config: Arc::new(config),
            store,
            paginator,
            verifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }
}

impl FromRef<AppState> for JwtVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
