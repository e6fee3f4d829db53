// src/state.rs

use crate::config::Config;
use crate::store::Stores;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Config,
}

impl FromRef<AppState> for Stores {
    fn from_ref(state: &AppState) -> Self {
        state.stores.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
