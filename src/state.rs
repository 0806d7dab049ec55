use std::sync::Arc;

use crate::auth::repo::{RefreshTokenRepo, UserRepo};
use crate::bookings::repo::BookingRepo;
use crate::config::AppConfig;
use crate::db::PgStore;
use crate::events::repo::EventRepo;
use crate::storage::{Storage, StorageClient};

/// Everything a request needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepo>,
    pub events: Arc<dyn EventRepo>,
    pub bookings: Arc<dyn BookingRepo>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = PgStore::connect(&config.database_url).await?;
        store.migrate().await?;

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        Ok(Self::from_store(config, Arc::new(store), storage))
    }

    /// Wires one store object into every repository slot.
    pub fn from_store<S>(config: Arc<AppConfig>, store: Arc<S>, storage: Arc<dyn StorageClient>) -> Self
    where
        S: UserRepo + RefreshTokenRepo + EventRepo + BookingRepo + 'static,
    {
        Self {
            config,
            users: store.clone(),
            refresh_tokens: store.clone(),
            events: store.clone(),
            bookings: store,
            storage,
        }
    }
}
