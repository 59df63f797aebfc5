use std::sync::Arc;

use crate::auth::AuthService;
use crate::billing::BillingService;
use crate::catalog::{CatalogService, StaticCatalog};
use crate::config::Config;
use crate::integrations::IntegrationService;
use crate::progress::ProgressService;
use crate::store::{CatalogSource, KeyValueStore, KvProgressStore, Latency, MemoryKeyValueStore};
use crate::video::VideoService;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub progress: ProgressService,
    pub auth: Arc<AuthService>,
    pub billing: Arc<BillingService>,
    pub integrations: Arc<IntegrationService>,
    pub video: Arc<VideoService>,
}

impl AppState {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let latency = Latency(config.simulated_latency);
        let catalog: Arc<dyn CatalogSource> = match &config.catalog_path {
            Some(path) => Arc::new(StaticCatalog::from_path(path, latency).await?),
            None => Arc::new(StaticCatalog::bundled(latency)?),
        };
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        Self::assemble(catalog, kv, config, latency).await
    }

    /// Wire services over the given catalog and key-value store.
    pub async fn assemble(
        catalog: Arc<dyn CatalogSource>,
        kv: Arc<dyn KeyValueStore>,
        config: &Config,
        latency: Latency,
    ) -> anyhow::Result<Self> {
        let progress_store = Arc::new(KvProgressStore::new(kv.clone()));
        let auth = AuthService::restore(kv, latency).await?;
        Ok(Self {
            catalog: CatalogService::new(catalog.clone()),
            progress: ProgressService::new(catalog.clone(), progress_store, latency),
            auth: Arc::new(auth),
            billing: Arc::new(BillingService::with_defaults(latency)),
            integrations: Arc::new(IntegrationService::new(latency)),
            video: Arc::new(VideoService::new(catalog, config.video_provider)),
        })
    }
}
