use std::sync::Arc;

use curator_cache::CacheDb;
use curator_catalog::CatalogClient;
use curator_pipeline::{Settings, SyncJobs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator_worker=debug,curator_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        models_root = %settings.models_root.display(),
        cache = %settings.cache_path.display(),
        authenticated = settings.api_key.is_some(),
        "Worker starting"
    );

    let cache = CacheDb::connect(&settings.cache_path).await?;
    let versions = Arc::new(cache.namespace("catalog_versions"));
    let digests = Arc::new(cache.namespace("file_digests"));
    let client = Arc::new(CatalogClient::new(settings.api_key.clone()));

    let jobs = SyncJobs::new(settings, client, versions, digests);
    for handle in jobs.spawn_all() {
        handle.await?;
    }

    tracing::info!("Sync jobs complete");
    Ok(())
}
