use std::sync::Arc;
use std::time::Duration;
use storefront_engine::clock::SystemClock;
use storefront_engine::config::AppConfig;
use storefront_engine::experiments::registry::ExperimentRegistry;
use storefront_engine::http::router;
use storefront_engine::identity::StaticIdentity;
use storefront_engine::pricing::engine::PricingEngine;
use storefront_engine::promotions::registry::PromotionRegistry;
use storefront_engine::seasonal::orchestrator::SeasonalOrchestrator;
use storefront_engine::service::scheduler::RecalcScheduler;
use storefront_engine::store::memory::MemoryStore;
use storefront_engine::store::StorePort;
use storefront_engine::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let store_timeout = Duration::from_millis(cfg.store_timeout_ms);

    let store: Arc<dyn StorePort> = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let identity = Arc::new(StaticIdentity::new());

    let experiments = ExperimentRegistry::new(store.clone(), clock.clone(), store_timeout);
    let promotions = PromotionRegistry::new(store.clone(), clock.clone(), store_timeout);
    let pricing = PricingEngine::new(store.clone(), clock.clone(), store_timeout);
    let seasonal = SeasonalOrchestrator::new(promotions.clone(), clock.clone());

    experiments.hydrate().await?;
    promotions.hydrate().await?;
    pricing.hydrate().await?;

    let scheduler = RecalcScheduler {
        pricing: pricing.clone(),
        promotions: promotions.clone(),
        seasonal: seasonal.clone(),
        clock: clock.clone(),
        interval: Duration::from_secs(cfg.recalc_interval_secs),
    };
    let scheduler_handle = scheduler.start();

    let state = AppState {
        experiments,
        promotions,
        pricing,
        seasonal,
        identity,
        store,
        clock,
    };

    let app = router::build(state, cfg.internal_api_key.clone());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    scheduler_handle.stopped().await;
    Ok(())
}
