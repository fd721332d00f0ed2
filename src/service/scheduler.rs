use crate::clock::Clock;
use crate::pricing::engine::PricingEngine;
use crate::promotions::registry::PromotionRegistry;
use crate::seasonal::orchestrator::SeasonalOrchestrator;
use std::sync::Arc;
use tokio::sync::watch;

/// Background recalculation loop: seasonal activation checks, promotion
/// status upkeep, and price recalculation on a fixed interval,
/// independent of request traffic.
#[derive(Clone)]
pub struct RecalcScheduler {
    pub pricing: PricingEngine,
    pub promotions: PromotionRegistry,
    pub seasonal: SeasonalOrchestrator,
    pub clock: Arc<dyn Clock>,
    pub interval: std::time::Duration,
}

impl RecalcScheduler {
    /// Spawns the loop and returns its stop handle.
    pub fn start(self) -> SchedulerHandle {
        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx));
        SchedulerHandle { tx, join }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("recalculation scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    /// One pass; public so tests can drive the loop without timers.
    pub async fn tick(&self) {
        let now = self.clock.now();

        for event_id in self.seasonal.due_events(now).await {
            if let Err(err) = self.seasonal.activate(event_id).await {
                tracing::error!("seasonal activation failed for {event_id}: {err}");
            }
        }

        self.promotions.refresh_statuses(now).await;

        let categories = self.seasonal.active_categories(now).await;
        let changed = self.pricing.recalculate_all(categories).await;
        if changed > 0 {
            tracing::info!("recalculation pass updated {changed} package price(s)");
        }
    }
}

/// Stop handle for the scheduler. `stop` is idempotent; an in-flight tick
/// completes before the loop exits.
pub struct SchedulerHandle {
    tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }

    pub async fn stopped(self) {
        self.stop();
        let _ = self.join.await;
    }
}
