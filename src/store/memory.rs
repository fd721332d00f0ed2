use crate::domain::experiment::{Experiment, UserAssignment};
use crate::domain::pricing::DynamicPricing;
use crate::domain::promotion::Promotion;
use crate::store::{StoreError, StorePort};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store for dev and tests. `set_failing(true)` makes every call
/// return `StoreError::Unavailable` so degradation paths can be exercised.
#[derive(Clone, Default)]
pub struct MemoryStore {
    experiments: Arc<RwLock<HashMap<Uuid, Experiment>>>,
    assignments: Arc<RwLock<HashMap<(Uuid, String), UserAssignment>>>,
    promotions: Arc<RwLock<HashMap<String, Promotion>>>,
    pricing: Arc<RwLock<HashMap<String, DynamicPricing>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store failure injected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl StorePort for MemoryStore {
    async fn load_experiments(&self) -> Result<Vec<Experiment>, StoreError> {
        self.check()?;
        Ok(self.experiments.read().await.values().cloned().collect())
    }

    async fn save_experiment(&self, experiment: &Experiment) -> Result<(), StoreError> {
        self.check()?;
        self.experiments
            .write()
            .await
            .insert(experiment.experiment_id, experiment.clone());
        Ok(())
    }

    async fn load_assignments(&self) -> Result<Vec<UserAssignment>, StoreError> {
        self.check()?;
        Ok(self.assignments.read().await.values().cloned().collect())
    }

    async fn save_assignment(&self, assignment: &UserAssignment) -> Result<(), StoreError> {
        self.check()?;
        self.assignments.write().await.insert(
            (assignment.experiment_id, assignment.user_id.clone()),
            assignment.clone(),
        );
        Ok(())
    }

    async fn load_promotions(&self) -> Result<Vec<Promotion>, StoreError> {
        self.check()?;
        Ok(self.promotions.read().await.values().cloned().collect())
    }

    async fn save_promotion(&self, promotion: &Promotion) -> Result<(), StoreError> {
        self.check()?;
        self.promotions
            .write()
            .await
            .insert(promotion.promotion_id.clone(), promotion.clone());
        Ok(())
    }

    async fn load_pricing(&self) -> Result<Vec<DynamicPricing>, StoreError> {
        self.check()?;
        Ok(self.pricing.read().await.values().cloned().collect())
    }

    async fn save_pricing(&self, pricing: &DynamicPricing) -> Result<(), StoreError> {
        self.check()?;
        self.pricing
            .write()
            .await
            .insert(pricing.package_id.clone(), pricing.clone());
        Ok(())
    }
}
