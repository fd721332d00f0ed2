use crate::domain::experiment::{Experiment, UserAssignment};
use crate::domain::pricing::DynamicPricing;
use crate::domain::promotion::Promotion;

pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store operation timed out")]
    Timeout,
    #[error("store serialization failed: {0}")]
    Serialization(String),
}

/// Persistence port. The registries are the in-memory source of truth;
/// this port is the load/save seam behind them. A multi-instance
/// deployment would need the backing implementation to provide atomic
/// increments; that is out of scope here.
#[async_trait::async_trait]
pub trait StorePort: Send + Sync {
    async fn load_experiments(&self) -> Result<Vec<Experiment>, StoreError>;
    async fn save_experiment(&self, experiment: &Experiment) -> Result<(), StoreError>;

    async fn load_assignments(&self) -> Result<Vec<UserAssignment>, StoreError>;
    async fn save_assignment(&self, assignment: &UserAssignment) -> Result<(), StoreError>;

    async fn load_promotions(&self) -> Result<Vec<Promotion>, StoreError>;
    async fn save_promotion(&self, promotion: &Promotion) -> Result<(), StoreError>;

    async fn load_pricing(&self) -> Result<Vec<DynamicPricing>, StoreError>;
    async fn save_pricing(&self, pricing: &DynamicPricing) -> Result<(), StoreError>;
}
