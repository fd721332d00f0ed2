use crate::domain::targeting::TargetingCriteria;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: String,
    pub name: String,
    /// Share of allocated traffic, 0-100. Splits across an experiment's
    /// variants must sum to 100.
    pub traffic_split: f64,
    pub is_control: bool,
    /// Opaque display/behavior config handed back to the storefront.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub primary_metric: String,
    pub minimum_sample_size: u64,
    /// e.g. 0.95
    pub confidence_level: f64,
    /// Minimum lift (percent) worth shipping.
    pub minimum_detectable_effect_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: Uuid,
    pub name: String,
    pub status: ExperimentStatus,
    /// Fraction of all eligible users included in the experiment, 0-100.
    pub traffic_allocation_pct: f64,
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub targeting: TargetingCriteria,
    pub metrics: MetricsConfig,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Frozen on completion.
    pub final_results: Option<ExperimentResults>,
}

impl Experiment {
    pub fn control_variant(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_control)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Click,
    Purchase,
    AddToCart,
    CheckoutStart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub event_type: EventType,
    pub variant_id: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Sticky bucketing record: at most one per (user, experiment), never
/// reassigned while the experiment runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAssignment {
    pub user_id: String,
    pub experiment_id: Uuid,
    pub variant_id: String,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub converted: bool,
    #[serde(default)]
    pub conversion_value: f64,
    #[serde(default)]
    pub events: Vec<TrackedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ContinueTest,
    ImplementWinner,
    Inconclusive,
    StopTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant_id: String,
    pub name: String,
    pub is_control: bool,
    pub participants: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub computed_at: chrono::DateTime<chrono::Utc>,
    pub total_participants: u64,
    pub variants: Vec<VariantSummary>,
    pub best_variant_id: Option<String>,
    /// Relative improvement of the best variant over control, percent.
    pub lift_pct: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub recommended_action: RecommendedAction,
    pub insights: Vec<String>,
}
