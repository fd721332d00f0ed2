use crate::domain::promotion::{Conditions, DiscountKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionTemplate {
    pub template_id: String,
    pub name: String,
    pub discount: DiscountKind,
    pub priority: i32,
    #[serde(default)]
    pub target_packages: Vec<String>,
    #[serde(default)]
    pub conditions: Conditions,
}

/// Time-boxed campaign that spawns promotions from templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalEvent {
    pub event_id: Uuid,
    pub name: String,
    /// e.g. "winter_sale", "halloween"; pricing rules can key off this.
    pub category: String,
    /// 0-1, how aggressive the campaign is.
    pub intensity: f64,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    pub global: bool,
    #[serde(default)]
    pub regions: Vec<String>,
    pub templates: Vec<PromotionTemplate>,
    pub expected_lift_pct: Option<f64>,
    /// Set once promotions have been spawned; activation is idempotent.
    #[serde(default)]
    pub materialized: bool,
}
