use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    DemandBased,
    TimeBased,
    InventoryBased,
    CompetitorBased,
    Seasonal,
}

/// All fields optional; a rule matches when every populated condition holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    pub min_demand_rate: Option<f64>,
    pub max_demand_rate: Option<f64>,
    pub hours: Option<crate::domain::promotion::HourWindow>,
    pub days_of_week: Option<Vec<Weekday>>,
    pub min_inventory: Option<i64>,
    pub max_inventory: Option<i64>,
    /// Matches when a competitor price is known and below this value.
    pub competitor_below: Option<f64>,
    pub seasonal_category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceAdjustment {
    /// base * (1 + value/100)
    Percentage { value: f64 },
    /// base + value
    FixedAmount { value: f64 },
    SetPrice { value: f64 },
}

/// Phases an adjustment in over time instead of applying it instantly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ramp {
    pub duration_minutes: i64,
    pub steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingLimits {
    pub minimum_price: f64,
    pub maximum_price: f64,
    pub max_daily_changes: Option<u32>,
    pub min_minutes_between_changes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRule {
    pub rule_id: String,
    pub name: String,
    pub kind: RuleKind,
    pub priority: i32,
    pub is_active: bool,
    #[serde(default)]
    pub conditions: RuleConditions,
    pub adjustment: PriceAdjustment,
    pub ramp: Option<Ramp>,
    pub limits: PricingLimits,
    /// Ramp origin; set when the rule is activated.
    pub activated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub price: f64,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    pub reason: String,
    pub rule_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicPricing {
    pub package_id: String,
    pub base_price: f64,
    pub current_price: f64,
    pub is_active: bool,
    pub rules: Vec<PricingRule>,
    #[serde(default)]
    pub history: Vec<PriceHistoryEntry>,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// Snapshot of external signals consulted during rule evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketState {
    /// Purchases per hour, or whatever demand proxy the operator feeds in.
    pub demand_rate: f64,
    pub inventory_level: Option<i64>,
    pub competitor_price: Option<f64>,
    #[serde(default)]
    pub active_seasonal_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceChange {
    pub package_id: String,
    pub old_price: f64,
    pub new_price: f64,
    pub rule_id: Option<String>,
}
