use crate::domain::targeting::TargetingCriteria;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Draft,
    Scheduled,
    Active,
    Paused,
    Expired,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoinBonus {
    Fixed { coins: u64 },
    PercentOfBase { pct: f64 },
}

/// Exactly one discount shape per promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    PercentageOff { pct: f64 },
    FixedAmountOff { amount: f64 },
    BonusCoins { bonus: CoinBonus },
    Bundle { package_ids: Vec<String>, pct: f64 },
    FlashSale { pct: f64 },
    /// Scales the package's base coin grant; > 1.0 grants the surplus
    /// as bonus coins.
    SeasonalMultiplier { multiplier: f64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageLimits {
    pub total_limit: Option<u64>,
    pub per_user_limit: Option<u64>,
    pub per_day_limit: Option<u64>,
    pub max_discount_amount: Option<f64>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub per_user_counts: HashMap<String, u64>,
    #[serde(default)]
    pub usage_day: Option<NaiveDate>,
    #[serde(default)]
    pub used_today: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HourWindow {
    /// Inclusive start hour, 0-23.
    pub start: u32,
    /// Exclusive end hour; start > end wraps past midnight.
    pub end: u32,
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub min_purchase_amount: Option<f64>,
    #[serde(default)]
    pub first_purchase_only: bool,
    pub hours: Option<HourWindow>,
    pub days_of_week: Option<Vec<Weekday>>,
    #[serde(default)]
    pub stackable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Display {
    pub title: String,
    pub description: String,
    pub badge: Option<String>,
    pub highlight_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionAnalytics {
    pub times_applied: u64,
    pub total_savings_provided: f64,
    pub revenue_attributed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub promotion_id: String,
    pub name: String,
    pub status: PromotionStatus,
    /// Higher wins when several promotions apply.
    pub priority: i32,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    /// Offset applied when evaluating hour/day-of-week conditions.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Empty = applies to all packages.
    #[serde(default)]
    pub target_packages: Vec<String>,
    #[serde(default)]
    pub targeting: TargetingCriteria,
    pub discount: DiscountKind,
    #[serde(default)]
    pub limits: UsageLimits,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub analytics: PromotionAnalytics,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The package the caller is checking out, as the storefront sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageData {
    pub package_id: String,
    /// Base coin grant of the package, used for coin-denominated bonuses.
    #[serde(default)]
    pub coins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountResult {
    pub discount_amount: f64,
    pub final_amount: f64,
    pub bonus_coins: u64,
}

/// Soft misses on the checkout path. Typed, never thrown, so callers can
/// always fall back to full price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotActive,
    OutsideWindow,
    PackageNotEligible,
    TargetingMiss,
    BelowMinimumAmount,
    FirstPurchaseOnly,
    OutsideTimeWindow,
    UsageLimitReached,
    UserLimitReached,
    DailyLimitReached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied(DiscountResult),
    Ineligible { reason: IneligibleReason },
}
