use serde::{Deserialize, Serialize};

/// User profile as surfaced by the identity port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAttributes {
    pub user_id: String,
    pub segment: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
    pub account_age_days: Option<i64>,
    #[serde(default)]
    pub purchase_count: u64,
    #[serde(default)]
    pub total_spent: f64,
}

impl UserAttributes {
    /// Attributes for a user the identity port knows nothing about.
    pub fn anonymous(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            segment: None,
            country: None,
            device: None,
            account_age_days: None,
            purchase_count: 0,
            total_spent: 0.0,
        }
    }
}

/// Audience filter. Empty fields match everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetingCriteria {
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    pub min_account_age_days: Option<i64>,
    pub min_purchases: Option<u64>,
    pub max_purchases: Option<u64>,
}
