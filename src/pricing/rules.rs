use crate::domain::pricing::{MarketState, PriceAdjustment, PricingLimits, PricingRule, Ramp};
use crate::promotions::eligibility::local_time;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// True when every populated condition of the rule holds against the
/// market snapshot and wall clock.
pub fn matches(rule: &PricingRule, market: &MarketState, now: DateTime<Utc>) -> bool {
    let c = &rule.conditions;

    if let Some(min) = c.min_demand_rate {
        if market.demand_rate < min {
            return false;
        }
    }
    if let Some(max) = c.max_demand_rate {
        if market.demand_rate > max {
            return false;
        }
    }

    let local = local_time(now, 0);
    if let Some(window) = &c.hours {
        if !window.contains(local.hour()) {
            return false;
        }
    }
    if let Some(days) = &c.days_of_week {
        if !days.contains(&local.weekday()) {
            return false;
        }
    }

    if let Some(min) = c.min_inventory {
        match market.inventory_level {
            Some(level) if level >= min => {}
            _ => return false,
        }
    }
    if let Some(max) = c.max_inventory {
        match market.inventory_level {
            Some(level) if level <= max => {}
            _ => return false,
        }
    }

    if let Some(threshold) = c.competitor_below {
        match market.competitor_price {
            Some(price) if price < threshold => {}
            _ => return false,
        }
    }

    if let Some(category) = &c.seasonal_category {
        if !market.active_seasonal_categories.contains(category) {
            return false;
        }
    }

    true
}

/// Price the rule asks for, before clamping. Ramped rules phase the
/// adjustment in stepwise from the rule's activation time.
pub fn target_price(base: f64, rule: &PricingRule, now: DateTime<Utc>) -> f64 {
    let full = match rule.adjustment {
        PriceAdjustment::Percentage { value } => base * (1.0 + value / 100.0),
        PriceAdjustment::FixedAmount { value } => base + value,
        PriceAdjustment::SetPrice { value } => value,
    };

    match (rule.ramp, rule.activated_at) {
        (Some(ramp), Some(activated_at)) => {
            base + (full - base) * ramp_fraction(ramp, activated_at, now)
        }
        _ => full,
    }
}

fn ramp_fraction(ramp: Ramp, activated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if ramp.duration_minutes <= 0 || ramp.steps == 0 {
        return 1.0;
    }
    let elapsed = (now - activated_at).num_minutes();
    if elapsed <= 0 {
        return 0.0;
    }
    let raw = elapsed as f64 / ramp.duration_minutes as f64;
    if raw >= 1.0 {
        return 1.0;
    }
    let steps = ramp.steps as f64;
    (raw * steps).floor() / steps
}

pub fn clamp(price: f64, limits: &PricingLimits) -> f64 {
    price.max(limits.minimum_price).min(limits.maximum_price)
}

/// How many recorded price changes fall on the given day.
pub fn changes_today(
    history: &[crate::domain::pricing::PriceHistoryEntry],
    today: chrono::NaiveDate,
) -> u32 {
    history
        .iter()
        .filter(|entry| entry.recorded_at.date_naive() == today)
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::{RuleConditions, RuleKind};
    use chrono::{TimeZone, Weekday};

    fn weekend_rule() -> PricingRule {
        PricingRule {
            rule_id: "weekend".to_string(),
            name: "weekend discount".to_string(),
            kind: RuleKind::TimeBased,
            priority: 10,
            is_active: true,
            conditions: RuleConditions {
                days_of_week: Some(vec![Weekday::Fri, Weekday::Sat]),
                ..Default::default()
            },
            adjustment: PriceAdjustment::Percentage { value: -10.0 },
            ramp: None,
            limits: PricingLimits {
                minimum_price: 7.99,
                maximum_price: 12.99,
                max_daily_changes: None,
                min_minutes_between_changes: None,
            },
            activated_at: None,
        }
    }

    #[test]
    fn weekend_rule_matches_friday_not_tuesday() {
        let rule = weekend_rule();
        let market = MarketState::default();
        // 2026-01-02 is a Friday, 2026-01-06 a Tuesday.
        let friday = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 1, 6, 12, 0, 0).unwrap();
        assert!(matches(&rule, &market, friday));
        assert!(!matches(&rule, &market, tuesday));
    }

    #[test]
    fn percentage_discount_lands_within_limits() {
        let rule = weekend_rule();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let price = clamp(target_price(9.99, &rule, now), &rule.limits);
        assert!((price - 8.991).abs() < 1e-9);
    }

    #[test]
    fn set_price_is_clamped() {
        let mut rule = weekend_rule();
        rule.adjustment = PriceAdjustment::SetPrice { value: 4.0 };
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let price = clamp(target_price(9.99, &rule, now), &rule.limits);
        assert_eq!(price, 7.99);
    }

    #[test]
    fn demand_band_gates_matching() {
        let mut rule = weekend_rule();
        rule.conditions = RuleConditions {
            min_demand_rate: Some(50.0),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let mut market = MarketState::default();
        market.demand_rate = 10.0;
        assert!(!matches(&rule, &market, now));
        market.demand_rate = 80.0;
        assert!(matches(&rule, &market, now));
    }

    #[test]
    fn ramp_phases_adjustment_in() {
        let mut rule = weekend_rule();
        rule.ramp = Some(Ramp {
            duration_minutes: 100,
            steps: 4,
        });
        let activated = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        rule.activated_at = Some(activated);

        // Half way through a 4-step ramp: 2 of 4 steps applied.
        let half = activated + chrono::Duration::minutes(50);
        let expected = 9.99 + (8.991 - 9.99) * 0.5;
        assert!((target_price(9.99, &rule, half) - expected).abs() < 1e-9);

        let done = activated + chrono::Duration::minutes(200);
        assert!((target_price(9.99, &rule, done) - 8.991).abs() < 1e-9);
    }

    #[test]
    fn competitor_condition_requires_known_price() {
        let mut rule = weekend_rule();
        rule.conditions = RuleConditions {
            competitor_below: Some(9.0),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let mut market = MarketState::default();
        assert!(!matches(&rule, &market, now));
        market.competitor_price = Some(8.49);
        assert!(matches(&rule, &market, now));
    }
}
