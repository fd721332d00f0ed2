use crate::domain::promotion::{Conditions, IneligibleReason, UsageLimits};
use crate::domain::targeting::UserAttributes;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};

/// Checks cart-level conditions: minimum amount, first-purchase-only,
/// hour and day-of-week windows evaluated at the given UTC offset.
pub fn check_conditions(
    conditions: &Conditions,
    amount: f64,
    attrs: Option<&UserAttributes>,
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> Result<(), IneligibleReason> {
    if let Some(min) = conditions.min_purchase_amount {
        if amount < min {
            return Err(IneligibleReason::BelowMinimumAmount);
        }
    }

    if conditions.first_purchase_only {
        if let Some(attrs) = attrs {
            if attrs.purchase_count > 0 {
                return Err(IneligibleReason::FirstPurchaseOnly);
            }
        }
    }

    let local = local_time(now, utc_offset_minutes);

    if let Some(window) = &conditions.hours {
        if !window.contains(local.hour()) {
            return Err(IneligibleReason::OutsideTimeWindow);
        }
    }

    if let Some(days) = &conditions.days_of_week {
        if !days.contains(&local.weekday()) {
            return Err(IneligibleReason::OutsideTimeWindow);
        }
    }

    Ok(())
}

/// Pure usage-limit predicate. The caller must hold the registry write
/// guard so the check and the subsequent increment are atomic.
pub fn usage_ok(
    limits: &UsageLimits,
    user_id: Option<&str>,
    today: NaiveDate,
) -> Result<(), IneligibleReason> {
    if let Some(total) = limits.total_limit {
        if limits.usage_count >= total {
            return Err(IneligibleReason::UsageLimitReached);
        }
    }

    if let (Some(per_user), Some(user_id)) = (limits.per_user_limit, user_id) {
        let used = limits.per_user_counts.get(user_id).copied().unwrap_or(0);
        if used >= per_user {
            return Err(IneligibleReason::UserLimitReached);
        }
    }

    if let Some(per_day) = limits.per_day_limit {
        if limits.usage_day == Some(today) && limits.used_today >= per_day {
            return Err(IneligibleReason::DailyLimitReached);
        }
    }

    Ok(())
}

/// Counter bump paired with `usage_ok`, under the same write guard.
pub fn record_usage(limits: &mut UsageLimits, user_id: Option<&str>, today: NaiveDate) {
    limits.usage_count += 1;
    if let Some(user_id) = user_id {
        *limits
            .per_user_counts
            .entry(user_id.to_string())
            .or_default() += 1;
    }
    if limits.usage_day == Some(today) {
        limits.used_today += 1;
    } else {
        limits.usage_day = Some(today);
        limits.used_today = 1;
    }
}

pub fn local_time(now: DateTime<Utc>, utc_offset_minutes: i32) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset),
        None => now.fixed_offset(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promotion::HourWindow;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn minimum_amount_gate() {
        let conditions = Conditions {
            min_purchase_amount: Some(20.0),
            ..Default::default()
        };
        let now = Utc::now();
        assert_eq!(
            check_conditions(&conditions, 10.0, None, now, 0),
            Err(IneligibleReason::BelowMinimumAmount)
        );
        assert!(check_conditions(&conditions, 25.0, None, now, 0).is_ok());
    }

    #[test]
    fn first_purchase_only_rejects_repeat_buyers() {
        let conditions = Conditions {
            first_purchase_only: true,
            ..Default::default()
        };
        let mut attrs = UserAttributes::anonymous("u1");
        attrs.purchase_count = 4;
        assert_eq!(
            check_conditions(&conditions, 10.0, Some(&attrs), Utc::now(), 0),
            Err(IneligibleReason::FirstPurchaseOnly)
        );
    }

    #[test]
    fn happy_hour_window() {
        let conditions = Conditions {
            hours: Some(HourWindow { start: 18, end: 22 }),
            ..Default::default()
        };
        // 2026-01-07 19:30 UTC
        let inside = Utc.with_ymd_and_hms(2026, 1, 7, 19, 30, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2026, 1, 7, 9, 0, 0).unwrap();
        assert!(check_conditions(&conditions, 10.0, None, inside, 0).is_ok());
        assert_eq!(
            check_conditions(&conditions, 10.0, None, outside, 0),
            Err(IneligibleReason::OutsideTimeWindow)
        );
    }

    #[test]
    fn weekday_window_respects_offset() {
        let conditions = Conditions {
            days_of_week: Some(vec![Weekday::Sat]),
            ..Default::default()
        };
        // Friday 23:30 UTC is Saturday at UTC+1.
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 23, 30, 0).unwrap();
        assert_eq!(
            check_conditions(&conditions, 10.0, None, now, 0),
            Err(IneligibleReason::OutsideTimeWindow)
        );
        assert!(check_conditions(&conditions, 10.0, None, now, 60).is_ok());
    }

    #[test]
    fn usage_limits_enforced() {
        let mut limits = UsageLimits {
            total_limit: Some(2),
            per_user_limit: Some(1),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();

        assert!(usage_ok(&limits, Some("u1"), today).is_ok());
        record_usage(&mut limits, Some("u1"), today);
        assert_eq!(
            usage_ok(&limits, Some("u1"), today),
            Err(IneligibleReason::UserLimitReached)
        );
        assert!(usage_ok(&limits, Some("u2"), today).is_ok());
        record_usage(&mut limits, Some("u2"), today);
        assert_eq!(
            usage_ok(&limits, Some("u3"), today),
            Err(IneligibleReason::UsageLimitReached)
        );
    }

    #[test]
    fn daily_cap_resets_across_days() {
        let mut limits = UsageLimits {
            per_day_limit: Some(1),
            ..Default::default()
        };
        let day1 = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();

        record_usage(&mut limits, None, day1);
        assert_eq!(
            usage_ok(&limits, None, day1),
            Err(IneligibleReason::DailyLimitReached)
        );
        assert!(usage_ok(&limits, None, day2).is_ok());
    }
}
