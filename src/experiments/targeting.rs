use crate::domain::targeting::{TargetingCriteria, UserAttributes};

/// Audience predicate. Empty criteria match everyone; every populated
/// field must hold.
pub fn matches(criteria: &TargetingCriteria, attrs: &UserAttributes) -> bool {
    if !criteria.segments.is_empty() {
        match &attrs.segment {
            Some(segment) if criteria.segments.contains(segment) => {}
            _ => return false,
        }
    }

    if !criteria.countries.is_empty() {
        match &attrs.country {
            Some(country) if criteria.countries.contains(country) => {}
            _ => return false,
        }
    }

    if !criteria.devices.is_empty() {
        match &attrs.device {
            Some(device) if criteria.devices.contains(device) => {}
            _ => return false,
        }
    }

    if let Some(min_age) = criteria.min_account_age_days {
        if attrs.account_age_days.unwrap_or(0) < min_age {
            return false;
        }
    }

    if let Some(min) = criteria.min_purchases {
        if attrs.purchase_count < min {
            return false;
        }
    }

    if let Some(max) = criteria.max_purchases {
        if attrs.purchase_count > max {
            return false;
        }
    }

    true
}
