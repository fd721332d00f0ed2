use crate::domain::experiment::{Experiment, Variant};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stable per-(user, experiment) draws in [0, 1). Both the traffic
/// allocation gate and the variant pick come from the same hash, so
/// repeated calls are replayable and never double-bucket under races.
#[derive(Debug, Clone, Copy)]
pub struct BucketDraws {
    pub gate: f64,
    pub variant: f64,
}

pub fn draws(user_id: &str, experiment_id: Uuid) -> BucketDraws {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(experiment_id.as_bytes());
    let hash = hasher.finalize();

    let gate_bits = u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]);
    let variant_bits = u32::from_be_bytes([hash[4], hash[5], hash[6], hash[7]]);
    let scale = u32::MAX as f64 + 1.0;

    BucketDraws {
        gate: gate_bits as f64 / scale,
        variant: variant_bits as f64 / scale,
    }
}

/// Picks a variant for an eligible user, or None when the traffic
/// allocation gate excludes them. Walks variants in declaration order
/// accumulating splits; floating-point slack falls back to control.
pub fn pick_variant<'a>(experiment: &'a Experiment, user_id: &str) -> Option<&'a Variant> {
    let draws = draws(user_id, experiment.experiment_id);

    if draws.gate >= experiment.traffic_allocation_pct / 100.0 {
        return None;
    }

    let mut cumulative = 0.0;
    for variant in &experiment.variants {
        cumulative += variant.traffic_split / 100.0;
        if draws.variant < cumulative {
            return Some(variant);
        }
    }

    experiment.control_variant()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ExperimentStatus, MetricsConfig};

    fn experiment(allocation: f64, splits: &[(f64, bool)]) -> Experiment {
        Experiment {
            experiment_id: Uuid::new_v4(),
            name: "checkout-cta".to_string(),
            status: ExperimentStatus::Running,
            traffic_allocation_pct: allocation,
            variants: splits
                .iter()
                .enumerate()
                .map(|(i, (split, is_control))| Variant {
                    variant_id: format!("v{i}"),
                    name: format!("v{i}"),
                    traffic_split: *split,
                    is_control: *is_control,
                    config: serde_json::Map::new(),
                    views: 0,
                    clicks: 0,
                    conversions: 0,
                    revenue: 0.0,
                })
                .collect(),
            targeting: Default::default(),
            metrics: MetricsConfig {
                primary_metric: "conversion".to_string(),
                minimum_sample_size: 100,
                confidence_level: 0.95,
                minimum_detectable_effect_pct: 5.0,
            },
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            final_results: None,
        }
    }

    #[test]
    fn draws_are_deterministic() {
        let id = Uuid::new_v4();
        let a = draws("user-1", id);
        let b = draws("user-1", id);
        assert_eq!(a.gate, b.gate);
        assert_eq!(a.variant, b.variant);
    }

    #[test]
    fn full_allocation_always_buckets() {
        let exp = experiment(100.0, &[(50.0, true), (50.0, false)]);
        for i in 0..200 {
            assert!(pick_variant(&exp, &format!("user-{i}")).is_some());
        }
    }

    #[test]
    fn zero_allocation_excludes_everyone() {
        let exp = experiment(0.0, &[(50.0, true), (50.0, false)]);
        for i in 0..200 {
            assert!(pick_variant(&exp, &format!("user-{i}")).is_none());
        }
    }

    #[test]
    fn even_split_is_roughly_even() {
        let exp = experiment(100.0, &[(50.0, true), (50.0, false)]);
        let mut control = 0;
        for i in 0..1000 {
            let v = pick_variant(&exp, &format!("user-{i}")).unwrap();
            if v.is_control {
                control += 1;
            }
        }
        assert!((350..=650).contains(&control), "control got {control} of 1000");
    }

    #[test]
    fn partial_allocation_excludes_a_share() {
        let exp = experiment(30.0, &[(100.0, true)]);
        let bucketed = (0..1000)
            .filter(|i| pick_variant(&exp, &format!("user-{i}")).is_some())
            .count();
        assert!((200..=400).contains(&bucketed), "bucketed {bucketed} of 1000");
    }
}
