use crate::domain::experiment::{
    Experiment, ExperimentResults, RecommendedAction, VariantSummary,
};
use std::collections::HashMap;

/// Derives results from accumulated counters: per-variant conversion
/// rates, lift of the best challenger over control, and a two-proportion
/// pooled z-test against the configured confidence level.
pub fn compute(
    experiment: &Experiment,
    participants: &HashMap<String, u64>,
    now: chrono::DateTime<chrono::Utc>,
) -> ExperimentResults {
    let summaries: Vec<VariantSummary> = experiment
        .variants
        .iter()
        .map(|v| {
            let n = participants.get(&v.variant_id).copied().unwrap_or(0);
            VariantSummary {
                variant_id: v.variant_id.clone(),
                name: v.name.clone(),
                is_control: v.is_control,
                participants: n,
                conversions: v.conversions,
                conversion_rate: rate(v.conversions, n),
                revenue: v.revenue,
            }
        })
        .collect();

    let total: u64 = summaries.iter().map(|s| s.participants).sum();

    if total < experiment.metrics.minimum_sample_size {
        return ExperimentResults {
            computed_at: now,
            total_participants: total,
            variants: summaries,
            best_variant_id: None,
            lift_pct: 0.0,
            z_score: 0.0,
            p_value: 1.0,
            is_significant: false,
            recommended_action: RecommendedAction::ContinueTest,
            insights: vec![format!(
                "insufficient sample size: {total} of {} participants",
                experiment.metrics.minimum_sample_size
            )],
        };
    }

    let control = summaries.iter().find(|s| s.is_control).cloned();
    let best = summaries
        .iter()
        .filter(|s| !s.is_control)
        .max_by(|a, b| {
            a.conversion_rate
                .partial_cmp(&b.conversion_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();

    let (control, best) = match (control, best) {
        (Some(c), Some(b)) => (c, b),
        _ => {
            return ExperimentResults {
                computed_at: now,
                total_participants: total,
                variants: summaries,
                best_variant_id: None,
                lift_pct: 0.0,
                z_score: 0.0,
                p_value: 1.0,
                is_significant: false,
                recommended_action: RecommendedAction::Inconclusive,
                insights: vec!["experiment has no challenger to compare against control".to_string()],
            };
        }
    };

    let lift_pct = if control.conversion_rate > 0.0 {
        (best.conversion_rate - control.conversion_rate) / control.conversion_rate * 100.0
    } else {
        0.0
    };

    let (z_score, p_value) = z_test(
        control.conversions,
        control.participants,
        best.conversions,
        best.participants,
    );

    let alpha = 1.0 - experiment.metrics.confidence_level;
    let is_significant = p_value < alpha;

    let recommended_action = if is_significant {
        if lift_pct >= experiment.metrics.minimum_detectable_effect_pct {
            RecommendedAction::ImplementWinner
        } else {
            RecommendedAction::StopTest
        }
    } else {
        RecommendedAction::Inconclusive
    };

    let mut insights = vec![format!(
        "'{}' converts at {:.2}% vs control {:.2}% ({:+.1}% lift, p={:.4})",
        best.name,
        best.conversion_rate * 100.0,
        control.conversion_rate * 100.0,
        lift_pct,
        p_value
    )];
    if is_significant && lift_pct >= experiment.metrics.minimum_detectable_effect_pct {
        if let Some(winner) = experiment
            .variants
            .iter()
            .find(|v| v.variant_id == best.variant_id)
        {
            for (key, value) in &winner.config {
                if let Some(text) = value.as_str() {
                    insights.push(format!("winning {key}: {text}"));
                }
            }
        }
    }

    ExperimentResults {
        computed_at: now,
        total_participants: total,
        variants: summaries,
        best_variant_id: Some(best.variant_id),
        lift_pct,
        z_score,
        p_value,
        is_significant,
        recommended_action,
        insights,
    }
}

fn rate(conversions: u64, participants: u64) -> f64 {
    if participants == 0 {
        0.0
    } else {
        conversions as f64 / participants as f64
    }
}

/// Two-proportion pooled z-test; returns (z, two-sided p-value).
fn z_test(c_success: u64, c_total: u64, t_success: u64, t_total: u64) -> (f64, f64) {
    if c_total == 0 || t_total == 0 {
        return (0.0, 1.0);
    }

    let p1 = c_success as f64 / c_total as f64;
    let p2 = t_success as f64 / t_total as f64;
    let pooled = (c_success + t_success) as f64 / (c_total + t_total) as f64;
    let se =
        (pooled * (1.0 - pooled) * (1.0 / c_total as f64 + 1.0 / t_total as f64)).sqrt();

    if se == 0.0 {
        return (0.0, 1.0);
    }

    let z = (p2 - p1) / se;
    let p = 2.0 * (1.0 - normal_cdf(z.abs()));
    (z, p)
}

fn normal_cdf(x: f64) -> f64 {
    // Abramowitz-Stegun 26.2.17 approximation.
    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989423 * (-x * x / 2.0).exp();
    let prob = 1.0
        - d * t
            * (0.3193815
                + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));
    if x >= 0.0 {
        prob
    } else {
        1.0 - prob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ExperimentStatus, MetricsConfig, Variant};
    use uuid::Uuid;

    fn experiment(min_sample: u64, variants: Vec<Variant>) -> Experiment {
        Experiment {
            experiment_id: Uuid::new_v4(),
            name: "pricing-page".to_string(),
            status: ExperimentStatus::Running,
            traffic_allocation_pct: 100.0,
            variants,
            targeting: Default::default(),
            metrics: MetricsConfig {
                primary_metric: "conversion".to_string(),
                minimum_sample_size: min_sample,
                confidence_level: 0.95,
                minimum_detectable_effect_pct: 5.0,
            },
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            final_results: None,
        }
    }

    fn variant(id: &str, is_control: bool, conversions: u64) -> Variant {
        Variant {
            variant_id: id.to_string(),
            name: id.to_string(),
            traffic_split: 50.0,
            is_control,
            config: serde_json::Map::new(),
            views: 0,
            clicks: 0,
            conversions,
            revenue: 0.0,
        }
    }

    #[test]
    fn small_sample_recommends_continuing() {
        let exp = experiment(
            1000,
            vec![variant("control", true, 3), variant("b", false, 5)],
        );
        let participants = HashMap::from([("control".to_string(), 40), ("b".to_string(), 40)]);
        let out = compute(&exp, &participants, chrono::Utc::now());
        assert!(!out.is_significant);
        assert_eq!(out.recommended_action, RecommendedAction::ContinueTest);
    }

    #[test]
    fn clear_gap_is_significant() {
        let exp = experiment(
            100,
            vec![variant("control", true, 100), variant("b", false, 170)],
        );
        let participants =
            HashMap::from([("control".to_string(), 1000), ("b".to_string(), 1000)]);
        let out = compute(&exp, &participants, chrono::Utc::now());
        assert!(out.is_significant);
        assert_eq!(out.recommended_action, RecommendedAction::ImplementWinner);
        assert_eq!(out.best_variant_id.as_deref(), Some("b"));
        assert!(out.lift_pct > 50.0);
    }

    #[test]
    fn noise_is_inconclusive() {
        let exp = experiment(
            100,
            vec![variant("control", true, 100), variant("b", false, 103)],
        );
        let participants =
            HashMap::from([("control".to_string(), 1000), ("b".to_string(), 1000)]);
        let out = compute(&exp, &participants, chrono::Utc::now());
        assert!(!out.is_significant);
        assert_eq!(out.recommended_action, RecommendedAction::Inconclusive);
    }

    #[test]
    fn zero_control_rate_yields_zero_lift() {
        let exp = experiment(
            100,
            vec![variant("control", true, 0), variant("b", false, 30)],
        );
        let participants =
            HashMap::from([("control".to_string(), 500), ("b".to_string(), 500)]);
        let out = compute(&exp, &participants, chrono::Utc::now());
        assert_eq!(out.lift_pct, 0.0);
    }
}
