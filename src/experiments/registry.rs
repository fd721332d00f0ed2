use crate::clock::Clock;
use crate::domain::experiment::{
    EventType, Experiment, ExperimentResults, ExperimentStatus, MetricsConfig, TrackedEvent,
    UserAssignment, Variant,
};
use crate::domain::targeting::{TargetingCriteria, UserAttributes};
use crate::errors::EngineError;
use crate::experiments::{assigner, results, targeting};
use crate::store::{StoreError, StorePort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct VariantDef {
    pub variant_id: Option<String>,
    pub name: String,
    pub traffic_split: f64,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateExperimentInput {
    pub name: String,
    pub traffic_allocation_pct: f64,
    pub variants: Vec<VariantDef>,
    #[serde(default)]
    pub targeting: TargetingCriteria,
    pub metrics: MetricsConfig,
}

/// Owns experiment definitions, lifecycle, sticky assignments, and event
/// counters. All mutation goes through the registry write locks; the
/// store is a best-effort write-through on the request path and strict
/// on admin operations.
#[derive(Clone)]
pub struct ExperimentRegistry {
    experiments: Arc<RwLock<HashMap<Uuid, Experiment>>>,
    assignments: Arc<RwLock<HashMap<(Uuid, String), UserAssignment>>>,
    store: Arc<dyn StorePort>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl ExperimentRegistry {
    pub fn new(store: Arc<dyn StorePort>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            experiments: Arc::new(RwLock::new(HashMap::new())),
            assignments: Arc::new(RwLock::new(HashMap::new())),
            store,
            clock,
            store_timeout,
        }
    }

    /// Loads persisted experiments and assignments into the registry.
    pub async fn hydrate(&self) -> Result<(), EngineError> {
        let experiments = self.store.load_experiments().await?;
        let assignments = self.store.load_assignments().await?;

        let mut exp_guard = self.experiments.write().await;
        for experiment in experiments {
            exp_guard.insert(experiment.experiment_id, experiment);
        }
        drop(exp_guard);

        let mut assign_guard = self.assignments.write().await;
        for assignment in assignments {
            assign_guard.insert(
                (assignment.experiment_id, assignment.user_id.clone()),
                assignment,
            );
        }
        Ok(())
    }

    pub async fn create(&self, input: CreateExperimentInput) -> Result<Experiment, EngineError> {
        if input.variants.is_empty() {
            return Err(EngineError::Validation(
                "experiment needs at least one variant".to_string(),
            ));
        }

        let split_sum: f64 = input.variants.iter().map(|v| v.traffic_split).sum();
        if (split_sum - 100.0).abs() > 0.01 {
            return Err(EngineError::Validation(format!(
                "variant traffic splits must sum to 100, got {split_sum}"
            )));
        }

        let controls = input.variants.iter().filter(|v| v.is_control).count();
        if controls != 1 {
            return Err(EngineError::Validation(format!(
                "exactly one control variant required, got {controls}"
            )));
        }

        if !(0.0..=100.0).contains(&input.traffic_allocation_pct) {
            return Err(EngineError::Validation(format!(
                "traffic allocation must be 0-100, got {}",
                input.traffic_allocation_pct
            )));
        }

        let experiment = Experiment {
            experiment_id: Uuid::new_v4(),
            name: input.name,
            status: ExperimentStatus::Draft,
            traffic_allocation_pct: input.traffic_allocation_pct,
            variants: input
                .variants
                .into_iter()
                .enumerate()
                .map(|(i, def)| Variant {
                    variant_id: def.variant_id.unwrap_or_else(|| {
                        if def.is_control {
                            "control".to_string()
                        } else {
                            format!("variant-{}", i + 1)
                        }
                    }),
                    name: def.name,
                    traffic_split: def.traffic_split,
                    is_control: def.is_control,
                    config: def.config,
                    views: 0,
                    clicks: 0,
                    conversions: 0,
                    revenue: 0.0,
                })
                .collect(),
            targeting: input.targeting,
            metrics: input.metrics,
            created_at: self.clock.now(),
            started_at: None,
            completed_at: None,
            final_results: None,
        };

        self.persist_strict(&experiment).await?;
        self.experiments
            .write()
            .await
            .insert(experiment.experiment_id, experiment.clone());
        Ok(experiment)
    }

    pub async fn start(&self, experiment_id: Uuid) -> Result<Experiment, EngineError> {
        self.transition(experiment_id, |status| match status {
            ExperimentStatus::Draft => Ok(ExperimentStatus::Running),
            other => Err(format!("cannot start experiment in {other:?} state")),
        })
        .await
    }

    pub async fn pause(&self, experiment_id: Uuid) -> Result<Experiment, EngineError> {
        self.transition(experiment_id, |status| match status {
            ExperimentStatus::Running => Ok(ExperimentStatus::Paused),
            other => Err(format!("cannot pause experiment in {other:?} state")),
        })
        .await
    }

    pub async fn resume(&self, experiment_id: Uuid) -> Result<Experiment, EngineError> {
        self.transition(experiment_id, |status| match status {
            ExperimentStatus::Paused => Ok(ExperimentStatus::Running),
            other => Err(format!("cannot resume experiment in {other:?} state")),
        })
        .await
    }

    /// Completes the experiment, computing and freezing final results.
    pub async fn complete(&self, experiment_id: Uuid) -> Result<Experiment, EngineError> {
        let participants = self.participants_by_variant(experiment_id).await;
        let now = self.clock.now();

        let mut guard = self.experiments.write().await;
        let experiment = guard
            .get_mut(&experiment_id)
            .ok_or_else(|| EngineError::NotFound(format!("experiment {experiment_id}")))?;

        match experiment.status {
            ExperimentStatus::Running | ExperimentStatus::Paused => {}
            other => {
                return Err(EngineError::InvalidState(format!(
                    "cannot complete experiment in {other:?} state"
                )))
            }
        }

        experiment.status = ExperimentStatus::Completed;
        experiment.completed_at = Some(now);
        experiment.final_results = Some(results::compute(experiment, &participants, now));

        let snapshot = experiment.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;
        Ok(snapshot)
    }

    /// Sticky variant assignment. Returns None for unknown or non-running
    /// experiments, targeting misses, and users outside the traffic gate.
    pub async fn assign(
        &self,
        experiment_id: Uuid,
        attrs: &UserAttributes,
    ) -> Option<String> {
        let experiments = self.experiments.read().await;
        let experiment = experiments.get(&experiment_id)?;

        // Check-and-insert under one write guard: a second concurrent
        // caller observes the first caller's assignment.
        let mut assignments = self.assignments.write().await;
        let key = (experiment_id, attrs.user_id.clone());
        if let Some(existing) = assignments.get(&key) {
            return Some(existing.variant_id.clone());
        }

        if experiment.status != ExperimentStatus::Running {
            return None;
        }

        if !targeting::matches(&experiment.targeting, attrs) {
            return None;
        }

        let variant = assigner::pick_variant(experiment, &attrs.user_id)?;
        let assignment = UserAssignment {
            user_id: attrs.user_id.clone(),
            experiment_id,
            variant_id: variant.variant_id.clone(),
            assigned_at: self.clock.now(),
            converted: false,
            conversion_value: 0.0,
            events: Vec::new(),
        };
        assignments.insert(key, assignment.clone());
        drop(assignments);
        drop(experiments);

        self.persist_assignment_soft(&assignment).await;
        Some(assignment.variant_id)
    }

    /// Records an event against the caller's assignment. Silent no-op when
    /// no assignment exists or the experiment is not running: telemetry
    /// must never break checkout.
    pub async fn track(
        &self,
        experiment_id: Uuid,
        user_id: &str,
        event_type: EventType,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        let now = self.clock.now();
        let mut experiments = self.experiments.write().await;
        let Some(experiment) = experiments.get_mut(&experiment_id) else {
            return;
        };
        if experiment.status != ExperimentStatus::Running {
            return;
        }

        let mut assignments = self.assignments.write().await;
        let Some(assignment) = assignments.get_mut(&(experiment_id, user_id.to_string())) else {
            return;
        };

        let Some(variant) = experiment
            .variants
            .iter_mut()
            .find(|v| v.variant_id == assignment.variant_id)
        else {
            return;
        };

        match event_type {
            EventType::View => variant.views += 1,
            EventType::Click => variant.clicks += 1,
            EventType::Purchase => {
                if let Some(amount) = metadata.get("amount").and_then(|v| v.as_f64()) {
                    variant.conversions += 1;
                    variant.revenue += amount;
                    assignment.converted = true;
                    assignment.conversion_value = amount;
                }
            }
            EventType::AddToCart | EventType::CheckoutStart => {}
        }

        assignment.events.push(TrackedEvent {
            event_type,
            variant_id: assignment.variant_id.clone(),
            occurred_at: now,
            metadata,
        });

        let assignment_snapshot = assignment.clone();
        let experiment_snapshot = experiment.clone();
        drop(assignments);
        drop(experiments);

        self.persist_soft(&experiment_snapshot).await;
        self.persist_assignment_soft(&assignment_snapshot).await;
    }

    /// On-demand results for a running or completed experiment. Completed
    /// experiments return their frozen results.
    pub async fn results(&self, experiment_id: Uuid) -> Result<ExperimentResults, EngineError> {
        let frozen = {
            let guard = self.experiments.read().await;
            let experiment = guard
                .get(&experiment_id)
                .ok_or_else(|| EngineError::NotFound(format!("experiment {experiment_id}")))?;
            experiment.final_results.clone()
        };
        if let Some(results) = frozen {
            return Ok(results);
        }

        let participants = self.participants_by_variant(experiment_id).await;
        let guard = self.experiments.read().await;
        let experiment = guard
            .get(&experiment_id)
            .ok_or_else(|| EngineError::NotFound(format!("experiment {experiment_id}")))?;
        Ok(results::compute(experiment, &participants, self.clock.now()))
    }

    pub async fn variant_config(
        &self,
        experiment_id: Uuid,
        variant_id: &str,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        let guard = self.experiments.read().await;
        guard
            .get(&experiment_id)?
            .variants
            .iter()
            .find(|v| v.variant_id == variant_id)
            .map(|v| v.config.clone())
    }

    pub async fn get(&self, experiment_id: Uuid) -> Option<Experiment> {
        self.experiments.read().await.get(&experiment_id).cloned()
    }

    pub async fn list(&self) -> Vec<Experiment> {
        let mut all: Vec<Experiment> = self.experiments.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub async fn assignment_for(
        &self,
        experiment_id: Uuid,
        user_id: &str,
    ) -> Option<UserAssignment> {
        self.assignments
            .read()
            .await
            .get(&(experiment_id, user_id.to_string()))
            .cloned()
    }

    async fn participants_by_variant(&self, experiment_id: Uuid) -> HashMap<String, u64> {
        let guard = self.assignments.read().await;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for assignment in guard.values() {
            if assignment.experiment_id == experiment_id {
                *counts.entry(assignment.variant_id.clone()).or_default() += 1;
            }
        }
        counts
    }

    async fn transition(
        &self,
        experiment_id: Uuid,
        step: impl FnOnce(ExperimentStatus) -> Result<ExperimentStatus, String>,
    ) -> Result<Experiment, EngineError> {
        let now = self.clock.now();
        let mut guard = self.experiments.write().await;
        let experiment = guard
            .get_mut(&experiment_id)
            .ok_or_else(|| EngineError::NotFound(format!("experiment {experiment_id}")))?;

        let next = step(experiment.status).map_err(EngineError::InvalidState)?;
        if next == ExperimentStatus::Running && experiment.started_at.is_none() {
            experiment.started_at = Some(now);
        }
        experiment.status = next;

        let snapshot = experiment.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;
        Ok(snapshot)
    }

    async fn persist_strict(&self, experiment: &Experiment) -> Result<(), EngineError> {
        match tokio::time::timeout(self.store_timeout, self.store.save_experiment(experiment)).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(EngineError::Storage(err)),
            Err(_) => Err(EngineError::Storage(StoreError::Timeout)),
        }
    }

    async fn persist_soft(&self, experiment: &Experiment) {
        match tokio::time::timeout(self.store_timeout, self.store.save_experiment(experiment)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!("experiment {} save failed: {}", experiment.experiment_id, err);
            }
            Err(_) => {
                tracing::warn!("experiment {} save timed out", experiment.experiment_id);
            }
        }
    }

    async fn persist_assignment_soft(&self, assignment: &UserAssignment) {
        match tokio::time::timeout(self.store_timeout, self.store.save_assignment(assignment)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(
                    "assignment ({}, {}) save failed: {}",
                    assignment.experiment_id,
                    assignment.user_id,
                    err
                );
            }
            Err(_) => {
                tracing::warn!(
                    "assignment ({}, {}) save timed out",
                    assignment.experiment_id,
                    assignment.user_id
                );
            }
        }
    }
}
