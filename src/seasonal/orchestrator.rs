use crate::clock::Clock;
use crate::domain::promotion::{Display, Promotion, PromotionAnalytics, PromotionStatus, UsageLimits};
use crate::domain::seasonal::{PromotionTemplate, SeasonalEvent};
use crate::errors::EngineError;
use crate::promotions::registry::PromotionRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateSeasonalEventInput {
    pub name: String,
    pub category: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    #[serde(default = "default_global")]
    pub global: bool,
    #[serde(default)]
    pub regions: Vec<String>,
    pub templates: Vec<PromotionTemplate>,
    pub expected_lift_pct: Option<f64>,
}

fn default_intensity() -> f64 {
    1.0
}

fn default_global() -> bool {
    true
}

/// Owns time-boxed campaigns and spawns promotions from their templates.
/// Materialized promotions get deterministic `{event}:{template}` ids, so
/// re-activating an event never duplicates them.
#[derive(Clone)]
pub struct SeasonalOrchestrator {
    events: Arc<RwLock<HashMap<Uuid, SeasonalEvent>>>,
    promotions: PromotionRegistry,
    clock: Arc<dyn Clock>,
}

impl SeasonalOrchestrator {
    pub fn new(promotions: PromotionRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
            promotions,
            clock,
        }
    }

    pub async fn create(&self, input: CreateSeasonalEventInput) -> Result<SeasonalEvent, EngineError> {
        if input.ends_at <= input.starts_at {
            return Err(EngineError::Validation(
                "seasonal event window must end after it starts".to_string(),
            ));
        }
        if input.templates.is_empty() {
            return Err(EngineError::Validation(
                "seasonal event needs at least one promotion template".to_string(),
            ));
        }

        let event = SeasonalEvent {
            event_id: Uuid::new_v4(),
            name: input.name,
            category: input.category,
            intensity: input.intensity.clamp(0.0, 1.0),
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            global: input.global,
            regions: input.regions,
            templates: input.templates,
            expected_lift_pct: input.expected_lift_pct,
            materialized: false,
        };

        self.events.write().await.insert(event.event_id, event.clone());
        Ok(event)
    }

    /// Spawns one scheduled promotion per template; the scheduler's status
    /// refresh flips them active at the event's start. Idempotent.
    pub async fn activate(&self, event_id: Uuid) -> Result<Vec<Promotion>, EngineError> {
        let event = self
            .events
            .read()
            .await
            .get(&event_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("seasonal event {event_id}")))?;

        let now = self.clock.now();
        let mut spawned = Vec::new();
        for template in &event.templates {
            let promotion = materialize(&event, template, now);
            if self.promotions.insert_if_absent(promotion.clone()).await? {
                spawned.push(promotion);
            }
        }

        if let Some(event) = self.events.write().await.get_mut(&event_id) {
            event.materialized = true;
        }

        tracing::info!(
            "seasonal event {} materialized {} promotion(s)",
            event.name,
            spawned.len()
        );
        Ok(spawned)
    }

    /// Events whose window has opened but which have not been materialized.
    pub async fn due_events(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<Uuid> {
        self.events
            .read()
            .await
            .values()
            .filter(|e| !e.materialized && e.starts_at <= now && now <= e.ends_at)
            .map(|e| e.event_id)
            .collect()
    }

    /// Categories of events currently in-window, fed to pricing rules.
    pub async fn active_categories(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<String> {
        let mut categories: Vec<String> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.starts_at <= now && now <= e.ends_at)
            .map(|e| e.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub async fn get(&self, event_id: Uuid) -> Option<SeasonalEvent> {
        self.events.read().await.get(&event_id).cloned()
    }

    pub async fn list(&self) -> Vec<SeasonalEvent> {
        let mut all: Vec<SeasonalEvent> = self.events.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        all
    }
}

fn materialize(
    event: &SeasonalEvent,
    template: &PromotionTemplate,
    now: chrono::DateTime<chrono::Utc>,
) -> Promotion {
    Promotion {
        promotion_id: format!("{}:{}", event.event_id, template.template_id),
        name: format!("{} - {}", event.name, template.name),
        status: PromotionStatus::Scheduled,
        priority: template.priority,
        starts_at: event.starts_at,
        ends_at: event.ends_at,
        utc_offset_minutes: 0,
        target_packages: template.target_packages.clone(),
        targeting: Default::default(),
        discount: template.discount.clone(),
        limits: UsageLimits::default(),
        conditions: template.conditions.clone(),
        display: Display {
            title: template.name.clone(),
            description: event.name.clone(),
            badge: Some(event.category.clone()),
            highlight_color: None,
        },
        analytics: PromotionAnalytics::default(),
        created_at: now,
    }
}
