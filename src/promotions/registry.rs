use crate::clock::Clock;
use crate::domain::promotion::{
    ApplyOutcome, Conditions, DiscountKind, DiscountResult, Display, IneligibleReason, PackageData,
    Promotion, PromotionAnalytics, PromotionStatus, UsageLimits,
};
use crate::domain::targeting::{TargetingCriteria, UserAttributes};
use crate::errors::EngineError;
use crate::experiments::targeting;
use crate::promotions::{discount, eligibility};
use crate::store::{StoreError, StorePort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreatePromotionInput {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
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
}

/// Owns promotion definitions, eligibility, and redemption counters.
/// The apply path runs its usage-limit check and counter increment under
/// a single write guard, so caps cannot be over-redeemed concurrently.
#[derive(Clone)]
pub struct PromotionRegistry {
    promotions: Arc<RwLock<HashMap<String, Promotion>>>,
    store: Arc<dyn StorePort>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl PromotionRegistry {
    pub fn new(store: Arc<dyn StorePort>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            promotions: Arc::new(RwLock::new(HashMap::new())),
            store,
            clock,
            store_timeout,
        }
    }

    pub async fn hydrate(&self) -> Result<(), EngineError> {
        let promotions = self.store.load_promotions().await?;
        let mut guard = self.promotions.write().await;
        for promotion in promotions {
            guard.insert(promotion.promotion_id.clone(), promotion);
        }
        Ok(())
    }

    pub async fn create(&self, input: CreatePromotionInput) -> Result<Promotion, EngineError> {
        validate(&input)?;
        let now = self.clock.now();

        let status = if input.starts_at > now {
            PromotionStatus::Scheduled
        } else {
            PromotionStatus::Active
        };

        let promotion = Promotion {
            promotion_id: Uuid::new_v4().to_string(),
            name: input.name,
            status,
            priority: input.priority,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            utc_offset_minutes: input.utc_offset_minutes,
            target_packages: input.target_packages,
            targeting: input.targeting,
            discount: input.discount,
            limits: input.limits,
            conditions: input.conditions,
            display: input.display,
            analytics: PromotionAnalytics::default(),
            created_at: now,
        };

        self.persist_strict(&promotion).await?;
        self.promotions
            .write()
            .await
            .insert(promotion.promotion_id.clone(), promotion.clone());
        Ok(promotion)
    }

    /// Inserts a pre-built promotion unless one with the same id exists.
    /// Seasonal materialization relies on this for idempotence.
    pub async fn insert_if_absent(&self, promotion: Promotion) -> Result<bool, EngineError> {
        let mut guard = self.promotions.write().await;
        if guard.contains_key(&promotion.promotion_id) {
            return Ok(false);
        }
        guard.insert(promotion.promotion_id.clone(), promotion.clone());
        drop(guard);
        self.persist_soft(&promotion).await;
        Ok(true)
    }

    /// Active promotions visible for a package/user, highest priority first.
    pub async fn list_active(
        &self,
        package_id: Option<&str>,
        attrs: Option<&UserAttributes>,
    ) -> Vec<Promotion> {
        let now = self.clock.now();
        let today = now.date_naive();
        let guard = self.promotions.read().await;

        let mut visible: Vec<Promotion> = guard
            .values()
            .filter(|p| p.status == PromotionStatus::Active)
            .filter(|p| p.starts_at <= now && now <= p.ends_at)
            .filter(|p| match package_id {
                Some(id) => p.target_packages.is_empty() || p.target_packages.iter().any(|t| t == id),
                None => true,
            })
            .filter(|p| match attrs {
                Some(attrs) => targeting::matches(&p.targeting, attrs),
                None => true,
            })
            .filter(|p| {
                eligibility::usage_ok(&p.limits, attrs.map(|a| a.user_id.as_str()), today).is_ok()
            })
            .cloned()
            .collect();

        visible.sort_by(|a, b| b.priority.cmp(&a.priority));
        visible
    }

    /// Validates and redeems a promotion. Unknown ids are `NotFound`;
    /// every eligibility miss is a typed `Ineligible` outcome so checkout
    /// can always fall back to full price.
    pub async fn apply(
        &self,
        promotion_id: &str,
        amount: f64,
        package: &PackageData,
        attrs: Option<&UserAttributes>,
    ) -> Result<ApplyOutcome, EngineError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut guard = self.promotions.write().await;
        let promotion = guard
            .get_mut(promotion_id)
            .ok_or_else(|| EngineError::NotFound(format!("promotion {promotion_id}")))?;

        if let Err(reason) = eligible(promotion, amount, package, attrs, now) {
            return Ok(ApplyOutcome::Ineligible { reason });
        }

        let user_id = attrs.map(|a| a.user_id.as_str());
        if let Err(reason) = eligibility::usage_ok(&promotion.limits, user_id, today) {
            return Ok(ApplyOutcome::Ineligible { reason });
        }

        let computed = discount::compute(
            &promotion.discount,
            amount,
            package,
            promotion.limits.max_discount_amount,
        );
        let result = DiscountResult {
            discount_amount: computed.discount_amount,
            final_amount: (amount - computed.discount_amount).max(0.0),
            bonus_coins: computed.bonus_coins,
        };

        eligibility::record_usage(&mut promotion.limits, user_id, today);
        promotion.analytics.times_applied += 1;
        promotion.analytics.total_savings_provided += result.discount_amount;
        promotion.analytics.revenue_attributed += result.final_amount;

        let snapshot = promotion.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;

        Ok(ApplyOutcome::Applied(result))
    }

    /// Flips scheduled promotions active at their start and expires past
    /// ones. Driven by the background scheduler.
    pub async fn refresh_statuses(&self, now: chrono::DateTime<chrono::Utc>) {
        let mut changed = Vec::new();
        {
            let mut guard = self.promotions.write().await;
            for promotion in guard.values_mut() {
                let next = match promotion.status {
                    PromotionStatus::Scheduled if now > promotion.ends_at => {
                        Some(PromotionStatus::Expired)
                    }
                    PromotionStatus::Scheduled if now >= promotion.starts_at => {
                        Some(PromotionStatus::Active)
                    }
                    PromotionStatus::Active if now > promotion.ends_at => {
                        Some(PromotionStatus::Expired)
                    }
                    _ => None,
                };
                if let Some(next) = next {
                    promotion.status = next;
                    changed.push(promotion.clone());
                }
            }
        }
        for promotion in changed {
            self.persist_soft(&promotion).await;
        }
    }

    pub async fn pause(&self, promotion_id: &str) -> Result<Promotion, EngineError> {
        self.transition(promotion_id, PromotionStatus::Active, PromotionStatus::Paused)
            .await
    }

    pub async fn resume(&self, promotion_id: &str) -> Result<Promotion, EngineError> {
        self.transition(promotion_id, PromotionStatus::Paused, PromotionStatus::Active)
            .await
    }

    pub async fn get(&self, promotion_id: &str) -> Option<Promotion> {
        self.promotions.read().await.get(promotion_id).cloned()
    }

    pub async fn list(&self) -> Vec<Promotion> {
        let mut all: Vec<Promotion> = self.promotions.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        all
    }

    async fn transition(
        &self,
        promotion_id: &str,
        from: PromotionStatus,
        to: PromotionStatus,
    ) -> Result<Promotion, EngineError> {
        let mut guard = self.promotions.write().await;
        let promotion = guard
            .get_mut(promotion_id)
            .ok_or_else(|| EngineError::NotFound(format!("promotion {promotion_id}")))?;
        if promotion.status != from {
            return Err(EngineError::InvalidState(format!(
                "promotion {promotion_id} is {:?}, expected {from:?}",
                promotion.status
            )));
        }
        promotion.status = to;
        let snapshot = promotion.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;
        Ok(snapshot)
    }

    async fn persist_strict(&self, promotion: &Promotion) -> Result<(), EngineError> {
        match tokio::time::timeout(self.store_timeout, self.store.save_promotion(promotion)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(EngineError::Storage(err)),
            Err(_) => Err(EngineError::Storage(StoreError::Timeout)),
        }
    }

    async fn persist_soft(&self, promotion: &Promotion) {
        match tokio::time::timeout(self.store_timeout, self.store.save_promotion(promotion)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!("promotion {} save failed: {}", promotion.promotion_id, err);
            }
            Err(_) => {
                tracing::warn!("promotion {} save timed out", promotion.promotion_id);
            }
        }
    }
}

fn eligible(
    promotion: &Promotion,
    amount: f64,
    package: &PackageData,
    attrs: Option<&UserAttributes>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(), IneligibleReason> {
    if promotion.status != PromotionStatus::Active {
        return Err(IneligibleReason::NotActive);
    }
    if now < promotion.starts_at || now > promotion.ends_at {
        return Err(IneligibleReason::OutsideWindow);
    }
    if !promotion.target_packages.is_empty()
        && !promotion
            .target_packages
            .iter()
            .any(|t| t == &package.package_id)
    {
        return Err(IneligibleReason::PackageNotEligible);
    }
    // bundle discounts bind to their own package list, independent of
    // target_packages
    if let DiscountKind::Bundle { package_ids, .. } = &promotion.discount {
        if !package_ids.iter().any(|p| p == &package.package_id) {
            return Err(IneligibleReason::PackageNotEligible);
        }
    }
    if let Some(attrs) = attrs {
        if !targeting::matches(&promotion.targeting, attrs) {
            return Err(IneligibleReason::TargetingMiss);
        }
    }
    eligibility::check_conditions(
        &promotion.conditions,
        amount,
        attrs,
        now,
        promotion.utc_offset_minutes,
    )
}

fn validate(input: &CreatePromotionInput) -> Result<(), EngineError> {
    if input.ends_at <= input.starts_at {
        return Err(EngineError::Validation(
            "promotion window must end after it starts".to_string(),
        ));
    }
    let pct = match &input.discount {
        DiscountKind::PercentageOff { pct }
        | DiscountKind::Bundle { pct, .. }
        | DiscountKind::FlashSale { pct } => Some(*pct),
        _ => None,
    };
    if let Some(pct) = pct {
        if !(0.0..=100.0).contains(&pct) {
            return Err(EngineError::Validation(format!(
                "discount percentage must be 0-100, got {pct}"
            )));
        }
    }
    if let DiscountKind::FixedAmountOff { amount } = &input.discount {
        if *amount < 0.0 {
            return Err(EngineError::Validation(
                "fixed discount must be non-negative".to_string(),
            ));
        }
    }
    Ok(())
}
