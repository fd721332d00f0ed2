use crate::clock::Clock;
use crate::domain::pricing::{
    DynamicPricing, MarketState, PriceChange, PriceHistoryEntry, PricingRule,
};
use crate::errors::EngineError;
use crate::pricing::rules;
use crate::store::{StoreError, StorePort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Prices move only when they differ from the current price by at least
/// one cent.
const PRICE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreatePricingInput {
    pub package_id: String,
    pub base_price: f64,
    #[serde(default)]
    pub rules: Vec<PricingRule>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Owns base prices and prioritized rule lists per package, and the
/// market snapshot the rules are evaluated against. Recalculation applies
/// at most the highest-priority matching rule per pass.
#[derive(Clone)]
pub struct PricingEngine {
    pricing: Arc<RwLock<HashMap<String, DynamicPricing>>>,
    market: Arc<RwLock<MarketState>>,
    store: Arc<dyn StorePort>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl PricingEngine {
    pub fn new(store: Arc<dyn StorePort>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            pricing: Arc::new(RwLock::new(HashMap::new())),
            market: Arc::new(RwLock::new(MarketState::default())),
            store,
            clock,
            store_timeout,
        }
    }

    pub async fn hydrate(&self) -> Result<(), EngineError> {
        let entries = self.store.load_pricing().await?;
        let mut guard = self.pricing.write().await;
        for entry in entries {
            guard.insert(entry.package_id.clone(), entry);
        }
        Ok(())
    }

    pub async fn create(&self, input: CreatePricingInput) -> Result<DynamicPricing, EngineError> {
        if input.base_price <= 0.0 {
            return Err(EngineError::Validation(format!(
                "base price must be positive, got {}",
                input.base_price
            )));
        }
        for rule in &input.rules {
            validate_rule(rule)?;
        }

        let now = self.clock.now();
        let mut rules = input.rules;
        for rule in &mut rules {
            if rule.is_active && rule.activated_at.is_none() {
                rule.activated_at = Some(now);
            }
        }

        let entry = DynamicPricing {
            package_id: input.package_id,
            base_price: input.base_price,
            current_price: input.base_price,
            is_active: input.is_active,
            rules,
            history: Vec::new(),
            last_updated: now,
        };

        self.persist_strict(&entry).await?;
        self.pricing
            .write()
            .await
            .insert(entry.package_id.clone(), entry.clone());
        Ok(entry)
    }

    pub async fn add_rule(
        &self,
        package_id: &str,
        mut rule: PricingRule,
    ) -> Result<DynamicPricing, EngineError> {
        validate_rule(&rule)?;
        let now = self.clock.now();
        if rule.is_active && rule.activated_at.is_none() {
            rule.activated_at = Some(now);
        }

        let mut guard = self.pricing.write().await;
        let entry = guard
            .get_mut(package_id)
            .ok_or_else(|| EngineError::NotFound(format!("pricing for package {package_id}")))?;
        entry.rules.push(rule);
        let snapshot = entry.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;
        Ok(snapshot)
    }

    /// Effective price for checkout; None when the package is unknown or
    /// pricing is switched off for it.
    pub async fn current_price(&self, package_id: &str) -> Option<f64> {
        let guard = self.pricing.read().await;
        let entry = guard.get(package_id)?;
        entry.is_active.then_some(entry.current_price)
    }

    pub async fn set_market(&self, market: MarketState) {
        *self.market.write().await = market;
    }

    pub async fn market_snapshot(&self) -> MarketState {
        self.market.read().await.clone()
    }

    /// One recalculation pass for a package: highest-priority matching
    /// active rule wins, adjustment is clamped to that rule's limits, and
    /// a history entry is appended when the price actually moves. Without
    /// a match the price reverts to base.
    pub async fn recalculate(
        &self,
        package_id: &str,
        market: &MarketState,
    ) -> Result<Option<PriceChange>, EngineError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut guard = self.pricing.write().await;
        let entry = guard
            .get_mut(package_id)
            .ok_or_else(|| EngineError::NotFound(format!("pricing for package {package_id}")))?;
        if !entry.is_active {
            return Ok(None);
        }

        let mut sorted: Vec<&PricingRule> =
            entry.rules.iter().filter(|r| r.is_active).collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        let matched = sorted.into_iter().find(|r| rules::matches(r, market, now));

        let (target, reason, rule_id, rate_limits) = match matched {
            Some(rule) => (
                rules::clamp(rules::target_price(entry.base_price, rule, now), &rule.limits),
                rule.name.clone(),
                Some(rule.rule_id.clone()),
                Some((
                    rule.limits.max_daily_changes,
                    rule.limits.min_minutes_between_changes,
                )),
            ),
            None => (
                entry.base_price,
                "no rule matched, reverting to base price".to_string(),
                None,
                None,
            ),
        };

        if (target - entry.current_price).abs() < PRICE_EPSILON {
            return Ok(None);
        }

        if let Some((max_daily, min_spacing)) = rate_limits {
            if let Some(max_daily) = max_daily {
                if rules::changes_today(&entry.history, today) >= max_daily {
                    tracing::debug!("package {package_id}: daily change budget exhausted");
                    return Ok(None);
                }
            }
            if let Some(min_minutes) = min_spacing {
                if (now - entry.last_updated).num_minutes() < min_minutes {
                    return Ok(None);
                }
            }
        }

        let change = PriceChange {
            package_id: entry.package_id.clone(),
            old_price: entry.current_price,
            new_price: target,
            rule_id: rule_id.clone(),
        };

        entry.history.push(PriceHistoryEntry {
            price: target,
            recorded_at: now,
            reason,
            rule_id,
        });
        entry.current_price = target;
        entry.last_updated = now;

        let snapshot = entry.clone();
        drop(guard);
        self.persist_soft(&snapshot).await;
        Ok(Some(change))
    }

    /// Recalculates every active package. One package failing never stops
    /// the others.
    pub async fn recalculate_all(&self, seasonal_categories: Vec<String>) -> usize {
        let market = {
            let mut market = self.market.read().await.clone();
            market.active_seasonal_categories = seasonal_categories;
            market
        };

        let package_ids: Vec<String> = self.pricing.read().await.keys().cloned().collect();
        let mut changed = 0;
        for package_id in package_ids {
            match self.recalculate(&package_id, &market).await {
                Ok(Some(change)) => {
                    changed += 1;
                    tracing::info!(
                        "package {} repriced {:.2} -> {:.2}",
                        change.package_id,
                        change.old_price,
                        change.new_price
                    );
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!("recalculation failed for package {package_id}: {err}");
                }
            }
        }
        changed
    }

    pub async fn get(&self, package_id: &str) -> Option<DynamicPricing> {
        self.pricing.read().await.get(package_id).cloned()
    }

    pub async fn list(&self) -> Vec<DynamicPricing> {
        let mut all: Vec<DynamicPricing> = self.pricing.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.package_id.cmp(&b.package_id));
        all
    }

    async fn persist_strict(&self, entry: &DynamicPricing) -> Result<(), EngineError> {
        match tokio::time::timeout(self.store_timeout, self.store.save_pricing(entry)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(EngineError::Storage(err)),
            Err(_) => Err(EngineError::Storage(StoreError::Timeout)),
        }
    }

    async fn persist_soft(&self, entry: &DynamicPricing) {
        match tokio::time::timeout(self.store_timeout, self.store.save_pricing(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!("pricing {} save failed: {}", entry.package_id, err);
            }
            Err(_) => {
                tracing::warn!("pricing {} save timed out", entry.package_id);
            }
        }
    }
}

fn validate_rule(rule: &PricingRule) -> Result<(), EngineError> {
    if rule.limits.minimum_price > rule.limits.maximum_price {
        return Err(EngineError::Validation(format!(
            "rule {}: minimum price exceeds maximum",
            rule.rule_id
        )));
    }
    if let crate::domain::pricing::PriceAdjustment::SetPrice { value } = rule.adjustment {
        if value <= 0.0 {
            return Err(EngineError::Validation(format!(
                "rule {}: set price must be positive",
                rule.rule_id
            )));
        }
    }
    Ok(())
}
