use chrono::TimeZone;
use std::sync::Arc;
use std::time::Duration;
use storefront_engine::clock::{Clock, ManualClock};
use storefront_engine::domain::promotion::{
    ApplyOutcome, CoinBonus, Conditions, DiscountKind, IneligibleReason, PackageData,
    PromotionStatus, UsageLimits,
};
use storefront_engine::domain::targeting::TargetingCriteria;
use storefront_engine::errors::EngineError;
use storefront_engine::promotions::registry::{CreatePromotionInput, PromotionRegistry};
use storefront_engine::store::memory::MemoryStore;

fn clock() -> ManualClock {
    ManualClock::new(chrono::Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap())
}

fn registry(clock: &ManualClock) -> PromotionRegistry {
    PromotionRegistry::new(
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
        Duration::from_millis(500),
    )
}

fn package() -> PackageData {
    PackageData {
        package_id: "coins_500".to_string(),
        coins: 500,
    }
}

fn input(discount: DiscountKind, limits: UsageLimits) -> CreatePromotionInput {
    let starts = chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let ends = chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    CreatePromotionInput {
        name: "new year".to_string(),
        priority: 5,
        starts_at: starts,
        ends_at: ends,
        utc_offset_minutes: 0,
        target_packages: Vec::new(),
        targeting: TargetingCriteria::default(),
        discount,
        limits,
        conditions: Conditions::default(),
        display: Default::default(),
    }
}

#[tokio::test]
async fn fixed_discount_is_capped() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::FixedAmountOff { amount: 5.0 },
            UsageLimits {
                max_discount_amount: Some(3.0),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let outcome = registry
        .apply(&promo.promotion_id, 10.0, &package(), None)
        .await
        .unwrap();
    match outcome {
        ApplyOutcome::Applied(result) => {
            assert_eq!(result.discount_amount, 3.0);
            assert_eq!(result.final_amount, 7.0);
        }
        other => panic!("expected applied, got {other:?}"),
    }
}

#[tokio::test]
async fn discount_never_drives_amount_negative() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::FixedAmountOff { amount: 50.0 },
            UsageLimits::default(),
        ))
        .await
        .unwrap();

    let outcome = registry
        .apply(&promo.promotion_id, 4.0, &package(), None)
        .await
        .unwrap();
    match outcome {
        ApplyOutcome::Applied(result) => {
            assert_eq!(result.final_amount, 0.0);
            assert_eq!(result.discount_amount, 4.0);
        }
        other => panic!("expected applied, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_promotion_is_not_found() {
    let clock = clock();
    let registry = registry(&clock);
    let err = registry
        .apply("missing", 10.0, &package(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn minimum_cart_value_is_soft_ineligibility() {
    let clock = clock();
    let registry = registry(&clock);
    let mut def = input(DiscountKind::PercentageOff { pct: 10.0 }, UsageLimits::default());
    def.conditions.min_purchase_amount = Some(20.0);
    let promo = registry.create(def).await.unwrap();

    let outcome = registry
        .apply(&promo.promotion_id, 10.0, &package(), None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ApplyOutcome::Ineligible {
            reason: IneligibleReason::BelowMinimumAmount
        }
    ));
}

#[tokio::test]
async fn concurrent_applies_cannot_exceed_total_limit() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::PercentageOff { pct: 10.0 },
            UsageLimits {
                total_limit: Some(1),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let pkg_a = package();
    let pkg_b = package();
    let a = registry.apply(&promo.promotion_id, 10.0, &pkg_a, None);
    let b = registry.apply(&promo.promotion_id, 10.0, &pkg_b, None);
    let (a, b) = tokio::join!(a, b);

    let outcomes = [a.unwrap(), b.unwrap()];
    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, ApplyOutcome::Applied(_)))
        .count();
    let exhausted = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                ApplyOutcome::Ineligible {
                    reason: IneligibleReason::UsageLimitReached
                }
            )
        })
        .count();
    assert_eq!(applied, 1);
    assert_eq!(exhausted, 1);

    let promo = registry.get(&promo.promotion_id).await.unwrap();
    assert_eq!(promo.limits.usage_count, 1);
}

#[tokio::test]
async fn per_user_limit_is_per_user() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::PercentageOff { pct: 10.0 },
            UsageLimits {
                per_user_limit: Some(1),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let alice = storefront_engine::domain::targeting::UserAttributes::anonymous("alice");
    let bob = storefront_engine::domain::targeting::UserAttributes::anonymous("bob");

    let first = registry
        .apply(&promo.promotion_id, 10.0, &package(), Some(&alice))
        .await
        .unwrap();
    assert!(matches!(first, ApplyOutcome::Applied(_)));

    let second = registry
        .apply(&promo.promotion_id, 10.0, &package(), Some(&alice))
        .await
        .unwrap();
    assert!(matches!(
        second,
        ApplyOutcome::Ineligible {
            reason: IneligibleReason::UserLimitReached
        }
    ));

    let other = registry
        .apply(&promo.promotion_id, 10.0, &package(), Some(&bob))
        .await
        .unwrap();
    assert!(matches!(other, ApplyOutcome::Applied(_)));
}

#[tokio::test]
async fn bonus_coins_do_not_discount_price() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::BonusCoins {
                bonus: CoinBonus::PercentOfBase { pct: 20.0 },
            },
            UsageLimits::default(),
        ))
        .await
        .unwrap();

    let outcome = registry
        .apply(&promo.promotion_id, 10.0, &package(), None)
        .await
        .unwrap();
    match outcome {
        ApplyOutcome::Applied(result) => {
            assert_eq!(result.discount_amount, 0.0);
            assert_eq!(result.final_amount, 10.0);
            assert_eq!(result.bonus_coins, 100);
        }
        other => panic!("expected applied, got {other:?}"),
    }
}

#[tokio::test]
async fn bundle_discount_binds_to_its_package_list() {
    let clock = clock();
    let registry = registry(&clock);
    let promo = registry
        .create(input(
            DiscountKind::Bundle {
                package_ids: vec!["coins_500".to_string(), "coins_1200".to_string()],
                pct: 10.0,
            },
            UsageLimits::default(),
        ))
        .await
        .unwrap();

    let outcome = registry
        .apply(&promo.promotion_id, 10.0, &package(), None)
        .await
        .unwrap();
    match outcome {
        ApplyOutcome::Applied(result) => assert_eq!(result.discount_amount, 1.0),
        other => panic!("expected applied, got {other:?}"),
    }

    let outside = PackageData {
        package_id: "coins_100".to_string(),
        coins: 100,
    };
    let outcome = registry
        .apply(&promo.promotion_id, 10.0, &outside, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ApplyOutcome::Ineligible {
            reason: IneligibleReason::PackageNotEligible
        }
    ));
}

#[tokio::test]
async fn active_listing_sorts_by_priority_and_respects_windows() {
    let clock = clock();
    let registry = registry(&clock);

    let mut low = input(DiscountKind::PercentageOff { pct: 5.0 }, UsageLimits::default());
    low.priority = 1;
    low.name = "low".to_string();
    let mut high = input(DiscountKind::PercentageOff { pct: 10.0 }, UsageLimits::default());
    high.priority = 9;
    high.name = "high".to_string();
    let mut future = input(DiscountKind::PercentageOff { pct: 50.0 }, UsageLimits::default());
    future.name = "future".to_string();
    future.starts_at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    future.ends_at = chrono::Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

    registry.create(low).await.unwrap();
    registry.create(high).await.unwrap();
    let future = registry.create(future).await.unwrap();
    assert_eq!(future.status, PromotionStatus::Scheduled);

    let active = registry.list_active(None, None).await;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].name, "high");
    assert_eq!(active[1].name, "low");
}

#[tokio::test]
async fn status_refresh_activates_and_expires() {
    let clock = clock();
    let registry = registry(&clock);

    let mut def = input(DiscountKind::PercentageOff { pct: 10.0 }, UsageLimits::default());
    def.starts_at = chrono::Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
    def.ends_at = chrono::Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
    let promo = registry.create(def).await.unwrap();
    assert_eq!(promo.status, PromotionStatus::Scheduled);

    clock.set(chrono::Utc.with_ymd_and_hms(2026, 1, 11, 0, 0, 0).unwrap());
    registry.refresh_statuses(clock.now()).await;
    assert_eq!(
        registry.get(&promo.promotion_id).await.unwrap().status,
        PromotionStatus::Active
    );

    clock.set(chrono::Utc.with_ymd_and_hms(2026, 1, 21, 0, 0, 0).unwrap());
    registry.refresh_statuses(clock.now()).await;
    assert_eq!(
        registry.get(&promo.promotion_id).await.unwrap().status,
        PromotionStatus::Expired
    );
}
