use crate::domain::promotion::{CoinBonus, DiscountKind, PackageData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Computed {
    pub discount_amount: f64,
    pub bonus_coins: u64,
}

/// Computes the raw discount for one promotion against a cart amount,
/// clamped to `cap` when set. Coin bonuses never reduce the amount paid.
pub fn compute(
    kind: &DiscountKind,
    amount: f64,
    package: &PackageData,
    cap: Option<f64>,
) -> Computed {
    let (discount, bonus) = match kind {
        DiscountKind::PercentageOff { pct } => (amount * pct / 100.0, 0),
        DiscountKind::FixedAmountOff { amount: off } => (off.min(amount), 0),
        DiscountKind::BonusCoins { bonus } => (0.0, coin_bonus(bonus, package)),
        DiscountKind::Bundle { pct, .. } => (amount * pct / 100.0, 0),
        DiscountKind::FlashSale { pct } => (amount * pct / 100.0, 0),
        DiscountKind::SeasonalMultiplier { multiplier } => {
            let surplus = (multiplier - 1.0).max(0.0);
            (0.0, (package.coins as f64 * surplus).round() as u64)
        }
    };

    let discount = match cap {
        Some(cap) => discount.min(cap),
        None => discount,
    }
    .max(0.0);

    Computed {
        discount_amount: discount,
        bonus_coins: bonus,
    }
}

fn coin_bonus(bonus: &CoinBonus, package: &PackageData) -> u64 {
    match bonus {
        CoinBonus::Fixed { coins } => *coins,
        CoinBonus::PercentOfBase { pct } => (package.coins as f64 * pct / 100.0).round() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(coins: u64) -> PackageData {
        PackageData {
            package_id: "coins_500".to_string(),
            coins,
        }
    }

    #[test]
    fn percentage_off() {
        let out = compute(&DiscountKind::PercentageOff { pct: 20.0 }, 10.0, &package(500), None);
        assert!((out.discount_amount - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_off_never_exceeds_amount() {
        let out = compute(&DiscountKind::FixedAmountOff { amount: 15.0 }, 10.0, &package(500), None);
        assert_eq!(out.discount_amount, 10.0);
    }

    #[test]
    fn fixed_off_clamped_to_cap() {
        // fixed 5 with a cap of 3 on a 10 cart gives exactly 3 off.
        let out = compute(
            &DiscountKind::FixedAmountOff { amount: 5.0 },
            10.0,
            &package(500),
            Some(3.0),
        );
        assert_eq!(out.discount_amount, 3.0);
    }

    #[test]
    fn bonus_coins_percent_of_base() {
        let out = compute(
            &DiscountKind::BonusCoins {
                bonus: CoinBonus::PercentOfBase { pct: 10.0 },
            },
            10.0,
            &package(500),
            None,
        );
        assert_eq!(out.discount_amount, 0.0);
        assert_eq!(out.bonus_coins, 50);
    }

    #[test]
    fn seasonal_multiplier_scales_coin_grant() {
        let out = compute(
            &DiscountKind::SeasonalMultiplier { multiplier: 1.5 },
            10.0,
            &package(500),
            None,
        );
        assert_eq!(out.bonus_coins, 250);
    }

    #[test]
    fn multiplier_below_one_grants_nothing() {
        let out = compute(
            &DiscountKind::SeasonalMultiplier { multiplier: 0.8 },
            10.0,
            &package(500),
            None,
        );
        assert_eq!(out.bonus_coins, 0);
    }
}
