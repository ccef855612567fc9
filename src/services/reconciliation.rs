//! Quantity and weight arithmetic for splitting and merging claims.
//!
//! Weights are rounded to [`WEIGHT_SCALE`] places once, on the share that is
//! computed proportionally. The other share is always derived by subtraction
//! so rounding error lands in it instead of being duplicated.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub const WEIGHT_SCALE: u32 = 2;

/// Scale weights are normalized to when read back from storage.
pub const STORAGE_SCALE: u32 = 4;

pub fn round_weight(weight: Decimal) -> Decimal {
    weight.round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A quantity together with the weight it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub qty: i32,
    pub weight: Decimal,
}

impl Share {
    pub fn new(qty: i32, weight: Decimal) -> Self {
        Self {
            qty,
            weight: weight.round_dp(STORAGE_SCALE),
        }
    }

    pub fn zero() -> Self {
        Self::new(0, Decimal::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.qty == 0
    }
}

impl Add for Share {
    type Output = Share;

    fn add(self, rhs: Share) -> Share {
        Share {
            qty: self.qty + rhs.qty,
            weight: self.weight + rhs.weight,
        }
    }
}

impl Sub for Share {
    type Output = Share;

    fn sub(self, rhs: Share) -> Share {
        Share {
            qty: self.qty - rhs.qty,
            weight: self.weight - rhs.weight,
        }
    }
}

/// Result of carving a claimed share out of a larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub claimed: Share,
    pub remainder: Share,
}

impl Split {
    pub fn has_remainder(&self) -> bool {
        self.remainder.qty > 0
    }
}

/// Weight of a single unit of `share`.
pub fn unit_weight(share: Share) -> Result<Decimal, ServiceError> {
    if share.qty <= 0 {
        return Err(ServiceError::precondition(format!(
            "Cannot derive unit weight from quantity {}",
            share.qty
        )));
    }
    Ok(share.weight / Decimal::from(share.qty))
}

/// Splits a picked share at the quantity actually loaded.
///
/// Loaded weight is proportional to the loaded quantity and rounded; the
/// remainder weight is what is left of the picked weight.
pub fn split_loaded(picked: Share, loaded_qty: i32) -> Result<Split, ServiceError> {
    if loaded_qty <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Loaded QTY must be positive, got {}",
            loaded_qty
        )));
    }
    if loaded_qty > picked.qty {
        return Err(ServiceError::capacity("Loaded QTY can't exceed Picked QTY"));
    }
    if loaded_qty == picked.qty {
        return Ok(Split {
            claimed: picked,
            remainder: Share::zero(),
        });
    }

    let loaded_weight =
        round_weight(picked.weight * Decimal::from(loaded_qty) / Decimal::from(picked.qty));
    let claimed = Share {
        qty: loaded_qty,
        weight: loaded_weight,
    };

    Ok(Split {
        claimed,
        remainder: picked - claimed,
    })
}

/// Splits a requested share by what one pallet contributes.
///
/// The contributed weight follows the pallet's own unit weight.
pub fn split_pick(requested: Share, pallet: Share, contribution_qty: i32) -> Result<Split, ServiceError> {
    if contribution_qty <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Release qty must be positive, got {}",
            contribution_qty
        )));
    }
    if pallet.qty < contribution_qty {
        return Err(ServiceError::capacity(
            "Release qty is bigger than what pallet has",
        ));
    }
    if requested.qty < contribution_qty {
        return Err(ServiceError::capacity("Release qty is bigger than required qty"));
    }

    let claimed = Share {
        qty: contribution_qty,
        weight: round_weight(unit_weight(pallet)? * Decimal::from(contribution_qty)),
    };
    let remainder = requested - claimed;
    if remainder.qty > 0 && remainder.weight < Decimal::ZERO {
        return Err(ServiceError::capacity(
            "Release weight is bigger than required weight",
        ));
    }

    Ok(Split { claimed, remainder })
}

/// Moves `contribution` from `current` into `existing`.
///
/// Returns the grown and the shrunk share, in that order.
pub fn merge_into(existing: Share, current: Share, contribution: Share) -> Result<(Share, Share), ServiceError> {
    if contribution.qty > current.qty {
        return Err(ServiceError::capacity("Release qty is bigger than required qty"));
    }
    let left = current - contribution;
    let left = if left.qty == 0 { Share::zero() } else { left };

    Ok((existing + contribution, left))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn loading_remainder_is_derived_by_subtraction() {
        let split = split_loaded(Share::new(100, dec!(33.33)), 60).unwrap();

        assert_eq!(split.claimed, Share::new(60, dec!(20.00)));
        assert_eq!(split.remainder.qty, 40);
        assert_eq!(split.remainder.weight, dec!(13.33));
    }

    #[test]
    fn loading_rounds_half_away_from_zero() {
        // 10.05 * 1 / 2 = 5.025
        let split = split_loaded(Share::new(2, dec!(10.05)), 1).unwrap();
        assert_eq!(split.claimed.weight, dec!(5.03));
        assert_eq!(split.remainder.weight, dec!(5.02));
    }

    #[test]
    fn full_load_has_no_remainder() {
        let split = split_loaded(Share::new(5, dec!(12.5)), 5).unwrap();
        assert!(!split.has_remainder());
        assert_eq!(split.claimed, Share::new(5, dec!(12.5)));
    }

    #[test]
    fn loading_more_than_picked_is_rejected() {
        assert_matches!(
            split_loaded(Share::new(5, dec!(10)), 6),
            Err(ServiceError::CapacityViolation(msg)) if msg == "Loaded QTY can't exceed Picked QTY"
        );
    }

    #[test]
    fn pick_uses_pallet_unit_weight() {
        let split = split_pick(Share::new(30, dec!(60)), Share::new(10, dec!(25)), 10).unwrap();

        assert_eq!(split.claimed, Share::new(10, dec!(25)));
        assert_eq!(split.remainder, Share::new(20, dec!(35)));
    }

    #[test]
    fn pick_checks_pallet_then_requirement() {
        assert_matches!(
            split_pick(Share::new(30, dec!(60)), Share::new(5, dec!(10)), 6),
            Err(ServiceError::CapacityViolation(msg)) if msg.contains("what pallet has")
        );
        assert_matches!(
            split_pick(Share::new(4, dec!(8)), Share::new(10, dec!(20)), 6),
            Err(ServiceError::CapacityViolation(msg)) if msg.contains("required qty")
        );
    }

    #[test]
    fn merge_empties_current_share() {
        let (absorbed, left) = merge_into(
            Share::new(10, dec!(20)),
            Share::new(4, dec!(8.5)),
            Share::new(4, dec!(8)),
        )
        .unwrap();

        assert_eq!(absorbed, Share::new(14, dec!(28)));
        assert!(left.is_empty());
        assert_eq!(left.weight, Decimal::ZERO);
    }

    #[test]
    fn unit_weight_requires_quantity() {
        assert_matches!(
            unit_weight(Share::zero()),
            Err(ServiceError::PreconditionViolation(_))
        );
    }

    fn cents(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    proptest! {
        #[test]
        fn loading_split_conserves_quantity_and_weight(
            picked_qty in 1i32..10_000,
            weight_cents in 0i64..100_000_000,
            loaded_ratio in 0.0f64..1.0,
        ) {
            let loaded_qty = ((picked_qty as f64 * loaded_ratio) as i32).clamp(1, picked_qty);
            let picked = Share::new(picked_qty, cents(weight_cents));

            let split = split_loaded(picked, loaded_qty).unwrap();

            prop_assert_eq!(split.claimed.qty + split.remainder.qty, picked.qty);
            prop_assert_eq!(split.claimed.weight + split.remainder.weight, picked.weight);
            prop_assert!(split.claimed.weight.scale() <= WEIGHT_SCALE);
        }

        #[test]
        fn pick_split_conserves_requested_share(
            requested_qty in 1i32..1_000,
            requested_cents in 0i64..10_000_000,
            pallet_qty in 1i32..1_000,
            pallet_cents in 0i64..10_000_000,
            contribution in 1i32..1_000,
        ) {
            let requested = Share::new(requested_qty, cents(requested_cents));
            let pallet = Share::new(pallet_qty, cents(pallet_cents));

            if let Ok(split) = split_pick(requested, pallet, contribution) {
                prop_assert_eq!(split.claimed + split.remainder, requested);
                prop_assert!(split.claimed.qty <= pallet.qty);
            }
        }

        #[test]
        fn merge_conserves_the_pair(
            existing_qty in 0i32..1_000,
            current_qty in 1i32..1_000,
            moved in 1i32..1_000,
            existing_cents in 0i64..1_000_000,
            current_cents in 0i64..1_000_000,
            moved_cents in 0i64..1_000_000,
        ) {
            prop_assume!(moved < current_qty);
            let existing = Share::new(existing_qty, cents(existing_cents));
            let current = Share::new(current_qty, cents(current_cents));
            let contribution = Share::new(moved, cents(moved_cents));

            let (absorbed, left) = merge_into(existing, current, contribution).unwrap();
            prop_assert_eq!(absorbed + left, existing + current);
        }
    }
}
