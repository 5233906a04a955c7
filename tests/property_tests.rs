//! Property tests for invariants that are cheapest to check by throwing
//! many inputs at them rather than enumerating cases by hand: preference
//! weight bounds and the delta calculator's symmetry.

use finance_ops::domain::TypePreference;
use finance_ops::engine::calculators;
use proptest::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

proptest! {
    /// No sequence of accept/reject feedback can push a type weight outside [0, 2].
    #[test]
    fn type_preference_weight_stays_in_bounds(deltas in proptest::collection::vec(-2.0f64..2.0, 0..200)) {
        let mut pref = TypePreference::default();
        for d in deltas {
            pref.apply_delta(d);
            prop_assert!(pref.weight >= 0.0 && pref.weight <= 2.0);
        }
    }

    /// `delta(current, previous)`'s direction always matches the sign of the
    /// absolute delta, regardless of scale.
    #[test]
    fn delta_direction_matches_absolute_sign(current in -1_000_000i64..1_000_000, previous in -1_000_000i64..1_000_000) {
        let current = Decimal::from_i64(current).unwrap();
        let previous = Decimal::from_i64(previous).unwrap();
        let result = calculators::delta(current, previous);

        if result.absolute > Decimal::ZERO {
            prop_assert_eq!(result.direction, calculators::Direction::Positive);
        } else if result.absolute < Decimal::ZERO {
            prop_assert_eq!(result.direction, calculators::Direction::Negative);
        } else {
            prop_assert_eq!(result.direction, calculators::Direction::Stable);
        }
        prop_assert_eq!(result.magnitude, result.absolute.abs());
    }

    /// Zero-previous handling: 100% when current moved away from zero, 0%
    /// when both are zero — never a division artifact.
    #[test]
    fn delta_handles_zero_previous_without_panicking(current in -1_000_000i64..1_000_000) {
        let current = Decimal::from_i64(current).unwrap();
        let result = calculators::delta(current, Decimal::ZERO);
        if current == Decimal::ZERO {
            prop_assert_eq!(result.percentage, 0.0);
        } else {
            prop_assert_eq!(result.percentage, 100.0);
        }
    }

    /// Coefficient of variation is non-negative and zero for fewer than two
    /// samples or a zero mean, for any input series.
    #[test]
    fn coefficient_of_variation_is_non_negative(values in proptest::collection::vec(-10_000.0f64..10_000.0, 0..50)) {
        let cv = calculators::coefficient_of_variation(&values);
        prop_assert!(cv >= 0.0);
        if values.len() < 2 {
            prop_assert_eq!(cv, 0.0);
        }
    }
}
