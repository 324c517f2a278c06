//! Property tests for decimal helpers

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::decimal::{format_grouped, relative_difference};
use core_kernel::{parse_ocr_number, percent_error, round_half_up};

proptest! {
    #[test]
    fn rounding_moves_at_most_half_a_unit(mantissa in -10_000_000_000i64..10_000_000_000i64, dp in 0u32..4) {
        let value = Decimal::new(mantissa, 5);
        let rounded = round_half_up(value, dp);
        let half_unit = Decimal::new(5, dp + 1);

        prop_assert!((rounded - value).abs() <= half_unit);
        prop_assert!(rounded.scale() <= dp);
    }

    #[test]
    fn comma_decimals_parse(whole in 0u64..10_000_000u64, cents in 0u32..100u32) {
        let raw = format!("{},{:02}", whole, cents);
        let expected = Decimal::from(whole) + Decimal::new(i64::from(cents), 2);

        prop_assert_eq!(parse_ocr_number(&raw).unwrap(), expected);
    }

    #[test]
    fn grouped_output_parses_back(mantissa in 0i64..100_000_000_000i64) {
        let value = Decimal::new(mantissa, 2);
        prop_assert_eq!(parse_ocr_number(&format_grouped(value)).unwrap(), round_half_up(value, 0));
    }

    #[test]
    fn percent_error_is_zero_only_for_equal_values(a in 1i64..1_000_000i64, b in 1i64..1_000_000i64) {
        let (a, b) = (Decimal::from(a), Decimal::from(b));
        prop_assert_eq!(percent_error(a, b).unwrap().is_zero(), a == b);
        prop_assert!(relative_difference(a, b).unwrap() <= Decimal::ONE);
    }
}
