//! Fixed-point scaling and unit conversion.

/// Shifts a fixed-point reading right by `precision` decimal places.
///
/// A precision of zero or below means the raw value is already in whole units.
pub fn scale_value(raw: f64, precision: i64) -> f64 {
    if precision <= 0 {
        return raw;
    }
    let exponent = i32::try_from(precision).unwrap_or(i32::MAX);
    raw / 10f64.powi(exponent)
}

/// Converts degrees Fahrenheit to degrees Celsius.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Converts one of the controller's ×100 aggregates to real units.
pub fn centi(value: f64) -> f64 {
    value / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_freezing_and_boiling_points() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
    }

    #[test]
    fn test_scale_examples() {
        assert_eq!(scale_value(720.0, 1), 72.0);
        assert_eq!(scale_value(105.0, 2), 1.05);
        assert_eq!(scale_value(850.0, 0), 850.0);
        assert_eq!(scale_value(850.0, -3), 850.0);
    }

    #[test]
    fn test_centi() {
        assert_eq!(centi(2512.0), 25.12);
    }

    proptest! {
        #[test]
        fn prop_non_positive_precision_is_identity(
            raw in -1_000_000i64..1_000_000,
            p in -10i64..=0,
        ) {
            prop_assert_eq!(scale_value(raw as f64, p), raw as f64);
        }

        #[test]
        fn prop_positive_precision_divides(raw in -1_000_000i64..1_000_000, p in 1i64..=6) {
            let expected = raw as f64 / 10f64.powi(p as i32);
            prop_assert_eq!(scale_value(raw as f64, p), expected);
        }
    }
}
