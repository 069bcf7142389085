//! Numeric safety helpers
//!
//! Stat multipliers stack without bound, so every value that feeds damage,
//! health or exp passes through one of these before it is stored.

/// Largest magnitude any simulation quantity may reach
pub const NUM_CAP: f64 = 9e15;

/// Clamp to `[min, max]`; non-finite input maps to `min`
#[inline]
pub fn clamp_finite(n: f64, min: f64, max: f64) -> f64 {
    if !n.is_finite() {
        return min;
    }
    n.clamp(min, max)
}

/// Replace non-finite input with `fallback`, then cap magnitude at [`NUM_CAP`]
#[inline]
pub fn safe_number(n: f64, fallback: f64) -> f64 {
    let v = if n.is_finite() { n } else { fallback };
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(-NUM_CAP, NUM_CAP)
}

/// Non-negative, finite, capped
#[inline]
pub fn safe_non_neg(n: f64, fallback: f64) -> f64 {
    clamp_finite(safe_number(n, fallback), 0.0, NUM_CAP)
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Compact display form: `950`, `1.25K`, `12.5M`, `340B`...
pub fn format_short(n: f64) -> String {
    let n = safe_number(n, 0.0);
    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();
    if abs < 1000.0 {
        return format!("{sign}{}", abs.round());
    }

    const UNITS: [(f64, &str); 5] = [(1e15, "Q"), (1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if abs >= scale {
            let val = abs / scale;
            let dp = if val >= 100.0 {
                0
            } else if val >= 10.0 {
                1
            } else {
                2
            };
            return format!("{sign}{val:.dp$}{suffix}");
        }
    }
    format!("{sign}{}", abs.round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_finite_non_finite() {
        assert_eq!(clamp_finite(f64::NAN, 2.0, 5.0), 2.0);
        assert_eq!(clamp_finite(f64::INFINITY, 2.0, 5.0), 2.0);
        assert_eq!(clamp_finite(7.0, 2.0, 5.0), 5.0);
    }

    #[test]
    fn test_safe_number_caps() {
        assert_eq!(safe_number(f64::NAN, 3.0), 3.0);
        assert_eq!(safe_number(1e20, 0.0), NUM_CAP);
        assert_eq!(safe_number(-1e20, 0.0), -NUM_CAP);
        assert_eq!(safe_number(f64::NAN, f64::NAN), 0.0);
    }

    #[test]
    fn test_safe_non_neg() {
        assert_eq!(safe_non_neg(-4.0, 0.0), 0.0);
        assert_eq!(safe_non_neg(f64::NEG_INFINITY, 12.0), 12.0);
        assert_eq!(safe_non_neg(42.5, 0.0), 42.5);
    }

    #[test]
    fn test_format_short() {
        assert_eq!(format_short(999.4), "999");
        assert_eq!(format_short(1234.0), "1.23K");
        assert_eq!(format_short(12_345.0), "12.3K");
        assert_eq!(format_short(123_456.0), "123K");
        assert_eq!(format_short(2.5e6), "2.50M");
        assert_eq!(format_short(-3e9), "-3.00B");
        assert_eq!(format_short(4e15), "4.00Q");
        assert_eq!(format_short(f64::NAN), "0");
    }

    proptest! {
        #[test]
        fn test_safe_non_neg_always_bounded(n in any::<f64>(), fb in any::<f64>()) {
            let v = safe_non_neg(n, fb);
            prop_assert!(v.is_finite());
            prop_assert!((0.0..=NUM_CAP).contains(&v));
        }
    }
}
