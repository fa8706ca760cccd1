//! Small numerically-stable math utilities used across distribution code.

use statrs::function::erf::erfc;
use statrs::function::gamma::ln_gamma;

/// Natural log of `sqrt(2π)`.
pub const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Stable sigmoid: `1 / (1 + exp(-x))`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    if x >= 0.0 { recip } else { e * recip }
}

/// Stable `log(sigmoid(x))`.
#[inline]
pub fn log_sigmoid(x: f64) -> f64 {
    if x >= 0.0 { -(-x).exp().ln_1p() } else { x - x.exp().ln_1p() }
}

/// `m * ln(x)` with the `x == 0` limit handled.
///
/// `logpow(0, 0) = 0`, `logpow(0, m) = -inf` for `m != 0`. Negative `x` yields NaN,
/// so callers must guard the support separately.
#[inline]
pub fn logpow(x: f64, m: f64) -> f64 {
    if x == 0.0 {
        if m == 0.0 { 0.0 } else { f64::NEG_INFINITY }
    } else {
        m * x.ln()
    }
}

/// `ln B(a, b) = ln Γ(a) + ln Γ(b) - ln Γ(a+b)`.
///
/// Composed from `ln_gamma` so that invalid arguments produce NaN instead of a panic.
#[inline]
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Standard normal CDF `Φ(x) = erfc(-x/√2)/2`.
#[inline]
pub fn std_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Exponentially scaled modified Bessel function of the first kind, order 0:
/// `exp(-|x|) I0(x)`.
///
/// Abramowitz & Stegun 9.8.1 / 9.8.2 (relative error below `2e-7`).
pub fn bessel_i0e(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        let i0 = 1.0
            + t * (3.515_622_9
                + t * (3.089_942_4
                    + t * (1.206_749_2 + t * (0.265_973_2 + t * (0.036_076_8 + t * 0.004_581_3)))));
        i0 * (-ax).exp()
    } else {
        let t = 3.75 / ax;
        let p = 0.398_942_28
            + t * (0.013_285_92
                + t * (0.002_253_19
                    + t * (-0.001_575_65
                        + t * (0.009_162_81
                            + t * (-0.020_577_06
                                + t * (0.026_355_37 + t * (-0.016_476_33 + t * 0.003_923_77)))))));
        p / ax.sqrt()
    }
}

/// Exponentially scaled modified Bessel function of the first kind, order 1:
/// `exp(-|x|) I1(x)`. Odd in `x`.
///
/// Abramowitz & Stegun 9.8.3 / 9.8.4.
pub fn bessel_i1e(x: f64) -> f64 {
    let ax = x.abs();
    let v = if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        let p = 0.5
            + t * (0.878_905_94
                + t * (0.514_988_69
                    + t * (0.150_849_34 + t * (0.026_587_33 + t * (0.003_015_32 + t * 0.000_324_11)))));
        ax * p * (-ax).exp()
    } else {
        let t = 3.75 / ax;
        let p = 0.398_942_28
            + t * (-0.039_880_24
                + t * (-0.003_620_18
                    + t * (0.001_638_01
                        + t * (-0.010_315_55
                            + t * (0.022_829_67
                                + t * (-0.028_953_12 + t * (0.017_876_54 - t * 0.004_200_59)))))));
        p / ax.sqrt()
    };
    if x < 0.0 { -v } else { v }
}

/// Wrap an angle into `[-π, π]`.
#[inline]
pub fn wrap_angle(x: f64) -> f64 {
    x.sin().atan2(x.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_bounds_and_symmetry() {
        for x in [-50.0, -10.0, -1.0, 0.0, 1.0, 10.0, 50.0] {
            let s = sigmoid(x);
            assert!((0.0..=1.0).contains(&s), "sigmoid({})={}", x, s);
            assert!((s + sigmoid(-x) - 1.0).abs() < 1e-15, "symmetry failed at {}", x);
        }
    }

    #[test]
    fn test_log_sigmoid_is_finite_extremes() {
        assert!(log_sigmoid(-800.0).is_finite());
        assert_relative_eq!(log_sigmoid(-800.0), -800.0, max_relative = 1e-12);
        assert_relative_eq!(log_sigmoid(0.0), -std::f64::consts::LN_2, epsilon = 1e-15);
    }

    #[test]
    fn test_logpow_zero_limits() {
        assert_eq!(logpow(0.0, 0.0), 0.0);
        assert_eq!(logpow(0.0, 1.5), f64::NEG_INFINITY);
        assert_relative_eq!(logpow(0.5, 2.0), 2.0 * 0.5f64.ln(), epsilon = 1e-15);
    }

    #[test]
    fn test_ln_beta_known_value() {
        // B(2, 2) = 1/6
        assert_relative_eq!(ln_beta(2.0, 2.0), (1.0f64 / 6.0).ln(), epsilon = 1e-12);
        assert!(ln_beta(-1.0, 2.0).is_nan() || ln_beta(-1.0, 2.0).is_infinite());
    }

    #[test]
    fn test_std_cdf() {
        assert_relative_eq!(std_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(std_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-9);
        assert_relative_eq!(std_cdf(-3.0) + std_cdf(3.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_bessel_reference_values() {
        // I0(1) = 1.2660658777520082, I1(1) = 0.5651591039924851
        assert_relative_eq!(bessel_i0e(1.0) * 1f64.exp(), 1.266_065_877_752_008, max_relative = 1e-6);
        assert_relative_eq!(bessel_i1e(1.0) * 1f64.exp(), 0.565_159_103_992_485, max_relative = 1e-6);
        // I0(5) = 27.239871823604442
        assert_relative_eq!(bessel_i0e(5.0) * 5f64.exp(), 27.239_871_823_604_44, max_relative = 1e-6);
        assert_relative_eq!(bessel_i0e(0.0), 1.0, epsilon = 1e-15);
        assert_eq!(bessel_i1e(0.0), 0.0);
        assert_relative_eq!(bessel_i1e(-2.0), -bessel_i1e(2.0), epsilon = 1e-15);
    }

    #[test]
    fn test_wrap_angle() {
        let pi = std::f64::consts::PI;
        assert_relative_eq!(wrap_angle(0.5), 0.5, epsilon = 1e-15);
        assert_relative_eq!(wrap_angle(2.0 * pi + 0.25), 0.25, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-pi - 0.25), pi - 0.25, epsilon = 1e-12);
    }
}
