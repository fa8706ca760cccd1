//! Bijective transforms between a constrained support and the real line.
//!
//! Inference that works in unconstrained space samples `y ∈ R` and maps it back with
//! `x = backward(y)`. The density of `y` picks up `log|dx/dy|`, which
//! [`Transform::log_jacobian_det`] returns as a function of `y`.
//!
//! Naming follows the distribution's point of view: `forward` goes constrained ->
//! unconstrained, `backward` goes unconstrained -> constrained.

use ndarray::ArrayD;
use ns_core::{Point, Result};

use crate::expr::{Bindings, Expr};

/// Reparameterization of a distribution's support.
#[derive(Debug, Clone)]
pub enum Transform {
    /// `(0, inf)`: `y = ln x`.
    Log,
    /// `(lower, inf)`: `y = ln(x - lower)`.
    LowerBound {
        /// Lower edge of the support.
        lower: Expr,
    },
    /// `(-inf, upper)`: `y = ln(upper - x)`.
    UpperBound {
        /// Upper edge of the support.
        upper: Expr,
    },
    /// `(lower, upper)`: `y = ln(x - lower) - ln(upper - x)`.
    Interval {
        /// Lower edge of the support.
        lower: Expr,
        /// Upper edge of the support.
        upper: Expr,
    },
    /// `(0, 1)`: `y = logit(x)`.
    LogOdds,
    /// `[-π, π]`: identity forward, angle wrap backward.
    Circular,
}

impl Transform {
    /// Short name used in diagnostics and variable naming.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Log => "log",
            Transform::LowerBound { .. } => "lowerbound",
            Transform::UpperBound { .. } => "upperbound",
            Transform::Interval { .. } => "interval",
            Transform::LogOdds => "logodds",
            Transform::Circular => "circular",
        }
    }

    /// Select a transform from optional bounds.
    ///
    /// - both finite -> `Interval`
    /// - lower only -> `LowerBound`
    /// - upper only -> `UpperBound`
    /// - neither -> `None`
    ///
    /// A constant bound whose elements are all infinite counts as absent.
    pub fn from_bounds(lower: Option<&Expr>, upper: Option<&Expr>) -> Option<Transform> {
        let lower = lower.filter(|e| !is_unbounded(e));
        let upper = upper.filter(|e| !is_unbounded(e));
        match (lower, upper) {
            (Some(l), Some(u)) => Some(Transform::Interval { lower: l.clone(), upper: u.clone() }),
            (Some(l), None) => Some(Transform::LowerBound { lower: l.clone() }),
            (None, Some(u)) => Some(Transform::UpperBound { upper: u.clone() }),
            (None, None) => None,
        }
    }

    /// Constrained -> unconstrained.
    pub fn forward(&self, x: &Expr) -> Expr {
        match self {
            Transform::Log => x.ln(),
            Transform::LowerBound { lower } => (x - lower).ln(),
            Transform::UpperBound { upper } => (upper - x).ln(),
            Transform::Interval { lower, upper } => (x - lower).ln() - (upper - x).ln(),
            Transform::LogOdds => x.ln() - (1.0 - x).ln(),
            Transform::Circular => x.clone(),
        }
    }

    /// Unconstrained -> constrained.
    pub fn backward(&self, y: &Expr) -> Expr {
        match self {
            Transform::Log => y.exp(),
            Transform::LowerBound { lower } => y.exp() + lower,
            Transform::UpperBound { upper } => upper - y.exp(),
            Transform::Interval { lower, upper } => lower + (upper - lower) * y.sigmoid(),
            Transform::LogOdds => y.sigmoid(),
            Transform::Circular => y.wrap_angle(),
        }
    }

    /// `log|d backward(y) / dy|`.
    pub fn log_jacobian_det(&self, y: &Expr) -> Expr {
        match self {
            Transform::Log | Transform::LowerBound { .. } | Transform::UpperBound { .. } => {
                y.clone()
            }
            Transform::Interval { lower, upper } => {
                (upper - lower).ln() + y.log_sigmoid() + (-y).log_sigmoid()
            }
            Transform::LogOdds => y.log_sigmoid() + (-y).log_sigmoid(),
            Transform::Circular => Expr::full(y.shape().unwrap_or(&[]), 0.0),
        }
    }

    /// [`Self::forward`] on a scalar; bounds must be constant.
    pub fn forward_value(&self, x: f64) -> Result<f64> {
        self.forward(&Expr::scalar(x)).eval_scalar(&Point::new())
    }

    /// [`Self::backward`] on a scalar; bounds must be constant.
    pub fn backward_value(&self, y: f64) -> Result<f64> {
        self.backward(&Expr::scalar(y)).eval_scalar(&Point::new())
    }

    /// [`Self::log_jacobian_det`] on a scalar; bounds must be constant.
    pub fn log_jacobian_det_value(&self, y: f64) -> Result<f64> {
        self.log_jacobian_det(&Expr::scalar(y)).eval_scalar(&Point::new())
    }

    /// Elementwise [`Self::forward`], resolving bound references through `bindings`.
    pub fn forward_array(&self, x: &ArrayD<f64>, bindings: &dyn Bindings) -> Result<ArrayD<f64>> {
        self.forward(&Expr::constant(x.clone())).eval(bindings)
    }

    /// Elementwise [`Self::backward`], resolving bound references through `bindings`.
    pub fn backward_array(&self, y: &ArrayD<f64>, bindings: &dyn Bindings) -> Result<ArrayD<f64>> {
        self.backward(&Expr::constant(y.clone())).eval(bindings)
    }

    /// Elementwise [`Self::log_jacobian_det`], resolving bound references through `bindings`.
    pub fn log_jacobian_det_array(
        &self,
        y: &ArrayD<f64>,
        bindings: &dyn Bindings,
    ) -> Result<ArrayD<f64>> {
        self.log_jacobian_det(&Expr::constant(y.clone())).eval(bindings)
    }
}

fn is_unbounded(e: &Expr) -> bool {
    e.as_constant().is_some_and(|a| a.iter().all(|v| v.is_infinite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use proptest::prelude::*;

    fn interval(lower: f64, upper: f64) -> Transform {
        Transform::Interval { lower: Expr::scalar(lower), upper: Expr::scalar(upper) }
    }

    fn check_roundtrip(t: &Transform, x: f64) -> std::result::Result<(), TestCaseError> {
        let y = t.forward_value(x).unwrap();
        let x_back = t.backward_value(y).unwrap();
        let scale = x.abs().max(1.0);
        prop_assert!((x - x_back).abs() / scale < 1e-8, "{}: x={}, y={}, x_back={}", t.name(), x, y, x_back);
        Ok(())
    }

    fn check_log_jacobian(t: &Transform, x: f64) -> std::result::Result<(), TestCaseError> {
        let y = t.forward_value(x).unwrap();
        let eps = 1e-6;
        let fd = (t.backward_value(y + eps).unwrap() - t.backward_value(y - eps).unwrap()) / (2.0 * eps);
        let ljd = t.log_jacobian_det_value(y).unwrap();
        prop_assert!(
            (ljd - fd.abs().ln()).abs() < 1e-5,
            "{}: x={}, analytical={}, fd={}",
            t.name(),
            x,
            ljd,
            fd.abs().ln()
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_log_roundtrip_and_jacobian(x in 1e-3f64..1e3) {
            check_roundtrip(&Transform::Log, x)?;
            check_log_jacobian(&Transform::Log, x)?;
        }

        #[test]
        fn prop_lower_bound_roundtrip_and_jacobian(lower in -10.0f64..10.0, d in 1e-2f64..50.0) {
            let t = Transform::LowerBound { lower: Expr::scalar(lower) };
            check_roundtrip(&t, lower + d)?;
            check_log_jacobian(&t, lower + d)?;
        }

        #[test]
        fn prop_upper_bound_roundtrip_and_jacobian(upper in -10.0f64..10.0, d in 1e-2f64..50.0) {
            let t = Transform::UpperBound { upper: Expr::scalar(upper) };
            check_roundtrip(&t, upper - d)?;
            check_log_jacobian(&t, upper - d)?;
        }

        #[test]
        fn prop_interval_roundtrip_and_jacobian(lower in -5.0f64..5.0, width in 0.5f64..10.0, frac in 0.01f64..0.99) {
            let t = interval(lower, lower + width);
            check_roundtrip(&t, lower + frac * width)?;
            check_log_jacobian(&t, lower + frac * width)?;
        }

        #[test]
        fn prop_logodds_roundtrip_and_jacobian(x in 0.01f64..0.99) {
            check_roundtrip(&Transform::LogOdds, x)?;
            check_log_jacobian(&Transform::LogOdds, x)?;
        }

        #[test]
        fn prop_circular_roundtrip_and_jacobian(x in -3.1f64..3.1) {
            check_roundtrip(&Transform::Circular, x)?;
            check_log_jacobian(&Transform::Circular, x)?;
        }
    }

    #[test]
    fn test_from_bounds_selection() {
        let zero = Expr::scalar(0.0);
        let one = Expr::scalar(1.0);
        let inf = Expr::scalar(f64::INFINITY);
        let ninf = Expr::scalar(f64::NEG_INFINITY);

        assert_eq!(Transform::from_bounds(Some(&zero), Some(&one)).unwrap().name(), "interval");
        assert_eq!(Transform::from_bounds(Some(&zero), None).unwrap().name(), "lowerbound");
        assert_eq!(Transform::from_bounds(Some(&zero), Some(&inf)).unwrap().name(), "lowerbound");
        assert_eq!(Transform::from_bounds(None, Some(&one)).unwrap().name(), "upperbound");
        assert_eq!(Transform::from_bounds(Some(&ninf), Some(&one)).unwrap().name(), "upperbound");
        assert!(Transform::from_bounds(Some(&ninf), Some(&inf)).is_none());
        assert!(Transform::from_bounds(None, None).is_none());
    }

    #[test]
    fn test_interval_log_jacobian_is_finite_at_extremes() {
        let t = interval(0.0, 1.0);
        for y in [-800.0, -50.0, 0.0, 50.0, 800.0] {
            let v = t.log_jacobian_det_value(y).unwrap();
            assert!(v.is_finite(), "y={} gave {}", y, v);
        }
        assert_relative_eq!(t.log_jacobian_det_value(0.0).unwrap(), 0.25f64.ln(), epsilon = 1e-15);
    }

    #[test]
    fn test_circular_backward_wraps() {
        let pi = std::f64::consts::PI;
        assert_relative_eq!(Transform::Circular.backward_value(pi + 0.5).unwrap(), -pi + 0.5, epsilon = 1e-12);
        assert_eq!(Transform::Circular.log_jacobian_det_value(7.0).unwrap(), 0.0);
    }

    #[test]
    fn test_array_forms() {
        let t = Transform::LowerBound { lower: Expr::var("lo", &[]) };
        let point = Point::new().with_scalar("lo", 1.0);
        let x = arr1(&[2.0, 1.0 + std::f64::consts::E]).into_dyn();
        let y = t.forward_array(&x, &point).unwrap();
        assert_relative_eq!(y[[0]], 0.0, epsilon = 1e-15);
        assert_relative_eq!(y[[1]], 1.0, epsilon = 1e-12);
        let back = t.backward_array(&y, &point).unwrap();
        assert_relative_eq!(back[[1]], x[[1]], epsilon = 1e-12);
        // Unbound reference surfaces as an error rather than a panic.
        assert!(t.forward_value(2.0).is_err());
    }
}
