//! Pareto distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

/// Pareto with shape `alpha` and scale `m` on `[m, inf)`.
///
/// ```text
/// log p(x) = ln(alpha) + alpha ln(m) - (alpha + 1) ln(x)
/// ```
#[derive(Debug)]
pub struct Pareto {
    alpha: Expr,
    m: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Pareto {
    const NAME: &'static str = "Pareto";

    /// Pareto with shape `alpha` and scale `m`.
    pub fn new(alpha: impl Into<Param>, m: impl Into<Param>) -> Result<Self> {
        Self::build(alpha.into().to_expr(), m.into().to_expr())
    }

    /// From required `alpha` and `m`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["alpha", "m"])?;
        Self::build(kwargs.require(Self::NAME, "alpha")?, kwargs.require(Self::NAME, "m")?)
    }

    fn build(alpha: Expr, m: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&alpha, &m])?;
        Ok(Self { alpha, m, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Shape.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }

    /// Scale, also the lower edge of the support.
    pub fn m(&self) -> &Expr {
        &self.m
    }
}

impl_with_shape!(Pareto);

impl Continuous for Pareto {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("alpha", &self.alpha), ("m", &self.m)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let (alpha, m) = (&self.alpha, &self.m);
        let lp = alpha.ln() + m.logpow(alpha) - value.logpow(alpha + 1.0);
        bound(lp, &[value.ge(m), alpha.gt(0.0), m.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.m])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let alpha = require_positive(Self::NAME, "alpha", p[0])?;
            let m = require_positive(Self::NAME, "m", p[1])?;
            let u: f64 = rng.random();
            Ok(m * (1.0 - u).powf(-1.0 / alpha))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (alpha, m) = (&self.alpha, &self.m);
            let inf = Expr::scalar(f64::INFINITY);
            let mean = Expr::switch(&alpha.gt(1.0), &(alpha * m / (alpha - 1.0)), &inf);
            let variance = Expr::switch(
                &alpha.gt(2.0),
                &(alpha * m.powf(2.0) / ((alpha - 2.0) * (alpha - 1.0).powf(2.0))),
                &inf,
            );
            Moments {
                mean: Some(mean),
                median: Some(m * Expr::scalar(2.0).powf(1.0 / alpha)),
                mode: None,
                variance: Some(variance),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Registry;
    use approx::assert_relative_eq;
    use ns_core::Point;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_logp() {
        let d = Pareto::new(3.0, 2.0).unwrap();
        let x: f64 = 2.5;
        let expected = 3f64.ln() + 3.0 * 2f64.ln() - 4.0 * x.ln();
        assert_relative_eq!(d.logp_at(x).unwrap(), expected, epsilon = 1e-12);
        assert!(d.logp_at(2.0).unwrap().is_finite());
        assert_eq!(d.logp_at(1.9).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_heavy_tail_moments_are_infinite() {
        let d = Pareto::new(1.5, 1.0).unwrap();
        let m = d.moments();
        assert_relative_eq!(m.mean.as_ref().unwrap().as_scalar().unwrap(), 3.0);
        assert_eq!(m.variance.as_ref().unwrap().as_scalar(), Some(f64::INFINITY));
    }

    #[test]
    fn test_vector_alpha_switches_elementwise() {
        let d = Pareto::new(vec![0.5, 3.0], 1.0).unwrap();
        let mean = d.moments().mean.as_ref().unwrap().as_constant().unwrap().clone();
        assert_eq!(mean[[0]], f64::INFINITY);
        assert_relative_eq!(mean[[1]], 1.5);
    }

    #[test]
    fn test_samples_above_scale() {
        let d = Pareto::new(4.0, 1.5).unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        let xs = d.sample(&Registry::new(), &Point::new(), &[5000], &mut rng).unwrap();
        assert!(xs.iter().all(|&x| x >= 1.5));
        assert!((xs.mean().unwrap() - 2.0).abs() < 0.05);
    }
}
