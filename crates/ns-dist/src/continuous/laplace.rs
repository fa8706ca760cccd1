//! Laplace (double exponential) distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;
use rand_distr::Open01;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_positive};

/// Laplace with location `mu` and scale `b`: `log p(x) = -ln(2b) - |x - mu| / b`.
#[derive(Debug)]
pub struct Laplace {
    mu: Expr,
    b: Expr,
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl Laplace {
    const NAME: &'static str = "Laplace";

    /// Laplace with location `mu` and scale `b`.
    pub fn new(mu: impl Into<Param>, b: impl Into<Param>) -> Result<Self> {
        Self::build(mu.into().to_expr(), b.into().to_expr())
    }

    /// From required `mu` and `b`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "b"])?;
        Self::build(kwargs.require(Self::NAME, "mu")?, kwargs.require(Self::NAME, "b")?)
    }

    fn build(mu: Expr, b: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &b])?;
        Ok(Self { mu, b, shape, moments: OnceLock::new() })
    }

    /// Location.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Scale.
    pub fn b(&self) -> &Expr {
        &self.b
    }
}

impl_with_shape!(Laplace);

impl Continuous for Laplace {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("b", &self.b)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let b = &self.b;
        let lp = -(2.0 * b).ln() - (value - &self.mu).abs() / b;
        bound(lp, &[b.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.b])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let b = require_positive(Self::NAME, "b", p[1])?;
            let u = rng.sample::<f64, _>(Open01) - 0.5;
            Ok(p[0] - b * u.signum() * (1.0 - 2.0 * u.abs()).ln())
        })
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            mean: Some(self.mu.clone()),
            median: Some(self.mu.clone()),
            mode: Some(self.mu.clone()),
            variance: Some(2.0 * self.b.powf(2.0)),
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
    fn test_logp_peak_and_tails() {
        let d = Laplace::new(1.0, 0.5).unwrap();
        assert_relative_eq!(d.logp_at(1.0).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.logp_at(2.0).unwrap(), -2.0, epsilon = 1e-12);
        assert_relative_eq!(d.logp_at(0.0).unwrap(), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nonpositive_scale_is_impossible() {
        assert_eq!(Laplace::new(0.0, 0.0).unwrap().logp_at(0.0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(Laplace::new(0.0, -1.0).unwrap().logp_at(0.0).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_sampler_moments() {
        let d = Laplace::new(-2.0, 1.5).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let xs = d.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        let mean = xs.mean().unwrap();
        let var = xs.mapv(|x| (x - mean).powi(2)).mean().unwrap();
        assert!((mean + 2.0).abs() < 0.05, "mean={}", mean);
        assert!((var - 4.5).abs() < 0.3, "var={}", var);
    }
}
