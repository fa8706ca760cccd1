//! Normal distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, precision_from_kwargs, tau_sd};
use crate::sampling::{SampleContext, generate_samples, require_positive};

/// `N(mu, sd)`, equivalently parameterized by precision `tau = sd^-2`.
///
/// `log p(x) = (-tau (x-mu)^2 + ln(tau / 2π)) / 2`
#[derive(Debug)]
pub struct Normal {
    mu: Expr,
    tau: Expr,
    sd: Expr,
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl Normal {
    const NAME: &'static str = "Normal";

    /// Normal with mean `mu` and standard deviation `sd`.
    pub fn new(mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, None, Some(sd.into().to_expr()))?;
        Self::build(mu.into().to_expr(), tau, sd)
    }

    /// Normal with mean `mu` and precision `tau`.
    pub fn with_tau(mu: impl Into<Param>, tau: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, Some(tau.into().to_expr()), None)?;
        Self::build(mu.into().to_expr(), tau, sd)
    }

    /// From `mu` (default 0) and at most one of `tau` / `sd` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "tau", "sd"])?;
        let (tau, sd) = precision_from_kwargs(Self::NAME, kwargs)?;
        Self::build(kwargs.expr_or("mu", 0.0), tau, sd)
    }

    fn build(mu: Expr, tau: Expr, sd: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &tau, &sd])?;
        Ok(Self { mu, tau, sd, shape, moments: OnceLock::new() })
    }

    /// Mean.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Precision.
    pub fn tau(&self) -> &Expr {
        &self.tau
    }

    /// Standard deviation.
    pub fn sd(&self) -> &Expr {
        &self.sd
    }
}

impl_with_shape!(Normal);

impl Continuous for Normal {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("tau", &self.tau), ("sd", &self.sd)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let tau = &self.tau;
        let lp = (-tau * (value - &self.mu).powf(2.0) + (tau / (2.0 * PI)).ln()) / 2.0;
        bound(lp, &[tau.gt(0.0), self.sd.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.sd])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let sd = require_positive(Self::NAME, "sd", p[1])?;
            Ok(p[0] + sd * rng.sample::<f64, _>(StandardNormal))
        })
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            mean: Some(self.mu.clone()),
            median: Some(self.mu.clone()),
            mode: Some(self.mu.clone()),
            variance: Some(1.0 / &self.tau),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::LN_SQRT_2PI;
    use crate::sampling::Registry;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use ns_core::{Error, Point};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_standard_at_zero() {
        let d = Normal::new(0.0, 1.0).unwrap();
        assert_relative_eq!(d.logp_at(0.0).unwrap(), -LN_SQRT_2PI, epsilon = 1e-12);
    }

    #[test]
    fn test_tau_and_sd_agree() {
        let a = Normal::new(1.0, 2.0).unwrap();
        let b = Normal::with_tau(1.0, 0.25).unwrap();
        for x in [-3.0, 0.0, 1.3, 4.0] {
            assert_relative_eq!(a.logp_at(x).unwrap(), b.logp_at(x).unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_sd_is_impossible() {
        let d = Normal::new(0.0, -1.0).unwrap();
        assert_eq!(d.logp_at(0.0).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_kwargs_conflict_and_default() {
        let err = Normal::from_kwargs(&Kwargs::new().with("tau", 1.0).with("sd", 1.0)).unwrap_err();
        assert!(matches!(err, Error::ConflictingParameters { .. }));

        let d = Normal::from_kwargs(&Kwargs::new()).unwrap();
        assert_eq!(d.tau().as_scalar(), Some(1.0));
        assert_eq!(d.sd().as_scalar(), Some(1.0));
    }

    #[test]
    fn test_vector_parameters_set_shape() {
        let d = Normal::new(vec![0.0, 1.0, 2.0], 1.0).unwrap();
        assert_eq!(d.shape(), &[3]);
        let lp = d.logp_value(&arr1(&[0.0, 1.0, 2.0]).into_dyn(), &Point::new()).unwrap();
        for v in lp.iter() {
            assert_relative_eq!(*v, -LN_SQRT_2PI, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_with_shape_override() {
        let d = Normal::new(0.0, 1.0).unwrap().with_shape(&[4]).unwrap();
        assert_eq!(d.shape(), &[4]);
        assert!(Normal::new(vec![0.0, 1.0], 1.0).unwrap().with_shape(&[3]).is_err());
    }

    #[test]
    fn test_sample_moments() {
        let d = Normal::new(3.0, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let xs = d.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        let mean = xs.mean().unwrap();
        let var = xs.mapv(|x| (x - mean).powi(2)).mean().unwrap();
        assert!((mean - 3.0).abs() < 0.05, "mean={}", mean);
        assert!((var - 4.0).abs() < 0.15, "var={}", var);
    }

    #[test]
    fn test_moments_are_lazy_and_stable() {
        let d = Normal::new(1.5, 2.0).unwrap();
        let m = d.moments();
        assert_eq!(m.mean.as_ref().unwrap().as_scalar(), Some(1.5));
        assert_relative_eq!(m.variance.as_ref().unwrap().as_scalar().unwrap(), 4.0, epsilon = 1e-12);
        assert!(std::ptr::eq(m, d.moments()));
    }
}
