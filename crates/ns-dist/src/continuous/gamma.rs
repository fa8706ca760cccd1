//! Gamma distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::Rng;
use rand_distr::Gamma as GammaSampler;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, ParameterGroup, gamma_from_moments, resolve_group};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

const SHAPE_RATE: ParameterGroup = ParameterGroup::new("shape/rate", &["alpha", "beta"]);
const MOMENTS: ParameterGroup = ParameterGroup::new("moments", &["mu", "sd"]);
const GROUPS: [ParameterGroup; 2] = [SHAPE_RATE, MOMENTS];

/// Gamma with shape `alpha` and rate `beta` on `[0, inf)`, or from mean/standard
/// deviation `(mu, sd)`.
///
/// ```text
/// log p(x) = -lnΓ(alpha) + alpha ln(beta) - beta x + (alpha - 1) ln x
/// ```
#[derive(Debug)]
pub struct Gamma {
    alpha: Expr,
    beta: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Gamma {
    const NAME: &'static str = "Gamma";

    /// Gamma with shape `alpha` and rate `beta`.
    pub fn new(alpha: impl Into<Param>, beta: impl Into<Param>) -> Result<Self> {
        Self::build(alpha.into().to_expr(), beta.into().to_expr())
    }

    /// Gamma with mean `mu` and standard deviation `sd`.
    pub fn with_moments(mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Self> {
        let (alpha, beta) = gamma_from_moments(&mu.into().to_expr(), &sd.into().to_expr());
        Self::build(alpha, beta)
    }

    /// From exactly one of `{alpha, beta}` or `{mu, sd}`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["alpha", "beta", "mu", "sd"])?;
        let group = resolve_group(Self::NAME, &GROUPS, kwargs)?;
        if *group == MOMENTS {
            let (alpha, beta) = gamma_from_moments(
                &kwargs.require(Self::NAME, "mu")?,
                &kwargs.require(Self::NAME, "sd")?,
            );
            Self::build(alpha, beta)
        } else {
            Self::build(kwargs.require(Self::NAME, "alpha")?, kwargs.require(Self::NAME, "beta")?)
        }
    }

    pub(crate) fn build(alpha: Expr, beta: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&alpha, &beta])?;
        Ok(Self { alpha, beta, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Shape.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }

    /// Rate.
    pub fn beta(&self) -> &Expr {
        &self.beta
    }
}

impl_with_shape!(Gamma);

impl Continuous for Gamma {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("alpha", &self.alpha), ("beta", &self.beta)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let (a, b) = (&self.alpha, &self.beta);
        let lp = -a.ln_gamma() + b.logpow(a) - b * value + value.logpow(a - 1.0);
        bound(lp, &[value.ge(0.0), a.gt(0.0), b.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.beta])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let a = require_positive(Self::NAME, "alpha", p[0])?;
            let b = require_positive(Self::NAME, "beta", p[1])?;
            let g = GammaSampler::new(a, 1.0 / b).map_err(|e| Error::Validation(e.to_string()))?;
            Ok(rng.sample(g))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (a, b) = (&self.alpha, &self.beta);
            Moments {
                mean: Some(a / b),
                median: None,
                mode: Some(((a - 1.0) / b).max(0.0)),
                variance: Some(a / b.powf(2.0)),
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
    use statrs::distribution::{Continuous as _, Gamma as StatrsGamma};

    #[test]
    fn test_logp_matches_statrs() {
        let d = Gamma::new(2.5, 1.5).unwrap();
        let reference = StatrsGamma::new(2.5, 1.5).unwrap();
        for x in [0.1, 1.0, 2.0, 7.5] {
            assert_relative_eq!(d.logp_at(x).unwrap(), reference.ln_pdf(x), epsilon = 1e-10);
        }
        assert_eq!(d.logp_at(-1.0).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_exponential_special_case_at_zero() {
        let d = Gamma::new(1.0, 2.0).unwrap();
        assert_relative_eq!(d.logp_at(0.0).unwrap(), 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_moment_parameterization() {
        let d = Gamma::from_kwargs(&Kwargs::new().with("mu", 3.0).with("sd", 1.5)).unwrap();
        assert_relative_eq!(d.alpha().as_scalar().unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(d.beta().as_scalar().unwrap(), 4.0 / 3.0, epsilon = 1e-12);
        let m = d.moments();
        assert_relative_eq!(m.mean.as_ref().unwrap().as_scalar().unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(m.variance.as_ref().unwrap().as_scalar().unwrap(), 2.25, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_rate_group_is_not_converted() {
        let d = Gamma::from_kwargs(&Kwargs::new().with("alpha", 3.0).with("beta", 1.5)).unwrap();
        assert_eq!(d.alpha().as_scalar(), Some(3.0));
        assert_eq!(d.beta().as_scalar(), Some(1.5));
    }

    #[test]
    fn test_mode_clamped_at_zero() {
        let d = Gamma::new(0.5, 1.0).unwrap();
        assert_eq!(d.moments().mode.as_ref().unwrap().as_scalar(), Some(0.0));
    }

    #[test]
    fn test_sampler_uses_rate() {
        let d = Gamma::new(3.0, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(19);
        let xs = d.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        assert!((xs.mean().unwrap() - 1.5).abs() < 0.03);
    }
}
