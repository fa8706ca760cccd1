//! Beta distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::Rng;
use rand_distr::Beta as BetaSampler;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, ParameterGroup, beta_from_moments, resolve_group};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

const SHAPE: ParameterGroup = ParameterGroup::new("shape", &["alpha", "beta"]);
const MOMENTS: ParameterGroup = ParameterGroup::new("moments", &["mu", "sd"]);
const GROUPS: [ParameterGroup; 2] = [SHAPE, MOMENTS];

/// Beta on `[0, 1]`, from shapes `(alpha, beta)` or mean/standard deviation `(mu, sd)`.
///
/// ```text
/// log p(x) = (alpha-1) ln x + (beta-1) ln(1-x) - ln B(alpha, beta)
/// ```
#[derive(Debug)]
pub struct Beta {
    alpha: Expr,
    beta: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Beta {
    const NAME: &'static str = "Beta";

    /// Beta with shapes `alpha` and `beta`.
    pub fn new(alpha: impl Into<Param>, beta: impl Into<Param>) -> Result<Self> {
        Self::build(alpha.into().to_expr(), beta.into().to_expr())
    }

    /// Beta with mean `mu` and standard deviation `sd`.
    pub fn with_moments(mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Self> {
        let (alpha, beta) = beta_from_moments(&mu.into().to_expr(), &sd.into().to_expr());
        Self::build(alpha, beta)
    }

    /// From exactly one of `{alpha, beta}` or `{mu, sd}`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["alpha", "beta", "mu", "sd"])?;
        let group = resolve_group(Self::NAME, &GROUPS, kwargs)?;
        if *group == MOMENTS {
            let (alpha, beta) = beta_from_moments(
                &kwargs.require(Self::NAME, "mu")?,
                &kwargs.require(Self::NAME, "sd")?,
            );
            Self::build(alpha, beta)
        } else {
            Self::build(kwargs.require(Self::NAME, "alpha")?, kwargs.require(Self::NAME, "beta")?)
        }
    }

    fn build(alpha: Expr, beta: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&alpha, &beta])?;
        Ok(Self { alpha, beta, shape, transform: Transform::LogOdds, moments: OnceLock::new() })
    }

    /// First shape parameter.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }

    /// Second shape parameter.
    pub fn beta(&self) -> &Expr {
        &self.beta
    }
}

impl_with_shape!(Beta);

impl Continuous for Beta {
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
        let lp = value.logpow(a - 1.0) + (1.0 - value).logpow(b - 1.0) - a.ln_beta(b);
        bound(lp, &[value.ge(0.0), value.le(1.0), a.gt(0.0), b.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.beta])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let a = require_positive(Self::NAME, "alpha", p[0])?;
            let b = require_positive(Self::NAME, "beta", p[1])?;
            let sampler = BetaSampler::new(a, b).map_err(|e| Error::Validation(e.to_string()))?;
            Ok(rng.sample(sampler))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (a, b) = (&self.alpha, &self.beta);
            let total = a + b;
            Moments {
                mean: Some(a / &total),
                variance: Some(a * b / (total.powf(2.0) * (&total + 1.0))),
                ..Moments::default()
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
    fn test_symmetric_at_half() {
        let d = Beta::new(2.0, 2.0).unwrap();
        assert_relative_eq!(d.logp_at(0.5).unwrap(), 1.5f64.ln(), epsilon = 1e-10);
        assert_eq!(d.logp_at(1.5).unwrap(), f64::NEG_INFINITY);
        assert_eq!(d.logp_at(-0.1).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_uniform_edges_are_finite() {
        let d = Beta::new(1.0, 1.0).unwrap();
        assert_relative_eq!(d.logp_at(0.0).unwrap(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(d.logp_at(1.0).unwrap(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_moment_parameterization() {
        let d = Beta::from_kwargs(&Kwargs::new().with("mu", 0.25).with("sd", 0.1)).unwrap();
        let m = d.moments();
        assert_relative_eq!(m.mean.as_ref().unwrap().as_scalar().unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(m.variance.as_ref().unwrap().as_scalar().unwrap(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_mixed_groups_conflict() {
        let kw = Kwargs::new().with("alpha", 1.0).with("beta", 1.0).with("mu", 0.5).with("sd", 0.1);
        assert!(matches!(Beta::from_kwargs(&kw), Err(Error::ConflictingParameters { .. })));
        let kw = Kwargs::new().with("alpha", 1.0);
        assert!(matches!(Beta::from_kwargs(&kw), Err(Error::UnderspecifiedParameters { .. })));
    }

    #[test]
    fn test_samples_in_unit_interval() {
        let d = Beta::new(2.0, 5.0).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let xs = d.sample(&Registry::new(), &Point::new(), &[10_000], &mut rng).unwrap();
        assert!(xs.iter().all(|&x| (0.0..=1.0).contains(&x)));
        assert!((xs.mean().unwrap() - 2.0 / 7.0).abs() < 0.01);
    }

    #[test]
    fn test_tiny_shapes_sample_inside_support() {
        let d = Beta::new(1e-3, 1e-3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let xs = d.sample(&Registry::new(), &Point::new(), &[2000], &mut rng).unwrap();
        assert!(xs.iter().all(|&x| x.is_finite() && (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_moments_group_matches_constructor() {
        let from_kwargs = Beta::from_kwargs(&Kwargs::new().with("mu", 0.3).with("sd", 0.2)).unwrap();
        let direct = Beta::with_moments(0.3, 0.2).unwrap();
        assert_eq!(from_kwargs.alpha().as_scalar(), direct.alpha().as_scalar());
        assert_eq!(from_kwargs.beta().as_scalar(), direct.beta().as_scalar());
        let shapes = Beta::from_kwargs(&Kwargs::new().with("alpha", 2.0).with("beta", 3.0)).unwrap();
        assert_eq!(shapes.alpha().as_scalar(), Some(2.0));
    }

    #[test]
    fn test_logodds_transform() {
        assert_eq!(Beta::new(1.0, 1.0).unwrap().transform().unwrap().name(), "logodds");
    }
}
