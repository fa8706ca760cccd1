//! Half-normal distribution.

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
use crate::transforms::Transform;

/// `|N(0, sd)|` on `[0, inf)`.
#[derive(Debug)]
pub struct HalfNormal {
    tau: Expr,
    sd: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl HalfNormal {
    const NAME: &'static str = "HalfNormal";

    /// Half-normal with scale `sd`.
    pub fn new(sd: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, None, Some(sd.into().to_expr()))?;
        Self::build(tau, sd)
    }

    /// Half-normal with precision `tau`.
    pub fn with_tau(tau: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, Some(tau.into().to_expr()), None)?;
        Self::build(tau, sd)
    }

    /// From at most one of `tau` / `sd` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["tau", "sd"])?;
        let (tau, sd) = precision_from_kwargs(Self::NAME, kwargs)?;
        Self::build(tau, sd)
    }

    fn build(tau: Expr, sd: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&tau, &sd])?;
        Ok(Self { tau, sd, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Precision.
    pub fn tau(&self) -> &Expr {
        &self.tau
    }

    /// Scale.
    pub fn sd(&self) -> &Expr {
        &self.sd
    }
}

impl_with_shape!(HalfNormal);

impl Continuous for HalfNormal {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("tau", &self.tau), ("sd", &self.sd)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let tau = &self.tau;
        let lp = -0.5 * tau * value.powf(2.0) + 0.5 * (tau * 2.0 / PI).ln();
        bound(lp, &[value.ge(0.0), tau.gt(0.0), self.sd.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.sd])?;
        generate_samples(&[&v[0]], &self.shape, size, ctx.rng(), |rng, p| {
            let sd = require_positive(Self::NAME, "sd", p[0])?;
            Ok(sd * rng.sample::<f64, _>(StandardNormal).abs())
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            mean: Some((2.0 / (PI * &self.tau)).sqrt()),
            variance: Some((1.0 - 2.0 / PI) / &self.tau),
            ..Moments::default()
        })
    }
}
