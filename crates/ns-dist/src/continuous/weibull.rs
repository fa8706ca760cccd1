//! Weibull distribution.

use std::f64::consts::LN_2;
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
use crate::transforms::Transform;

/// Weibull with shape `alpha` and scale `beta` on `[0, inf)`.
///
/// ```text
/// log p(x) = ln(alpha) - ln(beta) + (alpha - 1) ln(x / beta) - (x / beta)^alpha
/// ```
#[derive(Debug)]
pub struct Weibull {
    alpha: Expr,
    beta: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Weibull {
    const NAME: &'static str = "Weibull";

    /// Weibull with shape `alpha` and scale `beta`.
    pub fn new(alpha: impl Into<Param>, beta: impl Into<Param>) -> Result<Self> {
        Self::build(alpha.into().to_expr(), beta.into().to_expr())
    }

    /// From required `alpha` and `beta`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["alpha", "beta"])?;
        Self::build(kwargs.require(Self::NAME, "alpha")?, kwargs.require(Self::NAME, "beta")?)
    }

    fn build(alpha: Expr, beta: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&alpha, &beta])?;
        Ok(Self { alpha, beta, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Shape.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }

    /// Scale.
    pub fn beta(&self) -> &Expr {
        &self.beta
    }
}

impl_with_shape!(Weibull);

impl Continuous for Weibull {
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
        let z = value / b;
        let lp = a.ln() - b.ln() + z.logpow(a - 1.0) - z.powf(a);
        bound(lp, &[value.ge(0.0), a.gt(0.0), b.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.beta])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let a = require_positive(Self::NAME, "alpha", p[0])?;
            let b = require_positive(Self::NAME, "beta", p[1])?;
            let u: f64 = rng.sample(Open01);
            Ok(b * (-u.ln()).powf(1.0 / a))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (a, b) = (&self.alpha, &self.beta);
            let g1 = (1.0 + 1.0 / a).ln_gamma().exp();
            let g2 = (1.0 + 2.0 / a).ln_gamma().exp();
            Moments {
                mean: Some(b * &g1),
                median: Some(b * Expr::scalar(LN_2).powf(1.0 / a)),
                mode: None,
                variance: Some(b.powf(2.0) * (g2 - g1.powf(2.0))),
            }
        })
    }
}
