//! Inverse-gamma distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::Rng;
use rand_distr::Gamma as GammaSampler;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

/// `1 / Gamma(alpha, rate = beta)` on `(0, inf)`.
///
/// ```text
/// log p(x) = alpha ln(beta) - lnΓ(alpha) - beta / x - (alpha + 1) ln x
/// ```
///
/// Mean and variance are infinite (elementwise) where `alpha <= 1` and `alpha <= 2`
/// respectively.
#[derive(Debug)]
pub struct InverseGamma {
    alpha: Expr,
    beta: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl InverseGamma {
    const NAME: &'static str = "InverseGamma";

    /// Inverse-gamma with shape `alpha` and scale `beta`.
    pub fn new(alpha: impl Into<Param>, beta: impl Into<Param>) -> Result<Self> {
        Self::build(alpha.into().to_expr(), beta.into().to_expr())
    }

    /// From a required `alpha` and `beta` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["alpha", "beta"])?;
        Self::build(kwargs.require(Self::NAME, "alpha")?, kwargs.expr_or("beta", 1.0))
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

impl_with_shape!(InverseGamma);

impl Continuous for InverseGamma {
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
        let lp = b.logpow(a) - a.ln_gamma() - b / value + value.logpow(-a - 1.0);
        bound(lp, &[value.gt(0.0), a.gt(0.0), b.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.beta])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let a = require_positive(Self::NAME, "alpha", p[0])?;
            let b = require_positive(Self::NAME, "beta", p[1])?;
            let g = GammaSampler::new(a, 1.0 / b).map_err(|e| Error::Validation(e.to_string()))?;
            let draw: f64 = rng.sample(g);
            Ok(1.0 / draw)
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (a, b) = (&self.alpha, &self.beta);
            let inf = Expr::scalar(f64::INFINITY);
            let mean = Expr::switch(&a.gt(1.0), &(b / (a - 1.0)), &inf);
            let variance = Expr::switch(
                &a.gt(2.0),
                &(b.powf(2.0) / ((a - 1.0).powf(2.0) * (a - 2.0))),
                &inf,
            );
            Moments { mean: Some(mean), median: None, mode: Some(b / (a + 1.0)), variance: Some(variance) }
        })
    }
}
