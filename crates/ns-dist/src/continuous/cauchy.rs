//! Cauchy distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_positive};

/// Cauchy (Lorentz) with location `alpha` and scale `beta`. Mean and variance are
/// undefined.
#[derive(Debug)]
pub struct Cauchy {
    alpha: Expr,
    beta: Expr,
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl Cauchy {
    const NAME: &'static str = "Cauchy";

    /// Cauchy with location `alpha` and scale `beta`.
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
        Ok(Self { alpha, beta, shape, moments: OnceLock::new() })
    }

    /// Location.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }

    /// Scale.
    pub fn beta(&self) -> &Expr {
        &self.beta
    }
}

impl_with_shape!(Cauchy);

impl Continuous for Cauchy {
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
        let beta = &self.beta;
        let z = (value - &self.alpha) / beta;
        let lp = -PI.ln() - beta.ln() - z.powf(2.0).ln_1p();
        bound(lp, &[beta.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.alpha, &self.beta])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let beta = require_positive(Self::NAME, "beta", p[1])?;
            let u: f64 = rng.random();
            Ok(p[0] + beta * (PI * (u - 0.5)).tan())
        })
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            median: Some(self.alpha.clone()),
            mode: Some(self.alpha.clone()),
            ..Moments::default()
        })
    }
}
