//! Half-Cauchy distribution.

use std::f64::consts::{LN_2, PI};
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

/// `|Cauchy(0, beta)|` on `[0, inf)`.
#[derive(Debug)]
pub struct HalfCauchy {
    beta: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl HalfCauchy {
    const NAME: &'static str = "HalfCauchy";

    /// Half-Cauchy with scale `beta`.
    pub fn new(beta: impl Into<Param>) -> Result<Self> {
        Self::build(beta.into().to_expr())
    }

    /// From a required `beta`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["beta"])?;
        Self::build(kwargs.require(Self::NAME, "beta")?)
    }

    fn build(beta: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&beta])?;
        Ok(Self { beta, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Scale.
    pub fn beta(&self) -> &Expr {
        &self.beta
    }
}

impl_with_shape!(HalfCauchy);

impl Continuous for HalfCauchy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("beta", &self.beta)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let beta = &self.beta;
        let lp = LN_2 - PI.ln() - beta.ln() - (value / beta).powf(2.0).ln_1p();
        bound(lp, &[value.ge(0.0), beta.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.beta])?;
        generate_samples(&[&v[0]], &self.shape, size, ctx.rng(), |rng, p| {
            let beta = require_positive(Self::NAME, "beta", p[0])?;
            let u: f64 = rng.random();
            Ok(beta * (PI * (u - 0.5)).tan().abs())
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            median: Some(self.beta.clone()),
            mode: Some(Expr::full(&self.shape, 0.0)),
            ..Moments::default()
        })
    }
}
