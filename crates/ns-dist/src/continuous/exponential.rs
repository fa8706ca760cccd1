//! Exponential distribution.

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

/// Exponential with rate `lam` on `[0, inf)`: `log p(x) = ln(lam) - lam·x`.
#[derive(Debug)]
pub struct Exponential {
    lam: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Exponential {
    const NAME: &'static str = "Exponential";

    /// Exponential with rate `lam`.
    pub fn new(lam: impl Into<Param>) -> Result<Self> {
        Self::build(lam.into().to_expr())
    }

    /// From a required `lam`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["lam"])?;
        Self::build(kwargs.require(Self::NAME, "lam")?)
    }

    fn build(lam: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&lam])?;
        Ok(Self { lam, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Rate.
    pub fn lam(&self) -> &Expr {
        &self.lam
    }
}

impl_with_shape!(Exponential);

impl Continuous for Exponential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("lam", &self.lam)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let lam = &self.lam;
        bound(lam.ln() - lam * value, &[value.ge(0.0), lam.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.lam])?;
        generate_samples(&[&v[0]], &self.shape, size, ctx.rng(), |rng, p| {
            let lam = require_positive(Self::NAME, "lam", p[0])?;
            let u: f64 = rng.sample(Open01);
            Ok(-u.ln() / lam)
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let lam = &self.lam;
            Moments {
                mean: Some(1.0 / lam),
                median: Some(LN_2 / lam),
                mode: Some(Expr::full(&self.shape, 0.0)),
                variance: Some(lam.powf(-2.0)),
            }
        })
    }
}
