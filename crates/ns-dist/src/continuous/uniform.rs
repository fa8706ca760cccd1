//! Continuous uniform distribution.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::Rng;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_finite};
use crate::transforms::Transform;

/// Uniform on `[lower, upper]`.
#[derive(Debug)]
pub struct Uniform {
    lower: Expr,
    upper: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Uniform {
    const NAME: &'static str = "Uniform";

    /// Uniform on `[lower, upper]`.
    pub fn new(lower: impl Into<Param>, upper: impl Into<Param>) -> Result<Self> {
        Self::build(lower.into().to_expr(), upper.into().to_expr())
    }

    /// From `lower` (default 0) and `upper` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["lower", "upper"])?;
        Self::build(kwargs.expr_or("lower", 0.0), kwargs.expr_or("upper", 1.0))
    }

    fn build(lower: Expr, upper: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&lower, &upper])?;
        let transform = Transform::Interval { lower: lower.clone(), upper: upper.clone() };
        Ok(Self { lower, upper, shape, transform, moments: OnceLock::new() })
    }

    /// Lower edge.
    pub fn lower(&self) -> &Expr {
        &self.lower
    }

    /// Upper edge.
    pub fn upper(&self) -> &Expr {
        &self.upper
    }
}

impl_with_shape!(Uniform);

impl Continuous for Uniform {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("lower", &self.lower), ("upper", &self.upper)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let lp = -(&self.upper - &self.lower).ln();
        bound(lp, &[value.ge(&self.lower), value.le(&self.upper)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.lower, &self.upper])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let lower = require_finite(Self::NAME, "lower", p[0])?;
            let upper = require_finite(Self::NAME, "upper", p[1])?;
            if upper < lower {
                return Err(Error::Validation(format!(
                    "{}: upper ({}) must be >= lower ({})",
                    Self::NAME,
                    upper,
                    lower
                )));
            }
            Ok(lower + (upper - lower) * rng.random::<f64>())
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let mid = (&self.upper + &self.lower) / 2.0;
            Moments {
                mean: Some(mid.clone()),
                median: Some(mid),
                mode: None,
                variance: Some((&self.upper - &self.lower).powf(2.0) / 12.0),
            }
        })
    }
}
