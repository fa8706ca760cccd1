//! Improper flat prior.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};

use crate::distribution::{Continuous, Moments, impl_with_shape};
use crate::expr::Expr;
use crate::params::Kwargs;
use crate::sampling::SampleContext;

/// Uninformative log-density of zero over the whole real line. Cannot be sampled.
#[derive(Debug, Default)]
pub struct Flat {
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl Flat {
    const NAME: &'static str = "Flat";

    /// Scalar flat prior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes no parameters.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &[])?;
        Ok(Self::new())
    }
}

impl_with_shape!(Flat);

impl Continuous for Flat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        Vec::new()
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        Ok(Expr::full(value.shape()?, 0.0))
    }

    fn random(&self, _ctx: &mut SampleContext<'_>, _size: &[usize]) -> Result<ArrayD<f64>> {
        Err(Error::UnsamplableDistribution(Self::NAME.to_string()))
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments { median: Some(Expr::scalar(0.0)), ..Moments::default() })
    }
}
