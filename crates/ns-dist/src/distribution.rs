//! The [`Continuous`] distribution interface and shared helpers.

use ndarray::ArrayD;
use ns_core::{Error, Point, Result};
use rand::RngCore;

use crate::expr::{Expr, broadcast_shapes};
use crate::sampling::{SampleContext, VariableRegistry};
use crate::transforms::Transform;

/// Closed-form summary statistics; `None` where undefined or not provided.
#[derive(Debug, Clone, Default)]
pub struct Moments {
    /// Expected value.
    pub mean: Option<Expr>,
    /// Median.
    pub median: Option<Expr>,
    /// Mode.
    pub mode: Option<Expr>,
    /// Variance.
    pub variance: Option<Expr>,
}

/// A parametric continuous distribution.
///
/// Object safe: a model graph stores distributions as `Box<dyn Continuous>`. Instances
/// are immutable after construction apart from lazily computed moments.
pub trait Continuous: std::fmt::Debug + Send + Sync {
    /// Distribution name, e.g. `"Normal"`.
    fn name(&self) -> &'static str;

    /// Declared shape of a single draw.
    fn shape(&self) -> &[usize];

    /// Canonical parameters in declaration order.
    fn parameters(&self) -> Vec<(&'static str, &Expr)>;

    /// Guarded elementwise log-density at `value`.
    ///
    /// Out-of-support values and invalid parameters give `-inf`, never an error.
    fn logp(&self, value: &Expr) -> Result<Expr>;

    /// Draw an array of shape `size ++ shape()`.
    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>>;

    /// Reparameterization to the real line, if the support is constrained.
    fn transform(&self) -> Option<&Transform> {
        None
    }

    /// Closed-form moments.
    fn moments(&self) -> &Moments;

    /// Starting value: the first of mean, median, mode that is available and finite.
    fn default_value(&self) -> Option<Expr> {
        let m = self.moments();
        [&m.mean, &m.median, &m.mode].into_iter().flatten().find(|e| is_usable(e)).cloned()
    }

    /// Eager log-density at a concrete value, resolving parameter references via `point`.
    fn logp_value(&self, value: &ArrayD<f64>, point: &Point) -> Result<ArrayD<f64>> {
        self.logp(&Expr::constant(value.clone()))?.eval(point)
    }

    /// Eager scalar log-density for a scalar distribution with literal parameters.
    fn logp_at(&self, x: f64) -> Result<f64> {
        self.logp(&Expr::scalar(x))?.eval_scalar(&Point::new())
    }

    /// Sample with a fresh [`SampleContext`].
    fn sample(
        &self,
        registry: &dyn VariableRegistry,
        point: &Point,
        size: &[usize],
        rng: &mut dyn RngCore,
    ) -> Result<ArrayD<f64>> {
        let mut ctx = SampleContext::new(registry, point, rng);
        self.random(&mut ctx, size)
    }
}

// Non-constant candidates are accepted as-is; constants must be finite everywhere.
fn is_usable(e: &Expr) -> bool {
    e.as_constant().is_none_or(|a| a.iter().all(|v| v.is_finite()))
}

/// Broadcast shape of the given parameters.
pub fn infer_shape(name: &str, params: &[&Expr]) -> Result<Vec<usize>> {
    let mut shapes = Vec::with_capacity(params.len());
    for p in params {
        shapes.push(p.shape()?);
    }
    broadcast_shapes(&shapes)
        .map_err(|e| Error::Shape(format!("{}: parameters do not broadcast: {}", name, e)))
}

/// Check that parameters of shape `inferred` broadcast to `declared`.
pub fn check_declared_shape(name: &str, inferred: &[usize], declared: &[usize]) -> Result<()> {
    match broadcast_shapes(&[inferred, declared]) {
        Ok(s) if s == declared => Ok(()),
        _ => Err(Error::Shape(format!(
            "{}: parameters of shape {:?} do not broadcast to declared shape {:?}",
            name, inferred, declared
        ))),
    }
}

/// Implements `with_shape` for a distribution struct with `shape: Vec<usize>` and
/// `moments: OnceLock<Moments>` fields. Cached moments are dropped on reshape.
macro_rules! impl_with_shape {
    ($ty:ty) => {
        impl $ty {
            /// Override the declared shape; parameters must broadcast to it.
            pub fn with_shape(mut self, shape: &[usize]) -> ns_core::Result<Self> {
                let name = <Self as $crate::distribution::Continuous>::name(&self);
                $crate::distribution::check_declared_shape(name, &self.shape, shape)?;
                self.shape = shape.to_vec();
                self.moments = std::sync::OnceLock::new();
                Ok(self)
            }
        }
    };
}
pub(crate) use impl_with_shape;

/// A distribution viewed through its transform: density over the unconstrained variable.
#[derive(Debug, Clone, Copy)]
pub struct Transformed<'a> {
    dist: &'a dyn Continuous,
    transform: &'a Transform,
}

impl<'a> Transformed<'a> {
    /// `None` when the distribution has no transform.
    pub fn new(dist: &'a dyn Continuous) -> Option<Self> {
        dist.transform().map(|transform| Self { dist, transform })
    }

    /// The transform in use.
    pub fn transform(&self) -> &Transform {
        self.transform
    }

    /// `logp(backward(y)) + log_jacobian_det(y)`.
    pub fn logp_unconstrained(&self, y: &Expr) -> Result<Expr> {
        let x = self.transform.backward(y);
        Ok(self.dist.logp(&x)? + self.transform.log_jacobian_det(y))
    }

    /// Unconstrained counterpart of the distribution's default value.
    pub fn default_value(&self) -> Option<Expr> {
        self.dist.default_value().map(|x| self.transform.forward(&x))
    }
}
