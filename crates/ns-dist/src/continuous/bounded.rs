//! Truncation of an arbitrary distribution to `[lower, upper]`.
//!
//! [`Bounded`] owns its inner distribution and forwards to it; the log-density is the
//! inner one guarded by the bounds (unnormalized), and sampling rejects inner draws that
//! fall outside. [`Bound`] is a small factory for building several bounded distributions
//! with the same limits.

use std::sync::OnceLock;

use ndarray::{ArrayD, IxDyn};
use ns_core::{Error, Result};

use super::StudentT;
use crate::distribution::{Continuous, Moments, check_declared_shape, infer_shape};
use crate::expr::{Expr, broadcast_to};
use crate::guard::bound;
use crate::params::Param;
use crate::sampling::SampleContext;
use crate::transforms::Transform;

/// A distribution restricted to `[lower, upper]`; either side may be absent.
#[derive(Debug)]
pub struct Bounded {
    inner: Box<dyn Continuous>,
    lower: Option<Expr>,
    upper: Option<Expr>,
    transform: Option<Transform>,
    moments: OnceLock<Moments>,
}

impl Bounded {
    const NAME: &'static str = "Bounded";

    /// Restrict `inner` to `[lower, upper]`.
    ///
    /// A constant bound that is infinite everywhere is treated as absent. Bounds must
    /// broadcast to the inner distribution's shape.
    pub fn new(inner: Box<dyn Continuous>, lower: Option<Expr>, upper: Option<Expr>) -> Result<Self> {
        let transform = Transform::from_bounds(lower.as_ref(), upper.as_ref());
        let (lower, upper) = match &transform {
            Some(Transform::Interval { lower, upper }) => (Some(lower.clone()), Some(upper.clone())),
            Some(Transform::LowerBound { lower }) => (Some(lower.clone()), None),
            Some(Transform::UpperBound { upper }) => (None, Some(upper.clone())),
            _ => (None, None),
        };
        let present: Vec<&Expr> = lower.iter().chain(upper.iter()).collect();
        let bounds_shape = infer_shape(Self::NAME, &present)?;
        check_declared_shape(Self::NAME, &bounds_shape, inner.shape())?;
        Ok(Self { inner, lower, upper, transform, moments: OnceLock::new() })
    }

    /// The wrapped distribution.
    pub fn inner(&self) -> &dyn Continuous {
        self.inner.as_ref()
    }

    /// Lower bound, if any.
    pub fn lower(&self) -> Option<&Expr> {
        self.lower.as_ref()
    }

    /// Upper bound, if any.
    pub fn upper(&self) -> Option<&Expr> {
        self.upper.as_ref()
    }
}

impl Continuous for Bounded {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        self.inner.parameters()
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let mut constraints = Vec::with_capacity(2);
        if let Some(lower) = &self.lower {
            constraints.push(value.ge(lower));
        }
        if let Some(upper) = &self.upper {
            constraints.push(value.le(upper));
        }
        bound(self.inner.logp(value)?, &constraints)
    }

    /// Fill each output position independently from repeated inner draws.
    ///
    /// Upstream references are resolved once for the whole call, so every round draws
    /// from the same conditional inner distribution.
    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let lower = self.lower.clone().unwrap_or_else(|| Expr::scalar(f64::NEG_INFINITY));
        let upper = self.upper.clone().unwrap_or_else(|| Expr::scalar(f64::INFINITY));
        let v = ctx.draw_values(&[&lower, &upper])?;

        let target: Vec<usize> = size.iter().chain(self.shape()).copied().collect();
        let lo = broadcast_to(&v[0], &target)?;
        let hi = broadcast_to(&v[1], &target)?;
        let requested = lo.len();

        let config = ctx.rejection().clone();
        let mut out = vec![0.0; requested];
        let mut done = vec![false; requested];
        let mut filled = 0;
        let mut rounds = 0;

        while filled < requested {
            if config.is_cancelled() {
                return Err(Error::Cancelled { rounds });
            }
            if config.max_rounds.is_some_and(|max| rounds >= max) {
                log::warn!(
                    "{}({}): giving up after {} rounds with {}/{} draws in bounds",
                    Self::NAME,
                    self.inner.name(),
                    rounds,
                    filled,
                    requested
                );
                return Err(Error::RejectionLimit { rounds, filled, requested });
            }

            let draw = self.inner.random(ctx, size)?;
            if draw.shape() != target.as_slice() {
                return Err(Error::Shape(format!(
                    "{}: inner draw has shape {:?}, expected {:?}",
                    Self::NAME,
                    draw.shape(),
                    target
                )));
            }
            rounds += 1;

            for (i, ((&x, &l), &h)) in draw.iter().zip(lo.iter()).zip(hi.iter()).enumerate() {
                if !done[i] && x >= l && x <= h {
                    out[i] = x;
                    done[i] = true;
                    filled += 1;
                }
            }
            log::debug!("{}: round {} filled {}/{}", Self::NAME, rounds, filled, requested);
        }

        ArrayD::from_shape_vec(IxDyn(&target), out).map_err(|e| Error::Shape(e.to_string()))
    }

    fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            mode: self.inner.moments().mode.clone(),
            ..Moments::default()
        })
    }

    /// The inner default, moved into the support where it falls on or outside a bound:
    /// to the midpoint with both bounds, to `lower + 1` or `upper - 1` with one.
    fn default_value(&self) -> Option<Expr> {
        let inner = self.inner.default_value();
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => {
                let mid = (l + u) * 0.5;
                Some(match inner {
                    Some(d) => Expr::switch(&d.gt(l).and(d.lt(u)), &d, &mid),
                    None => mid,
                })
            }
            (Some(l), None) => {
                let above = l + 1.0;
                Some(match inner {
                    Some(d) => Expr::switch(&d.gt(l), &d, &above),
                    None => above,
                })
            }
            (None, Some(u)) => {
                let below = u - 1.0;
                Some(match inner {
                    Some(d) => Expr::switch(&d.lt(u), &d, &below),
                    None => below,
                })
            }
            (None, None) => inner,
        }
    }
}

/// Bounds to apply to distributions, e.g. `Bound::lower(0.0).dist(Normal::new(0.0, 1.0)?)`.
#[derive(Debug, Clone)]
pub struct Bound {
    lower: Expr,
    upper: Expr,
}

impl Bound {
    /// Both bounds; pass an infinity to leave a side open.
    pub fn new(lower: impl Into<Param>, upper: impl Into<Param>) -> Self {
        Self { lower: lower.into().to_expr(), upper: upper.into().to_expr() }
    }

    /// Lower bound only.
    pub fn lower(lower: impl Into<Param>) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    /// Upper bound only.
    pub fn upper(upper: impl Into<Param>) -> Self {
        Self::new(f64::NEG_INFINITY, upper)
    }

    /// Bound `inner`.
    pub fn dist(&self, inner: impl Continuous + 'static) -> Result<Bounded> {
        self.dist_boxed(Box::new(inner))
    }

    /// Bound an already boxed distribution.
    pub fn dist_boxed(&self, inner: Box<dyn Continuous>) -> Result<Bounded> {
        Bounded::new(inner, Some(self.lower.clone()), Some(self.upper.clone()))
    }
}

/// Student's t restricted to `[0, inf)`.
pub fn student_t_pos(nu: impl Into<Param>, mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Bounded> {
    Bound::lower(0.0).dist(StudentT::new(nu, mu, sd)?)
}
