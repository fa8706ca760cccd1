//! Von Mises (circular normal) distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::{Rng, RngCore};

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::math::wrap_angle;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_finite};
use crate::transforms::Transform;

/// Below this concentration draws are uniform on the circle.
const UNIFORM_KAPPA: f64 = 1e-8;

/// Von Mises on `[-π, π]` with mean direction `mu` and concentration `kappa`.
///
/// ```text
/// log p(x) = kappa cos(mu - x) - ln(2π I0(kappa))
/// ```
///
/// `ln I0` is evaluated as `ln(i0e(kappa)) + |kappa|` so large concentrations do not
/// overflow.
#[derive(Debug)]
pub struct VonMises {
    mu: Expr,
    kappa: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl VonMises {
    const NAME: &'static str = "VonMises";

    /// Von Mises with mean direction `mu` and concentration `kappa`.
    pub fn new(mu: impl Into<Param>, kappa: impl Into<Param>) -> Result<Self> {
        Self::build(mu.into().to_expr(), kappa.into().to_expr())
    }

    /// From `mu` (default 0) and a required `kappa`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "kappa"])?;
        Self::build(kwargs.expr_or("mu", 0.0), kwargs.require(Self::NAME, "kappa")?)
    }

    fn build(mu: Expr, kappa: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &kappa])?;
        Ok(Self { mu, kappa, shape, transform: Transform::Circular, moments: OnceLock::new() })
    }

    /// Mean direction.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Concentration.
    pub fn kappa(&self) -> &Expr {
        &self.kappa
    }
}

impl_with_shape!(VonMises);

/// Best & Fisher (1979) rejection sampler.
fn draw(rng: &mut dyn RngCore, mu: f64, kappa: f64) -> f64 {
    if kappa < UNIFORM_KAPPA {
        return PI * (2.0 * rng.random::<f64>() - 1.0);
    }

    let s = if kappa < 1e-5 {
        1.0 / kappa + kappa
    } else {
        let r = 1.0 + (1.0 + 4.0 * kappa * kappa).sqrt();
        let rho = (r - (2.0 * r).sqrt()) / (2.0 * kappa);
        (1.0 + rho * rho) / (2.0 * rho)
    };

    let w = loop {
        let z = (PI * rng.random::<f64>()).cos();
        let w = (1.0 + s * z) / (s + z);
        let y = kappa * (s - w);
        let v: f64 = rng.random();
        if y * (2.0 - y) - v >= 0.0 || (y / v).ln() + 1.0 - y >= 0.0 {
            break w;
        }
    };

    let theta = w.clamp(-1.0, 1.0).acos();
    let theta = if rng.random::<f64>() < 0.5 { -theta } else { theta };
    wrap_angle(theta + mu)
}

impl Continuous for VonMises {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("kappa", &self.kappa)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let kappa = &self.kappa;
        let ln_norm = (2.0 * PI).ln() + kappa.i0e().ln() + kappa.abs();
        let lp = kappa * (&self.mu - value).cos() - ln_norm;
        bound(lp, &[value.ge(-PI), value.le(PI), kappa.ge(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.kappa])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let mu = require_finite(Self::NAME, "mu", p[0])?;
            let kappa = p[1];
            if !kappa.is_finite() || kappa < 0.0 {
                return Err(Error::Validation(format!(
                    "{}: kappa must be finite and >= 0, got {}",
                    Self::NAME,
                    kappa
                )));
            }
            Ok(draw(rng, mu, kappa))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let kappa = &self.kappa;
            Moments {
                mean: Some(self.mu.clone()),
                median: Some(self.mu.clone()),
                mode: Some(self.mu.clone()),
                variance: Some(1.0 - kappa.i1e() / kappa.i0e()),
            }
        })
    }
}
