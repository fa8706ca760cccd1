//! Log-normal distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, precision_from_kwargs, tau_sd};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

/// `exp(N(mu, tau^-1/2))` on `(0, inf)`.
///
/// ```text
/// log p(x) = -tau/2 (ln x - mu)² + ½ ln(tau / 2π) - ln x
/// ```
#[derive(Debug)]
pub struct Lognormal {
    mu: Expr,
    tau: Expr,
    sd: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Lognormal {
    const NAME: &'static str = "Lognormal";

    /// Log-normal whose logarithm has mean `mu` and precision `tau`.
    pub fn new(mu: impl Into<Param>, tau: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, Some(tau.into().to_expr()), None)?;
        Self::build(mu.into().to_expr(), tau, sd)
    }

    /// Log-normal whose logarithm has mean `mu` and standard deviation `sd`.
    pub fn with_sd(mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Self> {
        let (tau, sd) = tau_sd(Self::NAME, None, Some(sd.into().to_expr()))?;
        Self::build(mu.into().to_expr(), tau, sd)
    }

    /// From `mu` (default 0) and at most one of `tau` / `sd` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "tau", "sd"])?;
        let (tau, sd) = precision_from_kwargs(Self::NAME, kwargs)?;
        Self::build(kwargs.expr_or("mu", 0.0), tau, sd)
    }

    fn build(mu: Expr, tau: Expr, sd: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &tau, &sd])?;
        Ok(Self { mu, tau, sd, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Location of `ln x`.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Precision of `ln x`.
    pub fn tau(&self) -> &Expr {
        &self.tau
    }

    /// Standard deviation of `ln x`.
    pub fn sd(&self) -> &Expr {
        &self.sd
    }
}

impl_with_shape!(Lognormal);

impl Continuous for Lognormal {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("tau", &self.tau), ("sd", &self.sd)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let tau = &self.tau;
        let ln_x = value.ln();
        let lp = -0.5 * tau * (&ln_x - &self.mu).powf(2.0) + 0.5 * (tau / (2.0 * PI)).ln() - &ln_x;
        bound(lp, &[value.gt(0.0), tau.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.tau])?;
        generate_samples(&[&v[0], &v[1]], &self.shape, size, ctx.rng(), |rng, p| {
            let tau = require_positive(Self::NAME, "tau", p[1])?;
            let z: f64 = rng.sample(StandardNormal);
            Ok((p[0] + z / tau.sqrt()).exp())
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (mu, tau) = (&self.mu, &self.tau);
            let inv_tau = 1.0 / tau;
            Moments {
                mean: Some((mu + 0.5 * &inv_tau).exp()),
                median: Some(mu.exp()),
                mode: Some((mu - &inv_tau).exp()),
                variance: Some((inv_tau.exp() - 1.0) * (2.0 * mu + &inv_tau).exp()),
            }
        })
    }
}
