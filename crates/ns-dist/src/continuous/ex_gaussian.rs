//! Exponentially modified Gaussian.

use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::Result;
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::math::LN_SQRT_2PI;
use crate::params::{Kwargs, Param};
use crate::sampling::{SampleContext, generate_samples, require_positive};

/// Sum of `N(mu, sigma)` and an exponential with mean `nu`.
///
/// ```text
/// log p(x) = -ln(nu) + (mu - x)/nu + ½(sigma/nu)² + ln Φ((x - mu)/sigma - sigma/nu)
/// ```
///
/// Where `nu <= 0.05·sigma` the exponential component is negligible and the plain normal
/// log-density is used instead (the threshold gamlss uses).
#[derive(Debug)]
pub struct ExGaussian {
    mu: Expr,
    sigma: Expr,
    nu: Expr,
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl ExGaussian {
    const NAME: &'static str = "ExGaussian";

    /// Normal `(mu, sigma)` plus exponential with mean `nu`.
    pub fn new(mu: impl Into<Param>, sigma: impl Into<Param>, nu: impl Into<Param>) -> Result<Self> {
        Self::build(mu.into().to_expr(), sigma.into().to_expr(), nu.into().to_expr())
    }

    /// From required `mu`, `sigma` and `nu`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "sigma", "nu"])?;
        Self::build(
            kwargs.require(Self::NAME, "mu")?,
            kwargs.require(Self::NAME, "sigma")?,
            kwargs.require(Self::NAME, "nu")?,
        )
    }

    fn build(mu: Expr, sigma: Expr, nu: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &sigma, &nu])?;
        Ok(Self { mu, sigma, nu, shape, moments: OnceLock::new() })
    }

    /// Mean of the normal component.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Standard deviation of the normal component.
    pub fn sigma(&self) -> &Expr {
        &self.sigma
    }

    /// Mean of the exponential component.
    pub fn nu(&self) -> &Expr {
        &self.nu
    }
}

impl_with_shape!(ExGaussian);

impl Continuous for ExGaussian {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("sigma", &self.sigma), ("nu", &self.nu)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let (mu, sigma, nu) = (&self.mu, &self.sigma, &self.nu);
        let modified = -nu.ln() + (mu - value) / nu + 0.5 * (sigma / nu).powf(2.0)
            + ((value - mu) / sigma - sigma / nu).std_cdf().logpow(1.0);
        let normal = -sigma.ln() - LN_SQRT_2PI - 0.5 * ((value - mu) / sigma).powf(2.0);
        let lp = Expr::switch(&nu.gt(0.05 * sigma), &modified, &normal);
        bound(lp, &[sigma.gt(0.0), nu.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.sigma, &self.nu])?;
        generate_samples(&[&v[0], &v[1], &v[2]], &self.shape, size, ctx.rng(), |rng, p| {
            let sigma = require_positive(Self::NAME, "sigma", p[1])?;
            let nu = require_positive(Self::NAME, "nu", p[2])?;
            let z: f64 = rng.sample(StandardNormal);
            let e: f64 = rng.sample(Exp1);
            Ok(p[0] + sigma * z + nu * e)
        })
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| Moments {
            mean: Some(&self.mu + &self.nu),
            variance: Some(self.sigma.powf(2.0) + self.nu.powf(2.0)),
            ..Moments::default()
        })
    }
}
