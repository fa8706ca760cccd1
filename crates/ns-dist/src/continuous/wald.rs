//! Wald (inverse Gaussian) distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, WALD_GROUPS, resolve_group, wald_mu_lam_phi};
use crate::sampling::{SampleContext, generate_samples, require_positive};
use crate::transforms::Transform;

/// Inverse Gaussian with mean `mu`, shape `lam`, dispersion `phi = lam/mu`, shifted by
/// `alpha`.
///
/// ```text
/// log p(x) = ½ ln(lam / 2π) - 1.5 ln(x - alpha) - lam / (2 (x - alpha)) · ((x - alpha - mu) / mu)²
/// ```
#[derive(Debug)]
pub struct Wald {
    mu: Expr,
    lam: Expr,
    phi: Expr,
    alpha: Expr,
    shape: Vec<usize>,
    transform: Transform,
    moments: OnceLock<Moments>,
}

impl Wald {
    const NAME: &'static str = "Wald";

    /// Wald with mean `mu` and shape `lam`.
    pub fn new(mu: impl Into<Param>, lam: impl Into<Param>) -> Result<Self> {
        let (mu, lam, phi) =
            wald_mu_lam_phi(Self::NAME, Some(mu.into().to_expr()), Some(lam.into().to_expr()), None)?;
        Self::build(mu, lam, phi, Expr::scalar(0.0))
    }

    /// From `mu`, `lam`, `phi` (one of the combinations `{mu}`, `{mu, lam}`,
    /// `{mu, phi}`, `{lam, phi}`) and an optional shift `alpha` (default 0).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["mu", "lam", "phi", "alpha"])?;
        resolve_group(Self::NAME, &WALD_GROUPS, kwargs)?;
        let (mu, lam, phi) =
            wald_mu_lam_phi(Self::NAME, kwargs.expr("mu"), kwargs.expr("lam"), kwargs.expr("phi"))?;
        Self::build(mu, lam, phi, kwargs.expr_or("alpha", 0.0))
    }

    /// Builder-style shift of the support to `(alpha, inf)`.
    pub fn with_alpha(self, alpha: impl Into<Param>) -> Result<Self> {
        Self::build(self.mu, self.lam, self.phi, alpha.into().to_expr())
    }

    fn build(mu: Expr, lam: Expr, phi: Expr, alpha: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&mu, &lam, &phi, &alpha])?;
        Ok(Self { mu, lam, phi, alpha, shape, transform: Transform::Log, moments: OnceLock::new() })
    }

    /// Mean (before shifting).
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Shape.
    pub fn lam(&self) -> &Expr {
        &self.lam
    }

    /// Dispersion `lam / mu`.
    pub fn phi(&self) -> &Expr {
        &self.phi
    }

    /// Shift.
    pub fn alpha(&self) -> &Expr {
        &self.alpha
    }
}

impl_with_shape!(Wald);

/// Michael, Schucany & Haas (1976) transformation with multiple roots.
fn draw(rng: &mut dyn RngCore, mu: f64, lam: f64, alpha: f64) -> f64 {
    let v = rng.sample::<f64, _>(StandardNormal).powi(2);
    let mu_v = mu * v;
    let x = mu + mu * mu_v / (2.0 * lam) - mu / (2.0 * lam) * (4.0 * mu * lam * v + mu_v * mu_v).sqrt();
    let z: f64 = rng.random();
    let value = if z <= mu / (mu + x) { x } else { mu * mu / x };
    value + alpha
}

impl Continuous for Wald {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("mu", &self.mu), ("lam", &self.lam), ("phi", &self.phi), ("alpha", &self.alpha)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let (mu, lam, alpha) = (&self.mu, &self.lam, &self.alpha);
        let shifted = value - alpha;
        let lp = (lam / (2.0 * PI)).logpow(0.5)
            - shifted.logpow(1.5)
            - 0.5 * lam / &shifted * ((&shifted - mu) / mu).powf(2.0);
        bound(lp, &[value.gt(0.0), shifted.gt(0.0), mu.gt(0.0), lam.gt(0.0), alpha.ge(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.mu, &self.lam, &self.alpha])?;
        generate_samples(&[&v[0], &v[1], &v[2]], &self.shape, size, ctx.rng(), |rng, p| {
            let mu = require_positive(Self::NAME, "mu", p[0])?;
            let lam = require_positive(Self::NAME, "lam", p[1])?;
            if !p[2].is_finite() || p[2] < 0.0 {
                return Err(Error::Validation(format!(
                    "{}: alpha must be finite and >= 0, got {}",
                    Self::NAME,
                    p[2]
                )));
            }
            Ok(draw(rng, mu, lam, p[2]))
        })
    }

    fn transform(&self) -> Option<&Transform> {
        Some(&self.transform)
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (mu, lam, alpha) = (&self.mu, &self.lam, &self.alpha);
            let r = 1.5 * mu / lam;
            Moments {
                mean: Some(mu + alpha),
                median: None,
                mode: Some(mu * ((1.0 + r.powf(2.0)).sqrt() - &r) + alpha),
                variance: Some(mu.powf(3.0) / lam),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::Registry;
    use approx::assert_relative_eq;
    use ns_core::Point;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn reference_logpdf(x: f64, mu: f64, lam: f64) -> f64 {
        0.5 * (lam / (2.0 * PI * x.powi(3))).ln() - lam * (x - mu).powi(2) / (2.0 * mu * mu * x)
    }

    #[test]
    fn test_logp_matches_closed_form() {
        let d = Wald::new(2.0, 3.0).unwrap();
        for x in [0.3, 1.0, 2.5, 7.0] {
            assert_relative_eq!(d.logp_at(x).unwrap(), reference_logpdf(x, 2.0, 3.0), epsilon = 1e-12);
        }
        assert_eq!(d.logp_at(-1.0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(d.logp_at(0.0).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_parameterizations_agree() {
        let a = Wald::from_kwargs(&Kwargs::new().with("mu", 2.0).with("lam", 3.0)).unwrap();
        let b = Wald::from_kwargs(&Kwargs::new().with("mu", 2.0).with("phi", 1.5)).unwrap();
        let c = Wald::from_kwargs(&Kwargs::new().with("lam", 3.0).with("phi", 1.5)).unwrap();
        for x in [0.5, 1.5, 4.0] {
            let la = a.logp_at(x).unwrap();
            assert_relative_eq!(la, b.logp_at(x).unwrap(), epsilon = 1e-12);
            assert_relative_eq!(la, c.logp_at(x).unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_kwargs() {
        assert!(matches!(
            Wald::from_kwargs(&Kwargs::new().with("lam", 3.0)),
            Err(Error::UnderspecifiedParameters { .. })
        ));
        assert!(matches!(
            Wald::from_kwargs(&Kwargs::new().with("mu", 1.0).with("lam", 3.0).with("phi", 1.0)),
            Err(Error::ConflictingParameters { .. })
        ));
    }

    #[test]
    fn test_shift() {
        let d = Wald::new(1.0, 2.0).unwrap().with_alpha(1.0).unwrap();
        assert_relative_eq!(d.logp_at(2.0).unwrap(), reference_logpdf(1.0, 1.0, 2.0), epsilon = 1e-12);
        assert_eq!(d.logp_at(0.5).unwrap(), f64::NEG_INFINITY);
        assert_eq!(d.moments().mean.as_ref().unwrap().as_scalar(), Some(2.0));
    }

    #[test]
    fn test_sample_mean() {
        let d = Wald::new(2.0, 3.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let xs = d.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        assert!(xs.iter().all(|&x| x > 0.0));
        // sd = sqrt(8/3) ~ 1.63, standard error ~ 0.012
        assert!((xs.mean().unwrap() - 2.0).abs() < 0.06);
    }
}
