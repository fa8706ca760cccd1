//! Student's t distribution.

use std::f64::consts::PI;
use std::sync::OnceLock;

use ndarray::ArrayD;
use ns_core::{Error, Result};
use rand::Rng;
use rand_distr::StudentT as StudentTSampler;

use crate::distribution::{Continuous, Moments, impl_with_shape, infer_shape};
use crate::expr::Expr;
use crate::guard::bound;
use crate::params::{Kwargs, Param, ParameterGroup, resolve_group};
use crate::sampling::{SampleContext, generate_samples, require_positive};

const SCALE_GROUPS: [ParameterGroup; 3] = [
    ParameterGroup::new("default", &[]),
    ParameterGroup::new("precision", &["lam"]),
    ParameterGroup::new("standard deviation", &["sd"]),
];

/// Non-standardized Student's t with `nu` degrees of freedom, location `mu` and precision
/// `lam` (equivalently scale `sd = lam^-1/2`).
///
/// ```text
/// log p(x) = lnΓ((nu+1)/2) - lnΓ(nu/2) + ½ ln(lam / (nu π)) - (nu+1)/2 · ln(1 + lam (x-mu)² / nu)
/// ```
#[derive(Debug)]
pub struct StudentT {
    nu: Expr,
    mu: Expr,
    lam: Expr,
    sd: Expr,
    shape: Vec<usize>,
    moments: OnceLock<Moments>,
}

impl StudentT {
    const NAME: &'static str = "StudentT";

    /// Student's t with `nu` degrees of freedom, location `mu` and scale `sd`.
    pub fn new(nu: impl Into<Param>, mu: impl Into<Param>, sd: impl Into<Param>) -> Result<Self> {
        let sd = sd.into().to_expr();
        let lam = sd.powf(-2.0);
        Self::build(nu.into().to_expr(), mu.into().to_expr(), lam, sd)
    }

    /// Student's t with `nu` degrees of freedom, location `mu` and precision `lam`.
    pub fn with_lam(nu: impl Into<Param>, mu: impl Into<Param>, lam: impl Into<Param>) -> Result<Self> {
        let lam = lam.into().to_expr();
        let sd = lam.powf(-0.5);
        Self::build(nu.into().to_expr(), mu.into().to_expr(), lam, sd)
    }

    /// From a required `nu`, `mu` (default 0) and at most one of `lam` / `sd` (default 1).
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["nu", "mu", "lam", "sd"])?;
        let nu = kwargs.require(Self::NAME, "nu")?;
        let mu = kwargs.expr_or("mu", 0.0);
        resolve_group(Self::NAME, &SCALE_GROUPS, kwargs)?;
        match (kwargs.expr("lam"), kwargs.expr("sd")) {
            (Some(lam), _) => {
                let sd = lam.powf(-0.5);
                Self::build(nu, mu, lam, sd)
            }
            (None, Some(sd)) => {
                let lam = sd.powf(-2.0);
                Self::build(nu, mu, lam, sd)
            }
            (None, None) => Self::build(nu, mu, Expr::scalar(1.0), Expr::scalar(1.0)),
        }
    }

    fn build(nu: Expr, mu: Expr, lam: Expr, sd: Expr) -> Result<Self> {
        let shape = infer_shape(Self::NAME, &[&nu, &mu, &lam, &sd])?;
        Ok(Self { nu, mu, lam, sd, shape, moments: OnceLock::new() })
    }

    /// Degrees of freedom.
    pub fn nu(&self) -> &Expr {
        &self.nu
    }

    /// Location.
    pub fn mu(&self) -> &Expr {
        &self.mu
    }

    /// Precision.
    pub fn lam(&self) -> &Expr {
        &self.lam
    }

    /// Scale.
    pub fn sd(&self) -> &Expr {
        &self.sd
    }
}

impl_with_shape!(StudentT);

impl Continuous for StudentT {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("nu", &self.nu), ("mu", &self.mu), ("lam", &self.lam), ("sd", &self.sd)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        let (nu, lam) = (&self.nu, &self.lam);
        let half_nu_p1 = (nu + 1.0) / 2.0;
        let lp = half_nu_p1.ln_gamma() - (nu / 2.0).ln_gamma() + 0.5 * (lam / (nu * PI)).ln()
            - &half_nu_p1 * (lam * (value - &self.mu).powf(2.0) / nu).ln_1p();
        bound(lp, &[lam.gt(0.0), nu.gt(0.0), self.sd.gt(0.0)])
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        let v = ctx.draw_values(&[&self.nu, &self.mu, &self.lam])?;
        generate_samples(&[&v[0], &v[1], &v[2]], &self.shape, size, ctx.rng(), |rng, p| {
            let nu = require_positive(Self::NAME, "nu", p[0])?;
            let lam = require_positive(Self::NAME, "lam", p[2])?;
            let t = StudentTSampler::new(nu).map_err(|e| Error::Validation(e.to_string()))?;
            let draw: f64 = rng.sample(t);
            Ok(p[1] + draw / lam.sqrt())
        })
    }

    fn moments(&self) -> &Moments {
        self.moments.get_or_init(|| {
            let (nu, lam) = (&self.nu, &self.lam);
            let variance = Expr::switch(
                &nu.gt(2.0),
                &(nu / (nu - 2.0) / lam),
                &Expr::scalar(f64::INFINITY),
            );
            Moments {
                mean: Some(self.mu.clone()),
                median: Some(self.mu.clone()),
                mode: Some(self.mu.clone()),
                variance: Some(variance),
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
    use statrs::distribution::{Continuous as _, StudentsT};

    #[test]
    fn test_logp_matches_statrs() {
        let d = StudentT::new(4.0, 1.0, 2.0).unwrap();
        let reference = StudentsT::new(1.0, 2.0, 4.0).unwrap();
        for x in [-3.0, 0.0, 1.0, 2.5, 10.0] {
            assert_relative_eq!(d.logp_at(x).unwrap(), reference.ln_pdf(x), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lam_and_sd_agree() {
        let a = StudentT::from_kwargs(&Kwargs::new().with("nu", 3.0).with("lam", 0.25)).unwrap();
        let b = StudentT::from_kwargs(&Kwargs::new().with("nu", 3.0).with("sd", 2.0)).unwrap();
        assert_relative_eq!(a.logp_at(0.7).unwrap(), b.logp_at(0.7).unwrap(), epsilon = 1e-12);
        let both = Kwargs::new().with("nu", 3.0).with("lam", 1.0).with("sd", 1.0);
        assert!(matches!(StudentT::from_kwargs(&both), Err(Error::ConflictingParameters { .. })));
        assert!(StudentT::from_kwargs(&Kwargs::new()).is_err());
    }

    #[test]
    fn test_variance_infinite_for_small_nu() {
        let heavy = StudentT::new(1.5, 0.0, 1.0).unwrap();
        assert_eq!(heavy.moments().variance.as_ref().unwrap().as_scalar(), Some(f64::INFINITY));
        let light = StudentT::new(4.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(light.moments().variance.as_ref().unwrap().as_scalar().unwrap(), 2.0);
    }

    #[test]
    fn test_sampler_centered_on_mu() {
        let d = StudentT::new(5.0, 3.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let xs = d.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        assert!((xs.mean().unwrap() - 3.0).abs() < 0.03);
    }
}
