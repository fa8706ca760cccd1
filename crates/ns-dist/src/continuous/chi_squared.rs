//! Chi-squared distribution as a special case of [`Gamma`].

use ndarray::ArrayD;
use ns_core::Result;

use super::Gamma;
use crate::distribution::{Continuous, Moments};
use crate::expr::Expr;
use crate::params::{Kwargs, Param};
use crate::sampling::SampleContext;
use crate::transforms::Transform;

/// `Gamma(alpha = nu/2, beta = 1/2)`: log-density, sampler and moments all come from the
/// inner gamma.
#[derive(Debug)]
pub struct ChiSquared {
    nu: Expr,
    gamma: Gamma,
}

impl ChiSquared {
    const NAME: &'static str = "ChiSquared";

    /// Chi-squared with `nu` degrees of freedom.
    pub fn new(nu: impl Into<Param>) -> Result<Self> {
        Self::build(nu.into().to_expr())
    }

    /// From a required `nu`.
    pub fn from_kwargs(kwargs: &Kwargs) -> Result<Self> {
        kwargs.check_known(Self::NAME, &["nu"])?;
        Self::build(kwargs.require(Self::NAME, "nu")?)
    }

    fn build(nu: Expr) -> Result<Self> {
        let gamma = Gamma::build(&nu / 2.0, Expr::scalar(0.5))?;
        Ok(Self { nu, gamma })
    }

    /// Override the declared shape; `nu` must broadcast to it.
    pub fn with_shape(self, shape: &[usize]) -> Result<Self> {
        Ok(Self { nu: self.nu, gamma: self.gamma.with_shape(shape)? })
    }

    /// Degrees of freedom.
    pub fn nu(&self) -> &Expr {
        &self.nu
    }

    /// The equivalent gamma distribution.
    pub fn as_gamma(&self) -> &Gamma {
        &self.gamma
    }
}

impl Continuous for ChiSquared {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn shape(&self) -> &[usize] {
        self.gamma.shape()
    }

    fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        vec![("nu", &self.nu)]
    }

    fn logp(&self, value: &Expr) -> Result<Expr> {
        self.gamma.logp(value)
    }

    fn random(&self, ctx: &mut SampleContext<'_>, size: &[usize]) -> Result<ArrayD<f64>> {
        self.gamma.random(ctx, size)
    }

    fn transform(&self) -> Option<&Transform> {
        self.gamma.transform()
    }

    fn moments(&self) -> &Moments {
        self.gamma.moments()
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

    #[test]
    fn test_identical_to_gamma() {
        let chi = ChiSquared::new(4.0).unwrap();
        let gamma = Gamma::new(2.0, 0.5).unwrap();
        for x in [0.0, 0.5, 3.0, 11.0, -1.0] {
            assert_eq!(chi.logp_at(x).unwrap(), gamma.logp_at(x).unwrap());
        }
        assert_eq!(chi.moments().mean.as_ref().unwrap().as_scalar(), Some(4.0));
        assert_eq!(chi.moments().variance.as_ref().unwrap().as_scalar(), Some(8.0));
    }

    #[test]
    fn test_exposes_nu() {
        let chi = ChiSquared::from_kwargs(&Kwargs::new().with("nu", 3.0)).unwrap();
        assert_eq!(chi.nu().as_scalar(), Some(3.0));
        assert_eq!(chi.as_gamma().alpha().as_scalar(), Some(1.5));
        assert_eq!(chi.name(), "ChiSquared");
    }

    #[test]
    fn test_sample_mean_is_nu() {
        let chi = ChiSquared::new(6.0).unwrap();
        let mut rng = StdRng::seed_from_u64(14);
        let xs = chi.sample(&Registry::new(), &Point::new(), &[20_000], &mut rng).unwrap();
        assert_relative_eq!(xs.mean().unwrap(), 6.0, epsilon = 0.1);
    }

    #[test]
    fn test_with_shape() {
        let chi = ChiSquared::new(2.0).unwrap().with_shape(&[3]).unwrap();
        assert_eq!(chi.shape(), &[3]);
    }
}
