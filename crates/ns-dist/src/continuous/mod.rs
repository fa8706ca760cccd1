//! Concrete univariate continuous distributions.
//!
//! Every distribution offers typed constructors plus a `from_kwargs` constructor that
//! goes through the shared parameter-group resolution, so equivalent parameterizations
//! (e.g. `tau` vs `sd`) are validated the same way whether they come from Rust code or
//! from a JSON config.

mod beta;
mod bounded;
mod cauchy;
mod chi_squared;
mod ex_gaussian;
mod exponential;
mod flat;
mod gamma;
mod half_cauchy;
mod half_normal;
mod inverse_gamma;
mod laplace;
mod lognormal;
mod normal;
mod pareto;
mod student_t;
mod uniform;
mod von_mises;
mod wald;
mod weibull;

pub use beta::Beta;
pub use bounded::{Bound, Bounded, student_t_pos};
pub use cauchy::Cauchy;
pub use chi_squared::ChiSquared;
pub use ex_gaussian::ExGaussian;
pub use exponential::Exponential;
pub use flat::Flat;
pub use gamma::Gamma;
pub use half_cauchy::HalfCauchy;
pub use half_normal::HalfNormal;
pub use inverse_gamma::InverseGamma;
pub use laplace::Laplace;
pub use lognormal::Lognormal;
pub use normal::Normal;
pub use pareto::Pareto;
pub use student_t::StudentT;
pub use uniform::Uniform;
pub use von_mises::VonMises;
pub use wald::Wald;
pub use weibull::Weibull;

use ns_core::{Error, Result};

use crate::distribution::Continuous;
use crate::params::Kwargs;

/// Names accepted by [`from_kwargs`].
pub const DISTRIBUTION_NAMES: [&str; 19] = [
    "Beta",
    "Cauchy",
    "ChiSquared",
    "ExGaussian",
    "Exponential",
    "Flat",
    "Gamma",
    "HalfCauchy",
    "HalfNormal",
    "InverseGamma",
    "Laplace",
    "Lognormal",
    "Normal",
    "Pareto",
    "StudentT",
    "Uniform",
    "VonMises",
    "Wald",
    "Weibull",
];

macro_rules! dispatch {
    ($name:expr, $kwargs:expr, $shape:expr; $($ty:ident),* $(,)?) => {
        match $name {
            $(stringify!($ty) => {
                let dist = $ty::from_kwargs($kwargs)?;
                let dist = match $shape {
                    Some(shape) => dist.with_shape(shape)?,
                    None => dist,
                };
                Box::new(dist) as Box<dyn Continuous>
            })*
            other => {
                return Err(Error::Validation(format!(
                    "unknown distribution `{}` (expected one of {:?})",
                    other, DISTRIBUTION_NAMES
                )));
            }
        }
    };
}

/// Build a distribution by name from named parameters.
pub fn from_kwargs(name: &str, kwargs: &Kwargs) -> Result<Box<dyn Continuous>> {
    build(name, kwargs, None)
}

/// Like [`from_kwargs`], overriding the declared shape.
pub fn from_kwargs_with_shape(name: &str, kwargs: &Kwargs, shape: &[usize]) -> Result<Box<dyn Continuous>> {
    build(name, kwargs, Some(shape))
}

fn build(name: &str, kwargs: &Kwargs, shape: Option<&[usize]>) -> Result<Box<dyn Continuous>> {
    log::debug!("building {} from {:?}", name, kwargs.names().collect::<Vec<_>>());
    Ok(dispatch!(name, kwargs, shape;
        Beta, Cauchy, ChiSquared, ExGaussian, Exponential, Flat, Gamma, HalfCauchy, HalfNormal,
        InverseGamma, Laplace, Lognormal, Normal, Pareto, StudentT, Uniform, VonMises, Wald,
        Weibull,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_dispatches() {
        for name in DISTRIBUTION_NAMES {
            // An empty bag is either accepted (all defaults) or rejected as underspecified,
            // never as an unknown distribution.
            match from_kwargs(name, &Kwargs::new()) {
                Ok(d) => assert_eq!(d.name(), name),
                Err(Error::UnderspecifiedParameters { distribution, .. }) => {
                    assert_eq!(distribution, name)
                }
                Err(other) => panic!("{}: unexpected {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(from_kwargs("Normall", &Kwargs::new()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_shape_override() {
        let d = from_kwargs_with_shape("Normal", &Kwargs::new(), &[2, 3]).unwrap();
        assert_eq!(d.shape(), &[2, 3]);
        let d = from_kwargs_with_shape("ChiSquared", &Kwargs::new().with("nu", 2.0), &[4]).unwrap();
        assert_eq!(d.shape(), &[4]);
    }
}
