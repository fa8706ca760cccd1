//! Parametric continuous distributions for NextStat.
//!
//! This crate provides:
//! - a symbolic expression type ([`expr::Expr`]) so log-densities can be built once and
//!   evaluated later against concrete parameter values
//! - guarded log-densities: out-of-support values and invalid parameters map to `-inf`
//! - bijective transforms to the real line for constrained supports
//! - ancestral sampling with memoized resolution of upstream random variables
//! - a JSON spec layer that compiles named parameters into distributions
//!
//! ```
//! use ns_dist::continuous::Normal;
//! use ns_dist::Continuous;
//!
//! let d = Normal::new(0.0, 1.0).unwrap();
//! let lp = d.logp_at(0.0).unwrap();
//! assert!((lp + 0.5 * (2.0 * std::f64::consts::PI).ln()).abs() < 1e-12);
//! ```

#![warn(missing_docs)]

pub mod continuous;
pub mod distribution;
pub mod expr;
pub mod guard;
pub mod math;
pub mod params;
pub mod sampling;
pub mod spec;
pub mod transforms;

pub use distribution::{Continuous, Moments, Transformed};
pub use expr::Expr;
pub use guard::{IMPOSSIBLE, bound};
pub use params::{Kwargs, Param};
pub use sampling::{Registry, RejectionConfig, SampleContext, VariableRegistry};
pub use spec::{DistributionSpec, ModelSpec, ParamSpec};
pub use transforms::Transform;
