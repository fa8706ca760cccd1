//! JSON model descriptions compiled into distributions.
//!
//! A [`DistributionSpec`] names a distribution and its parameters:
//!
//! ```json
//! { "dist": "Normal", "params": { "mu": { "ref": "m" }, "sd": 2.0 }, "lower": 0.0 }
//! ```
//!
//! Parameters go through the same `from_kwargs` resolution as the Rust constructors, so
//! conflicting or missing parameterizations are reported identically. A [`ModelSpec`]
//! maps variable names to distributions and compiles into a [`Registry`].

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayD};
use ns_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::continuous::{Bounded, from_kwargs, from_kwargs_with_shape};
use crate::distribution::Continuous;
use crate::expr::Expr;
use crate::params::{Kwargs, Param};
use crate::sampling::{Registry, RejectionConfig};

/// A parameter value in a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    /// `1.5`
    Scalar(f64),
    /// `[1.0, 2.0]`
    Vector(Vec<f64>),
    /// `[[1.0, 2.0], [3.0, 4.0]]`
    Matrix(Vec<Vec<f64>>),
    /// `{"ref": "mu", "shape": [3]}`; `shape` defaults to scalar.
    Reference {
        /// Referenced variable name.
        #[serde(rename = "ref")]
        id: String,
        /// Declared shape of the referenced variable.
        #[serde(default)]
        shape: Vec<usize>,
    },
}

impl ParamSpec {
    /// Convert into a [`Param`].
    pub fn to_param(&self) -> Result<Param> {
        Ok(match self {
            ParamSpec::Scalar(v) => Param::from(*v),
            ParamSpec::Vector(v) => Param::from(v.clone()),
            ParamSpec::Matrix(rows) => {
                let ncols = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|r| r.len() != ncols) {
                    return Err(Error::Validation("ragged nested array parameter".to_string()));
                }
                let flat: Vec<f64> = rows.iter().flatten().copied().collect();
                let a: ArrayD<f64> = Array2::from_shape_vec((rows.len(), ncols), flat)
                    .map_err(|e| Error::Shape(e.to_string()))?
                    .into_dyn();
                Param::from(a)
            }
            ParamSpec::Reference { id, shape } => Param::reference_with_shape(id.as_str(), shape),
        })
    }
}

/// One distribution, optionally truncated to `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    /// Distribution name, e.g. `"Gamma"`.
    pub dist: String,
    /// Named parameters.
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
    /// Declared shape override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    /// Lower truncation bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    /// Upper truncation bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl DistributionSpec {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parameters as a [`Kwargs`] bag.
    pub fn kwargs(&self) -> Result<Kwargs> {
        let mut kwargs = Kwargs::new();
        for (name, value) in &self.params {
            kwargs.insert(name, value.to_param()?);
        }
        Ok(kwargs)
    }

    /// Compile into a distribution.
    pub fn build(&self) -> Result<Box<dyn Continuous>> {
        let kwargs = self.kwargs()?;
        let dist = match &self.shape {
            Some(shape) => from_kwargs_with_shape(&self.dist, &kwargs, shape)?,
            None => from_kwargs(&self.dist, &kwargs)?,
        };
        if self.lower.is_none() && self.upper.is_none() {
            return Ok(dist);
        }
        let bounded = Bounded::new(dist, self.lower.map(Expr::scalar), self.upper.map(Expr::scalar))?;
        Ok(Box::new(bounded))
    }
}

/// Named random variables plus the sampling policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Variable name -> distribution.
    pub variables: BTreeMap<String, DistributionSpec>,
    /// Rejection-sampling policy for bounded variables.
    #[serde(default)]
    pub rejection: RejectionConfig,
}

impl ModelSpec {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile every variable into a [`Registry`].
    ///
    /// References are checked for existence here; cycles surface when sampling.
    pub fn build_registry(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        for (name, spec) in &self.variables {
            for param in spec.params.values() {
                match param {
                    ParamSpec::Reference { id, .. } if !self.variables.contains_key(id) => {
                        return Err(Error::UnresolvedReference(format!("{} (used by `{}`)", id, name)));
                    }
                    _ => {}
                }
            }
            registry.register_boxed(name.as_str(), spec.build()?)?;
        }
        log::debug!("compiled {} variables", registry.len());
        Ok(registry)
    }
}
