//! Common value types shared by distribution code.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

/// Identifier of a random variable in the upstream registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(String);

impl VarId {
    /// Create a new identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VarId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One concrete assignment of values to upstream random variables.
///
/// A point is built per sampling call and is never mutated by the code that
/// reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    values: BTreeMap<VarId, ArrayD<f64>>,
}

impl Point {
    /// Create an empty point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of an array value.
    pub fn with(mut self, id: impl Into<VarId>, value: ArrayD<f64>) -> Self {
        self.values.insert(id.into(), value);
        self
    }

    /// Builder-style insertion of a scalar value (0-d array).
    pub fn with_scalar(self, id: impl Into<VarId>, value: f64) -> Self {
        self.with(id, ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Value bound to `id`, if any.
    pub fn get(&self, id: &VarId) -> Option<&ArrayD<f64>> {
        self.values.get(id)
    }

    /// Whether `id` is bound.
    pub fn contains(&self, id: &VarId) -> bool {
        self.values.contains_key(id)
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(id, value)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &ArrayD<f64>)> {
        self.values.iter()
    }
}

impl FromIterator<(VarId, ArrayD<f64>)> for Point {
    fn from_iter<I: IntoIterator<Item = (VarId, ArrayD<f64>)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}
