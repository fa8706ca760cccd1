//! Ancestral sampling: resolving parameters to concrete arrays and drawing variates.
//!
//! Parameters may reference upstream random variables. [`SampleContext::draw_values`]
//! takes their values from the supplied [`Point`] when present and otherwise samples
//! the upstream distribution found in the [`VariableRegistry`], depth-first. Draws are
//! memoised per context so a variable referenced twice yields a single draw.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{ArrayD, IxDyn};
use ns_core::{Error, Point, Result, VarId};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::distribution::Continuous;
use crate::expr::{Bindings, Expr};

/// Lookup of upstream random variables by identifier.
pub trait VariableRegistry {
    /// Distribution registered under `id`.
    fn lookup(&self, id: &VarId) -> Option<&dyn Continuous>;
}

/// In-memory [`VariableRegistry`].
#[derive(Debug, Default)]
pub struct Registry {
    vars: BTreeMap<VarId, Box<dyn Continuous>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dist` under `id`; identifiers must be unique.
    pub fn register(&mut self, id: impl Into<VarId>, dist: impl Continuous + 'static) -> Result<()> {
        self.register_boxed(id, Box::new(dist))
    }

    /// Register an already boxed distribution.
    pub fn register_boxed(&mut self, id: impl Into<VarId>, dist: Box<dyn Continuous>) -> Result<()> {
        let id = id.into();
        if self.vars.contains_key(&id) {
            return Err(Error::Validation(format!("variable `{}` is already registered", id)));
        }
        self.vars.insert(id, dist);
        Ok(())
    }

    /// Number of registered variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl VariableRegistry for Registry {
    fn lookup(&self, id: &VarId) -> Option<&dyn Continuous> {
        self.vars.get(id).map(|d| d.as_ref())
    }
}

/// Termination policy for rejection sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectionConfig {
    /// Maximum rounds of inner draws; `None` loops until every position is filled.
    pub max_rounds: Option<usize>,
    /// Cooperative cancellation flag, checked once per round.
    #[serde(skip)]
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RejectionConfig {
    fn default() -> Self {
        Self { max_rounds: Some(10_000), cancel: None }
    }
}

impl RejectionConfig {
    /// No round cap.
    pub fn unbounded() -> Self {
        Self { max_rounds: None, cancel: None }
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Whether the cancellation flag is set.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// Per-call sampling state.
pub struct SampleContext<'a> {
    registry: &'a dyn VariableRegistry,
    point: &'a Point,
    drawn: BTreeMap<VarId, ArrayD<f64>>,
    resolving: Vec<VarId>,
    rng: &'a mut dyn RngCore,
    rejection: RejectionConfig,
}

struct Resolved<'r> {
    point: &'r Point,
    drawn: &'r BTreeMap<VarId, ArrayD<f64>>,
}

impl Bindings for Resolved<'_> {
    fn value(&self, id: &VarId) -> Option<&ArrayD<f64>> {
        self.point.get(id).or_else(|| self.drawn.get(id))
    }
}

impl<'a> SampleContext<'a> {
    /// New context with the default [`RejectionConfig`].
    pub fn new(registry: &'a dyn VariableRegistry, point: &'a Point, rng: &'a mut dyn RngCore) -> Self {
        Self {
            registry,
            point,
            drawn: BTreeMap::new(),
            resolving: Vec::new(),
            rng,
            rejection: RejectionConfig::default(),
        }
    }

    /// Replace the rejection policy.
    pub fn with_rejection(mut self, rejection: RejectionConfig) -> Self {
        self.rejection = rejection;
        self
    }

    /// Random source.
    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    /// Rejection policy.
    pub fn rejection(&self) -> &RejectionConfig {
        &self.rejection
    }

    /// Values supplied by the caller.
    pub fn point(&self) -> &Point {
        self.point
    }

    /// Upstream values drawn so far in this context.
    pub fn drawn(&self, id: &VarId) -> Option<&ArrayD<f64>> {
        self.drawn.get(id)
    }

    /// Concrete arrays for each parameter expression.
    ///
    /// Constants are returned as-is. Referenced variables come from the point, then from
    /// earlier draws in this context, then from sampling their registered distribution.
    pub fn draw_values(&mut self, params: &[&Expr]) -> Result<Vec<ArrayD<f64>>> {
        let mut out = Vec::with_capacity(params.len());
        for p in params {
            if let Some(c) = p.as_constant() {
                out.push(c.clone());
                continue;
            }
            for id in p.vars() {
                self.resolve(&id)?;
            }
            let bindings = Resolved { point: self.point, drawn: &self.drawn };
            out.push(p.eval(&bindings)?);
        }
        Ok(out)
    }

    fn resolve(&mut self, id: &VarId) -> Result<()> {
        if self.point.contains(id) || self.drawn.contains_key(id) {
            return Ok(());
        }
        if self.resolving.contains(id) {
            let mut cycle: Vec<String> =
                self.resolving.iter().skip_while(|v| *v != id).map(VarId::to_string).collect();
            cycle.push(id.to_string());
            return Err(Error::CyclicDependency(cycle.join(" -> ")));
        }

        let registry = self.registry;
        let dist = registry.lookup(id).ok_or_else(|| Error::UnresolvedReference(id.to_string()))?;
        log::debug!("drawing upstream variable `{}` from {}", id, dist.name());

        self.resolving.push(id.clone());
        let value = dist.random(self, &[]);
        self.resolving.pop();

        self.drawn.insert(id.clone(), value?);
        Ok(())
    }
}

/// Draw an array of shape `size ++ shape`, one generator call per element.
///
/// Every parameter array is broadcast to the target shape first; a parameter that does
/// not broadcast is an [`Error::Shape`], never truncated or padded. The generator
/// receives the parameter values at that element in `params` order.
pub fn generate_samples<F>(
    params: &[&ArrayD<f64>],
    shape: &[usize],
    size: &[usize],
    rng: &mut dyn RngCore,
    mut generator: F,
) -> Result<ArrayD<f64>>
where
    F: FnMut(&mut dyn RngCore, &[f64]) -> Result<f64>,
{
    let target: Vec<usize> = size.iter().chain(shape).copied().collect();
    let mut views = Vec::with_capacity(params.len());
    for p in params {
        views.push(p.broadcast(IxDyn(&target)).ok_or_else(|| {
            Error::Shape(format!(
                "parameter of shape {:?} does not broadcast to sample shape {:?}",
                p.shape(),
                target
            ))
        })?);
    }

    let n: usize = target.iter().product();
    let mut iters: Vec<_> = views.iter().map(|v| v.iter()).collect();
    let mut args = vec![0.0; params.len()];
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        for (a, it) in args.iter_mut().zip(iters.iter_mut()) {
            *a = *it
                .next()
                .ok_or_else(|| Error::Computation("parameter iterator exhausted".to_string()))?;
        }
        out.push(generator(&mut *rng, &args)?);
    }
    ArrayD::from_shape_vec(IxDyn(&target), out).map_err(|e| Error::Shape(e.to_string()))
}

/// `v` if finite and strictly positive, else a validation error naming the parameter.
pub fn require_positive(distribution: &str, name: &str, v: f64) -> Result<f64> {
    if !v.is_finite() || v <= 0.0 {
        return Err(Error::Validation(format!(
            "{}: {} must be finite and > 0, got {}",
            distribution, name, v
        )));
    }
    Ok(v)
}

/// `v` if finite, else a validation error naming the parameter.
pub fn require_finite(distribution: &str, name: &str, v: f64) -> Result<f64> {
    if !v.is_finite() {
        return Err(Error::Validation(format!("{}: {} must be finite, got {}", distribution, name, v)));
    }
    Ok(v)
}
