//! Guarded log-density construction.

use ns_core::{Error, Result};

use crate::expr::{Expr, broadcast_shapes};

/// Log-density sentinel for values outside the support or invalid parameters.
pub const IMPOSSIBLE: f64 = f64::NEG_INFINITY;

/// `expr` where every constraint holds, [`IMPOSSIBLE`] elsewhere (elementwise).
///
/// Only builds a `switch` node (folded when everything is constant); it never evaluates
/// deferred operands and never fails for out-of-support values. Fails with
/// [`Error::Shape`] when the constraints and `expr` cannot be broadcast together.
pub fn bound(expr: Expr, constraints: &[Expr]) -> Result<Expr> {
    let Some(all) = Expr::all(constraints) else {
        return Ok(expr);
    };

    let mut shapes = Vec::with_capacity(constraints.len() + 1);
    shapes.push(expr.shape()?);
    for c in constraints {
        shapes.push(c.shape()?);
    }
    broadcast_shapes(&shapes).map_err(|e| match e {
        Error::Shape(msg) => Error::Shape(format!("log-density constraints: {}", msg)),
        other => other,
    })?;

    Ok(Expr::switch(&all, &expr, &Expr::scalar(IMPOSSIBLE)))
}
