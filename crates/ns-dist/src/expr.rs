//! Immutable elementwise expression graph over `f64` arrays.
//!
//! Log-densities, transforms and derived parameters are built as [`Expr`] graphs.
//! Leaves are constants (`ndarray::ArrayD<f64>`) or references to upstream random
//! variables; interior nodes are elementwise ops with NumPy broadcasting.
//!
//! Every node carries its statically-known broadcast shape. Operations whose operands
//! are all constants fold eagerly, so a distribution built from literals produces
//! concrete arrays without ever touching a variable binding.
//!
//! # Example
//! ```
//! use ns_dist::expr::Expr;
//! use ns_core::Point;
//!
//! let x = Expr::var("x", &[]);
//! let lp = -(&x * &x) * 0.5;
//! let point = Point::new().with_scalar("x", 2.0);
//! assert_eq!(lp.eval(&point).unwrap()[[]], -2.0);
//! ```

use std::collections::BTreeSet;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD, IxDyn, Zip};
use ns_core::{Error, Point, Result, VarId};
use statrs::function::gamma::ln_gamma;

use crate::math;

/// Source of values for variable leaves during [`Expr::eval`].
pub trait Bindings {
    /// Value bound to `id`, if any.
    fn value(&self, id: &VarId) -> Option<&ArrayD<f64>>;
}

impl Bindings for Point {
    fn value(&self, id: &VarId) -> Option<&ArrayD<f64>> {
        self.get(id)
    }
}

/// Elementwise unary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `ln(x)`
    Ln,
    /// `exp(x)`
    Exp,
    /// `ln(1 + x)`
    Ln1p,
    /// `sqrt(x)`
    Sqrt,
    /// `|x|`
    Abs,
    /// `cos(x)`
    Cos,
    /// `sin(x)`
    Sin,
    /// `tan(x)`
    Tan,
    /// `ln Γ(x)`
    LnGamma,
    /// Standard normal CDF.
    StdCdf,
    /// `exp(-|x|) I0(x)`
    BesselI0e,
    /// `exp(-|x|) I1(x)`
    BesselI1e,
    /// `1 / (1 + exp(-x))`
    Sigmoid,
    /// `ln(sigmoid(x))`
    LogSigmoid,
    /// `atan2(sin x, cos x)`
    WrapAngle,
}

impl UnaryOp {
    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Ln => x.ln(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln1p => x.ln_1p(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::LnGamma => ln_gamma(x),
            UnaryOp::StdCdf => math::std_cdf(x),
            UnaryOp::BesselI0e => math::bessel_i0e(x),
            UnaryOp::BesselI1e => math::bessel_i1e(x),
            UnaryOp::Sigmoid => math::sigmoid(x),
            UnaryOp::LogSigmoid => math::log_sigmoid(x),
            UnaryOp::WrapAngle => math::wrap_angle(x),
        }
    }
}

/// Elementwise binary operation. Comparisons and `And` produce `1.0`/`0.0` masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `a ^ b`
    Pow,
    /// `max(a, b)`
    Max,
    /// `b * ln(a)` with the `a == 0` limit handled.
    LogPow,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a && b` (nonzero is true)
    And,
}

impl BinaryOp {
    #[inline]
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::LogPow => math::logpow(a, b),
            BinaryOp::Gt => mask(a > b),
            BinaryOp::Ge => mask(a >= b),
            BinaryOp::Lt => mask(a < b),
            BinaryOp::Le => mask(a <= b),
            BinaryOp::And => mask(a != 0.0 && b != 0.0),
        }
    }
}

#[inline]
fn mask(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[derive(Debug)]
enum Node {
    Const(ArrayD<f64>),
    Var(VarId),
    Unary(UnaryOp, Expr),
    Binary(BinaryOp, Expr, Expr),
    Switch(Expr, Expr, Expr),
}

/// Handle to an immutable, shared expression node.
///
/// Cloning is cheap (`Arc`). Shape mismatches introduced through operator overloads are
/// recorded on the node and surface from [`Expr::shape`] and [`Expr::eval`].
#[derive(Debug, Clone)]
pub struct Expr {
    node: Arc<Node>,
    shape: std::result::Result<Vec<usize>, String>,
}

impl Expr {
    // --- Leaf constructors ---

    /// Constant array leaf.
    pub fn constant(value: ArrayD<f64>) -> Self {
        let shape = Ok(value.shape().to_vec());
        Self { node: Arc::new(Node::Const(value)), shape }
    }

    /// Constant 0-d leaf.
    pub fn scalar(value: f64) -> Self {
        Self::constant(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Constant filled with `value` in the given shape.
    pub fn full(shape: &[usize], value: f64) -> Self {
        Self::constant(ArrayD::from_elem(IxDyn(shape), value))
    }

    /// Reference to an upstream random variable with declared shape.
    pub fn var(id: impl Into<VarId>, shape: &[usize]) -> Self {
        Self { node: Arc::new(Node::Var(id.into())), shape: Ok(shape.to_vec()) }
    }

    /// `then` where `cond` is nonzero, `otherwise` elsewhere.
    pub fn switch(cond: &Expr, then: &Expr, otherwise: &Expr) -> Self {
        let shape = combined_shape(&[cond, then, otherwise]);
        if let (Some(c), Some(t), Some(e)) =
            (cond.as_constant(), then.as_constant(), otherwise.as_constant())
        {
            if let Ok(folded) = select(c, t, e) {
                return Self::constant(folded);
            }
        }
        Self {
            node: Arc::new(Node::Switch(cond.clone(), then.clone(), otherwise.clone())),
            shape,
        }
    }

    /// Logical-and of all masks; `None` when `masks` is empty.
    pub fn all(masks: &[Expr]) -> Option<Self> {
        let (first, rest) = masks.split_first()?;
        Some(rest.iter().fold(first.clone(), |acc, m| acc.and(m)))
    }

    fn unary(&self, op: UnaryOp) -> Self {
        if let Node::Const(a) = &*self.node {
            return Self::constant(a.mapv(|v| op.apply(v)));
        }
        Self { node: Arc::new(Node::Unary(op, self.clone())), shape: self.shape.clone() }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        if let (Node::Const(a), Node::Const(b)) = (&*lhs.node, &*rhs.node) {
            if let Ok(folded) = zip_with(a, b, |x, y| op.apply(x, y)) {
                return Self::constant(folded);
            }
        }
        let shape = combined_shape(&[&lhs, &rhs]);
        Self { node: Arc::new(Node::Binary(op, lhs, rhs)), shape }
    }

    // --- Inspection ---

    /// Static broadcast shape, or `Error::Shape` if operands were incompatible.
    pub fn shape(&self) -> Result<&[usize]> {
        self.shape.as_deref().map_err(|msg| Error::Shape(msg.clone()))
    }

    /// The folded value if this node is a constant.
    pub fn as_constant(&self) -> Option<&ArrayD<f64>> {
        match &*self.node {
            Node::Const(a) => Some(a),
            _ => None,
        }
    }

    /// The value if this node is a single-element constant.
    pub fn as_scalar(&self) -> Option<f64> {
        self.as_constant().filter(|a| a.len() == 1).and_then(|a| a.iter().next().copied())
    }

    /// Whether this node is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(&*self.node, Node::Const(_))
    }

    /// Identifiers of every variable leaf reachable from this node.
    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<VarId>) {
        match &*self.node {
            Node::Const(_) => {}
            Node::Var(id) => {
                out.insert(id.clone());
            }
            Node::Unary(_, x) => x.collect_vars(out),
            Node::Binary(_, a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Node::Switch(c, t, e) => {
                c.collect_vars(out);
                t.collect_vars(out);
                e.collect_vars(out);
            }
        }
    }

    // --- Evaluation ---

    /// Evaluate eagerly, resolving variable leaves through `bindings`.
    pub fn eval(&self, bindings: &dyn Bindings) -> Result<ArrayD<f64>> {
        match &*self.node {
            Node::Const(a) => Ok(a.clone()),
            Node::Var(id) => {
                let value =
                    bindings.value(id).ok_or_else(|| Error::UnresolvedReference(id.to_string()))?;
                let declared = self.shape()?;
                if value.shape() != declared {
                    return Err(Error::Shape(format!(
                        "variable `{}` declared with shape {:?} but bound to shape {:?}",
                        id,
                        declared,
                        value.shape()
                    )));
                }
                Ok(value.clone())
            }
            Node::Unary(op, x) => Ok(x.eval(bindings)?.mapv_into(|v| op.apply(v))),
            Node::Binary(op, a, b) => {
                let a = a.eval(bindings)?;
                let b = b.eval(bindings)?;
                zip_with(&a, &b, |x, y| op.apply(x, y))
            }
            Node::Switch(c, t, e) => {
                select(&c.eval(bindings)?, &t.eval(bindings)?, &e.eval(bindings)?)
            }
        }
    }

    /// Evaluate and require exactly one element.
    pub fn eval_scalar(&self, bindings: &dyn Bindings) -> Result<f64> {
        let v = self.eval(bindings)?;
        if v.len() != 1 {
            return Err(Error::Shape(format!("expected a single value, got shape {:?}", v.shape())));
        }
        v.iter()
            .next()
            .copied()
            .ok_or_else(|| Error::Computation("empty array in scalar evaluation".to_string()))
    }

    // --- Unary ops ---

    /// `ln(x)`
    pub fn ln(&self) -> Self {
        self.unary(UnaryOp::Ln)
    }

    /// `exp(x)`
    pub fn exp(&self) -> Self {
        self.unary(UnaryOp::Exp)
    }

    /// `ln(1 + x)`
    pub fn ln_1p(&self) -> Self {
        self.unary(UnaryOp::Ln1p)
    }

    /// `sqrt(x)`
    pub fn sqrt(&self) -> Self {
        self.unary(UnaryOp::Sqrt)
    }

    /// `|x|`
    pub fn abs(&self) -> Self {
        self.unary(UnaryOp::Abs)
    }

    /// `cos(x)`
    pub fn cos(&self) -> Self {
        self.unary(UnaryOp::Cos)
    }

    /// `sin(x)`
    pub fn sin(&self) -> Self {
        self.unary(UnaryOp::Sin)
    }

    /// `tan(x)`
    pub fn tan(&self) -> Self {
        self.unary(UnaryOp::Tan)
    }

    /// `ln Γ(x)`
    pub fn ln_gamma(&self) -> Self {
        self.unary(UnaryOp::LnGamma)
    }

    /// `ln B(x, other)`, composed from `ln_gamma`.
    pub fn ln_beta(&self, other: impl Into<Expr>) -> Self {
        let other = other.into();
        self.ln_gamma() + other.ln_gamma() - (self + &other).ln_gamma()
    }

    /// Standard normal CDF.
    pub fn std_cdf(&self) -> Self {
        self.unary(UnaryOp::StdCdf)
    }

    /// `exp(-|x|) I0(x)`
    pub fn i0e(&self) -> Self {
        self.unary(UnaryOp::BesselI0e)
    }

    /// `exp(-|x|) I1(x)`
    pub fn i1e(&self) -> Self {
        self.unary(UnaryOp::BesselI1e)
    }

    /// Stable sigmoid.
    pub fn sigmoid(&self) -> Self {
        self.unary(UnaryOp::Sigmoid)
    }

    /// Stable `ln(sigmoid(x))`.
    pub fn log_sigmoid(&self) -> Self {
        self.unary(UnaryOp::LogSigmoid)
    }

    /// Wrap into `[-π, π]`.
    pub fn wrap_angle(&self) -> Self {
        self.unary(UnaryOp::WrapAngle)
    }

    // --- Binary ops ---

    /// `x ^ e`
    pub fn powf(&self, e: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Pow, self.clone(), e.into())
    }

    /// `max(x, other)`
    pub fn max(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Max, self.clone(), other.into())
    }

    /// `m * ln(x)` with `logpow(0, 0) = 0`.
    pub fn logpow(&self, m: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::LogPow, self.clone(), m.into())
    }

    /// Mask `x > other`.
    pub fn gt(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Gt, self.clone(), other.into())
    }

    /// Mask `x >= other`.
    pub fn ge(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ge, self.clone(), other.into())
    }

    /// Mask `x < other`.
    pub fn lt(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Lt, self.clone(), other.into())
    }

    /// Mask `x <= other`.
    pub fn le(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Le, self.clone(), other.into())
    }

    /// Mask `x && other`.
    pub fn and(&self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::And, self.clone(), other.into())
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::scalar(v)
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

impl From<ArrayD<f64>> for Expr {
    fn from(a: ArrayD<f64>) -> Self {
        Expr::constant(a)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl $trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::binary($op, self, rhs.clone())
            }
        }

        impl $trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self.clone(), rhs)
            }
        }

        impl $trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::binary($op, self.clone(), rhs.clone())
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                Expr::binary($op, self, Expr::scalar(rhs))
            }
        }

        impl $trait<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                Expr::binary($op, self.clone(), Expr::scalar(rhs))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, Expr::scalar(self), rhs)
            }
        }

        impl $trait<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                Expr::binary($op, Expr::scalar(self), rhs.clone())
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}

// --- Broadcasting ---

/// NumPy right-aligned broadcast of several shapes.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; ndim];
    for s in shapes {
        let offset = ndim - s.len();
        for (i, &d) in s.iter().enumerate() {
            let o = &mut out[offset + i];
            if *o == d || d == 1 {
                continue;
            }
            if *o == 1 {
                *o = d;
                continue;
            }
            return Err(Error::Shape(format!("shapes {:?} cannot be broadcast together", shapes)));
        }
    }
    Ok(out)
}

fn combined_shape(exprs: &[&Expr]) -> std::result::Result<Vec<usize>, String> {
    let mut shapes = Vec::with_capacity(exprs.len());
    for e in exprs {
        shapes.push(e.shape.as_deref().map_err(|m| m.to_string())?);
    }
    broadcast_shapes(&shapes).map_err(|e| match e {
        Error::Shape(msg) => msg,
        other => other.to_string(),
    })
}

fn broadcast_view<'a>(a: &'a ArrayD<f64>, shape: &[usize]) -> Result<ArrayViewD<'a, f64>> {
    a.broadcast(IxDyn(shape)).ok_or_else(|| {
        Error::Shape(format!("cannot broadcast shape {:?} to {:?}", a.shape(), shape))
    })
}

/// Broadcast `a` to exactly `shape` (never truncates or pads).
pub fn broadcast_to(a: &ArrayD<f64>, shape: &[usize]) -> Result<ArrayD<f64>> {
    Ok(broadcast_view(a, shape)?.to_owned())
}

/// Elementwise `f(a, b)` under broadcasting.
pub fn zip_with(
    a: &ArrayD<f64>,
    b: &ArrayD<f64>,
    f: impl Fn(f64, f64) -> f64,
) -> Result<ArrayD<f64>> {
    let shape = broadcast_shapes(&[a.shape(), b.shape()])?;
    let av = broadcast_view(a, &shape)?;
    let bv = broadcast_view(b, &shape)?;
    Ok(Zip::from(av).and(bv).map_collect(|&x, &y| f(x, y)))
}

fn select(cond: &ArrayD<f64>, then: &ArrayD<f64>, otherwise: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let shape = broadcast_shapes(&[cond.shape(), then.shape(), otherwise.shape()])?;
    let c = broadcast_view(cond, &shape)?;
    let t = broadcast_view(then, &shape)?;
    let e = broadcast_view(otherwise, &shape)?;
    Ok(Zip::from(c).and(t).and(e).map_collect(|&c, &t, &e| if c != 0.0 { t } else { e }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_constants_fold_eagerly() {
        let e = Expr::scalar(2.0) * 3.0 + 1.0;
        assert_eq!(e.as_scalar(), Some(7.0));
        let l = Expr::scalar(1.0).exp().ln();
        assert_relative_eq!(l.as_scalar().unwrap(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_var_defers_evaluation() {
        let x = Expr::var("x", &[3]);
        let e = (&x - 1.0).powf(2.0);
        assert!(!e.is_constant());
        assert_eq!(e.shape().unwrap(), &[3]);
        assert_eq!(e.vars().into_iter().collect::<Vec<_>>(), vec![VarId::from("x")]);

        let point = Point::new().with("x", arr1(&[0.0, 1.0, 3.0]).into_dyn());
        let v = e.eval(&point).unwrap();
        assert_eq!(v.as_slice().unwrap(), &[1.0, 0.0, 4.0]);
    }

    #[test]
    fn test_missing_binding_is_unresolved_reference() {
        let e = Expr::var("mu", &[]) + 1.0;
        let err = e.eval(&Point::new()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(ref id) if id == "mu"));
    }

    #[test]
    fn test_bound_shape_mismatch_is_shape_error() {
        let e = Expr::var("x", &[2]);
        let point = Point::new().with("x", arr1(&[1.0, 2.0, 3.0]).into_dyn());
        assert!(matches!(e.eval(&point), Err(Error::Shape(_))));
    }

    #[test]
    fn test_broadcast_shapes_numpy_rules() {
        assert_eq!(broadcast_shapes(&[&[3], &[]]).unwrap(), vec![3]);
        assert_eq!(broadcast_shapes(&[&[4, 1], &[3]]).unwrap(), vec![4, 3]);
        assert_eq!(broadcast_shapes(&[&[2, 1, 5], &[3, 1]]).unwrap(), vec![2, 3, 5]);
        assert_eq!(broadcast_shapes(&[&[0], &[1]]).unwrap(), vec![0]);
        assert!(broadcast_shapes(&[&[3], &[2]]).is_err());
    }

    #[test]
    fn test_incompatible_operands_record_shape_error() {
        let a = Expr::var("a", &[3]);
        let b = Expr::var("b", &[2]);
        let c = &a + &b;
        assert!(matches!(c.shape(), Err(Error::Shape(_))));
        // Errors propagate through later nodes.
        assert!(c.exp().shape().is_err());
    }

    #[test]
    fn test_switch_selects_per_element() {
        let cond = Expr::constant(arr1(&[1.0, 0.0, 1.0]).into_dyn());
        let s = Expr::switch(&cond, &Expr::scalar(5.0), &Expr::scalar(f64::NEG_INFINITY));
        let v = s.as_constant().unwrap();
        assert_eq!(v.as_slice().unwrap(), &[5.0, f64::NEG_INFINITY, 5.0]);
    }

    #[test]
    fn test_comparisons_produce_masks() {
        let x = Expr::constant(arr1(&[-1.0, 0.0, 1.0]).into_dyn());
        let m = x.ge(0.0).and(x.lt(1.0));
        assert_eq!(m.as_constant().unwrap().as_slice().unwrap(), &[0.0, 1.0, 0.0]);
        // NaN compares false.
        assert_eq!(Expr::scalar(f64::NAN).gt(0.0).as_scalar(), Some(0.0));
    }

    #[test]
    fn test_all_of_masks() {
        assert!(Expr::all(&[]).is_none());
        let m = Expr::all(&[Expr::scalar(1.0), Expr::scalar(1.0), Expr::scalar(0.0)]).unwrap();
        assert_eq!(m.as_scalar(), Some(0.0));
    }

    #[test]
    fn test_ln_beta_composed() {
        let v = Expr::scalar(2.0).ln_beta(2.0);
        assert_relative_eq!(v.as_scalar().unwrap(), (1.0f64 / 6.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_eval_scalar_requires_single_element() {
        let e = Expr::constant(arr1(&[1.0, 2.0]).into_dyn());
        assert!(e.eval_scalar(&Point::new()).is_err());
        assert_eq!(Expr::scalar(4.0).eval_scalar(&Point::new()).unwrap(), 4.0);
    }
}
