//! Parameter inputs, alternative parameterizations and their closed-form conversions.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, ArrayD, IxDyn};
use ns_core::{Error, Result, VarId};

use crate::expr::Expr;

/// A distribution parameter as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Concrete constant array (0-d for scalars).
    Literal(ArrayD<f64>),
    /// Another random variable, resolved at sampling time.
    Reference {
        /// Upstream variable.
        id: VarId,
        /// Declared shape of the upstream variable.
        shape: Vec<usize>,
    },
}

impl Param {
    /// Reference to a scalar upstream variable.
    pub fn reference(id: impl Into<VarId>) -> Self {
        Param::Reference { id: id.into(), shape: Vec::new() }
    }

    /// Reference to an upstream variable of the given shape.
    pub fn reference_with_shape(id: impl Into<VarId>, shape: &[usize]) -> Self {
        Param::Reference { id: id.into(), shape: shape.to_vec() }
    }

    /// Canonical expression form.
    pub fn to_expr(&self) -> Expr {
        match self {
            Param::Literal(a) => Expr::constant(a.clone()),
            Param::Reference { id, shape } => Expr::var(id.clone(), shape),
        }
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Literal(ArrayD::from_elem(IxDyn(&[]), v))
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::from(f64::from(v))
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::from(v as f64)
    }
}

impl From<Vec<f64>> for Param {
    fn from(v: Vec<f64>) -> Self {
        Param::Literal(Array1::from(v).into_dyn())
    }
}

impl From<&[f64]> for Param {
    fn from(v: &[f64]) -> Self {
        Param::from(v.to_vec())
    }
}

impl From<ArrayD<f64>> for Param {
    fn from(a: ArrayD<f64>) -> Self {
        Param::Literal(a)
    }
}

impl From<Param> for Expr {
    fn from(p: Param) -> Self {
        p.to_expr()
    }
}

/// Named-argument bag used by `from_kwargs` constructors and config specs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    values: BTreeMap<String, Param>,
}

impl Kwargs {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: impl Into<Param>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace `name`.
    pub fn insert(&mut self, name: &str, value: impl Into<Param>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Parameter supplied under `name`.
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    /// Whether `name` was supplied.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Supplied names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Expression for `name`, if supplied.
    pub fn expr(&self, name: &str) -> Option<Expr> {
        self.get(name).map(Param::to_expr)
    }

    /// Expression for `name`, or the scalar `default`.
    pub fn expr_or(&self, name: &str, default: f64) -> Expr {
        self.expr(name).unwrap_or_else(|| Expr::scalar(default))
    }

    /// Expression for a mandatory `name`.
    pub fn require(&self, distribution: &str, name: &str) -> Result<Expr> {
        self.expr(name).ok_or_else(|| Error::UnderspecifiedParameters {
            distribution: distribution.to_string(),
            detail: format!("missing required parameter `{}`", name),
        })
    }

    /// Reject names outside `allowed`.
    pub fn check_known(&self, distribution: &str, allowed: &[&str]) -> Result<()> {
        for name in self.names() {
            if !allowed.contains(&name) {
                return Err(Error::Validation(format!(
                    "{}: unknown parameter `{}` (expected one of {:?})",
                    distribution, name, allowed
                )));
            }
        }
        Ok(())
    }
}

/// One complete alternative parameterization, e.g. `{alpha, beta}` vs `{mu, sd}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterGroup {
    /// Label used in diagnostics.
    pub name: &'static str,
    /// Member parameter names.
    pub members: &'static [&'static str],
}

impl ParameterGroup {
    /// New group.
    pub const fn new(name: &'static str, members: &'static [&'static str]) -> Self {
        Self { name, members }
    }
}

/// `{}` (defaults) vs `{tau}` vs `{sd}`.
pub const PRECISION_GROUPS: [ParameterGroup; 3] = [
    ParameterGroup::new("default", &[]),
    ParameterGroup::new("precision", &["tau"]),
    ParameterGroup::new("standard deviation", &["sd"]),
];

/// Pick the group whose members exactly match the supplied group-member names.
///
/// Names that belong to no group are ignored here. If no group matches exactly but one
/// or more are fully supplied, the inputs conflict; otherwise they are underspecified.
pub fn resolve_group<'g>(
    distribution: &str,
    groups: &'g [ParameterGroup],
    kwargs: &Kwargs,
) -> Result<&'g ParameterGroup> {
    let universe: BTreeSet<&str> = groups.iter().flat_map(|g| g.members.iter().copied()).collect();
    let supplied: BTreeSet<&str> = kwargs.names().filter(|n| universe.contains(n)).collect();

    if let Some(g) = groups.iter().find(|g| {
        g.members.len() == supplied.len() && g.members.iter().all(|m| supplied.contains(m))
    }) {
        log::debug!("{}: using {} parameterization", distribution, g.name);
        return Ok(g);
    }

    let detail = format!("expected one of {}; got {{{}}}", describe(groups), join(&supplied));
    let complete = groups.iter().filter(|g| g.members.iter().all(|m| supplied.contains(m))).count();
    if complete > 0 {
        Err(Error::ConflictingParameters { distribution: distribution.to_string(), detail })
    } else {
        Err(Error::UnderspecifiedParameters { distribution: distribution.to_string(), detail })
    }
}

fn join<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(", ")
}

fn describe(groups: &[ParameterGroup]) -> String {
    groups.iter().map(|g| format!("{{{}}}", join(g.members))).collect::<Vec<_>>().join(" | ")
}

/// Canonical `(tau, sd)` from at most one of precision or standard deviation.
///
/// `tau = sd^-2`, `sd = tau^-0.5`; both omitted gives `(1, 1)`.
pub fn tau_sd(distribution: &str, tau: Option<Expr>, sd: Option<Expr>) -> Result<(Expr, Expr)> {
    match (tau, sd) {
        (Some(_), Some(_)) => Err(Error::ConflictingParameters {
            distribution: distribution.to_string(),
            detail: "can't pass both tau and sd".to_string(),
        }),
        (None, None) => Ok((Expr::scalar(1.0), Expr::scalar(1.0))),
        (Some(tau), None) => {
            let sd = tau.powf(-0.5);
            Ok((tau, sd))
        }
        (None, Some(sd)) => {
            let tau = sd.powf(-2.0);
            Ok((tau, sd))
        }
    }
}

/// `(tau, sd)` resolved from the `tau` / `sd` entries of `kwargs`.
pub fn precision_from_kwargs(distribution: &str, kwargs: &Kwargs) -> Result<(Expr, Expr)> {
    resolve_group(distribution, &PRECISION_GROUPS, kwargs)?;
    tau_sd(distribution, kwargs.expr("tau"), kwargs.expr("sd"))
}

/// Beta `(alpha, beta)` from mean and standard deviation.
///
/// `kappa = mu(1-mu)/sd² - 1`, `alpha = mu·kappa`, `beta = (1-mu)·kappa`.
pub fn beta_from_moments(mu: &Expr, sd: &Expr) -> (Expr, Expr) {
    let kappa = mu * (1.0 - mu) / sd.powf(2.0) - 1.0;
    let alpha = mu * &kappa;
    let beta = (1.0 - mu) * &kappa;
    (alpha, beta)
}

/// Gamma `(alpha, beta)` from mean and standard deviation.
///
/// `alpha = mu²/sd²`, `beta = mu/sd²`.
pub fn gamma_from_moments(mu: &Expr, sd: &Expr) -> (Expr, Expr) {
    let var = sd.powf(2.0);
    (mu.powf(2.0) / &var, mu / &var)
}

/// Wald `{mu}`, `{mu, lam}`, `{mu, phi}`, `{lam, phi}`.
pub const WALD_GROUPS: [ParameterGroup; 4] = [
    ParameterGroup::new("mean", &["mu"]),
    ParameterGroup::new("mean/shape", &["mu", "lam"]),
    ParameterGroup::new("mean/dispersion", &["mu", "phi"]),
    ParameterGroup::new("shape/dispersion", &["lam", "phi"]),
];

/// Canonical Wald `(mu, lam, phi)` where `phi = lam/mu`.
///
/// `mu` alone implies `lam = 1`, `phi = 1/mu`.
pub fn wald_mu_lam_phi(
    distribution: &str,
    mu: Option<Expr>,
    lam: Option<Expr>,
    phi: Option<Expr>,
) -> Result<(Expr, Expr, Expr)> {
    match (mu, lam, phi) {
        (Some(mu), None, None) => {
            let phi = 1.0 / &mu;
            Ok((mu, Expr::scalar(1.0), phi))
        }
        (Some(mu), Some(lam), None) => {
            let phi = &lam / &mu;
            Ok((mu, lam, phi))
        }
        (Some(mu), None, Some(phi)) => {
            let lam = &mu * &phi;
            Ok((mu, lam, phi))
        }
        (None, Some(lam), Some(phi)) => {
            let mu = &lam / &phi;
            Ok((mu, lam, phi))
        }
        (Some(_), Some(_), Some(_)) => Err(Error::ConflictingParameters {
            distribution: distribution.to_string(),
            detail: "mu, lam and phi are overdetermined; pass at most two".to_string(),
        }),
        _ => Err(Error::UnderspecifiedParameters {
            distribution: distribution.to_string(),
            detail: "Wald distribution must specify either mu only, mu and lam, mu and phi, \
                     or lam and phi"
                .to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BETA_GROUPS: [ParameterGroup; 2] = [
        ParameterGroup::new("shape", &["alpha", "beta"]),
        ParameterGroup::new("moments", &["mu", "sd"]),
    ];

    fn scalar(e: &Expr) -> f64 {
        e.as_scalar().unwrap()
    }

    #[test]
    fn test_resolve_exact_group() {
        let kw = Kwargs::new().with("mu", 0.5).with("sd", 0.1);
        assert_eq!(resolve_group("Beta", &BETA_GROUPS, &kw).unwrap().name, "moments");
    }

    #[test]
    fn test_resolve_partial_group_is_underspecified() {
        let kw = Kwargs::new().with("alpha", 2.0);
        let err = resolve_group("Beta", &BETA_GROUPS, &kw).unwrap_err();
        assert!(matches!(err, Error::UnderspecifiedParameters { .. }), "{}", err);
    }

    #[test]
    fn test_resolve_group_plus_stray_member_conflicts() {
        let kw = Kwargs::new().with("alpha", 2.0).with("beta", 2.0).with("mu", 0.5);
        let err = resolve_group("Beta", &BETA_GROUPS, &kw).unwrap_err();
        assert!(matches!(err, Error::ConflictingParameters { .. }), "{}", err);
    }

    #[test]
    fn test_tau_sd_defaults_and_conversion() {
        let (tau, sd) = tau_sd("Normal", None, None).unwrap();
        assert_eq!((scalar(&tau), scalar(&sd)), (1.0, 1.0));

        let (tau, _) = tau_sd("Normal", None, Some(Expr::scalar(2.0))).unwrap();
        assert_relative_eq!(scalar(&tau), 0.25, epsilon = 1e-15);

        let (_, sd) = tau_sd("Normal", Some(Expr::scalar(4.0)), None).unwrap();
        assert_relative_eq!(scalar(&sd), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_tau_and_sd_conflict() {
        let err = tau_sd("Normal", Some(Expr::scalar(1.0)), Some(Expr::scalar(1.0))).unwrap_err();
        assert!(matches!(err, Error::ConflictingParameters { .. }));

        let kw = Kwargs::new().with("tau", 1.0).with("sd", 1.0);
        assert!(matches!(
            precision_from_kwargs("Normal", &kw),
            Err(Error::ConflictingParameters { .. })
        ));
    }

    #[test]
    fn test_beta_from_moments() {
        // Beta(2, 2): mean 0.5, var = 4/(16*5) = 0.05
        let (a, b) = beta_from_moments(&Expr::scalar(0.5), &Expr::scalar(0.05f64.sqrt()));
        assert_relative_eq!(scalar(&a), 2.0, epsilon = 1e-12);
        assert_relative_eq!(scalar(&b), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gamma_from_moments() {
        let (a, b) = gamma_from_moments(&Expr::scalar(2.0), &Expr::scalar(1.0));
        assert_relative_eq!(scalar(&a), 4.0, epsilon = 1e-12);
        assert_relative_eq!(scalar(&b), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wald_combinations_agree() {
        let c = |v: f64| Some(Expr::scalar(v));
        let (mu1, lam1, phi1) = wald_mu_lam_phi("Wald", c(2.0), c(3.0), None).unwrap();
        let (mu2, lam2, phi2) = wald_mu_lam_phi("Wald", c(2.0), None, c(1.5)).unwrap();
        let (mu3, lam3, phi3) = wald_mu_lam_phi("Wald", None, c(3.0), c(1.5)).unwrap();
        for (m, l, p) in [(&mu1, &lam1, &phi1), (&mu2, &lam2, &phi2), (&mu3, &lam3, &phi3)] {
            assert_relative_eq!(scalar(m), 2.0, epsilon = 1e-12);
            assert_relative_eq!(scalar(l), 3.0, epsilon = 1e-12);
            assert_relative_eq!(scalar(p), 1.5, epsilon = 1e-12);
        }

        let (mu, lam, phi) = wald_mu_lam_phi("Wald", c(4.0), None, None).unwrap();
        assert_eq!((scalar(&mu), scalar(&lam), scalar(&phi)), (4.0, 1.0, 0.25));
    }

    #[test]
    fn test_wald_invalid_combinations() {
        assert!(matches!(
            wald_mu_lam_phi("Wald", None, Some(Expr::scalar(1.0)), None),
            Err(Error::UnderspecifiedParameters { .. })
        ));
        assert!(matches!(
            wald_mu_lam_phi(
                "Wald",
                Some(Expr::scalar(1.0)),
                Some(Expr::scalar(1.0)),
                Some(Expr::scalar(1.0))
            ),
            Err(Error::ConflictingParameters { .. })
        ));
    }

    #[test]
    fn test_unknown_name_rejected() {
        let kw = Kwargs::new().with("mu", 0.0).with("sigma", 1.0);
        assert!(matches!(kw.check_known("Normal", &["mu", "tau", "sd"]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_integral_input_becomes_float() {
        match Param::from(3) {
            Param::Literal(a) => assert_eq!(a[[]], 3.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reference_is_deferred() {
        let e = Param::reference("mu").to_expr();
        assert!(!e.is_constant());
        assert_eq!(e.shape().unwrap(), &[] as &[usize]);
    }
}
