//! Numeric back-check of a finished run.
//!
//! Forward kinematics are evaluated at a sample joint configuration to get
//! target values, then every solved variable's branches are evaluated in
//! solve order against those targets.

use std::f64::consts::TAU;

use serde::Serialize;
use tracing::debug;

use crate::error::IkError;
use crate::kinematics::{Manipulator, INFORMATIVE_ROWS};
use crate::solve::SolveReport;
use crate::symbolic::{evaluate, Bindings, EvalError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableError {
    pub symbol: String,
    /// Value at the sample configuration.
    pub expected: f64,
    /// Closest branch value.
    pub actual: f64,
    pub branch: usize,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub errors: Vec<VariableError>,
    pub max_error: f64,
}

impl VerificationReport {
    pub fn passed(&self, tolerance: f64) -> bool {
        self.max_error <= tolerance
    }
}

/// Distance between two angles on the circle.
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

pub fn verify(
    manipulator: &Manipulator,
    report: &SolveReport,
    sample: &Bindings,
) -> Result<VerificationReport, IkError> {
    let mut truth: Bindings = manipulator.parameters.clone();
    truth.extend(sample.iter().map(|(k, v)| (k.clone(), *v)));
    for aux in &report.auxiliary {
        if let Some(name) = aux.lhs.as_symbol() {
            let value = evaluate(&aux.rhs, &truth)?;
            truth.insert(name.to_string(), value);
        }
    }

    // Targets come from the unnormalized transforms.
    let mut known: Bindings = manipulator.parameters.clone();
    for m in &manipulator.matrix_equations {
        for i in 0..INFORMATIVE_ROWS {
            for j in 0..4 {
                let eq = m.entry(i, j);
                if let Some(name) = eq.lhs.as_symbol() {
                    if !known.contains_key(name) {
                        let value = evaluate(&eq.rhs, &truth)?;
                        known.insert(name.to_string(), value);
                    }
                }
            }
        }
    }

    let mut errors = Vec::new();
    for node in &report.solutions {
        let expected = *truth
            .get(&node.symbol)
            .ok_or_else(|| EvalError::UndefinedSymbol(node.symbol.clone()))?;
        let angular = report
            .unknown(&node.symbol)
            .map(|u| u.kind.is_angular())
            .unwrap_or(false);

        let mut best: Option<VariableError> = None;
        let mut first_failure = None;
        for (branch, solution) in node.solutions.iter().enumerate() {
            let actual = match evaluate(solution, &known) {
                Ok(v) if v.is_finite() => v,
                Ok(_) => continue,
                Err(e) => {
                    first_failure.get_or_insert(e);
                    continue;
                }
            };
            let error = if angular {
                angle_distance(actual, expected)
            } else {
                (actual - expected).abs()
            };
            if best.as_ref().map_or(true, |b| error < b.error) {
                best = Some(VariableError {
                    symbol: node.symbol.clone(),
                    expected,
                    actual,
                    branch,
                    error,
                });
            }
        }

        let best = match (best, first_failure) {
            (Some(best), _) => best,
            (None, Some(e)) => return Err(e.into()),
            (None, None) => VariableError {
                symbol: node.symbol.clone(),
                expected,
                actual: f64::NAN,
                branch: 0,
                error: f64::INFINITY,
            },
        };
        debug!(symbol = %best.symbol, branch = best.branch, error = best.error, "branch checked");
        // later solutions refer to the chosen branch
        known.insert(best.symbol.clone(), best.actual);
        errors.push(best);
    }

    let max_error = errors.iter().map(|e| e.error).fold(0.0, f64::max);
    Ok(VerificationReport { errors, max_error })
}
