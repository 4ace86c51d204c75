//! Complexity ranking of candidate equations.

use crate::kinematics::Equation;

/// Order equations by ascending complexity score.
///
/// Equal scores keep their input order, so rankings are reproducible.
pub fn erank(mut equations: Vec<Equation>) -> Vec<Equation> {
    equations.sort_by_cached_key(Equation::complexity);
    equations
}
