//! Built-in solving strategies, tried in the order of [`default_strategies`].

use tracing::debug;

use super::inventory::EquationInventory;
use super::strategy::{Attempt, SolvingStrategy};
use super::unknown::Unknown;
use crate::kinematics::Equation;
use crate::symbolic::{negate, simplify, solve_linear, Expr, Function};

/// Stand-in for `f(x)` while isolating it. Not a parseable symbol.
const PLACEHOLDER: &str = "$u";

/// Value `v` with `func(symbol) = v`, when `eq` mentions `symbol` only as
/// `func(symbol)` and linearly so.
pub fn isolate(eq: &Equation, func: Function, symbol: &str) -> Option<Expr> {
    let call = Expr::call(func, vec![Expr::sym(symbol)]);
    let placeholder = Expr::sym(PLACEHOLDER);
    let reduced = eq.substitute(&call, &placeholder);
    if reduced.mentions(symbol) || !reduced.mentions(PLACEHOLDER) {
        return None;
    }
    solve_linear(&reduced.lhs, &reduced.rhs, PLACEHOLDER)
}

/// `x = atan2(s, c)` from one equation giving `sin(x) = s` and another
/// giving `cos(x) = c`.
pub struct SinCosPairSolver;

impl SolvingStrategy for SinCosPairSolver {
    fn name(&self) -> &str {
        "atan2"
    }

    fn attempt(&self, unknown: &mut Unknown, inventory: &EquationInventory) -> Attempt {
        let candidates = inventory.solvable_for(&unknown.symbol);
        for sin_eq in &candidates {
            let Some(s) = isolate(sin_eq, Function::Sin, &unknown.symbol) else {
                continue;
            };
            for cos_eq in &candidates {
                if cos_eq == sin_eq {
                    continue;
                }
                if let Some(c) = isolate(cos_eq, Function::Cos, &unknown.symbol) {
                    let solution = simplify(&Expr::atan2(s, c));
                    unknown.propose(
                        self.name(),
                        vec![solution],
                        Vec::new(),
                        (*sin_eq).clone(),
                        Some((*cos_eq).clone()),
                    );
                    return Attempt::Solved;
                }
            }
        }
        Attempt::NotSolved
    }
}

/// The unknown appears linearly in a one-unknown equation.
pub struct AlgebraicSolver;

impl SolvingStrategy for AlgebraicSolver {
    fn name(&self) -> &str {
        "algebraic"
    }

    fn attempt(&self, unknown: &mut Unknown, inventory: &EquationInventory) -> Attempt {
        let found = inventory.solvable_for(&unknown.symbol).into_iter().find_map(|eq| {
            solve_linear(&eq.lhs, &eq.rhs, &unknown.symbol).map(|x| (eq.clone(), x))
        });
        match found {
            Some((eq, x)) => {
                unknown.propose(self.name(), vec![x], Vec::new(), eq, None);
                Attempt::Solved
            }
            None => Attempt::NotSolved,
        }
    }
}

/// The unknown appears only as `sin(x)` or only as `cos(x)`: two branches.
pub struct InverseTrigSolver;

impl SolvingStrategy for InverseTrigSolver {
    fn name(&self) -> &str {
        "inverse_trig"
    }

    fn attempt(&self, unknown: &mut Unknown, inventory: &EquationInventory) -> Attempt {
        for eq in inventory.solvable_for(&unknown.symbol) {
            for func in [Function::Cos, Function::Sin] {
                let Some(v) = isolate(eq, func, &unknown.symbol) else {
                    continue;
                };
                let (method, solutions) = match func {
                    Function::Cos => (
                        "arccos",
                        vec![Expr::acos(v.clone()), negate(Expr::acos(v.clone()))],
                    ),
                    _ => (
                        "arcsin",
                        vec![Expr::asin(v.clone()), Expr::pi() - Expr::asin(v.clone())],
                    ),
                };
                debug!(symbol = %unknown.symbol, method, "inverse trig branches");
                let assumption = format!("{} <= 1", Expr::abs(v));
                unknown.propose(method, solutions, vec![assumption], eq.clone(), None);
                return Attempt::Solved;
            }
        }
        Attempt::NotSolved
    }
}

/// Built-in strategies in priority order.
pub fn default_strategies() -> Vec<Box<dyn SolvingStrategy>> {
    vec![
        Box::new(SinCosPairSolver),
        Box::new(AlgebraicSolver),
        Box::new(InverseTrigSolver),
    ]
}
