//! Sum-of-angle normalizer.
//!
//! Rewrites `sin(a ± b)` and `cos(a ± b)` over two adjacent joint variables
//! in terms of a compound variable, and records `compound = a ± b` as an
//! auxiliary equation for later back-substitution.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::unknown::{Unknown, VariableKind};
use crate::kinematics::{CompoundTable, Equation, MatrixEquation, INFORMATIVE_ROWS};
use crate::symbolic::pattern::Bindings as PatternBindings;
use crate::symbolic::{find_matches, simplify, Expr, Function, Pattern};

/// What one normalization pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalization {
    /// Compound symbols introduced, in discovery order.
    pub introduced: Vec<String>,
    /// Number of sub-expression rewrites.
    pub rewrites: usize,
}

/// A validated match: replace `target` with `name`.
struct Rewrite {
    name: String,
    target: Expr,
    definition: Expr,
}

fn angle_sum(func: Function) -> Pattern {
    Pattern::call(
        func,
        vec![Pattern::signed_sum(
            Pattern::wild_symbol("a"),
            "s",
            Pattern::wild_symbol("b"),
        )],
    )
}

pub struct SumOfAngles<'a> {
    table: &'a CompoundTable,
    patterns: [Pattern; 2],
}

impl<'a> SumOfAngles<'a> {
    pub fn new(table: &'a CompoundTable) -> Self {
        Self {
            table,
            patterns: [angle_sum(Function::Sin), angle_sum(Function::Cos)],
        }
    }

    /// Normalize every informative entry of every matrix equation in place.
    ///
    /// New compound variables are appended to `unknowns`; their defining
    /// equations to `auxiliary`.
    pub fn run(
        &self,
        matrix_equations: &mut [MatrixEquation],
        unknowns: &mut Vec<Unknown>,
        auxiliary: &mut Vec<Equation>,
    ) -> Normalization {
        let joints: BTreeSet<String> = unknowns
            .iter()
            .filter(|u| u.kind != VariableKind::Compound)
            .map(|u| u.symbol.clone())
            .collect();
        let mut report = Normalization::default();

        for m in matrix_equations.iter_mut() {
            for i in 0..INFORMATIVE_ROWS {
                for j in 0..4 {
                    let mut eq = m.entry(i, j);
                    eq.lhs = simplify(&eq.lhs);
                    eq.rhs = simplify(&eq.rhs);

                    while let Some(rewrite) = self.next_rewrite(&eq, &joints, auxiliary) {
                        if !auxiliary.iter().any(|aux| aux.lhs.as_symbol() == Some(&rewrite.name)) {
                            let definition =
                                Equation::new(Expr::sym(&rewrite.name), rewrite.definition.clone());
                            info!(
                                compound = %rewrite.name,
                                definition = %definition,
                                "new sum-of-angle variable"
                            );
                            if !unknowns.iter().any(|u| u.symbol == rewrite.name) {
                                unknowns.push(Unknown::compound(&rewrite.name));
                            }
                            auxiliary.push(definition);
                            report.introduced.push(rewrite.name.clone());
                        }
                        let replacement = Expr::sym(&rewrite.name);
                        eq = eq.substitute(&rewrite.target, &replacement);
                        report.rewrites += 1;
                    }

                    m.set_entry(i, j, eq);
                }
            }
        }
        report
    }

    /// First match in `eq` that can be compounded, if any.
    fn next_rewrite(
        &self,
        eq: &Equation,
        joints: &BTreeSet<String>,
        auxiliary: &[Equation],
    ) -> Option<Rewrite> {
        for side in [&eq.lhs, &eq.rhs] {
            for pattern in &self.patterns {
                for found in find_matches(side, pattern) {
                    let rewrite = self.validate(&found.bindings, found.expr, joints, auxiliary);
                    if rewrite.is_some() {
                        return rewrite;
                    }
                }
            }
        }
        None
    }

    fn validate(
        &self,
        bindings: &PatternBindings,
        matched: &Expr,
        joints: &BTreeSet<String>,
        auxiliary: &[Equation],
    ) -> Option<Rewrite> {
        let a = bindings.get("a")?.as_symbol()?;
        let b = bindings.get("b")?.as_symbol()?;
        let sign = bindings.get("s")?.as_number()?;
        if a == b || sign == 0.0 || !joints.contains(a) || !joints.contains(b) {
            return None;
        }
        let Some(name) = self.table.lookup(a, b) else {
            debug!(a, b, "no compound for non-adjacent pair");
            return None;
        };

        let definition = if sign > 0.0 {
            Expr::sym(a) + Expr::sym(b)
        } else {
            Expr::sym(a) - Expr::sym(b)
        };
        let existing = auxiliary
            .iter()
            .find(|aux| aux.lhs.as_symbol() == Some(name))
            .map(|aux| &aux.rhs);
        if let Some(rhs) = existing {
            let swapped = Expr::sym(b) + Expr::sym(a);
            if *rhs != definition && !(sign > 0.0 && *rhs == swapped) {
                warn!(
                    compound = name,
                    existing = %rhs,
                    found = %definition,
                    "conflicting compound definition"
                );
                return None;
            }
        }

        let Expr::FnCall { args, .. } = matched else {
            return None;
        };
        Some(Rewrite {
            name: name.to_string(),
            target: args.first()?.clone(),
            definition: existing.cloned().unwrap_or(definition),
        })
    }
}
