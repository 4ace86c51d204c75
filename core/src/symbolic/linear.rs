//! Isolation of a symbol that appears linearly.

use super::expr::{BinaryOperator, Expr, UnaryOperator};
use super::simplify::{negate, simplify};

/// Split `expr` into `(coef, rest)` with `expr == coef*symbol + rest`.
///
/// Returns `None` when `symbol` occurs non-linearly (inside a function, a
/// power, a denominator or a product with another term containing it).
pub fn linear_in(expr: &Expr, symbol: &str) -> Option<(Expr, Expr)> {
    let (coef, rest) = decompose(expr, symbol)?;
    Some((simplify(&coef), simplify(&rest)))
}

fn decompose(expr: &Expr, symbol: &str) -> Option<(Expr, Expr)> {
    if !expr.has_symbol(symbol) {
        return Some((Expr::zero(), expr.clone()));
    }
    match expr {
        Expr::Symbol(_) => Some((Expr::one(), Expr::zero())),
        Expr::BinaryOp { op, left, right } => match op {
            BinaryOperator::Add => {
                let (c1, r1) = decompose(left, symbol)?;
                let (c2, r2) = decompose(right, symbol)?;
                Some((c1 + c2, r1 + r2))
            }
            BinaryOperator::Sub => {
                let (c1, r1) = decompose(left, symbol)?;
                let (c2, r2) = decompose(right, symbol)?;
                Some((c1 - c2, r1 - r2))
            }
            BinaryOperator::Mul => {
                if !left.has_symbol(symbol) {
                    let (c, r) = decompose(right, symbol)?;
                    Some((left.as_ref().clone() * c, left.as_ref().clone() * r))
                } else if !right.has_symbol(symbol) {
                    let (c, r) = decompose(left, symbol)?;
                    Some((c * right.as_ref().clone(), r * right.as_ref().clone()))
                } else {
                    None
                }
            }
            BinaryOperator::Div if !right.has_symbol(symbol) => {
                let (c, r) = decompose(left, symbol)?;
                Some((c / right.as_ref().clone(), r / right.as_ref().clone()))
            }
            _ => None,
        },
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => {
            let (c, r) = decompose(operand, symbol)?;
            Some((negate(c), negate(r)))
        }
        _ => None,
    }
}

/// Solve `lhs = rhs` for `symbol` when it appears linearly with a
/// non-zero coefficient.
pub fn solve_linear(lhs: &Expr, rhs: &Expr, symbol: &str) -> Option<Expr> {
    let difference = lhs.clone() - rhs.clone();
    let (coef, rest) = linear_in(&difference, symbol)?;
    if coef.is_zero() {
        return None;
    }
    Some(simplify(&(negate(rest) / coef)))
}
