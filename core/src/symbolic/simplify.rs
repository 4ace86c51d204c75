//! Algebraic simplification.
//!
//! A bottom-up rewrite pass that folds numeric constants, removes identity
//! elements and collapses products of sines and cosines back into the sine or
//! cosine of an angle sum. Passes repeat until the tree stops changing.

use super::expr::{BinaryOperator, Expr, Function, UnaryOperator};

const MAX_PASSES: usize = 16;
const COEFF_EPS: f64 = 1e-12;

pub fn simplify(expr: &Expr) -> Expr {
    let mut current = expr.clone();
    for _ in 0..MAX_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn pass(expr: &Expr) -> Expr {
    let rebuilt = expr.map_children(pass);
    let folded = fold(rebuilt);
    match &folded {
        Expr::BinaryOp {
            op: BinaryOperator::Add | BinaryOperator::Sub,
            ..
        } => collapse_trig_sums(&folded).unwrap_or(folded),
        _ => folded,
    }
}

/// Negate without stacking unary minus signs.
pub fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Number(n) => Expr::Number(-n),
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => *operand,
        Expr::BinaryOp {
            op: BinaryOperator::Sub,
            left,
            right,
        } => Expr::binary(BinaryOperator::Sub, *right, *left),
        other => -other,
    }
}

fn fold(expr: Expr) -> Expr {
    match expr {
        Expr::BinaryOp { op, left, right } => fold_binary(op, *left, *right),
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => negate(*operand),
        Expr::FnCall { func, args } => fold_call(func, args),
        other => other,
    }
}

fn fold_binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    use BinaryOperator::*;

    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        match op {
            Add => return Expr::Number(l + r),
            Sub => return Expr::Number(l - r),
            Mul => return Expr::Number(l * r),
            Div if r != 0.0 => return Expr::Number(l / r),
            Pow => return Expr::Number(l.powf(r)),
            Div => {}
        }
    }

    match op {
        Add => {
            if left.is_zero() {
                right
            } else if right.is_zero() {
                left
            } else if let Some(inner) = negated(&right) {
                Expr::binary(Sub, left, inner.clone())
            } else {
                Expr::binary(Add, left, right)
            }
        }
        Sub => {
            if right.is_zero() {
                left
            } else if left.is_zero() {
                negate(right)
            } else if left == right {
                Expr::zero()
            } else if let Some(inner) = negated(&right) {
                Expr::binary(Add, left, inner.clone())
            } else {
                Expr::binary(Sub, left, right)
            }
        }
        Mul => {
            if left.is_zero() || right.is_zero() {
                Expr::zero()
            } else if left.is_one() {
                right
            } else if right.is_one() {
                left
            } else if left.as_number() == Some(-1.0) {
                negate(right)
            } else if right.as_number() == Some(-1.0) {
                negate(left)
            } else if let (Some(a), Some(b)) = (negated(&left), negated(&right)) {
                Expr::binary(Mul, a.clone(), b.clone())
            } else {
                Expr::binary(Mul, left, right)
            }
        }
        Div => {
            if right.is_one() {
                left
            } else if right.as_number() == Some(-1.0) {
                negate(left)
            } else if left.is_zero() && !right.is_zero() {
                Expr::zero()
            } else if let (Some(a), Some(b)) = (negated(&left), negated(&right)) {
                Expr::binary(Div, a.clone(), b.clone())
            } else if let Some(b) = negated(&right) {
                Expr::binary(Div, negate(left), b.clone())
            } else {
                Expr::binary(Div, left, right)
            }
        }
        Pow => {
            if right.is_one() {
                left
            } else if right.is_zero() {
                Expr::one()
            } else {
                Expr::binary(Pow, left, right)
            }
        }
    }
}

fn fold_call(func: Function, args: Vec<Expr>) -> Expr {
    if let [arg] = args.as_slice() {
        match func {
            Function::Sin if arg.is_zero() => return Expr::zero(),
            Function::Cos if arg.is_zero() => return Expr::one(),
            Function::Sin => {
                if let Some(inner) = negated(arg) {
                    return negate(Expr::sin(inner.clone()));
                }
            }
            Function::Cos => {
                if let Some(inner) = negated(arg) {
                    return Expr::cos(inner.clone());
                }
            }
            _ => {}
        }
    }
    Expr::FnCall { func, args }
}

fn negated(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => Some(operand),
        _ => None,
    }
}

/// One additive term: `coeff * f1 * f2 * ...`.
#[derive(Debug, Clone)]
struct Term {
    coeff: f64,
    factors: Vec<Expr>,
}

fn flatten_sum(expr: &Expr, sign: f64, out: &mut Vec<Term>) {
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::Add,
            left,
            right,
        } => {
            flatten_sum(left, sign, out);
            flatten_sum(right, sign, out);
        }
        Expr::BinaryOp {
            op: BinaryOperator::Sub,
            left,
            right,
        } => {
            flatten_sum(left, sign, out);
            flatten_sum(right, -sign, out);
        }
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => flatten_sum(operand, -sign, out),
        _ => {
            let mut term = Term {
                coeff: sign,
                factors: Vec::new(),
            };
            flatten_product(expr, &mut term);
            out.push(term);
        }
    }
}

fn flatten_product(expr: &Expr, term: &mut Term) {
    match expr {
        Expr::BinaryOp {
            op: BinaryOperator::Mul,
            left,
            right,
        } => {
            flatten_product(left, term);
            flatten_product(right, term);
        }
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => {
            term.coeff = -term.coeff;
            flatten_product(operand, term);
        }
        Expr::Number(n) => term.coeff *= n,
        other => term.factors.push(other.clone()),
    }
}

/// `sin(x)` / `cos(x)` as `(func, x)`.
fn trig_factor(expr: &Expr) -> Option<(Function, &Expr)> {
    match expr {
        Expr::FnCall { func, args } if matches!(func, Function::Sin | Function::Cos) => {
            args.first().map(|a| (*func, a))
        }
        _ => None,
    }
}

/// Factors of `term` other than the two at `skip`, in a canonical order.
fn remainder(term: &Term, skip: (usize, usize)) -> Vec<Expr> {
    let mut rest: Vec<Expr> = term
        .factors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip.0 && *i != skip.1)
        .map(|(_, f)| f.clone())
        .collect();
    rest.sort_by_key(|f| f.to_string());
    rest
}

fn same_coeff(a: f64, b: f64) -> bool {
    (a - b).abs() < COEFF_EPS
}

/// Try to combine `first` and `second` into one term via an angle-sum identity.
fn combine(first: &Term, second: &Term) -> Option<Term> {
    if !same_coeff(first.coeff.abs(), second.coeff.abs()) {
        return None;
    }
    let n1 = first.factors.len();
    let n2 = second.factors.len();
    for a in 0..n1 {
        for b in 0..n1 {
            if a == b {
                continue;
            }
            let (Some((fa, x)), Some((fb, y))) =
                (trig_factor(&first.factors[a]), trig_factor(&first.factors[b]))
            else {
                continue;
            };
            if x == y {
                continue;
            }
            for c in 0..n2 {
                for d in 0..n2 {
                    if c == d {
                        continue;
                    }
                    let (Some((fc, u)), Some((fd, v))) =
                        (trig_factor(&second.factors[c]), trig_factor(&second.factors[d]))
                    else {
                        continue;
                    };
                    if u != x || v != y {
                        continue;
                    }
                    if remainder(first, (a, b)) != remainder(second, (c, d)) {
                        continue;
                    }
                    let same = same_coeff(first.coeff, second.coeff);
                    let sum = || x.clone() + y.clone();
                    let diff = || x.clone() - y.clone();
                    use Function::{Cos, Sin};
                    let (coeff, collapsed) = match (fa, fb, fc, fd) {
                        // sin x cos y +/- cos x sin y
                        (Sin, Cos, Cos, Sin) if same => (first.coeff, Expr::sin(sum())),
                        (Sin, Cos, Cos, Sin) => (first.coeff, Expr::sin(diff())),
                        // cos x cos y -/+ sin x sin y
                        (Cos, Cos, Sin, Sin) if same => (first.coeff, Expr::cos(diff())),
                        (Cos, Cos, Sin, Sin) => (first.coeff, Expr::cos(sum())),
                        // sin x sin y +/- cos x cos y
                        (Sin, Sin, Cos, Cos) if same => (first.coeff, Expr::cos(diff())),
                        (Sin, Sin, Cos, Cos) => (-first.coeff, Expr::cos(sum())),
                        _ => continue,
                    };
                    let mut factors = remainder(first, (a, b));
                    factors.push(collapsed);
                    return Some(Term { coeff, factors });
                }
            }
        }
    }
    None
}

fn collapse_trig_sums(expr: &Expr) -> Option<Expr> {
    let mut terms = Vec::new();
    flatten_sum(expr, 1.0, &mut terms);
    if terms.len() < 2 {
        return None;
    }

    let mut changed = false;
    'search: loop {
        for i in 0..terms.len() {
            for j in (i + 1)..terms.len() {
                if let Some(merged) = combine(&terms[i], &terms[j]) {
                    terms[i] = merged;
                    terms.remove(j);
                    changed = true;
                    continue 'search;
                }
            }
        }
        break;
    }

    changed.then(|| rebuild_sum(&terms))
}

fn rebuild_term(term: &Term) -> Expr {
    let magnitude = term.coeff.abs();
    let mut factors = term.factors.iter().cloned();
    let product = match factors.next() {
        None => return Expr::Number(magnitude),
        Some(first) => factors.fold(first, |acc, f| acc * f),
    };
    if same_coeff(magnitude, 1.0) {
        product
    } else {
        Expr::Number(magnitude) * product
    }
}

fn rebuild_sum(terms: &[Term]) -> Expr {
    let mut result: Option<Expr> = None;
    for term in terms.iter().filter(|t| t.coeff != 0.0) {
        let body = rebuild_term(term);
        let negative = term.coeff < 0.0;
        result = Some(match result {
            None if negative => negate(body),
            None => body,
            Some(acc) if negative => acc - body,
            Some(acc) => acc + body,
        });
    }
    result.unwrap_or_else(Expr::zero)
}
