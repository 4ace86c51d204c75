//! Structural pattern matching with named wildcards.
//!
//! A [`Pattern`] is an expression template. Wildcards bind to sub-expressions;
//! a wildcard name used twice must bind to structurally equal expressions.

use std::collections::BTreeMap;

use super::expr::{BinaryOperator, Expr, Function, UnaryOperator};

pub type Bindings = BTreeMap<String, Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Matches any expression.
    Wild(String),
    /// Matches a bare symbol only.
    WildSymbol(String),
    Call(Function, Vec<Pattern>),
    Binary(BinaryOperator, Box<Pattern>, Box<Pattern>),
    /// `first + sign*second`. The sign binds as `Number(1)` or `Number(-1)`
    /// and accepts `a + b`, `a - b`, `a + (-b)` and `a + (-1)*b`.
    SignedSum {
        first: Box<Pattern>,
        sign: String,
        second: Box<Pattern>,
    },
}

/// One matching sub-expression and its bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Match<'a> {
    pub expr: &'a Expr,
    pub bindings: Bindings,
}

impl Pattern {
    pub fn wild(name: &str) -> Self {
        Pattern::Wild(name.to_string())
    }

    pub fn wild_symbol(name: &str) -> Self {
        Pattern::WildSymbol(name.to_string())
    }

    pub fn call(func: Function, args: Vec<Pattern>) -> Self {
        Pattern::Call(func, args)
    }

    pub fn signed_sum(first: Pattern, sign: &str, second: Pattern) -> Self {
        Pattern::SignedSum {
            first: Box::new(first),
            sign: sign.to_string(),
            second: Box::new(second),
        }
    }

    /// Match at the root of `expr` only.
    pub fn match_expr(&self, expr: &Expr) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        self.match_into(expr, &mut bindings).then_some(bindings)
    }

    fn match_into(&self, expr: &Expr, bindings: &mut Bindings) -> bool {
        match self {
            Pattern::Wild(name) => bind(bindings, name, expr),
            Pattern::WildSymbol(name) => {
                matches!(expr, Expr::Symbol(_)) && bind(bindings, name, expr)
            }
            Pattern::Call(func, args) => match expr {
                Expr::FnCall {
                    func: actual,
                    args: actual_args,
                } if actual == func && actual_args.len() == args.len() => args
                    .iter()
                    .zip(actual_args)
                    .all(|(p, e)| p.match_into(e, bindings)),
                _ => false,
            },
            Pattern::Binary(op, left, right) => match expr {
                Expr::BinaryOp {
                    op: actual,
                    left: l,
                    right: r,
                } if actual == op => left.match_into(l, bindings) && right.match_into(r, bindings),
                _ => false,
            },
            Pattern::SignedSum {
                first,
                sign,
                second,
            } => {
                for (a, s, b) in signed_sum_readings(expr) {
                    let mut trial = bindings.clone();
                    if first.match_into(a, &mut trial)
                        && bind(&mut trial, sign, &Expr::Number(s))
                        && second.match_into(b, &mut trial)
                    {
                        *bindings = trial;
                        return true;
                    }
                }
                false
            }
        }
    }
}

fn bind(bindings: &mut Bindings, name: &str, expr: &Expr) -> bool {
    match bindings.get(name) {
        Some(existing) => existing == expr,
        None => {
            bindings.insert(name.to_string(), expr.clone());
            true
        }
    }
}

/// Ways to read `expr` as `a + s*b`.
fn signed_sum_readings(expr: &Expr) -> Vec<(&Expr, f64, &Expr)> {
    let Expr::BinaryOp { op, left, right } = expr else {
        return Vec::new();
    };
    match op {
        BinaryOperator::Sub => vec![(left.as_ref(), -1.0, right.as_ref())],
        BinaryOperator::Add => match right.as_ref() {
            Expr::UnaryOp {
                op: UnaryOperator::Neg,
                operand,
            } => vec![(left.as_ref(), -1.0, operand.as_ref())],
            Expr::BinaryOp {
                op: BinaryOperator::Mul,
                left: factor,
                right: rest,
            } if factor.as_number() == Some(-1.0) => {
                vec![(left.as_ref(), -1.0, rest.as_ref())]
            }
            _ => vec![(left.as_ref(), 1.0, right.as_ref())],
        },
        _ => Vec::new(),
    }
}

/// All sub-expressions of `expr` matching `pattern`, in pre-order.
pub fn find_matches<'a>(expr: &'a Expr, pattern: &Pattern) -> Vec<Match<'a>> {
    let mut found = Vec::new();
    expr.visit(&mut |e| {
        if let Some(bindings) = pattern.match_expr(e) {
            found.push(Match { expr: e, bindings });
        }
    });
    found
}
