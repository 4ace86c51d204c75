//! Numeric evaluation of expressions against a symbol binding.

use std::collections::BTreeMap;

use thiserror::Error;

use super::expr::{BinaryOperator, Constant, Expr, Function, UnaryOperator};

/// Slack allowed on the `[-1, 1]` domain of asin/acos before the argument is rejected.
const DOMAIN_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{func}() takes {expected} argument(s), got {got}")]
    ArityMismatch {
        func: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Symbol values used during evaluation.
pub type Bindings = BTreeMap<String, f64>;

pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::Symbol(name) => bindings
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedSymbol(name.clone())),

        Expr::Constant(Constant::Pi) => Ok(std::f64::consts::PI),

        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, bindings)?;
            let r = evaluate(right, bindings)?;

            match op {
                BinaryOperator::Add => Ok(l + r),
                BinaryOperator::Sub => Ok(l - r),
                BinaryOperator::Mul => Ok(l * r),
                BinaryOperator::Div => {
                    if r.abs() < 1e-15 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
                BinaryOperator::Pow => Ok(l.powf(r)),
            }
        }

        Expr::UnaryOp { op, operand } => {
            let val = evaluate(operand, bindings)?;
            match op {
                UnaryOperator::Neg => Ok(-val),
            }
        }

        Expr::FnCall { func, args } => {
            if args.len() != func.arity() {
                return Err(EvalError::ArityMismatch {
                    func: func.name(),
                    expected: func.arity(),
                    got: args.len(),
                });
            }
            let values = args
                .iter()
                .map(|a| evaluate(a, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            apply(*func, &values)
        }
    }
}

fn apply(func: Function, values: &[f64]) -> Result<f64, EvalError> {
    let val = values[0];
    match func {
        Function::Sin => Ok(val.sin()),
        Function::Cos => Ok(val.cos()),
        Function::Tan => Ok(val.tan()),
        Function::Asin => unit_domain(val, "asin").map(f64::asin),
        Function::Acos => unit_domain(val, "acos").map(f64::acos),
        Function::Atan => Ok(val.atan()),
        Function::Atan2 => Ok(val.atan2(values[1])),
        Function::Sqrt => {
            if val < 0.0 {
                Err(EvalError::InvalidArgument(
                    "sqrt of negative number".to_string(),
                ))
            } else {
                Ok(val.sqrt())
            }
        }
        Function::Abs => Ok(val.abs()),
    }
}

fn unit_domain(val: f64, name: &str) -> Result<f64, EvalError> {
    if val.abs() > 1.0 + DOMAIN_SLACK {
        Err(EvalError::InvalidArgument(format!(
            "{} argument must be in [-1, 1], got {}",
            name, val
        )))
    } else {
        Ok(val.clamp(-1.0, 1.0))
    }
}
