use thiserror::Error;

use crate::symbolic::{EvalError, ParseError};

/// Top-level error type for ik-core.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// Malformed manipulator input. Fatal at setup; the engine refuses to start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Not enough matrix equations: expected at least {expected}, got {got}")]
    NotEnoughEquations { expected: usize, got: usize },

    #[error("No joint variable found in the first DH row")]
    NoVariableInFirstRow,

    #[error("Manipulator declares no joint variables")]
    NoJointVariables,

    #[error("Variable declared twice: {0}")]
    DuplicateVariable(String),

    #[error("Bad matrix shape: {0}")]
    BadMatrixShape(String),

    #[error("Expression error: {0}")]
    Parse(#[from] ParseError),
}

/// A collaborator broke the solving contract. The run halts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("Strategy '{method}' reported {symbol} solved with no solutions")]
    EmptySolutions { symbol: String, method: String },

    #[error("No solution graph node for solved variable {0}")]
    MissingNode(String),

    #[error("Cycle in solution graph: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Variable {0} is already solved")]
    AlreadySolved(String),

    #[error(
        "{child} (order {child_order}) depends on {parent} solved later (order {parent_order})"
    )]
    ForwardReference {
        child: String,
        child_order: u32,
        parent: String,
        parent_order: u32,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
