//! Symbolic algebra used by the solver.
//!
//! Provides:
//! - An immutable expression tree with structural equality and substitution
//! - A text parser and a numeric evaluator
//! - Simplification that collapses angle-sum products
//! - Wildcard pattern matching
//! - Linear isolation of a symbol

pub mod expr;
pub mod parser;
pub mod evaluator;
pub mod simplify;
pub mod pattern;
pub mod linear;


pub use expr::{BinaryOperator, Constant, Expr, Function, UnaryOperator};
pub use parser::{parse_expression, ParseError};
pub use evaluator::{evaluate, Bindings, EvalError};
pub use simplify::{negate, simplify};
pub use pattern::{find_matches, Match, Pattern};
pub use linear::{linear_in, solve_linear};
