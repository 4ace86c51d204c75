//! Symbolic expression tree.
//!
//! Expressions are immutable values: every transformation returns a new tree.
//! Equality is structural, so `a + b` and `b + a` are different expressions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::parser::{parse_expression, ParseError};

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Named symbol (joint variable, DH parameter, pose entry...)
    Symbol(String),
    /// Built-in constant
    Constant(Constant),
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (negation)
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Function call
    FnCall { func: Function, args: Vec<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
}

/// Functions understood by the parser, the evaluator and the strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    Abs,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "asin" => Some(Self::Asin),
            "acos" => Some(Self::Acos),
            "atan" => Some(Self::Atan),
            "atan2" => Some(Self::Atan2),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Atan2 => 2,
            _ => 1,
        }
    }
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn sym(name: &str) -> Self {
        Expr::Symbol(name.to_string())
    }

    pub fn zero() -> Self {
        Expr::Number(0.0)
    }

    pub fn one() -> Self {
        Expr::Number(1.0)
    }

    pub fn pi() -> Self {
        Expr::Constant(Constant::Pi)
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(func: Function, args: Vec<Expr>) -> Self {
        Expr::FnCall { func, args }
    }

    pub fn sin(arg: Expr) -> Self {
        Self::call(Function::Sin, vec![arg])
    }

    pub fn cos(arg: Expr) -> Self {
        Self::call(Function::Cos, vec![arg])
    }

    pub fn asin(arg: Expr) -> Self {
        Self::call(Function::Asin, vec![arg])
    }

    pub fn acos(arg: Expr) -> Self {
        Self::call(Function::Acos, vec![arg])
    }

    pub fn atan2(y: Expr, x: Expr) -> Self {
        Self::call(Function::Atan2, vec![y, x])
    }

    pub fn abs(arg: Expr) -> Self {
        Self::call(Function::Abs, vec![arg])
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Self::binary(BinaryOperator::Pow, self, exponent)
    }

    /// Parse from text. Shorthand for [`parse_expression`].
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parse_expression(input)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Number(n) if *n == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Number(n) if *n == 1.0)
    }

    /// Immediate children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Number(_) | Expr::Symbol(_) | Expr::Constant(_) => Vec::new(),
            Expr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::UnaryOp { operand, .. } => vec![operand.as_ref()],
            Expr::FnCall { args, .. } => args.iter().collect(),
        }
    }

    /// Visit this node and every descendant in pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Operation count: one per operator or function node.
    pub fn count_ops(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |e| {
            if matches!(
                e,
                Expr::BinaryOp { .. } | Expr::UnaryOp { .. } | Expr::FnCall { .. }
            ) {
                count += 1;
            }
        });
        count
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Symbol(name) = e {
                symbols.insert(name.clone());
            }
        });
        symbols
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        match self {
            Expr::Symbol(s) => s == name,
            _ => self.children().iter().any(|c| c.has_symbol(name)),
        }
    }

    /// Does `target` occur anywhere in this tree (including the root)?
    pub fn contains(&self, target: &Expr) -> bool {
        self == target || self.children().iter().any(|c| c.contains(target))
    }

    /// Replace every occurrence of `target` with `replacement`.
    ///
    /// Matching is structural and outermost-first; a replaced subtree is not
    /// searched again.
    pub fn substitute(&self, target: &Expr, replacement: &Expr) -> Expr {
        if self == target {
            return replacement.clone();
        }
        self.map_children(|child| child.substitute(target, replacement))
    }

    /// Rebuild this node with `f` applied to each child.
    pub fn map_children(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Number(_) | Expr::Symbol(_) | Expr::Constant(_) => self.clone(),
            Expr::BinaryOp { op, left, right } => Expr::binary(*op, f(left), f(right)),
            Expr::UnaryOp { op, operand } => Expr::UnaryOp {
                op: *op,
                operand: Box::new(f(operand)),
            },
            Expr::FnCall { func, args } => Expr::FnCall {
                func: *func,
                args: args.iter().map(f).collect(),
            },
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::BinaryOp { op, .. } => match op {
                BinaryOperator::Add | BinaryOperator::Sub => 1,
                BinaryOperator::Mul | BinaryOperator::Div => 2,
                BinaryOperator::Pow => 4,
            },
            Expr::UnaryOp { .. } => 3,
            Expr::Number(n) if *n < 0.0 => 3,
            _ => 5,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Constant(Constant::Pi) => write!(f, "pi"),
            Expr::BinaryOp { op, left, right } => {
                let (symbol, prec) = match op {
                    BinaryOperator::Add => (" + ", 1),
                    BinaryOperator::Sub => (" - ", 1),
                    BinaryOperator::Mul => ("*", 2),
                    BinaryOperator::Div => ("/", 2),
                    BinaryOperator::Pow => ("^", 4),
                };
                match op {
                    // right associative
                    BinaryOperator::Pow => {
                        write_operand(f, left, prec + 1)?;
                        write!(f, "{}", symbol)?;
                        write_operand(f, right, prec)
                    }
                    BinaryOperator::Add | BinaryOperator::Mul => {
                        write_operand(f, left, prec)?;
                        write!(f, "{}", symbol)?;
                        write_operand(f, right, prec)
                    }
                    BinaryOperator::Sub | BinaryOperator::Div => {
                        write_operand(f, left, prec)?;
                        write!(f, "{}", symbol)?;
                        write_operand(f, right, prec + 1)
                    }
                }
            }
            Expr::UnaryOp {
                op: UnaryOperator::Neg,
                operand,
            } => {
                write!(f, "-")?;
                write_operand(f, operand, 5)
            }
            Expr::FnCall { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Expr> for String {
    fn from(expr: Expr) -> Self {
        expr.to_string()
    }
}

impl TryFrom<String> for Expr {
    type Error = ParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        parse_expression(&text)
    }
}

impl std::str::FromStr for Expr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression(s)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOperator::Add, self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOperator::Sub, self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOperator::Mul, self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOperator::Div, self, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand: Box::new(self),
        }
    }
}
