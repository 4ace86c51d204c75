use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::inventory::EquationInventory;
use super::rank::erank;
use crate::kinematics::{Equation, JointKind, JointVariable, MatrixEquation};
use crate::symbolic::Expr;

/// Stable identity of a variable, derived from its symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    pub fn for_symbol(symbol: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, symbol.as_bytes()))
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Revolute,
    Prismatic,
    /// Sum or difference of two adjacent joint angles.
    Compound,
}

impl VariableKind {
    /// Angles compare modulo a full turn.
    pub fn is_angular(&self) -> bool {
        matches!(self, Self::Revolute | Self::Compound)
    }
}

impl From<JointKind> for VariableKind {
    fn from(kind: JointKind) -> Self {
        match kind {
            JointKind::Revolute => Self::Revolute,
            JointKind::Prismatic => Self::Prismatic,
        }
    }
}

/// One variable to be solved, with its solution state.
///
/// `solved` holds iff `solutions` is non-empty and `solve_order > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unknown {
    pub id: VariableId,
    pub symbol: String,
    pub kind: VariableKind,
    pub solved: bool,
    /// 0 until solved; then the position in the global solve sequence.
    pub solve_order: u32,
    /// Ranked equations mentioning this variable.
    #[serde(skip)]
    pub candidates: Vec<Equation>,
    pub solve_method: Option<String>,
    pub solutions: Vec<Expr>,
    pub assumptions: Vec<String>,
    pub primary_equation: Option<Equation>,
    pub secondary_equation: Option<Equation>,
}

impl Unknown {
    pub fn new(symbol: &str, kind: VariableKind) -> Self {
        Self {
            id: VariableId::for_symbol(symbol),
            symbol: symbol.to_string(),
            kind,
            solved: false,
            solve_order: 0,
            candidates: Vec::new(),
            solve_method: None,
            solutions: Vec::new(),
            assumptions: Vec::new(),
            primary_equation: None,
            secondary_equation: None,
        }
    }

    pub fn joint(variable: &JointVariable) -> Self {
        Self::new(&variable.symbol, variable.kind.into())
    }

    pub fn compound(symbol: &str) -> Self {
        Self::new(symbol, VariableKind::Compound)
    }

    pub fn is_solved(&self) -> bool {
        self.solved && !self.solutions.is_empty() && self.solve_order > 0
    }

    /// Collect every informative matrix entry mentioning this variable.
    pub fn scan(&mut self, matrix_equations: &[MatrixEquation]) {
        let found = matrix_equations
            .iter()
            .flat_map(|m| m.entries())
            .filter(|eq| eq.mentions(&self.symbol))
            .collect();
        self.candidates = erank(found);
    }

    /// Re-derive candidates from the inventory: one-unknown equations first.
    pub fn refresh_candidates(&mut self, inventory: &EquationInventory) {
        self.candidates = inventory.equations_with(&self.symbol);
    }

    /// Record a strategy's result. The engine decides whether to commit it.
    pub fn propose(
        &mut self,
        method: &str,
        solutions: Vec<Expr>,
        assumptions: Vec<String>,
        primary: Equation,
        secondary: Option<Equation>,
    ) {
        self.solve_method = Some(method.to_string());
        self.solutions = solutions;
        self.assumptions = assumptions;
        self.primary_equation = Some(primary);
        self.secondary_equation = secondary;
    }

    /// Equations the accepted solution was derived from.
    pub fn used_equations(&self) -> Vec<Equation> {
        self.primary_equation
            .iter()
            .chain(self.secondary_equation.iter())
            .cloned()
            .collect()
    }

    pub fn mark_solved(&mut self, order: u32) {
        self.solved = true;
        self.solve_order = order;
    }

    /// Discard a partial attempt.
    pub fn reset_attempt(&mut self) {
        self.solve_method = None;
        self.solutions.clear();
        self.assumptions.clear();
        self.primary_equation = None;
        self.secondary_equation = None;
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
