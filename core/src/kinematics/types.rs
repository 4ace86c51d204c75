use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::compound::{CompoundEntry, CompoundTable};
use crate::error::InputError;
use crate::symbolic::{Expr, ParseError};

/// Only the upper three rows of a homogeneous transform carry information.
pub const INFORMATIVE_ROWS: usize = 3;

/// `lhs = rhs`. Equality is structural on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Equation {
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }

    pub fn parse(lhs: &str, rhs: &str) -> Result<Self, ParseError> {
        Ok(Self::new(Expr::parse(lhs)?, Expr::parse(rhs)?))
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        let mut symbols = self.lhs.free_symbols();
        symbols.extend(self.rhs.free_symbols());
        symbols
    }

    pub fn mentions(&self, symbol: &str) -> bool {
        self.lhs.has_symbol(symbol) || self.rhs.has_symbol(symbol)
    }

    /// Distinct members of `unknowns` appearing on either side.
    pub fn unknowns_in(&self, unknowns: &BTreeSet<String>) -> Vec<String> {
        self.symbols()
            .into_iter()
            .filter(|s| unknowns.contains(s))
            .collect()
    }

    pub fn count_unknowns(&self, unknowns: &BTreeSet<String>) -> usize {
        self.unknowns_in(unknowns).len()
    }

    /// Ranking score: operation count of both sides.
    pub fn complexity(&self) -> usize {
        self.lhs.count_ops() + self.rhs.count_ops()
    }

    pub fn substitute(&self, target: &Expr, replacement: &Expr) -> Self {
        Self::new(
            self.lhs.substitute(target, replacement),
            self.rhs.substitute(target, replacement),
        )
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// A 4x4 homogeneous-transform equation `lhs = rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEquation {
    pub lhs: Matrix4<Expr>,
    pub rhs: Matrix4<Expr>,
}

impl MatrixEquation {
    pub fn new(lhs: Matrix4<Expr>, rhs: Matrix4<Expr>) -> Self {
        Self { lhs, rhs }
    }

    /// Standard pose target: `r_11..r_33` rotation, `px py pz` translation.
    pub fn pose_target() -> Matrix4<Expr> {
        Matrix4::from_fn(|i, j| match (i, j) {
            (3, 3) => Expr::one(),
            (3, _) => Expr::zero(),
            (_, 3) => Expr::sym(["px", "py", "pz"][i]),
            _ => Expr::Symbol(format!("r_{}{}", i + 1, j + 1)),
        })
    }

    /// `pose_target() = rhs`
    pub fn with_pose_target(rhs: Matrix4<Expr>) -> Self {
        Self::new(Self::pose_target(), rhs)
    }

    pub fn entry(&self, i: usize, j: usize) -> Equation {
        Equation::new(self.lhs[(i, j)].clone(), self.rhs[(i, j)].clone())
    }

    pub fn set_entry(&mut self, i: usize, j: usize, eq: Equation) {
        self.lhs[(i, j)] = eq.lhs;
        self.rhs[(i, j)] = eq.rhs;
    }

    /// Scalar equations of the informative rows, row-major.
    pub fn entries(&self) -> impl Iterator<Item = Equation> + '_ {
        (0..INFORMATIVE_ROWS).flat_map(move |i| (0..4).map(move |j| self.entry(i, j)))
    }
}

/// One Denavit-Hartenberg row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhRow {
    pub alpha: Expr,
    pub a: Expr,
    pub d: Expr,
    pub theta: Expr,
}

impl DhRow {
    pub fn mentions(&self, symbol: &str) -> bool {
        [&self.alpha, &self.a, &self.d, &self.theta]
            .iter()
            .any(|e| e.has_symbol(symbol))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Revolute,
    Prismatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointVariable {
    pub symbol: String,
    pub kind: JointKind,
}

impl JointVariable {
    pub fn revolute(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: JointKind::Revolute,
        }
    }

    pub fn prismatic(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: JointKind::Prismatic,
        }
    }
}

/// A manipulator with precomputed forward kinematics.
#[derive(Debug, Clone, PartialEq)]
pub struct Manipulator {
    pub name: String,
    pub dh: Vec<DhRow>,
    pub variables: Vec<JointVariable>,
    /// Numeric values of constant parameters (link lengths...), used for verification.
    pub parameters: BTreeMap<String, f64>,
    pub matrix_equations: Vec<MatrixEquation>,
    pub compounds: CompoundTable,
}

impl Manipulator {
    /// Build with the default adjacent-pair compound table.
    pub fn new(
        name: &str,
        variables: Vec<JointVariable>,
        matrix_equations: Vec<MatrixEquation>,
    ) -> Self {
        let compounds = CompoundTable::adjacent(&symbols_of(&variables));
        Self {
            name: name.to_string(),
            dh: Vec::new(),
            variables,
            parameters: BTreeMap::new(),
            matrix_equations,
            compounds,
        }
    }

    pub fn joint(&self, symbol: &str) -> Option<&JointVariable> {
        self.variables.iter().find(|v| v.symbol == symbol)
    }

    /// Check the input is solvable at all. Returns the index of the last DH
    /// row carrying a joint variable (0 without a DH table).
    pub fn validate(&self, min_matrix_equations: usize) -> Result<usize, InputError> {
        if self.variables.is_empty() {
            return Err(InputError::NoJointVariables);
        }
        let mut seen = BTreeSet::new();
        for v in &self.variables {
            if !seen.insert(v.symbol.as_str()) {
                return Err(InputError::DuplicateVariable(v.symbol.clone()));
            }
        }
        let first = match self.matrix_equations.first() {
            Some(first) if self.matrix_equations.len() >= min_matrix_equations => first,
            _ => {
                return Err(InputError::NotEnoughEquations {
                    expected: min_matrix_equations.max(1),
                    got: self.matrix_equations.len(),
                })
            }
        };

        if self.dh.is_empty() {
            // first structural row of the first transform
            let has_variable = (0..4).any(|j| {
                let eq = first.entry(0, j);
                self.variables.iter().any(|v| eq.mentions(&v.symbol))
            });
            if !has_variable {
                return Err(InputError::NoVariableInFirstRow);
            }
            return Ok(0);
        }

        if !self.variables.iter().any(|v| self.dh[0].mentions(&v.symbol)) {
            return Err(InputError::NoVariableInFirstRow);
        }
        let max_index = self
            .dh
            .iter()
            .rposition(|row| self.variables.iter().any(|v| row.mentions(&v.symbol)))
            .unwrap_or(0);
        debug!(manipulator = %self.name, max_index, "chain span");
        Ok(max_index)
    }
}

fn symbols_of(variables: &[JointVariable]) -> Vec<String> {
    variables.iter().map(|v| v.symbol.clone()).collect()
}

// ---------------------------------------------------------------------------
// JSON input
// ---------------------------------------------------------------------------

/// One matrix equation as text rows. A missing `lhs` means the pose target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEquationSpec {
    #[serde(default)]
    pub lhs: Option<Vec<Vec<String>>>,
    pub rhs: Vec<Vec<String>>,
}

/// JSON form of a [`Manipulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulatorSpec {
    pub name: String,
    /// Rows of `[alpha, a, d, theta]`.
    #[serde(default)]
    pub dh: Vec<[String; 4]>,
    pub variables: Vec<JointVariable>,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub compounds: Option<Vec<CompoundEntry>>,
    pub equations: Vec<MatrixEquationSpec>,
}

fn parse_matrix(rows: &[Vec<String>]) -> Result<Matrix4<Expr>, InputError> {
    if rows.len() != 3 && rows.len() != 4 {
        return Err(InputError::BadMatrixShape(format!(
            "expected 3 or 4 rows, got {}",
            rows.len()
        )));
    }
    let mut m = MatrixEquation::pose_target();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != 4 {
            return Err(InputError::BadMatrixShape(format!(
                "row {} has {} entries, expected 4",
                i,
                row.len()
            )));
        }
        for (j, text) in row.iter().enumerate() {
            m[(i, j)] = Expr::parse(text)?;
        }
    }
    Ok(m)
}

impl TryFrom<ManipulatorSpec> for Manipulator {
    type Error = InputError;

    fn try_from(spec: ManipulatorSpec) -> Result<Self, Self::Error> {
        let dh = spec
            .dh
            .iter()
            .map(|[alpha, a, d, theta]| {
                Ok(DhRow {
                    alpha: Expr::parse(alpha)?,
                    a: Expr::parse(a)?,
                    d: Expr::parse(d)?,
                    theta: Expr::parse(theta)?,
                })
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        let matrix_equations = spec
            .equations
            .iter()
            .map(|eq| {
                let lhs = match &eq.lhs {
                    Some(rows) => parse_matrix(rows)?,
                    None => MatrixEquation::pose_target(),
                };
                Ok(MatrixEquation::new(lhs, parse_matrix(&eq.rhs)?))
            })
            .collect::<Result<Vec<_>, InputError>>()?;

        let compounds = match spec.compounds {
            Some(entries) => CompoundTable::new(entries),
            None => CompoundTable::adjacent(&symbols_of(&spec.variables)),
        };

        Ok(Self {
            name: spec.name,
            dh,
            variables: spec.variables,
            parameters: spec.parameters,
            matrix_equations,
            compounds,
        })
    }
}
