//! Equation inventory: equations partitioned by remaining unknown count.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use super::rank::erank;
use super::unknown::Unknown;
use crate::error::InputError;
use crate::kinematics::{Equation, MatrixEquation};

/// Which collection an equation sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    One,
    Two,
    Many,
}

/// Three disjoint, de-duplicated, ranked collections of equations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EquationInventory {
    /// Exactly one unsolved variable.
    pub one: Vec<Equation>,
    /// Exactly two.
    pub two: Vec<Equation>,
    /// Three or more.
    pub many: Vec<Equation>,
    /// Every distinct equation seen at scan time, in scan order.
    #[serde(skip)]
    source: Vec<Equation>,
    #[serde(skip)]
    unsolved: BTreeSet<String>,
}

impl EquationInventory {
    /// Scan the informative entries of every matrix equation, then the
    /// auxiliary equations.
    pub fn scan(
        matrix_equations: &[MatrixEquation],
        auxiliary: &[Equation],
        unknowns: &[Unknown],
    ) -> Result<Self, InputError> {
        if matrix_equations.is_empty() {
            return Err(InputError::NotEnoughEquations {
                expected: 1,
                got: 0,
            });
        }
        let equations = matrix_equations
            .iter()
            .flat_map(|m| m.entries())
            .chain(auxiliary.iter().cloned());
        Ok(Self::scan_equations(equations, unsolved_symbols(unknowns)))
    }

    /// Build from a flat equation list and the current unsolved set.
    pub fn scan_equations(
        equations: impl IntoIterator<Item = Equation>,
        unsolved: BTreeSet<String>,
    ) -> Self {
        let mut source: Vec<Equation> = Vec::new();
        for eq in equations {
            if !source.contains(&eq) {
                source.push(eq);
            }
        }
        let mut inventory = Self {
            source,
            unsolved,
            ..Self::default()
        };
        inventory.classify();
        inventory
    }

    /// Reclassify after variables changed to solved.
    pub fn repartition(&mut self, unknowns: &[Unknown]) {
        self.unsolved = unsolved_symbols(unknowns);
        self.classify();
        debug!(
            l1 = self.one.len(),
            l2 = self.two.len(),
            l3 = self.many.len(),
            "inventory repartitioned"
        );
    }

    fn classify(&mut self) {
        let (mut one, mut two, mut many) = (Vec::new(), Vec::new(), Vec::new());
        for eq in &self.source {
            match eq.count_unknowns(&self.unsolved) {
                0 => {}
                1 => one.push(eq.clone()),
                2 => two.push(eq.clone()),
                _ => many.push(eq.clone()),
            }
        }
        self.one = erank(one);
        self.two = erank(two);
        self.many = erank(many);
    }

    pub fn is_unknown(&self, symbol: &str) -> bool {
        self.unsolved.contains(symbol)
    }

    pub fn unsolved(&self) -> &BTreeSet<String> {
        &self.unsolved
    }

    pub fn level_of(&self, eq: &Equation) -> Option<Level> {
        if self.one.contains(eq) {
            Some(Level::One)
        } else if self.two.contains(eq) {
            Some(Level::Two)
        } else if self.many.contains(eq) {
            Some(Level::Many)
        } else {
            None
        }
    }

    pub fn level(&self, level: Level) -> &[Equation] {
        match level {
            Level::One => &self.one,
            Level::Two => &self.two,
            Level::Many => &self.many,
        }
    }

    /// Equations mentioning `symbol`: L1 first, then L2, then L3+.
    pub fn equations_with(&self, symbol: &str) -> Vec<Equation> {
        self.one
            .iter()
            .chain(&self.two)
            .chain(&self.many)
            .filter(|eq| eq.mentions(symbol))
            .cloned()
            .collect()
    }

    /// Single-unknown equations whose unknown is `symbol`.
    pub fn solvable_for(&self, symbol: &str) -> Vec<&Equation> {
        self.one.iter().filter(|eq| eq.mentions(symbol)).collect()
    }

    pub fn len(&self) -> usize {
        self.one.len() + self.two.len() + self.many.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn unsolved_symbols(unknowns: &[Unknown]) -> BTreeSet<String> {
    unknowns
        .iter()
        .filter(|u| !u.solved)
        .map(|u| u.symbol.clone())
        .collect()
}
