//! Solution dependency graph.
//!
//! One node per variable. A node's parents are the already-solved variables
//! referenced by the equations its solution was derived from.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use serde::Serialize;
use tracing::debug;

use super::unknown::{Unknown, VariableId};
use crate::error::InvariantViolation;
use crate::kinematics::Equation;
use crate::symbolic::Expr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionNode {
    pub id: VariableId,
    pub symbol: String,
    pub solve_order: u32,
    pub solve_method: Option<String>,
    pub solutions: Vec<Expr>,
    pub assumptions: Vec<String>,
    pub equations: Vec<Equation>,
    /// Variables this node's solution depends on.
    pub parents: BTreeSet<VariableId>,
}

impl SolutionNode {
    pub fn new(symbol: &str) -> Self {
        Self {
            id: VariableId::for_symbol(symbol),
            symbol: symbol.to_string(),
            solve_order: 0,
            solve_method: None,
            solutions: Vec::new(),
            assumptions: Vec::new(),
            equations: Vec::new(),
            parents: BTreeSet::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_solved(&self) -> bool {
        self.solve_order > 0
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SolutionGraph {
    pub nodes: HashMap<VariableId, SolutionNode>,
    /// Cached topological order, parents first.
    pub sort_order: Vec<VariableId>,
}

impl SolutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one node per unknown up front.
    pub fn generate_nodes(&mut self, unknowns: &[Unknown]) {
        for u in unknowns {
            self.ensure_node(&u.symbol);
        }
    }

    /// Find the node for `symbol`, creating it lazily.
    pub fn ensure_node(&mut self, symbol: &str) -> VariableId {
        let id = VariableId::for_symbol(symbol);
        if !self.nodes.contains_key(&id) {
            self.sort_order.clear();
            self.nodes.insert(id, SolutionNode::new(symbol));
        }
        id
    }

    pub fn get(&self, id: VariableId) -> Option<&SolutionNode> {
        self.nodes.get(&id)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&SolutionNode> {
        self.nodes.get(&VariableId::for_symbol(symbol))
    }

    /// Copy a just-solved unknown into its node and detect its parents.
    pub fn commit(
        &mut self,
        unknown: &Unknown,
        unknowns: &[Unknown],
    ) -> Result<(), InvariantViolation> {
        let node = self
            .nodes
            .get_mut(&unknown.id)
            .ok_or_else(|| InvariantViolation::MissingNode(unknown.symbol.clone()))?;

        node.solve_order = unknown.solve_order;
        node.solve_method = unknown.solve_method.clone();
        node.solutions = unknown.solutions.clone();
        node.assumptions = unknown.assumptions.clone();
        node.equations.extend(unknown.used_equations());

        self.detect_parents(unknown.id, unknowns)?;
        self.sort_order.clear();
        Ok(())
    }

    /// Parents: other solved variables named in the node's equations.
    fn detect_parents(
        &mut self,
        id: VariableId,
        unknowns: &[Unknown],
    ) -> Result<(), InvariantViolation> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| InvariantViolation::MissingNode(id.to_string()))?;
        let mut symbols = BTreeSet::new();
        for eq in &node.equations {
            symbols.extend(eq.symbols());
        }

        let mut parents = BTreeSet::new();
        for u in unknowns {
            if u.id == id || !u.solved || !symbols.contains(&u.symbol) {
                continue;
            }
            if u.solve_order >= node.solve_order {
                return Err(InvariantViolation::ForwardReference {
                    child: node.symbol.clone(),
                    child_order: node.solve_order,
                    parent: u.symbol.clone(),
                    parent_order: u.solve_order,
                });
            }
            parents.insert(u.id);
        }
        debug!(symbol = %node.symbol, parents = parents.len(), "parents detected");

        if let Some(node) = self.nodes.get_mut(&id) {
            node.parents = parents;
        }
        Ok(())
    }

    /// Topological sort, parents before children.
    /// Returns the order, or the symbols along a cycle.
    pub fn sort(&mut self) -> Result<Vec<VariableId>, InvariantViolation> {
        let mut sorted = Vec::new();
        let mut visited = HashSet::new();
        let mut temp_visited = Vec::new();

        // deterministic start order
        let mut ids: Vec<&SolutionNode> = self.nodes.values().collect();
        ids.sort_by(|a, b| (a.solve_order, &a.symbol).cmp(&(b.solve_order, &b.symbol)));
        let ids: Vec<VariableId> = ids.into_iter().map(|n| n.id).collect();

        for id in ids {
            if !visited.contains(&id) {
                if let Err(cycle) = self.visit(id, &mut visited, &mut temp_visited, &mut sorted) {
                    let path = cycle
                        .iter()
                        .filter_map(|id| self.nodes.get(id).map(|n| n.symbol.clone()))
                        .collect();
                    return Err(InvariantViolation::Cycle { path });
                }
            }
        }

        self.sort_order = sorted.clone();
        Ok(sorted)
    }

    fn visit(
        &self,
        node_id: VariableId,
        visited: &mut HashSet<VariableId>,
        temp_visited: &mut Vec<VariableId>,
        sorted: &mut Vec<VariableId>,
    ) -> Result<(), Vec<VariableId>> {
        if let Some(pos) = temp_visited.iter().position(|id| *id == node_id) {
            // Cycle detected
            let mut cycle = temp_visited[pos..].to_vec();
            cycle.push(node_id);
            return Err(cycle);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_visited.push(node_id);

        if let Some(node) = self.nodes.get(&node_id) {
            for parent in &node.parents {
                self.visit(*parent, visited, temp_visited, sorted)?;
            }
        }

        temp_visited.pop();
        visited.insert(node_id);
        sorted.push(node_id);
        Ok(())
    }

    pub fn roots(&self) -> Vec<&SolutionNode> {
        self.solved_nodes().into_iter().filter(|n| n.is_root()).collect()
    }

    /// Nodes that depend on `id` (its children).
    pub fn get_dependents(&self, id: VariableId) -> Vec<VariableId> {
        let mut dependents: Vec<&SolutionNode> = self
            .nodes
            .values()
            .filter(|n| n.parents.contains(&id))
            .collect();
        dependents.sort_by_key(|n| n.solve_order);
        dependents.into_iter().map(|n| n.id).collect()
    }

    /// `(child, parent)` pairs, children in solve order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges = Vec::new();
        for child in self.solved_nodes() {
            let mut parents: Vec<&SolutionNode> = child
                .parents
                .iter()
                .filter_map(|p| self.nodes.get(p))
                .collect();
            parents.sort_by_key(|p| p.solve_order);
            for parent in parents {
                edges.push((child.symbol.as_str(), parent.symbol.as_str()));
            }
        }
        edges
    }

    /// Solved nodes by ascending solve order.
    pub fn solved_nodes(&self) -> Vec<&SolutionNode> {
        let mut nodes: Vec<&SolutionNode> = self.nodes.values().filter(|n| n.is_solved()).collect();
        nodes.sort_by_key(|n| n.solve_order);
        nodes
    }

    /// Plain-text listing of solutions and dependency edges.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in self.solved_nodes() {
            let method = node.solve_method.as_deref().unwrap_or("?");
            let _ = writeln!(out, "{}. {}  [{}]", node.solve_order, node.symbol, method);
            for (k, solution) in node.solutions.iter().enumerate() {
                let _ = writeln!(out, "     {}[{}] = {}", node.symbol, k, solution);
            }
            for assumption in &node.assumptions {
                let _ = writeln!(out, "     assuming {}", assumption);
            }
        }
        let edges = self.edges();
        if !edges.is_empty() {
            let _ = writeln!(out, "depends on:");
            for (child, parent) in edges {
                let _ = writeln!(out, "  {} -> {}", child, parent);
            }
        }
        out
    }
}
