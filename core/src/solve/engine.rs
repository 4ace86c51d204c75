//! Solving control loop.
//!
//! Each iteration runs a fixed sequence of steps over one shared
//! [`SolveContext`]: select the next unsolved variable, offer it to the
//! strategies, then check for completion. The context's `complete` field is
//! the only termination signal; step statuses are informational.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::graph::{SolutionGraph, SolutionNode};
use super::inventory::{EquationInventory, Level};
use super::strategies::default_strategies;
use super::strategy::{Attempt, SolvingStrategy};
use super::sum_of_angles::SumOfAngles;
use super::unknown::Unknown;
use crate::config::{CompletionPolicy, EngineConfig};
use crate::error::{IkError, InvariantViolation};
use crate::kinematics::{Equation, Manipulator, MatrixEquation};

/// Behavior-tree style step result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failure,
}

/// State shared by the steps of the control loop.
#[derive(Debug, Clone)]
pub struct SolveContext {
    pub unknowns: Vec<Unknown>,
    pub inventory: EquationInventory,
    pub graph: SolutionGraph,
    pub matrix_equations: Vec<MatrixEquation>,
    pub auxiliary: Vec<Equation>,
    /// Rotating selection cursor into `unknowns`.
    pub cursor: usize,
    /// Index of the variable exposed by the last selection.
    pub current: Option<usize>,
    pub solve_counter: u32,
    /// Failed attempts per variable since the last commit, indexed like
    /// `unknowns`.
    pub failures: Vec<usize>,
    pub complete: bool,
}

impl SolveContext {
    pub fn new(
        unknowns: Vec<Unknown>,
        inventory: EquationInventory,
        matrix_equations: Vec<MatrixEquation>,
        auxiliary: Vec<Equation>,
    ) -> Self {
        let mut graph = SolutionGraph::new();
        graph.generate_nodes(&unknowns);
        let failures = vec![0; unknowns.len()];
        Self {
            unknowns,
            inventory,
            graph,
            matrix_equations,
            auxiliary,
            cursor: 0,
            current: None,
            solve_counter: 0,
            failures,
            complete: false,
        }
    }

    pub fn unknown(&self, symbol: &str) -> Option<&Unknown> {
        self.unknowns.iter().find(|u| u.symbol == symbol)
    }

    pub fn unsolved_count(&self) -> usize {
        self.unknowns.iter().filter(|u| !u.solved).count()
    }

    /// Every unsolved variable has failed at least `passes` times since the
    /// last commit.
    pub fn exhausted(&self, passes: usize) -> bool {
        self.unknowns
            .iter()
            .enumerate()
            .filter(|(_, u)| !u.solved)
            .all(|(index, _)| self.failures.get(index).copied().unwrap_or(0) >= passes)
    }

    /// Record a successful attempt on `unknowns[index]`.
    pub fn commit(&mut self, index: usize) -> Result<(), IkError> {
        let unknown = self
            .unknowns
            .get(index)
            .ok_or_else(|| InvariantViolation::MissingNode(format!("#{}", index)))?;
        if unknown.solved {
            return Err(InvariantViolation::AlreadySolved(unknown.symbol.clone()).into());
        }
        if unknown.solutions.is_empty() {
            return Err(InvariantViolation::EmptySolutions {
                symbol: unknown.symbol.clone(),
                method: unknown.solve_method.clone().unwrap_or_default(),
            }
            .into());
        }

        self.solve_counter += 1;
        let order = self.solve_counter;
        let unknown = &mut self.unknowns[index];
        unknown.mark_solved(order);
        let snapshot = unknown.clone();

        self.graph.ensure_node(&snapshot.symbol);
        self.graph.commit(&snapshot, &self.unknowns)?;
        self.graph.sort()?;

        self.inventory.repartition(&self.unknowns);
        for u in self.unknowns.iter_mut().filter(|u| !u.solved) {
            u.refresh_candidates(&self.inventory);
        }
        self.failures.iter_mut().for_each(|count| *count = 0);

        info!(
            symbol = %snapshot.symbol,
            order,
            method = snapshot.solve_method.as_deref().unwrap_or(""),
            solution = %snapshot.solutions[0],
            "variable solved"
        );
        Ok(())
    }
}

/// One named step of the control loop.
pub trait Step {
    fn name(&self) -> &str;

    fn run(&self, ctx: &mut SolveContext) -> Result<StepStatus, IkError>;
}

/// Exposes the next unsolved variable after the cursor.
///
/// Reaching the end without one resets the cursor and exposes index 0,
/// whatever its state; only the completion detector decides "done".
pub struct Assigner;

impl Step for Assigner {
    fn name(&self) -> &str {
        "assigner"
    }

    fn run(&self, ctx: &mut SolveContext) -> Result<StepStatus, IkError> {
        while ctx.cursor < ctx.unknowns.len() {
            let index = ctx.cursor;
            ctx.cursor += 1;
            if !ctx.unknowns[index].solved {
                debug!(symbol = %ctx.unknowns[index].symbol, "offering variable");
                ctx.current = Some(index);
                return Ok(StepStatus::Success);
            }
        }
        ctx.cursor = 0;
        ctx.current = if ctx.unknowns.is_empty() { None } else { Some(0) };
        Ok(StepStatus::Success)
    }
}

/// Offers the current variable to each strategy in priority order.
pub struct StrategyDispatch<'a> {
    strategies: &'a [Box<dyn SolvingStrategy>],
}

impl<'a> StrategyDispatch<'a> {
    pub fn new(strategies: &'a [Box<dyn SolvingStrategy>]) -> Self {
        Self { strategies }
    }
}

impl Step for StrategyDispatch<'_> {
    fn name(&self) -> &str {
        "strategy_dispatch"
    }

    fn run(&self, ctx: &mut SolveContext) -> Result<StepStatus, IkError> {
        let Some(index) = ctx.current else {
            return Ok(StepStatus::Failure);
        };
        if ctx.unknowns[index].solved {
            return Ok(StepStatus::Failure);
        }

        let inventory = &ctx.inventory;
        let unknown = &mut ctx.unknowns[index];
        unknown.refresh_candidates(inventory);
        let mut solved = false;
        for strategy in self.strategies {
            match strategy.attempt(unknown, inventory) {
                Attempt::Solved => {
                    solved = true;
                    break;
                }
                Attempt::NotSolved => unknown.reset_attempt(),
            }
        }

        if solved {
            ctx.commit(index)?;
            return Ok(StepStatus::Success);
        }
        debug!(symbol = %ctx.unknowns[index].symbol, "no strategy applied");
        if let Some(count) = ctx.failures.get_mut(index) {
            *count += 1;
        }
        Ok(StepStatus::Failure)
    }
}

/// Counts solved variables and writes `ctx.complete`.
pub struct CompletionDetector {
    pub policy: CompletionPolicy,
}

impl Step for CompletionDetector {
    fn name(&self) -> &str {
        "completion_detect"
    }

    fn run(&self, ctx: &mut SolveContext) -> Result<StepStatus, IkError> {
        let total = ctx.unknowns.len();
        let solved = total - ctx.unsolved_count();
        ctx.complete = solved == total;
        debug!(total, solved, "completion check");

        let status = match (self.policy, ctx.complete) {
            (CompletionPolicy::SucceedWhenDone, true) | (CompletionPolicy::FailWhenDone, false) => {
                StepStatus::Success
            }
            _ => StepStatus::Failure,
        };
        Ok(status)
    }
}

/// Why a variable is left unsolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsolvedReason {
    /// No equation with at most two unknowns mentions the variable.
    NoUsableEquation,
    /// Such equations exist but no strategy succeeded.
    NoMatchingStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsolvedVariable {
    pub symbol: String,
    pub reason: UnsolvedReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveOutcome {
    Complete,
    Incomplete { unsolved: Vec<UnsolvedVariable> },
}

impl SolveOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SolveOutcome::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub child: String,
    pub parent: String,
}

/// Terminal artifact of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub name: String,
    pub outcome: SolveOutcome,
    pub iterations: usize,
    pub unknowns: Vec<Unknown>,
    pub auxiliary: Vec<Equation>,
    /// Solved nodes in solve order.
    pub solutions: Vec<SolutionNode>,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    pub graph: SolutionGraph,
}

impl SolveReport {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    pub fn unknown(&self, symbol: &str) -> Option<&Unknown> {
        self.unknowns.iter().find(|u| u.symbol == symbol)
    }
}

/// Drives setup and the control loop for one manipulator.
pub struct Solver {
    config: EngineConfig,
    strategies: Vec<Box<dyn SolvingStrategy>>,
}

impl Solver {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(
        config: EngineConfig,
        strategies: Vec<Box<dyn SolvingStrategy>>,
    ) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate input, build unknowns, normalize sums of angles and scan.
    pub fn prepare(&self, manipulator: &Manipulator) -> Result<SolveContext, IkError> {
        self.config.validate()?;
        let span = manipulator.validate(self.config.min_matrix_equations)?;

        let mut matrix_equations = manipulator.matrix_equations.clone();
        let mut unknowns: Vec<Unknown> = manipulator.variables.iter().map(Unknown::joint).collect();
        let mut auxiliary = Vec::new();

        if self.config.sum_of_angles {
            let report = SumOfAngles::new(&manipulator.compounds).run(
                &mut matrix_equations,
                &mut unknowns,
                &mut auxiliary,
            );
            debug!(
                introduced = report.introduced.len(),
                rewrites = report.rewrites,
                "sum-of-angles pass"
            );
        }

        for u in &mut unknowns {
            u.scan(&matrix_equations);
        }
        let inventory = EquationInventory::scan(&matrix_equations, &auxiliary, &unknowns)?;
        info!(
            manipulator = %manipulator.name,
            unknowns = unknowns.len(),
            chain_span = span,
            l1 = inventory.one.len(),
            l2 = inventory.two.len(),
            l3 = inventory.many.len(),
            "inventory scanned"
        );

        Ok(SolveContext::new(unknowns, inventory, matrix_equations, auxiliary))
    }

    /// Run the control loop to completion or exhaustion.
    pub fn run(&self, name: &str, mut ctx: SolveContext) -> Result<SolveReport, IkError> {
        let dispatch = StrategyDispatch::new(&self.strategies);
        let detector = CompletionDetector {
            policy: self.config.completion_policy,
        };
        let steps: [&dyn Step; 3] = [&Assigner, &dispatch, &detector];

        let mut iterations = 0;
        let outcome = loop {
            // an empty unknown list is trivially done
            detector.run(&mut ctx)?;
            if ctx.complete {
                info!(iterations, "all variables solved");
                break SolveOutcome::Complete;
            }
            if ctx.exhausted(self.config.stall_passes) || iterations >= self.config.max_iterations {
                let unsolved = diagnose(&ctx);
                warn!(iterations, remaining = unsolved.len(), "search exhausted");
                break SolveOutcome::Incomplete { unsolved };
            }

            iterations += 1;
            for step in &steps {
                let status = step.run(&mut ctx)?;
                debug!(step = step.name(), ?status, "step finished");
            }
        };

        let solutions = ctx.graph.solved_nodes().into_iter().cloned().collect();
        let edges = ctx
            .graph
            .edges()
            .into_iter()
            .map(|(child, parent)| Edge {
                child: child.to_string(),
                parent: parent.to_string(),
            })
            .collect();

        Ok(SolveReport {
            name: name.to_string(),
            outcome,
            iterations,
            unknowns: ctx.unknowns,
            auxiliary: ctx.auxiliary,
            solutions,
            edges,
            graph: ctx.graph,
        })
    }

    pub fn solve(&self, manipulator: &Manipulator) -> Result<SolveReport, IkError> {
        let ctx = self.prepare(manipulator)?;
        self.run(&manipulator.name, ctx)
    }
}

fn diagnose(ctx: &SolveContext) -> Vec<UnsolvedVariable> {
    ctx.unknowns
        .iter()
        .filter(|u| !u.solved)
        .map(|u| {
            let usable = [Level::One, Level::Two]
                .iter()
                .any(|level| ctx.inventory.level(*level).iter().any(|eq| eq.mentions(&u.symbol)));
            UnsolvedVariable {
                symbol: u.symbol.clone(),
                reason: if usable {
                    UnsolvedReason::NoMatchingStrategy
                } else {
                    UnsolvedReason::NoUsableEquation
                },
            }
        })
        .collect()
}
