pub mod unknown;
pub mod rank;
pub mod inventory;
pub mod sum_of_angles;
pub mod graph;
pub mod strategy;
pub mod strategies;
pub mod engine;

#[cfg(test)]
mod tests_inventory;

#[cfg(test)]
mod tests_graph;

#[cfg(test)]
mod tests_engine;

pub use unknown::{Unknown, VariableId, VariableKind};
pub use rank::erank;
pub use inventory::{EquationInventory, Level};
pub use sum_of_angles::{Normalization, SumOfAngles};
pub use graph::{SolutionGraph, SolutionNode};
pub use strategy::{Attempt, SolvingStrategy};
pub use strategies::{default_strategies, AlgebraicSolver, InverseTrigSolver, SinCosPairSolver};
pub use engine::{
    Assigner, CompletionDetector, Edge, SolveContext, SolveOutcome, SolveReport, Solver, Step,
    StepStatus, StrategyDispatch, UnsolvedReason, UnsolvedVariable,
};
