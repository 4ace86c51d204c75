use super::inventory::EquationInventory;
use super::unknown::Unknown;

/// Outcome of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The strategy wrote solutions, method and equations into the unknown
    /// via [`Unknown::propose`].
    Solved,
    NotSolved,
}

/// A closed-form solving method.
///
/// Implementations read the inventory and may write only into the unknown
/// they are offered.
pub trait SolvingStrategy {
    fn name(&self) -> &str;

    fn attempt(&self, unknown: &mut Unknown, inventory: &EquationInventory) -> Attempt;
}
