pub mod error;
pub mod config;
pub mod symbolic;
pub mod kinematics;
pub mod solve;
pub mod verify;

pub use config::{CompletionPolicy, EngineConfig};
pub use error::{ConfigError, IkError, InputError, InvariantViolation};
pub use kinematics::{
    Equation, JointKind, JointVariable, Manipulator, ManipulatorSpec, MatrixEquation,
};
pub use solve::{SolveOutcome, SolveReport, Solver};
pub use symbolic::Expr;
pub use verify::{verify, VerificationReport};
