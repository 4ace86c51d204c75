//! Forward-kinematics input: equations, transforms and manipulator description.

pub mod types;
pub mod compound;


pub use types::{
    DhRow, Equation, JointKind, JointVariable, Manipulator, ManipulatorSpec, MatrixEquation,
    MatrixEquationSpec, INFORMATIVE_ROWS,
};
pub use compound::{CompoundEntry, CompoundTable};
