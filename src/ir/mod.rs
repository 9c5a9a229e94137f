//! Intermediate representation.
//!
//! A tree IR with explicit control flow: labels, jumps, conditional jumps
//! and moves between typed expression trees. One [`IrFunction`] is produced
//! per defined user function.

pub mod build;
pub mod nodes;
pub mod print;

pub use build::build_program;
pub use nodes::*;
pub use print::print_functions;
