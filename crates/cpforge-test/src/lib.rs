//! Test fixtures for cpforge.
//!
//! A small finite-domain layer on top of the solver core: bitset integer
//! variables, a few propagating constraints, a first-unbound decision builder
//! and an N-Queens model. Used by the integration tests and the demo.

pub mod constraints;
pub mod intvar;
pub mod nqueens;
pub mod search;

pub use constraints::{AllDifferent, LessThan, NotEqual};
pub use intvar::IntVar;
pub use nqueens::{is_valid_placement, nqueens_model, SOLUTION_COUNTS};
pub use search::{AssignValue, FirstUnbound, SolutionRecorder, ValueStrategy};
