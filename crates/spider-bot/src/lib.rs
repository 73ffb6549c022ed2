pub mod scan;
pub mod solver;

pub use solver::{GameOutcome, Solver, SolverError, SolverEvent};
