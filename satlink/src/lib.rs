//! Every search in the crates above this one boils down to the same
//! conversation: allocate propositional variables, stream clauses at a
//! solver, ask for a model, read the model back.  This crate pins that
//! conversation down to one narrow contract, and provides two parties
//! that speak it: an in-process incremental solver (cryptominisat), and
//! any external executable that reads DIMACS CNF and writes the usual
//! `SAT`/`UNSAT` result file.
//!
//! One convention holds everywhere: variable 1 is the always-true
//! variable.  Both adapters allocate it on construction (and again
//! after `clear`) and assert the unit clause `[1]`, so the literals
//! `1` and `-1` can serve as the constants true and false without any
//! special casing in the layers that compile formulas.
mod dimacs;
mod external;
mod native;
mod solver;

pub use dimacs::ClauseBuffer;
pub use external::ExternalConfig;
pub use external::ExternalSolver;
pub use native::NativeSolver;
pub use solver::Solver;
pub use solver::SolverStats;

use thiserror::Error;

/// A literal is a signed variable index: the magnitude names a solver
/// variable, the sign encodes negation.  Zero is not a literal; it is
/// the DIMACS clause terminator.
pub type Literal = i32;

/// The always-true literal, by the variable-1 convention.
pub const TRUE: Literal = 1;

/// The always-false literal.
pub const FALSE: Literal = -1;

/// Everything that can go wrong while driving a solver.  All of these
/// are fatal for the current `solve` call: the adapter never retries,
/// though the caller is free to issue a fresh `solve`.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to launch solver {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver i/o failed")]
    Io(#[from] std::io::Error),

    #[error("solver {program:?} exited with unexpected status {status:?}")]
    UnexpectedExit { program: String, status: Option<i32> },

    #[error("malformed solver result: {0}")]
    MalformedResult(&'static str),

    #[error("assignment mentions variable {0} outside [1, {1}]")]
    VariableOutOfRange(Literal, u64),

    #[error("solver gave up without an answer")]
    Indeterminate,

    #[error("no solver is registered under the name {0:?}")]
    UnknownSolver(String),
}

/// Returns a boxed solver for a symbolic name: `"cryptominisat"` for
/// the in-process adapter, `"minisat"` for an external MiniSat-style
/// process with default flags.
///
/// This is the explicit replacement for a process-wide default-solver
/// setting: callers construct the handle once and own it.
///
/// # Errors
///
/// Returns `SolverError::UnknownSolver` for any other name.
pub fn solver_by_name(name: &str) -> Result<Box<dyn Solver>, SolverError> {
    match name {
        "cryptominisat" => Ok(Box::new(NativeSolver::new())),
        "minisat" => Ok(Box::new(ExternalSolver::new(ExternalConfig::minisat()))),
        _ => Err(SolverError::UnknownSolver(name.into())),
    }
}

#[test]
fn test_solver_by_name() {
    // The two known backends resolve; anything else is an error.
    assert_eq!(solver_by_name("cryptominisat").expect("ok").name(), "cryptominisat");
    assert_eq!(solver_by_name("minisat").expect("ok").name(), "external");
    assert!(solver_by_name("brute-force").is_err());
}
