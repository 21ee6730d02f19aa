//! The contract every SAT backend must honour.  The algebra layers
//! above compile formulas against this trait alone; whether clauses
//! end up in an in-process solver or in a DIMACS file handed to a
//! subprocess is invisible to them.
use super::Literal;
use super::SolverError;

/// One SAT session plus running diagnostics.
///
/// Variable ids are assigned in strictly increasing order and clause
/// emission order is preserved verbatim; some solvers tie-break on
/// order, so reproducibility depends on this.
pub trait Solver {
    /// A short human-readable backend name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Allocates a fresh variable and returns its positive literal.
    fn add_variable(&mut self) -> Literal;

    /// Appends one clause, the disjunction of `literals`.  Every
    /// literal must name an already-allocated variable.
    fn add_clause(&mut self, literals: &[Literal]);

    /// Decides the accumulated clause set.  `Ok(true)` means a model
    /// was found and may be decoded with `value`.
    ///
    /// # Errors
    ///
    /// Backend-specific fatal failures; see `SolverError`.  The
    /// session is still usable for a fresh `solve` afterwards.
    fn solve(&mut self) -> Result<bool, SolverError>;

    /// Decodes `literal` under the most recent model.  Only valid
    /// after `solve` returned `Ok(true)`.
    fn value(&self, literal: Literal) -> bool;

    /// Returns the session and cumulative counters.
    fn stats(&self) -> SolverStats;

    /// Resets all session state (variables, clauses, any model),
    /// folding the session counters into the cumulative totals.
    fn clear(&mut self);
}

/// Diagnostic counters.  The `session_*` fields describe the state
/// since the last `clear`; the `total_*` fields accumulate across the
/// lifetime of the solver value.  An explicit struct rather than
/// global counters, so each session owns its own numbers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SolverStats {
    pub session_variables: u64,
    pub session_clauses: u64,
    pub session_solves: u64,
    pub total_variables: u64,
    pub total_clauses: u64,
    pub total_solves: u64,
}

impl SolverStats {
    /// Folds the session counters into the totals and zeroes the
    /// session.  Called by the adapters' `clear`.
    pub fn roll_over(&mut self) {
        self.total_variables += self.session_variables;
        self.total_clauses += self.session_clauses;
        self.total_solves += self.session_solves;
        self.session_variables = 0;
        self.session_clauses = 0;
        self.session_solves = 0;
    }
}

#[test]
fn test_roll_over() {
    // Two sessions' worth of counters accumulate in the totals.
    let mut stats = SolverStats::default();

    stats.session_variables = 10;
    stats.session_clauses = 20;
    stats.session_solves = 1;
    stats.roll_over();

    stats.session_variables = 5;
    stats.roll_over();

    assert_eq!(stats.session_variables, 0);
    assert_eq!(stats.total_variables, 15);
    assert_eq!(stats.total_clauses, 20);
    assert_eq!(stats.total_solves, 1);
}
