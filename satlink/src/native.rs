//! The in-process backend: cryptominisat behind the same `Solver`
//! contract as the external adapter.  The binding is incremental, so
//! repeated solve/add-clause rounds (model enumeration, refinement
//! loops) stay in one solver instance instead of re-reading a CNF
//! file per round.
use super::solver::Solver;
use super::solver::SolverStats;
use super::Literal;
use super::SolverError;
use super::TRUE;
use cryptominisat::Lbool;
use cryptominisat::Lit;

/// A `Solver` backed by an in-process cryptominisat instance.
pub struct NativeSolver {
    solver: cryptominisat::Solver,
    stats: SolverStats,
    model: Option<Vec<bool>>,
}

impl NativeSolver {
    #[must_use]
    pub fn new() -> Self {
        let mut ret = Self {
            solver: cryptominisat::Solver::new(),
            stats: SolverStats::default(),
            model: None,
        };

        ret.bootstrap();
        ret
    }

    /// Allocates variable 1 and pins it true.
    fn bootstrap(&mut self) {
        let t = self.add_variable();
        assert_eq!(t, TRUE);
        self.add_clause(&[TRUE]);
    }

    /// Maps our signed literal onto the binding's representation.
    /// Our variables are 1-based, cryptominisat's are 0-based.
    fn to_lit(literal: Literal) -> Lit {
        debug_assert!(literal != 0);
        let var = (literal.abs() - 1) as u32;
        Lit::new(var, literal < 0).expect("variable index in range")
    }
}

impl Default for NativeSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for NativeSolver {
    fn name(&self) -> &'static str {
        "cryptominisat"
    }

    fn add_variable(&mut self) -> Literal {
        let var = self.solver.new_var();
        self.stats.session_variables += 1;
        (var.var() + 1) as Literal
    }

    fn add_clause(&mut self, literals: &[Literal]) {
        let clause: Vec<Lit> = literals.iter().map(|&lit| Self::to_lit(lit)).collect();
        self.solver.add_clause(&clause);
        self.stats.session_clauses += 1;
    }

    fn solve(&mut self) -> Result<bool, SolverError> {
        self.stats.session_solves += 1;
        self.model = None;

        match self.solver.solve() {
            Lbool::True => {
                let model = self
                    .solver
                    .get_model()
                    .iter()
                    .map(|value| match value {
                        Lbool::True => true,
                        _ => false,
                    })
                    .collect();
                self.model = Some(model);
                Ok(true)
            }
            Lbool::False => Ok(false),
            Lbool::Undef => Err(SolverError::Indeterminate),
        }
    }

    fn value(&self, literal: Literal) -> bool {
        let model = self
            .model
            .as_ref()
            .expect("value() before a satisfying solve()");
        let index = (literal.abs() - 1) as usize;
        model[index] == (literal > 0)
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn clear(&mut self) {
        self.stats.roll_over();
        self.solver = cryptominisat::Solver::new();
        self.model = None;
        self.bootstrap();
    }
}

#[test]
fn test_tiny_sat() {
    // (a ∨ b) ∧ (¬a) forces b.
    let mut solver = NativeSolver::new();

    let a = solver.add_variable();
    let b = solver.add_variable();
    solver.add_clause(&[a, b]);
    solver.add_clause(&[-a]);

    assert!(solver.solve().expect("ok"));
    assert!(solver.value(TRUE));
    assert!(!solver.value(a));
    assert!(solver.value(b));
    assert!(!solver.value(-b));
}

#[test]
fn test_tiny_unsat() {
    // a ∧ ¬a has no model.
    let mut solver = NativeSolver::new();

    let a = solver.add_variable();
    solver.add_clause(&[a]);
    solver.add_clause(&[-a]);

    assert!(!solver.solve().expect("ok"));
}

#[test]
fn test_incremental_blocking() {
    // Enumerate the three models of (a ∨ b) by blocking each one.
    let mut solver = NativeSolver::new();

    let a = solver.add_variable();
    let b = solver.add_variable();
    solver.add_clause(&[a, b]);

    let mut count = 0;
    while solver.solve().expect("ok") {
        count += 1;
        let block = [
            if solver.value(a) { -a } else { a },
            if solver.value(b) { -b } else { b },
        ];
        solver.add_clause(&block);
    }
    assert_eq!(count, 3);
}

#[test]
fn test_clear_restarts_session() {
    // After `clear`, the variable space is fresh and the old
    // contradiction is gone.
    let mut solver = NativeSolver::new();

    let a = solver.add_variable();
    solver.add_clause(&[a]);
    solver.add_clause(&[-a]);
    assert!(!solver.solve().expect("ok"));

    solver.clear();
    let b = solver.add_variable();
    assert_eq!(b, 2);
    solver.add_clause(&[b]);
    assert!(solver.solve().expect("ok"));
    assert_eq!(solver.stats().total_solves, 1);
    assert_eq!(solver.stats().session_solves, 1);
}
