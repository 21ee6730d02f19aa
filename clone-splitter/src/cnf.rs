//! The compiling carrier: a Boolean algebra whose values are solver
//! literals.  Each AND or XOR introduces one fresh Tseitin variable
//! constrained by the minimal clause set for its truth table (three
//! clauses for AND, four for XOR); the derived connectives come from
//! the trait's negation-based defaults, so these two templates are
//! the only ones that exist.
//!
//! By the variable-1 convention of the solver layer, the literals `1`
//! and `-1` serve directly as the constants.
use crate::boolean::BooleanAlgebra;
use satlink::Literal;
use satlink::Solver;
use satlink::SolverError;
use satlink::SolverStats;
use satlink::FALSE;
use satlink::TRUE;

/// The solver-facing surface of a compiling carrier: fresh problem
/// variables, asserted constraints, solving, and decoding.  The gate
/// cache wraps this trait, so search code is written once against it.
pub trait SatAlgebra: BooleanAlgebra<Elem = Literal> {
    /// Allocates a fresh problem variable.
    fn fresh(&mut self) -> Literal;

    /// Asserts `literal` as a unit clause.
    fn ensure(&mut self, literal: Literal);

    /// Appends a raw clause; used for blocking enumerated models.
    fn block(&mut self, clause: &[Literal]);

    /// Decides the accumulated constraints.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; see `satlink::SolverError`.
    fn solve(&mut self) -> Result<bool, SolverError>;

    /// Decodes `literal` under the most recent model.
    fn decode(&self, literal: Literal) -> bool;

    fn stats(&self) -> SolverStats;

    /// Resets all session state: variables, clauses, and any cached
    /// gates in wrappers.
    fn clear(&mut self);
}

/// A `BooleanAlgebra` compiling to CNF on `S`.
pub struct CnfAlgebra<S: Solver> {
    solver: S,
}

impl<S: Solver> CnfAlgebra<S> {
    /// Wraps `solver`, which the adapter contract guarantees arrives
    /// with variable 1 pinned true.
    #[must_use]
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }
}

impl<S: Solver> BooleanAlgebra for CnfAlgebra<S> {
    type Elem = Literal;

    fn top(&self) -> Literal {
        TRUE
    }

    fn bottom(&self) -> Literal {
        FALSE
    }

    fn lift(&self, value: bool) -> Literal {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    fn not(&self, elem: Literal) -> Literal {
        -elem
    }

    fn and(&mut self, a: Literal, b: Literal) -> Literal {
        let gate = self.solver.add_variable();
        self.solver.add_clause(&[-a, -b, gate]);
        self.solver.add_clause(&[a, -gate]);
        self.solver.add_clause(&[b, -gate]);
        gate
    }

    fn xor(&mut self, a: Literal, b: Literal) -> Literal {
        let gate = self.solver.add_variable();
        self.solver.add_clause(&[-a, -b, -gate]);
        self.solver.add_clause(&[a, b, -gate]);
        self.solver.add_clause(&[a, -b, gate]);
        self.solver.add_clause(&[-a, b, gate]);
        gate
    }
}

impl<S: Solver> SatAlgebra for CnfAlgebra<S> {
    fn fresh(&mut self) -> Literal {
        self.solver.add_variable()
    }

    fn ensure(&mut self, literal: Literal) {
        self.solver.add_clause(&[literal]);
    }

    fn block(&mut self, clause: &[Literal]) {
        self.solver.add_clause(clause);
    }

    fn solve(&mut self) -> Result<bool, SolverError> {
        self.solver.solve()
    }

    fn decode(&self, literal: Literal) -> bool {
        self.solver.value(literal)
    }

    fn stats(&self) -> SolverStats {
        self.solver.stats()
    }

    fn clear(&mut self) {
        self.solver.clear();
    }
}

#[cfg(test)]
use satlink::NativeSolver;

#[test]
fn test_and_gate_truth_table() {
    // Force each input combination through assumptions-by-unit-clause
    // on a fresh session and check the gate's decoded value.
    for &(a_value, b_value) in &[(false, false), (false, true), (true, false), (true, true)] {
        let mut alg = CnfAlgebra::new(NativeSolver::new());
        let a = alg.fresh();
        let b = alg.fresh();
        let gate = alg.and(a, b);

        alg.ensure(if a_value { a } else { -a });
        alg.ensure(if b_value { b } else { -b });
        assert!(alg.solve().expect("ok"));
        assert_eq!(alg.decode(gate), a_value && b_value);
    }
}

#[test]
fn test_xor_gate_truth_table() {
    for &(a_value, b_value) in &[(false, false), (false, true), (true, false), (true, true)] {
        let mut alg = CnfAlgebra::new(NativeSolver::new());
        let a = alg.fresh();
        let b = alg.fresh();
        let gate = alg.xor(a, b);

        alg.ensure(if a_value { a } else { -a });
        alg.ensure(if b_value { b } else { -b });
        assert!(alg.solve().expect("ok"));
        assert_eq!(alg.decode(gate), a_value != b_value);
    }
}

#[test]
fn test_derived_connectives_compile() {
    // or/leq/equ come from the trait defaults; spot-check one row
    // each against the concrete carrier.
    let mut alg = CnfAlgebra::new(NativeSolver::new());
    let a = alg.fresh();
    let b = alg.fresh();
    let or = alg.or(a, b);
    let leq = alg.leq(a, b);
    let equ = alg.equ(a, b);

    alg.ensure(a);
    alg.ensure(-b);
    assert!(alg.solve().expect("ok"));
    assert!(alg.decode(or));
    assert!(!alg.decode(leq));
    assert!(!alg.decode(equ));
}

#[test]
fn test_constants_decode() {
    let mut alg = CnfAlgebra::new(NativeSolver::new());

    assert!(alg.solve().expect("ok"));
    assert!(alg.decode(TRUE));
    assert!(!alg.decode(FALSE));
}
