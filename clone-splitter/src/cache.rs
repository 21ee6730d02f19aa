//! Structural gate sharing.  The refinement searches re-compile
//! structurally identical preservation predicates round after round;
//! without sharing, the CNF for one session grows without bound.
//! This decorator folds constants, canonicalizes operands, and
//! deduplicates AND/XOR gates through a bounded direct-mapped table
//! before anything reaches the compiling carrier underneath.
//!
//! The table is a prime-sized array indexed by a linear hash of the
//! canonical operand pair.  On a collision the newcomer overwrites
//! the old entry; the table never grows and never chains.  Losing an
//! entry costs nothing but the re-derivation of an equivalent gate
//! later.
use crate::boolean::BooleanAlgebra;
use crate::cnf::SatAlgebra;
use satlink::Literal;
use satlink::SolverError;
use satlink::SolverStats;
use satlink::FALSE;
use satlink::TRUE;

/// Number of slots per gate table.  Prime, so the linear index walks
/// the whole table.
const TABLE_SIZE: usize = 49999;

/// Multiplier for the linear index.
const STEP: i64 = 1_000_003;

#[derive(Clone, Copy, Default)]
struct Slot {
    a: Literal,
    b: Literal,
    /// 0 marks an empty slot; no gate is ever literal 0.
    gate: Literal,
}

/// A gate-deduplicating decorator around a `SatAlgebra`.
pub struct CachedOps<A> {
    inner: A,
    and_table: Vec<Slot>,
    xor_table: Vec<Slot>,
    hits: u64,
    misses: u64,
}

impl<A: SatAlgebra> CachedOps<A> {
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            and_table: vec![Slot::default(); TABLE_SIZE],
            xor_table: vec![Slot::default(); TABLE_SIZE],
            hits: 0,
            misses: 0,
        }
    }

    /// Gate requests answered from the table.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Gate requests that had to compile a fresh gate.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn index(a: Literal, b: Literal) -> usize {
        ((a as i64) * STEP + (b as i64)).rem_euclid(TABLE_SIZE as i64) as usize
    }
}

impl<A: SatAlgebra> BooleanAlgebra for CachedOps<A> {
    type Elem = Literal;

    fn top(&self) -> Literal {
        TRUE
    }

    fn bottom(&self) -> Literal {
        FALSE
    }

    fn lift(&self, value: bool) -> Literal {
        self.inner.lift(value)
    }

    fn not(&self, elem: Literal) -> Literal {
        -elem
    }

    fn and(&mut self, a: Literal, b: Literal) -> Literal {
        // Constant folding short-circuits before the table.
        if a == TRUE {
            return b;
        }
        if b == TRUE {
            return a;
        }
        if a == FALSE || b == FALSE {
            return FALSE;
        }
        if a == b {
            return a;
        }
        if a == -b {
            return FALSE;
        }

        // Commutative, so order the operands canonically.
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let index = Self::index(a, b);
        let slot = self.and_table[index];
        if slot.gate != 0 && slot.a == a && slot.b == b {
            self.hits += 1;
            return slot.gate;
        }

        self.misses += 1;
        let gate = self.inner.and(a, b);
        self.and_table[index] = Slot { a, b, gate };
        gate
    }

    fn xor(&mut self, a: Literal, b: Literal) -> Literal {
        if a == FALSE {
            return b;
        }
        if b == FALSE {
            return a;
        }
        if a == TRUE {
            return -b;
        }
        if b == TRUE {
            return -a;
        }
        if a == b {
            return FALSE;
        }
        if a == -b {
            return TRUE;
        }

        // xor(±a, ±b) = ±xor(a, b): hoist the operand signs out, then
        // order the now-positive operands.
        let mut negate = false;
        let (mut a, mut b) = (a, b);
        if a < 0 {
            a = -a;
            negate = !negate;
        }
        if b < 0 {
            b = -b;
            negate = !negate;
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };

        let index = Self::index(a, b);
        let slot = self.xor_table[index];
        let gate = if slot.gate != 0 && slot.a == a && slot.b == b {
            self.hits += 1;
            slot.gate
        } else {
            self.misses += 1;
            let gate = self.inner.xor(a, b);
            self.xor_table[index] = Slot { a, b, gate };
            gate
        };

        if negate {
            -gate
        } else {
            gate
        }
    }
}

impl<A: SatAlgebra> SatAlgebra for CachedOps<A> {
    fn fresh(&mut self) -> Literal {
        self.inner.fresh()
    }

    fn ensure(&mut self, literal: Literal) {
        self.inner.ensure(literal);
    }

    fn block(&mut self, clause: &[Literal]) {
        self.inner.block(clause);
    }

    fn solve(&mut self) -> Result<bool, SolverError> {
        self.inner.solve()
    }

    fn decode(&self, literal: Literal) -> bool {
        self.inner.decode(literal)
    }

    fn stats(&self) -> SolverStats {
        self.inner.stats()
    }

    /// Cached gates name variables of the session being torn down, so
    /// the tables are invalidated wholesale alongside the solver.
    fn clear(&mut self) {
        self.inner.clear();
        for slot in self.and_table.iter_mut() {
            *slot = Slot::default();
        }
        for slot in self.xor_table.iter_mut() {
            *slot = Slot::default();
        }
    }
}

#[cfg(test)]
use crate::cnf::CnfAlgebra;
#[cfg(test)]
use satlink::NativeSolver;

#[cfg(test)]
fn fresh_cache() -> CachedOps<CnfAlgebra<NativeSolver>> {
    CachedOps::new(CnfAlgebra::new(NativeSolver::new()))
}

#[test]
fn test_and_commutes_to_same_gate() {
    // Both operand orders hit the same slot.
    let mut alg = fresh_cache();
    let a = alg.fresh();
    let b = alg.fresh();

    let forward = alg.and(a, b);
    let backward = alg.and(b, a);
    assert_eq!(forward, backward);
    assert_eq!(alg.hits(), 1);
    assert_eq!(alg.misses(), 1);
}

#[test]
fn test_and_constant_folding() {
    // Identities never touch the table.
    let mut alg = fresh_cache();
    let a = alg.fresh();

    assert_eq!(alg.and(TRUE, a), a);
    assert_eq!(alg.and(a, TRUE), a);
    assert_eq!(alg.and(FALSE, a), FALSE);
    assert_eq!(alg.and(a, a), a);
    assert_eq!(alg.and(a, -a), FALSE);
    assert_eq!(alg.misses(), 0);
}

#[test]
fn test_xor_constant_folding() {
    let mut alg = fresh_cache();
    let a = alg.fresh();

    assert_eq!(alg.xor(FALSE, a), a);
    assert_eq!(alg.xor(TRUE, a), -a);
    assert_eq!(alg.xor(a, a), FALSE);
    assert_eq!(alg.xor(a, -a), TRUE);
    assert_eq!(alg.misses(), 0);
}

#[test]
fn test_xor_sign_hoisting() {
    // All four sign combinations share one compiled gate.
    let mut alg = fresh_cache();
    let a = alg.fresh();
    let b = alg.fresh();

    let base = alg.xor(a, b);
    assert_eq!(alg.xor(-a, b), -base);
    assert_eq!(alg.xor(a, -b), -base);
    assert_eq!(alg.xor(-a, -b), base);
    assert_eq!(alg.misses(), 1);
    assert_eq!(alg.hits(), 3);
}

#[test]
fn test_cached_gates_still_mean_and() {
    // Sharing must not change semantics: decode the shared gate
    // under a forced assignment.
    let mut alg = fresh_cache();
    let a = alg.fresh();
    let b = alg.fresh();
    let gate = alg.and(a, b);
    assert_eq!(alg.and(b, a), gate);

    alg.ensure(a);
    alg.ensure(b);
    assert!(alg.solve().expect("ok"));
    assert!(alg.decode(gate));
}

#[test]
fn test_clear_invalidates() {
    // After clear, the same operand pair compiles a fresh gate in
    // the new session rather than reusing a stale id.
    let mut alg = fresh_cache();
    let a = alg.fresh();
    let b = alg.fresh();
    alg.and(a, b);
    let misses_before = alg.misses();

    alg.clear();
    let a = alg.fresh();
    let b = alg.fresh();
    alg.and(a, b);
    assert_eq!(alg.misses(), misses_before + 1);
}
