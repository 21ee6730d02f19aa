//! Finite relations as Boolean tensors: an arity-k relation over a
//! domain of size n is an n×…×n tensor whose entry at (i₁, …, iₖ)
//! says whether the tuple is a member.  Everything here is carrier
//! generic: with the concrete carrier these combinators decide a
//! property, with the compiling carrier they emit the CNF that
//! asserts it.
use crate::boolean::BooleanAlgebra;
use crate::cnf::SatAlgebra;
use crate::tensor::Tensor;
use satlink::Literal;
use thiserror::Error;

/// Single-character coordinate alphabet for the membership text
/// format: `0`–`9`, then `a`–`z` for coordinates ten and up.
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An opaque finite index range `[0, size)`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Domain {
    size: usize,
}

impl Domain {
    /// A domain must have at least one element; most relation work
    /// wants at least two to be interesting, but one is legal.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size >= 1);
        Self { size }
    }

    #[must_use]
    pub fn size(self) -> usize {
        self.size
    }
}

/// A relation over a domain, of arity ≥ 1.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relation<E> {
    domain: Domain,
    tensor: Tensor<E>,
}

impl<E: Copy + Eq + std::fmt::Debug> Relation<E> {
    /// Wraps a tensor whose every axis ranges over `domain`.
    #[must_use]
    pub fn from_tensor(domain: Domain, tensor: Tensor<E>) -> Self {
        assert!(tensor.order() >= 1);
        assert!(tensor.dims().iter().all(|&dim| dim == domain.size()));
        Self { domain, tensor }
    }

    /// Builds a relation pointwise from coordinate tuples.
    pub fn from_fn<F>(domain: Domain, arity: usize, f: F) -> Self
    where
        F: FnMut(&[usize]) -> E,
    {
        assert!(arity >= 1);
        Self {
            domain,
            tensor: Tensor::from_fn(vec![domain.size(); arity], f),
        }
    }

    /// The relation containing no tuple.
    #[must_use]
    pub fn empty<A: BooleanAlgebra<Elem = E>>(alg: &A, domain: Domain, arity: usize) -> Self {
        assert!(arity >= 1);
        Self {
            domain,
            tensor: Tensor::constant(vec![domain.size(); arity], alg.bottom()),
        }
    }

    /// The relation containing every tuple.
    #[must_use]
    pub fn full<A: BooleanAlgebra<Elem = E>>(alg: &A, domain: Domain, arity: usize) -> Self {
        assert!(arity >= 1);
        Self {
            domain,
            tensor: Tensor::constant(vec![domain.size(); arity], alg.top()),
        }
    }

    /// The diagonal: tuples whose coordinates are all equal.
    #[must_use]
    pub fn identity<A: BooleanAlgebra<Elem = E>>(alg: &A, domain: Domain, arity: usize) -> Self {
        Self::from_fn(domain, arity, |coords| {
            alg.lift(coords.iter().all(|&c| c == coords[0]))
        })
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.tensor.order()
    }

    #[must_use]
    pub fn tensor(&self) -> &Tensor<E> {
        &self.tensor
    }

    fn same_shape(&self, other: &Self) {
        assert_eq!(self.domain, other.domain);
        assert_eq!(self.arity(), other.arity());
    }

    pub fn intersect<A>(&self, alg: &mut A, other: &Self) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.same_shape(other);
        Self {
            domain: self.domain,
            tensor: self.tensor.map2(&other.tensor, |a, b| alg.and(a, b)),
        }
    }

    pub fn union<A>(&self, alg: &mut A, other: &Self) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.same_shape(other);
        Self {
            domain: self.domain,
            tensor: self.tensor.map2(&other.tensor, |a, b| alg.or(a, b)),
        }
    }

    pub fn complement<A>(&self, alg: &A) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        Self {
            domain: self.domain,
            tensor: self.tensor.map(|a| alg.not(a)),
        }
    }

    /// Pointwise implication, folded over every axis.
    pub fn is_subset<A>(&self, alg: &mut A, other: &Self) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.same_shape(other);
        let pointwise = self.tensor.map2(&other.tensor, |a, b| alg.leq(a, b));
        pointwise
            .fold(self.arity(), |chunk| alg.all(chunk.iter().copied()))
            .scalar()
    }

    /// Pointwise equivalence, folded over every axis.
    pub fn is_equal<A>(&self, alg: &mut A, other: &Self) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.same_shape(other);
        let pointwise = self.tensor.map2(&other.tensor, |a, b| alg.equ(a, b));
        pointwise
            .fold(self.arity(), |chunk| alg.all(chunk.iter().copied()))
            .scalar()
    }

    pub fn is_full<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.tensor
            .fold(self.arity(), |chunk| alg.all(chunk.iter().copied()))
            .scalar()
    }

    pub fn is_empty<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let some = self
            .tensor
            .fold(self.arity(), |chunk| alg.any(chunk.iter().copied()))
            .scalar();
        alg.not(some)
    }

    /// The converse relation: axis order reversed.
    #[must_use]
    pub fn invert(&self) -> Self {
        let arity = self.arity();
        let map: Vec<usize> = (0..arity).rev().collect();
        Self {
            domain: self.domain,
            tensor: self.tensor.reshape(vec![self.domain.size(); arity], &map),
        }
    }

    /// Cyclic axis rotation: the first coordinate moves last.
    #[must_use]
    pub fn rotate(&self) -> Self {
        let arity = self.arity();
        let map: Vec<usize> = (0..arity).map(|axis| (axis + arity - 1) % arity).collect();
        Self {
            domain: self.domain,
            tensor: self.tensor.reshape(vec![self.domain.size(); arity], &map),
        }
    }

    /// The unary projection onto the all-coordinates-equal diagonal.
    #[must_use]
    pub fn diagonal(&self) -> Self {
        Self {
            domain: self.domain,
            tensor: self
                .tensor
                .reshape(vec![self.domain.size()], &vec![0; self.arity()]),
        }
    }

    /// Relational composition over one shared coordinate: the last
    /// axis of `self` is identified with the first axis of `other`
    /// and eliminated existentially.  Defined whenever the arities
    /// sum to at least three.
    pub fn compose<A>(&self, alg: &mut A, other: &Self) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        assert_eq!(self.domain, other.domain);
        let m = self.arity();
        let n = other.arity();
        assert!(m + n >= 3);

        // Shared axis last, so the existential fold is a trailing
        // fold.
        let result_order = m + n - 2;
        let full = vec![self.domain.size(); result_order + 1];

        let mut left_map: Vec<usize> = (0..m).collect();
        left_map[m - 1] = result_order;
        let mut right_map = vec![0; n];
        right_map[0] = result_order;
        for axis in 1..n {
            right_map[axis] = m - 1 + (axis - 1);
        }

        let left = self.tensor.reshape(full.clone(), &left_map);
        let right = other.tensor.reshape(full, &right_map);
        let joined = left.map2(&right, |a, b| alg.and(a, b));
        Self {
            domain: self.domain,
            tensor: joined.fold(1, |chunk| alg.any(chunk.iter().copied())),
        }
    }

    /// Drops the diagonal without emitting a single gate: diagonal
    /// cells are replaced by the false constant.  Transitivity and
    /// antisymmetry go through this first, which shrinks the compiled
    /// instance noticeably.
    fn without_diagonal<A>(&self, alg: &A) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        Self::from_fn(self.domain, self.arity(), |coords| {
            if coords.iter().all(|&c| c == coords[0]) {
                alg.bottom()
            } else {
                self.tensor.get(coords)
            }
        })
    }

    pub fn is_reflexive<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.diagonal().is_full(alg)
    }

    pub fn is_symmetric<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        self.invert().is_subset(alg, self)
    }

    pub fn is_antisymmetric<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let strict = self.without_diagonal(alg);
        let meet = strict.intersect(alg, &strict.invert());
        meet.is_empty(alg)
    }

    pub fn is_transitive<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let strict = self.without_diagonal(alg);
        let two_step = strict.compose(alg, &strict);
        two_step.is_subset(alg, self)
    }

    pub fn is_equivalence<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let parts = [
            self.is_reflexive(alg),
            self.is_symmetric(alg),
            self.is_transitive(alg),
        ];
        alg.all(parts.iter().copied())
    }

    pub fn is_partial_order<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let parts = [
            self.is_reflexive(alg),
            self.is_antisymmetric(alg),
            self.is_transitive(alg),
        ];
        alg.all(parts.iter().copied())
    }

    /// The covering relation of a partial order: the strict order
    /// minus its composition with itself.
    pub fn covering<A>(&self, alg: &mut A) -> Self
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let strict = self.without_diagonal(alg);
        let two_step = strict.compose(alg, &strict);
        let gap = two_step.complement(alg);
        strict.intersect(alg, &gap)
    }
}

impl Relation<bool> {
    /// Injects a concrete relation into another carrier.
    #[must_use]
    pub fn lift<A: BooleanAlgebra>(&self, alg: &A) -> Relation<A::Elem> {
        Relation {
            domain: self.domain,
            tensor: self.tensor.map(|member| alg.lift(member)),
        }
    }

    /// Parses the compact membership format: whitespace-separated
    /// groups of single-character coordinates, one group per member
    /// tuple.
    ///
    /// # Errors
    ///
    /// Rejects groups whose length differs from `arity`, characters
    /// outside the alphabet, and coordinates at or beyond the domain
    /// size.
    pub fn parse(domain: Domain, arity: usize, text: &str) -> Result<Self, ParseError> {
        assert!(arity >= 1);

        let size = domain.size();
        assert!(size <= ALPHABET.len());

        let mut cells = vec![false; size.pow(arity as u32)];
        for group in text.split_whitespace() {
            let mut offset = 0;
            let mut len = 0;
            for ch in group.chars() {
                let coord = ALPHABET
                    .iter()
                    .position(|&c| c as char == ch)
                    .ok_or(ParseError::BadCoordinate(ch))?;
                if coord >= size {
                    return Err(ParseError::CoordinateOutOfRange(ch, size));
                }
                offset = offset * size + coord;
                len += 1;
            }
            if len != arity {
                return Err(ParseError::WrongArity(group.into(), len, arity));
            }
            cells[offset] = true;
        }

        Ok(Self {
            domain,
            tensor: Tensor::from_elems(vec![size; arity], cells),
        })
    }

    /// Formats the member tuples in lexicographic index order,
    /// space-separated, using the same alphabet as `parse`.
    #[must_use]
    pub fn members(&self) -> String {
        let mut out = String::new();
        let mut coords = vec![0; self.arity()];
        let mut index = 0;

        loop {
            if self.tensor.elems()[index] {
                if !out.is_empty() {
                    out.push(' ');
                }
                for &coord in &coords {
                    out.push(ALPHABET[coord] as char);
                }
            }
            index += 1;

            let mut done = true;
            for axis in (0..coords.len()).rev() {
                coords[axis] += 1;
                if coords[axis] < self.domain.size() {
                    done = false;
                    break;
                }
                coords[axis] = 0;
            }
            if done {
                break;
            }
        }

        out
    }
}

impl Relation<Literal> {
    /// A relation of fresh solver variables, one per cell.
    pub fn symbolic<A: SatAlgebra>(alg: &mut A, domain: Domain, arity: usize) -> Self {
        Relation::from_fn(domain, arity, |_| alg.fresh())
    }

    /// Reads the relation back out of a satisfying assignment.
    #[must_use]
    pub fn decode<A: SatAlgebra>(&self, alg: &A) -> Relation<bool> {
        Relation {
            domain: self.domain,
            tensor: self.tensor.map(|lit| alg.decode(lit)),
        }
    }
}

/// Invalid membership text.  Construction-time, synchronous, never
/// retried.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("member {0:?} has {1} coordinates, expected {2}")]
    WrongArity(String, usize, usize),

    #[error("{0:?} is not a coordinate character")]
    BadCoordinate(char),

    #[error("coordinate {0:?} is outside a domain of size {1}")]
    CoordinateOutOfRange(char, usize),
}

#[cfg(test)]
use crate::boolean::Logic;

#[test]
fn test_parse_format_round_trip() {
    // Formatting a parsed relation reproduces the members in
    // lexicographic order.
    let domain = Domain::new(3);
    let relation = Relation::parse(domain, 2, "21 02 10").expect("ok");

    assert_eq!(relation.members(), "02 10 21");
    let again = Relation::parse(domain, 2, &relation.members()).expect("ok");
    assert_eq!(again, relation);
}

#[test]
fn test_parse_rejects_garbage() {
    let domain = Domain::new(3);

    assert_eq!(
        Relation::parse(domain, 2, "012"),
        Err(ParseError::WrongArity("012".into(), 3, 2))
    );
    assert_eq!(
        Relation::parse(domain, 2, "0!"),
        Err(ParseError::BadCoordinate('!'))
    );
    assert_eq!(
        Relation::parse(domain, 2, "03"),
        Err(ParseError::CoordinateOutOfRange('3', 3))
    );
}

#[test]
fn test_subset_equal_antisymmetry() {
    // Mutual inclusion coincides with equality, inclusion one way
    // does not.
    let mut alg = Logic;
    let domain = Domain::new(3);
    let small = Relation::parse(domain, 2, "01 12").expect("ok");
    let large = Relation::parse(domain, 2, "01 12 20").expect("ok");

    assert!(small.is_subset(&mut alg, &large));
    assert!(!large.is_subset(&mut alg, &small));
    assert!(!small.is_equal(&mut alg, &large));

    let copy = small.clone();
    assert!(small.is_subset(&mut alg, &copy));
    assert!(copy.is_subset(&mut alg, &small));
    assert!(small.is_equal(&mut alg, &copy));
}

#[test]
fn test_invert_involution() {
    let domain = Domain::new(4);
    let relation = Relation::parse(domain, 2, "01 23 31 00").expect("ok");

    assert_eq!(relation.invert().invert(), relation);

    let triple = Relation::parse(domain, 3, "012 330 101").expect("ok");
    assert_eq!(triple.invert().invert(), triple);
}

#[test]
fn test_compose_paths() {
    // 0→1→2 composes to 0→2.
    let mut alg = Logic;
    let domain = Domain::new(3);
    let step = Relation::parse(domain, 2, "01 12").expect("ok");

    assert_eq!(step.compose(&mut alg, &step).members(), "02");
}

#[test]
fn test_order_predicates() {
    let mut alg = Logic;
    let domain = Domain::new(3);

    // A chain 0 ≤ 1 ≤ 2.
    let chain = Relation::parse(domain, 2, "00 01 02 11 12 22").expect("ok");
    assert!(chain.is_reflexive(&mut alg));
    assert!(chain.is_antisymmetric(&mut alg));
    assert!(chain.is_transitive(&mut alg));
    assert!(chain.is_partial_order(&mut alg));
    assert!(!chain.is_symmetric(&mut alg));
    assert!(!chain.is_equivalence(&mut alg));

    // Two blocks {0, 1} and {2}.
    let blocks = Relation::parse(domain, 2, "00 01 10 11 22").expect("ok");
    assert!(blocks.is_equivalence(&mut alg));
    assert!(!blocks.is_antisymmetric(&mut alg));
}

#[test]
fn test_diagonal_rotate() {
    let mut alg = Logic;
    let domain = Domain::new(3);
    let relation = Relation::parse(domain, 2, "00 12 22").expect("ok");

    assert_eq!(relation.diagonal().members(), "0 2");
    // Rotating a binary relation is its converse.
    assert!(relation
        .rotate()
        .is_equal(&mut alg, &relation.invert()));
}

#[test]
fn test_concrete_enumeration_counts() {
    // Cross-check the predicates against known counts by brute
    // force: 5 equivalences (Bell(3)) and 19 partial orders on a
    // 3-element domain.
    let mut alg = Logic;
    let domain = Domain::new(3);
    let mut equivalences = 0;
    let mut orders = 0;

    for mask in 0u32..(1 << 9) {
        let relation =
            Relation::from_fn(domain, 2, |coords| mask & (1 << (3 * coords[0] + coords[1])) != 0);
        if relation.is_equivalence(&mut alg) {
            equivalences += 1;
        }
        if relation.is_partial_order(&mut alg) {
            orders += 1;
        }
    }

    assert_eq!(equivalences, 5);
    assert_eq!(orders, 19);
}

#[test]
fn test_n5_covering() {
    // The covering relation of the N5 lattice order.
    let mut alg = Logic;
    let domain = Domain::new(5);
    let order = Relation::parse(domain, 2, "00 01 02 03 04 11 12 13 22 23 33 44 43").expect("ok");

    assert!(order.is_partial_order(&mut alg));
    assert_eq!(order.covering(&mut alg).members(), "01 04 12 23 43");
}
