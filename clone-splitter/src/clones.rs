//! Clone presentations.  A clone, a composition-closed set of
//! operations containing the projections, is handled here through
//! one of two finite descriptions: the operations that generate it,
//! or the relations its members must preserve.
//!
//! Both descriptions expose a *possible-membership* filter built from
//! the current list.  The filter is a sound over-approximation: it
//! never rejects a genuine member (no false negatives), but it may
//! accept impostors while the list is incomplete.  That direction is
//! a caller contract, not something checked at runtime; the searches
//! in `search` lean on it, using exact re-verification to catch the
//! false positives and the lists' append-only growth to rule each one
//! out permanently.
use crate::boolean::BooleanAlgebra;
use crate::boolean::Logic;
use crate::operation::Operation;
use crate::relation::Domain;
use crate::relation::Relation;

/// A clone presented by a finite, append-only list of generating
/// operations.  Candidate *relations* are filtered against it: a
/// relation every generator preserves is possibly an invariant.
pub trait OperationBasis {
    fn domain(&self) -> Domain;

    /// The operations currently known to be members.
    fn operations(&self) -> &[Operation<bool>];

    /// Permanently appends `op`; refinement never removes anything.
    fn learn(&mut self, op: Operation<bool>);

    /// Compiled filter: `relation` is preserved by every listed
    /// operation.  Written once against the carrier, so the same code
    /// both compiles the SAT-side filter and decides the concrete
    /// default of `is_invariant`.
    fn possible_invariant<A: BooleanAlgebra>(
        &self,
        alg: &mut A,
        relation: &Relation<A::Elem>,
    ) -> A::Elem {
        let mut result = alg.top();
        for op in self.operations() {
            let lifted = op.lift(alg);
            let preserved = lifted.preserves(alg, relation);
            result = alg.and(result, preserved);
        }
        result
    }

    /// Exact invariant test.  The default evaluates the filter
    /// concretely, which is exact when the listed generators are the
    /// whole story; presentations that know more must override.
    fn is_invariant(&self, relation: &Relation<bool>) -> bool {
        self.possible_invariant(&mut Logic, relation)
    }
}

/// A clone presented by a finite, append-only list of defining
/// relations.  Candidate *operations* are filtered against it: an
/// operation preserving every listed relation is possibly a member.
pub trait RelationBasis {
    fn domain(&self) -> Domain;

    /// The relations every member must preserve.
    fn relations(&self) -> &[Relation<bool>];

    /// Permanently appends `relation`.
    fn learn(&mut self, relation: Relation<bool>);

    /// Compiled filter: `operation` preserves every listed relation.
    fn possible_member<A: BooleanAlgebra>(
        &self,
        alg: &mut A,
        operation: &Operation<A::Elem>,
    ) -> A::Elem {
        let mut result = alg.top();
        for relation in self.relations() {
            let lifted = relation.lift(alg);
            let preserved = operation.preserves(alg, &lifted);
            result = alg.and(result, preserved);
        }
        result
    }

    /// Exact membership test; same contract as
    /// `OperationBasis::is_invariant`.
    fn is_member(&self, operation: &Operation<bool>) -> bool {
        self.possible_member(&mut Logic, operation)
    }
}

/// The plain finitely generated clone: nothing beyond the list.
pub struct GeneratedOps {
    domain: Domain,
    operations: Vec<Operation<bool>>,
}

impl GeneratedOps {
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(domain: Domain, operations: Vec<Operation<bool>>) -> Self {
        assert!(operations.iter().all(|op| op.domain() == domain));
        Self { domain, operations }
    }
}

impl OperationBasis for GeneratedOps {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn operations(&self) -> &[Operation<bool>] {
        &self.operations
    }

    fn learn(&mut self, op: Operation<bool>) {
        assert_eq!(op.domain(), self.domain);
        self.operations.push(op);
    }
}

/// The plain finitely related clone: nothing beyond the list.
pub struct PreservedRels {
    domain: Domain,
    relations: Vec<Relation<bool>>,
}

impl PreservedRels {
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            relations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(domain: Domain, relations: Vec<Relation<bool>>) -> Self {
        assert!(relations.iter().all(|rel| rel.domain() == domain));
        Self { domain, relations }
    }
}

impl RelationBasis for PreservedRels {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn relations(&self) -> &[Relation<bool>] {
        &self.relations
    }

    fn learn(&mut self, relation: Relation<bool>) {
        assert_eq!(relation.domain(), self.domain);
        self.relations.push(relation);
    }
}

#[test]
fn test_generated_filter() {
    // The meet-generated clone admits the chain order as a possible
    // invariant, and rejects the relation the meet fails to preserve.
    let domain = Domain::new(2);
    let meet = Operation::from_table(domain, 2, |args| args[0].min(args[1]));
    let clone = GeneratedOps::with(domain, vec![meet]);

    let order = Relation::parse(domain, 2, "00 01 11").expect("ok");
    assert!(clone.is_invariant(&order));

    // {(0,1), (1,0)} meets down to (0,0), which is missing.
    let cross = Relation::parse(domain, 2, "01 10").expect("ok");
    assert!(!clone.is_invariant(&cross));
}

#[test]
fn test_related_filter() {
    // The order-defined clone admits monotone operations only.
    let domain = Domain::new(2);
    let order = Relation::parse(domain, 2, "00 01 11").expect("ok");
    let clone = PreservedRels::with(domain, vec![order]);

    let meet = Operation::from_table(domain, 2, |args| args[0].min(args[1]));
    assert!(clone.is_member(&meet));

    let negation = Operation::from_table(domain, 1, |args| 1 - args[0]);
    assert!(!clone.is_member(&negation));
}

#[test]
fn test_empty_bases_admit_everything() {
    // With no constraints listed, the filters are vacuously true.
    let domain = Domain::new(2);
    let ops = GeneratedOps::new(domain);
    let rels = PreservedRels::new(domain);

    let anything = Relation::parse(domain, 2, "10").expect("ok");
    let negation = Operation::from_table(domain, 1, |args| 1 - args[0]);
    assert!(ops.is_invariant(&anything));
    assert!(rels.is_member(&negation));
}
