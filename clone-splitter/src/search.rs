//! The counterexample-guided searches, and the model enumeration
//! they are built on.
//!
//! Every search here follows the same rhythm: compile a question
//! about an unknown relation and/or operation into one SAT instance,
//! decode the answer, and re-verify it against an exact oracle.  The
//! possible-membership filters of `clones` may admit false positives;
//! a failed verification is not an error but the refinement
//! signal, and the offending witness is learned into a basis so the
//! same impostor can never come back.  Lists only grow and the
//! universe of tensors at fixed arity is finite, so every loop
//! terminates.
use crate::boolean::Logic;
use crate::clones::OperationBasis;
use crate::clones::RelationBasis;
use crate::cnf::SatAlgebra;
use crate::operation::Operation;
use crate::relation::Relation;
use satlink::Literal;
use satlink::SolverError;

/// Counts the satisfying assignments of `cells` under the constraints
/// already asserted, blocking each model as it is found.  The cells
/// must be problem variables (as produced by `symbolic`), not gates.
///
/// # Errors
///
/// Propagates solver failures; the count so far is lost.
pub fn count_assignments<A: SatAlgebra>(
    alg: &mut A,
    cells: &[Literal],
) -> Result<u64, SolverError> {
    let mut count = 0;

    while alg.solve()? {
        count += 1;
        let block: Vec<Literal> = cells
            .iter()
            .map(|&cell| if alg.decode(cell) { -cell } else { cell })
            .collect();
        alg.block(&block);
    }
    Ok(count)
}

/// Outcome of a separation search.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Split {
    /// A verified separating pair: the relation is an invariant of
    /// the operation side's clone, the operation is a member of the
    /// relation side's clone, and the operation does not preserve the
    /// relation.
    Witness {
        relation: Relation<bool>,
        operation: Operation<bool>,
    },

    /// No separating pair exists at the probed arities.
    Exhausted { rounds: u64 },
}

/// Searches for a relation/operation pair separating two clone
/// presentations at fixed arities.
pub struct SplitFinder {
    relation_arity: usize,
    operation_arity: usize,
    widen: bool,
}

impl SplitFinder {
    #[must_use]
    pub fn new(relation_arity: usize, operation_arity: usize) -> Self {
        assert!(relation_arity >= 1);
        Self {
            relation_arity,
            operation_arity,
            widen: false,
        }
    }

    /// Requires each candidate relation to strictly extend the last
    /// rejected one.  A heuristic: monotone widening narrows the
    /// search frontier, at the price of possibly reporting exhaustion
    /// early.
    #[must_use]
    pub fn widening(mut self) -> Self {
        self.widen = true;
        self
    }

    /// Runs the refinement loop to completion.  `generated` filters
    /// the candidate relation, `related` filters the candidate
    /// operation; both may grow as impostor witnesses are learned.
    ///
    /// # Errors
    ///
    /// Propagates solver failures.
    pub fn search<A, G, R>(
        &self,
        alg: &mut A,
        generated: &mut G,
        related: &mut R,
    ) -> Result<Split, SolverError>
    where
        A: SatAlgebra,
        G: OperationBasis,
        R: RelationBasis,
    {
        let domain = generated.domain();
        assert_eq!(domain, related.domain());

        let mut last_rejected: Option<Relation<bool>> = None;
        let mut rounds = 0;
        loop {
            rounds += 1;
            alg.clear();

            let relation = Relation::symbolic(alg, domain, self.relation_arity);
            let operation = Operation::symbolic(alg, domain, self.operation_arity);

            let well_formed = operation.is_operation(alg);
            alg.ensure(well_formed);
            let preserved = operation.preserves(alg, &relation);
            let broken = alg.not(preserved);
            alg.ensure(broken);
            let admitted_relation = generated.possible_invariant(alg, &relation);
            alg.ensure(admitted_relation);
            let admitted_operation = related.possible_member(alg, &operation);
            alg.ensure(admitted_operation);

            if self.widen {
                if let Some(previous) = &last_rejected {
                    let lifted = previous.lift(alg);
                    let extends = lifted.is_subset(alg, &relation);
                    alg.ensure(extends);
                    let same = lifted.is_equal(alg, &relation);
                    let strict = alg.not(same);
                    alg.ensure(strict);
                }
            }

            if !alg.solve()? {
                log::info!("separation exhausted after {} rounds", rounds);
                return Ok(Split::Exhausted { rounds });
            }

            let relation = relation.decode(alg);
            let operation = operation.decode(alg);

            if !generated.is_invariant(&relation) {
                // A false positive of the relation filter: force every
                // future candidate operation to preserve it, which
                // shuts this relation out of the instance for good.
                log::info!("round {}: relation witness rejected, learning it", rounds);
                last_rejected = Some(relation.clone());
                related.learn(relation);
                continue;
            }
            if !related.is_member(&operation) {
                // Dually: every future candidate relation must be
                // preserved by this impostor.
                log::info!("round {}: operation witness rejected, learning it", rounds);
                generated.learn(operation);
                continue;
            }

            log::info!("separation witness verified after {} rounds", rounds);
            return Ok(Split::Witness {
                relation,
                operation,
            });
        }
    }
}

/// Outcome of a single-candidate membership probe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Membership<W> {
    /// No separating witness exists at the probed arity.  `basis`
    /// holds the indices of the presentation elements the search had
    /// to activate, the minimal separating set it converged on.
    Member { basis: Vec<usize> },

    /// A verified witness excluding the candidate.
    Excluded { witness: W },
}

/// Decides whether `candidate` preserves every invariant (of the
/// probed arity) of the clone generated by `generators`.
///
/// Generators are activated lazily: the instance only ever constrains
/// the candidate relation by the generators that were actually caught
/// admitting a false positive, which keeps the compiled instance
/// small.  Each failed verification activates exactly one more
/// generator, so the loop runs at most `generators.len() + 1` rounds.
///
/// # Errors
///
/// Propagates solver failures.
pub fn operation_membership<A: SatAlgebra>(
    alg: &mut A,
    candidate: &Operation<bool>,
    generators: &[Operation<bool>],
    relation_arity: usize,
) -> Result<Membership<Relation<bool>>, SolverError> {
    let domain = candidate.domain();
    assert!(generators.iter().all(|gen| gen.domain() == domain));

    let mut active: Vec<usize> = Vec::new();
    loop {
        alg.clear();

        let relation = Relation::symbolic(alg, domain, relation_arity);
        for &index in &active {
            let lifted = generators[index].lift(alg);
            let kept = lifted.preserves(alg, &relation);
            alg.ensure(kept);
        }
        let lifted = candidate.lift(alg);
        let preserved = lifted.preserves(alg, &relation);
        let broken = alg.not(preserved);
        alg.ensure(broken);

        if !alg.solve()? {
            return Ok(Membership::Member { basis: active });
        }

        let witness = relation.decode(alg);
        let culprit = generators
            .iter()
            .position(|gen| !gen.preserves(&mut Logic, &witness));
        match culprit {
            Some(index) => {
                debug_assert!(!active.contains(&index));
                log::debug!("activating generator {} against a false witness", index);
                active.push(index);
            }
            None => return Ok(Membership::Excluded { witness }),
        }
    }
}

/// Decides whether `candidate` is an invariant of the clone of all
/// operations (of the probed arity) preserving `relations`.  The
/// exact dual of `operation_membership`.
///
/// # Errors
///
/// Propagates solver failures.
pub fn relation_membership<A: SatAlgebra>(
    alg: &mut A,
    candidate: &Relation<bool>,
    relations: &[Relation<bool>],
    operation_arity: usize,
) -> Result<Membership<Operation<bool>>, SolverError> {
    let domain = candidate.domain();
    assert!(relations.iter().all(|rel| rel.domain() == domain));

    let mut active: Vec<usize> = Vec::new();
    loop {
        alg.clear();

        let operation = Operation::symbolic(alg, domain, operation_arity);
        let well_formed = operation.is_operation(alg);
        alg.ensure(well_formed);
        for &index in &active {
            let lifted = relations[index].lift(alg);
            let kept = operation.preserves(alg, &lifted);
            alg.ensure(kept);
        }
        let lifted = candidate.lift(alg);
        let preserved = operation.preserves(alg, &lifted);
        let broken = alg.not(preserved);
        alg.ensure(broken);

        if !alg.solve()? {
            return Ok(Membership::Member { basis: active });
        }

        let witness = operation.decode(alg);
        let culprit = relations
            .iter()
            .position(|rel| !witness.preserves(&mut Logic, rel));
        match culprit {
            Some(index) => {
                debug_assert!(!active.contains(&index));
                log::debug!("activating relation {} against a false witness", index);
                active.push(index);
            }
            None => return Ok(Membership::Excluded { witness }),
        }
    }
}

#[cfg(test)]
use crate::cache::CachedOps;
#[cfg(test)]
use crate::clones::GeneratedOps;
#[cfg(test)]
use crate::clones::PreservedRels;
#[cfg(test)]
use crate::cnf::CnfAlgebra;
#[cfg(test)]
use crate::relation::Domain;
#[cfg(test)]
use satlink::NativeSolver;

#[cfg(test)]
fn fresh_session() -> CachedOps<CnfAlgebra<NativeSolver>> {
    CachedOps::new(CnfAlgebra::new(NativeSolver::new()))
}

#[cfg(test)]
fn meet(domain: Domain) -> Operation<bool> {
    Operation::from_table(domain, 2, |args| args[0].min(args[1]))
}

#[cfg(test)]
fn chain_order(domain: Domain) -> Relation<bool> {
    Relation::from_fn(domain, 2, |coords| coords[0] <= coords[1])
}

#[test]
fn test_count_equivalences_on_seven_points() {
    // Equivalence relations on a 7-element domain: the Bell number
    // B(7) = 877.
    let mut alg = fresh_session();
    let domain = Domain::new(7);

    let relation = Relation::symbolic(&mut alg, domain, 2);
    let holds = relation.is_equivalence(&mut alg);
    alg.ensure(holds);

    let cells = relation.tensor().elems().to_vec();
    assert_eq!(count_assignments(&mut alg, &cells).expect("ok"), 877);
}

#[test]
fn test_count_partial_orders_on_five_points() {
    // Labeled posets on a 5-element domain: 4231.
    let mut alg = fresh_session();
    let domain = Domain::new(5);

    let relation = Relation::symbolic(&mut alg, domain, 2);
    let holds = relation.is_partial_order(&mut alg);
    alg.ensure(holds);

    let cells = relation.tensor().elems().to_vec();
    assert_eq!(count_assignments(&mut alg, &cells).expect("ok"), 4231);
}

#[test]
fn test_count_permutations_on_seven_points() {
    // Unary operation graphs that are permutations of a 7-element
    // domain: 7! = 5040.
    let mut alg = fresh_session();
    let domain = Domain::new(7);

    let operation = Operation::symbolic(&mut alg, domain, 1);
    let well_formed = operation.is_operation(&mut alg);
    alg.ensure(well_formed);
    let bijective = operation.is_permutation(&mut alg);
    alg.ensure(bijective);

    let cells = operation.tensor().elems().to_vec();
    assert_eq!(count_assignments(&mut alg, &cells).expect("ok"), 5040);
}

#[test]
fn test_operation_membership_member() {
    // The meet trivially preserves every invariant of its own clone.
    // One round to catch the false witness, one to conclude: the
    // basis is exactly the activated generator.
    let mut alg = fresh_session();
    let domain = Domain::new(2);

    let verdict =
        operation_membership(&mut alg, &meet(domain), &[meet(domain)], 2).expect("ok");
    assert_eq!(verdict, Membership::Member { basis: vec![0] });
}

#[test]
fn test_operation_membership_excluded() {
    // The join breaks some binary invariant of the meet-generated
    // clone, so it is not a member.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let join = Operation::from_table(domain, 2, |args| args[0].max(args[1]));

    match operation_membership(&mut alg, &join, &[meet(domain)], 2).expect("ok") {
        Membership::Excluded { witness } => {
            // The witness is a genuine separator: meet-invariant,
            // join-broken.
            assert!(meet(domain).preserves(&mut Logic, &witness));
            assert!(!join.preserves(&mut Logic, &witness));
        }
        other => panic!("expected exclusion, got {:?}", other),
    }
}

#[test]
fn test_relation_membership_member() {
    // The chain order is an invariant of its own polymorphism clone.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let order = chain_order(domain);

    let verdict =
        relation_membership(&mut alg, &order, &[order.clone()], 2).expect("ok");
    assert_eq!(verdict, Membership::Member { basis: vec![0] });
}

#[test]
fn test_relation_membership_excluded() {
    // {(0,1)} is not invariant under all monotone unary operations:
    // a constant already breaks it.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let fragile = Relation::parse(domain, 2, "01").expect("ok");

    match relation_membership(&mut alg, &fragile, &[chain_order(domain)], 1).expect("ok") {
        Membership::Excluded { witness } => {
            assert!(witness.is_operation(&mut Logic));
            assert!(witness.preserves(&mut Logic, &chain_order(domain)));
            assert!(!witness.preserves(&mut Logic, &fragile));
        }
        other => panic!("expected exclusion, got {:?}", other),
    }
}

#[test]
fn test_split_finds_witness() {
    // Some monotone operation fails to preserve some meet-invariant
    // relation: the join and {(0,0), (0,1), (1,0)} are one such pair.
    // Both bases are exact here, so the first witness verifies.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let mut generated = GeneratedOps::with(domain, vec![meet(domain)]);
    let mut related = PreservedRels::with(domain, vec![chain_order(domain)]);

    match SplitFinder::new(2, 2)
        .search(&mut alg, &mut generated, &mut related)
        .expect("ok")
    {
        Split::Witness {
            relation,
            operation,
        } => {
            assert!(operation.is_operation(&mut Logic));
            assert!(meet(domain).preserves(&mut Logic, &relation));
            assert!(operation.preserves(&mut Logic, &chain_order(domain)));
            assert!(!operation.preserves(&mut Logic, &relation));
        }
        other => panic!("expected witness, got {:?}", other),
    }
}

#[test]
fn test_split_widening_still_finds_witness() {
    // With exact bases no relation is ever rejected, so widening is
    // inert and the same search still succeeds.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let mut generated = GeneratedOps::with(domain, vec![meet(domain)]);
    let mut related = PreservedRels::with(domain, vec![chain_order(domain)]);

    let outcome = SplitFinder::new(2, 2)
        .widening()
        .search(&mut alg, &mut generated, &mut related)
        .expect("ok");
    assert!(matches!(outcome, Split::Witness { .. }));
}

#[test]
fn test_split_exhausted() {
    // Preserving both singleton subsets pins a unary operation to
    // the identity, and the identity breaks nothing: no separating
    // pair exists.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let mut generated = GeneratedOps::new(domain);
    let mut related = PreservedRels::with(
        domain,
        vec![
            Relation::parse(domain, 1, "0").expect("ok"),
            Relation::parse(domain, 1, "1").expect("ok"),
        ],
    );

    let outcome = SplitFinder::new(2, 1)
        .search(&mut alg, &mut generated, &mut related)
        .expect("ok");
    assert_eq!(outcome, Split::Exhausted { rounds: 1 });
}

/// A relation basis whose exact oracle knows more than its list: it
/// only accepts idempotent operations, while the advertised relation
/// list starts empty.
#[cfg(test)]
struct IdempotentOnly {
    inner: PreservedRels,
}

#[cfg(test)]
impl RelationBasis for IdempotentOnly {
    fn domain(&self) -> Domain {
        self.inner.domain()
    }

    fn relations(&self) -> &[Relation<bool>] {
        self.inner.relations()
    }

    fn learn(&mut self, relation: Relation<bool>) {
        self.inner.learn(relation);
    }

    fn is_member(&self, operation: &Operation<bool>) -> bool {
        let size = self.domain().size();
        (0..size).all(|x| {
            let mut coords = vec![x; operation.arity() + 1];
            coords[operation.arity()] = x;
            operation.tensor().get(&coords)
        })
    }
}

#[test]
fn test_split_learns_impostor_operations() {
    // The only idempotent unary operation on two points is the
    // identity, which breaks nothing; but the filter list starts
    // empty, so the search must learn the impostors (constants,
    // negation) one by one before it can conclude exhaustion.
    let mut alg = fresh_session();
    let domain = Domain::new(2);
    let mut generated = GeneratedOps::with(domain, vec![meet(domain)]);
    let mut related = IdempotentOnly {
        inner: PreservedRels::new(domain),
    };

    match SplitFinder::new(1, 1)
        .search(&mut alg, &mut generated, &mut related)
        .expect("ok")
    {
        Split::Exhausted { rounds } => {
            assert!(rounds >= 2 && rounds <= 3);
            // Each rejected operation was learned into the operation
            // basis.
            assert!(generated.operations().len() >= 2);
            assert_eq!(generated.operations().len() as u64, rounds);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}
