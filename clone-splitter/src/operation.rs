//! Finite operations as graphs: a k-ary operation is stored as an
//! arity-(k+1) tensor whose entry at (i₁, …, iₖ, o) says whether
//! applying the operation to the argument tuple yields `o`.  The
//! output axis comes last.
//!
//! Totality and single-valuedness are not structural: a symbolic
//! operation is just a tensor of literals, and `is_operation` is the
//! constraint that makes it a function.  Concrete operations built
//! with `from_table` satisfy it by construction.
use crate::boolean::BooleanAlgebra;
use crate::cnf::SatAlgebra;
use crate::relation::Domain;
use crate::relation::Relation;
use crate::tensor::Tensor;
use satlink::Literal;

/// A possibly partial, possibly multi-valued k-ary operation graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation<E> {
    domain: Domain,
    tensor: Tensor<E>,
}

impl<E: Copy + Eq + std::fmt::Debug> Operation<E> {
    /// Wraps a graph tensor of order arity + 1.
    #[must_use]
    pub fn from_graph(domain: Domain, tensor: Tensor<E>) -> Self {
        assert!(tensor.order() >= 1);
        assert!(tensor.dims().iter().all(|&dim| dim == domain.size()));
        Self { domain, tensor }
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Number of arguments; one less than the graph tensor's order.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.tensor.order() - 1
    }

    #[must_use]
    pub fn tensor(&self) -> &Tensor<E> {
        &self.tensor
    }

    /// The graph viewed as a plain relation of arity k+1.
    #[must_use]
    pub fn graph(&self) -> Relation<E> {
        Relation::from_tensor(self.domain, self.tensor.clone())
    }

    /// True iff the graph is a total, single-valued function: exactly
    /// one output per argument tuple.
    pub fn is_operation<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        let functional = self
            .tensor
            .fold(1, |outputs| alg.one(outputs.iter().copied()));
        functional
            .fold(self.arity(), |chunk| alg.all(chunk.iter().copied()))
            .scalar()
    }

    /// True iff a unary graph is a permutation: exactly one output
    /// per input and exactly one input per output.
    pub fn is_permutation<A>(&self, alg: &mut A) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        assert_eq!(self.arity(), 1);

        let size = self.domain.size();
        let forward = self
            .tensor
            .fold(1, |outputs| alg.one(outputs.iter().copied()))
            .fold(1, |chunk| alg.all(chunk.iter().copied()))
            .scalar();
        let backward = self
            .tensor
            .reshape(vec![size, size], &[1, 0])
            .fold(1, |inputs| alg.one(inputs.iter().copied()))
            .fold(1, |chunk| alg.all(chunk.iter().copied()))
            .scalar();
        alg.and(forward, backward)
    }

    /// True iff the operation preserves `relation`: for every matrix
    /// of arguments whose k columns are all members, the row-wise
    /// image tuple is a member too.
    ///
    /// Axis layout of the intermediate tensor: the m×k argument
    /// matrix first (row i, column j at axis i·k + j), then the m
    /// result coordinates, so the existential fold over the result
    /// tuple is a trailing fold.
    pub fn preserves<A>(&self, alg: &mut A, relation: &Relation<E>) -> E
    where
        A: BooleanAlgebra<Elem = E>,
    {
        assert_eq!(self.domain, relation.domain());

        let size = self.domain.size();
        let k = self.arity();
        let m = relation.arity();
        let args = m * k;
        let full = vec![size; args + m];

        // One application of the operation per relation coordinate:
        // row i of the argument matrix feeds it, result axis i pins
        // its output.
        let mut rows: Option<Tensor<E>> = None;
        for i in 0..m {
            let mut map = Vec::with_capacity(k + 1);
            for j in 0..k {
                map.push(i * k + j);
            }
            map.push(args + i);

            let row = self.tensor.reshape(full.clone(), &map);
            rows = Some(match rows {
                None => row,
                Some(acc) => acc.map2(&row, |a, b| alg.and(a, b)),
            });
        }
        let rows = rows.expect("relations have arity >= 1");

        // ... and the assembled result tuple must be a member.
        let result_map: Vec<usize> = (0..m).map(|i| args + i).collect();
        let target = relation.tensor().reshape(full, &result_map);
        let image = rows.map2(&target, |a, b| alg.and(a, b));
        let image_ok = image.fold(m, |chunk| alg.any(chunk.iter().copied()));

        // Premise: every column of the argument matrix is a member.
        let arg_dims = vec![size; args];
        let mut columns = Tensor::constant(arg_dims.clone(), alg.top());
        for j in 0..k {
            let map: Vec<usize> = (0..m).map(|i| i * k + j).collect();
            let column = relation.tensor().reshape(arg_dims.clone(), &map);
            columns = columns.map2(&column, |a, b| alg.and(a, b));
        }

        let pointwise = columns.map2(&image_ok, |premise, conclusion| alg.leq(premise, conclusion));
        pointwise
            .fold(args, |chunk| alg.all(chunk.iter().copied()))
            .scalar()
    }
}

impl Operation<bool> {
    /// Builds a total operation from its value table.
    pub fn from_table<F>(domain: Domain, arity: usize, f: F) -> Self
    where
        F: Fn(&[usize]) -> usize,
    {
        let size = domain.size();
        let tensor = Tensor::from_fn(vec![size; arity + 1], |coords| {
            let (args, output) = coords.split_at(arity);
            let value = f(args);
            assert!(value < size);
            value == output[0]
        });
        Self { domain, tensor }
    }

    /// The projection onto argument `index`.
    #[must_use]
    pub fn projection(domain: Domain, arity: usize, index: usize) -> Self {
        assert!(index < arity);
        Self::from_table(domain, arity, |args| args[index])
    }

    /// Injects a concrete operation into another carrier.
    #[must_use]
    pub fn lift<A: BooleanAlgebra>(&self, alg: &A) -> Operation<A::Elem> {
        Operation {
            domain: self.domain,
            tensor: self.tensor.map(|member| alg.lift(member)),
        }
    }
}

impl Operation<Literal> {
    /// An operation graph of fresh solver variables, one per cell.
    pub fn symbolic<A: SatAlgebra>(alg: &mut A, domain: Domain, arity: usize) -> Self {
        Operation {
            domain,
            tensor: Tensor::from_fn(vec![domain.size(); arity + 1], |_| alg.fresh()),
        }
    }

    /// Reads the operation back out of a satisfying assignment.
    #[must_use]
    pub fn decode<A: SatAlgebra>(&self, alg: &A) -> Operation<bool> {
        Operation {
            domain: self.domain,
            tensor: self.tensor.map(|lit| alg.decode(lit)),
        }
    }
}

#[cfg(test)]
use crate::boolean::Logic;

#[cfg(test)]
fn meet(domain: Domain) -> Operation<bool> {
    Operation::from_table(domain, 2, |args| args[0].min(args[1]))
}

#[test]
fn test_from_table_is_operation() {
    let mut alg = Logic;
    let domain = Domain::new(3);

    assert!(meet(domain).is_operation(&mut alg));
    assert!(Operation::projection(domain, 3, 1).is_operation(&mut alg));

    // A multi-valued graph is not an operation.
    let junk = Operation::from_graph(domain, Tensor::constant(vec![3, 3], true));
    assert!(!junk.is_operation(&mut alg));
}

#[test]
fn test_is_permutation() {
    let mut alg = Logic;
    let domain = Domain::new(3);

    let shift = Operation::from_table(domain, 1, |args| (args[0] + 1) % 3);
    assert!(shift.is_permutation(&mut alg));

    let collapse = Operation::from_table(domain, 1, |_| 0);
    assert!(collapse.is_operation(&mut alg));
    assert!(!collapse.is_permutation(&mut alg));
}

#[test]
fn test_meet_preserves_order() {
    // The meet of a chain preserves its order relation; coordinate
    // negation does not.
    let mut alg = Logic;
    let domain = Domain::new(2);
    let order = Relation::parse(domain, 2, "00 01 11").expect("ok");

    assert!(meet(domain).preserves(&mut alg, &order));

    let negation = Operation::from_table(domain, 1, |args| 1 - args[0]);
    assert!(!negation.preserves(&mut alg, &order));
}

#[test]
fn test_join_breaks_meet_graph() {
    // The join operation does not commute with the meet's own graph
    // relation, while the meet trivially does.
    let mut alg = Logic;
    let domain = Domain::new(2);
    let meet_graph = meet(domain).graph();
    let join = Operation::from_table(domain, 2, |args| args[0].max(args[1]));

    assert!(meet(domain).preserves(&mut alg, &meet_graph));
    assert!(!join.preserves(&mut alg, &meet_graph));
}

#[test]
fn test_projections_preserve_everything() {
    // Projections preserve every relation, here sampled on a domain
    // of size 3.
    let mut alg = Logic;
    let domain = Domain::new(3);
    let samples = [
        Relation::parse(domain, 2, "01 12 20").expect("ok"),
        Relation::parse(domain, 2, "00 01 02 11 22").expect("ok"),
        Relation::parse(domain, 1, "0 2").expect("ok"),
    ];

    for relation in samples.iter() {
        for index in 0..2 {
            let projection = Operation::projection(domain, 2, index);
            assert!(projection.preserves(&mut alg, relation));
        }
    }
}

#[test]
fn test_constants_preserve_only_their_member() {
    // A constant operation preserves a unary relation iff the
    // constant is a member.
    let mut alg = Logic;
    let domain = Domain::new(2);
    let zero_only = Relation::parse(domain, 1, "0").expect("ok");

    let const_zero = Operation::from_table(domain, 1, |_| 0);
    let const_one = Operation::from_table(domain, 1, |_| 1);
    assert!(const_zero.preserves(&mut alg, &zero_only));
    assert!(!const_one.preserves(&mut alg, &zero_only));
}
