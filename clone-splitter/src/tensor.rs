//! Dense multi-dimensional arrays of carrier values, the substrate
//! for relations and operation graphs.  A tensor is a value: every
//! transformation builds a new one, and shape disagreements are
//! precondition violations rather than recoverable errors.
//!
//! Elements are stored row-major, last axis fastest.  That layout is
//! load-bearing twice over: enumeration order is the lexicographic
//! order the text format promises, and the trailing axes of a tensor
//! are contiguous, so quantifier folds reduce whole chunks in place.

/// Returns the element count for `dims`, checking every advertised
/// dimension is positive.
fn element_count(dims: &[usize]) -> usize {
    assert!(dims.iter().all(|&dim| dim > 0));
    dims.iter().product()
}

/// Steps `coords` to the next row-major coordinate tuple.  Returns
/// false once every coordinate has wrapped around.
fn advance(coords: &mut [usize], dims: &[usize]) -> bool {
    for axis in (0..dims.len()).rev() {
        coords[axis] += 1;
        if coords[axis] < dims[axis] {
            return true;
        }
        coords[axis] = 0;
    }
    false
}

/// A dense tensor of `E` values.  `dims` may be empty: an order-0
/// tensor is a scalar with exactly one element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tensor<E> {
    dims: Vec<usize>,
    elems: Vec<E>,
}

impl<E: Copy> Tensor<E> {
    /// A tensor holding `elem` everywhere.
    #[must_use]
    pub fn constant(dims: Vec<usize>, elem: E) -> Self {
        let count = element_count(&dims);
        Self {
            elems: vec![elem; count],
            dims,
        }
    }

    /// A tensor computed pointwise, visiting coordinates in row-major
    /// order.
    pub fn from_fn<F>(dims: Vec<usize>, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> E,
    {
        let count = element_count(&dims);
        let mut coords = vec![0; dims.len()];
        let mut elems = Vec::with_capacity(count);

        loop {
            elems.push(f(&coords));
            if !advance(&mut coords, &dims) {
                break;
            }
        }

        assert_eq!(elems.len(), count);
        Self { dims, elems }
    }

    /// Wraps an existing row-major element vector.
    #[must_use]
    pub fn from_elems(dims: Vec<usize>, elems: Vec<E>) -> Self {
        assert_eq!(elems.len(), element_count(&dims));
        Self { dims, elems }
    }

    /// Number of axes.
    #[must_use]
    pub fn order(&self) -> usize {
        self.dims.len()
    }

    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The backing store, row-major.
    #[must_use]
    pub fn elems(&self) -> &[E] {
        &self.elems
    }

    /// The element at `coords`.
    #[must_use]
    pub fn get(&self, coords: &[usize]) -> E {
        self.elems[self.offset(coords)]
    }

    fn offset(&self, coords: &[usize]) -> usize {
        assert_eq!(coords.len(), self.dims.len());

        let mut offset = 0;
        for (&coord, &dim) in coords.iter().zip(self.dims.iter()) {
            assert!(coord < dim);
            offset = offset * dim + coord;
        }
        offset
    }

    /// The value of an order-0 tensor.
    #[must_use]
    pub fn scalar(&self) -> E {
        assert_eq!(self.order(), 0);
        self.elems[0]
    }

    /// Applies `f` elementwise.
    pub fn map<F, R: Copy>(&self, f: F) -> Tensor<R>
    where
        F: FnMut(E) -> R,
    {
        Tensor {
            dims: self.dims.clone(),
            elems: self.elems.iter().copied().map(f).collect(),
        }
    }

    /// Applies `f` elementwise to two tensors of identical shape.
    pub fn map2<F, T: Copy, R: Copy>(&self, other: &Tensor<T>, mut f: F) -> Tensor<R>
    where
        F: FnMut(E, T) -> R,
    {
        assert_eq!(self.dims, other.dims);

        Tensor {
            dims: self.dims.clone(),
            elems: self
                .elems
                .iter()
                .zip(other.elems.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Reduces the trailing `count` axes with `f`, which receives each
    /// contiguous chunk of elements sharing a prefix coordinate.
    pub fn fold<F>(&self, count: usize, f: F) -> Tensor<E>
    where
        F: FnMut(&[E]) -> E,
    {
        assert!(count <= self.order());

        let split = self.order() - count;
        let chunk: usize = self.dims[split..].iter().product();
        Tensor {
            dims: self.dims[..split].to_vec(),
            elems: self.elems.chunks(chunk).map(f).collect(),
        }
    }

    /// Re-indexes into a tensor of shape `dims`.  `axis_map[i]` names
    /// the new axis that feeds old axis `i`; several old axes may
    /// share a new axis (diagonal restriction) and new axes referenced
    /// by nobody broadcast.
    #[must_use]
    pub fn reshape(&self, dims: Vec<usize>, axis_map: &[usize]) -> Self {
        assert_eq!(axis_map.len(), self.order());
        for (old, &new) in axis_map.iter().enumerate() {
            assert_eq!(dims[new], self.dims[old]);
        }

        let mut scratch = vec![0; self.order()];
        Tensor::from_fn(dims, |coords| {
            for (slot, &source) in scratch.iter_mut().zip(axis_map.iter()) {
                *slot = coords[source];
            }
            self.get(&scratch)
        })
    }
}

#[test]
fn test_from_fn_get() {
    // Row-major layout: the last axis varies fastest.
    let tensor = Tensor::from_fn(vec![2, 3], |coords| 10 * coords[0] + coords[1]);

    assert_eq!(tensor.order(), 2);
    assert_eq!(tensor.elems(), &[0, 1, 2, 10, 11, 12]);
    assert_eq!(tensor.get(&[1, 2]), 12);
}

#[test]
fn test_scalar() {
    let tensor = Tensor::constant(vec![], 7);

    assert_eq!(tensor.order(), 0);
    assert_eq!(tensor.scalar(), 7);
}

#[test]
fn test_map2() {
    let left = Tensor::from_fn(vec![2, 2], |coords| coords[0]);
    let right = Tensor::from_fn(vec![2, 2], |coords| coords[1]);
    let sum = left.map2(&right, |a, b| a + b);

    assert_eq!(sum.elems(), &[0, 1, 1, 2]);
}

#[test]
fn test_fold_trailing() {
    // Folding the trailing axis reduces contiguous chunks.
    let tensor = Tensor::from_fn(vec![2, 3], |coords| 10 * coords[0] + coords[1]);
    let sums = tensor.fold(1, |chunk| chunk.iter().sum());

    assert_eq!(sums.dims(), &[2]);
    assert_eq!(sums.elems(), &[3, 33]);

    // Folding all axes yields a scalar; folding none copies.
    assert_eq!(tensor.fold(2, |chunk| chunk.iter().sum()).scalar(), 36);
    assert_eq!(tensor.fold(0, |chunk| chunk[0]).elems(), tensor.elems());
}

#[test]
fn test_reshape_transpose() {
    let tensor = Tensor::from_fn(vec![2, 3], |coords| 10 * coords[0] + coords[1]);
    let transposed = tensor.reshape(vec![3, 2], &[1, 0]);

    assert_eq!(transposed.get(&[2, 1]), tensor.get(&[1, 2]));
}

#[test]
fn test_reshape_broadcast_and_diagonal() {
    let vector = Tensor::from_fn(vec![3], |coords| coords[0]);

    // Broadcasting along a fresh axis repeats the data.
    let wide = vector.reshape(vec![2, 3], &[1]);
    assert_eq!(wide.get(&[0, 2]), 2);
    assert_eq!(wide.get(&[1, 2]), 2);

    // Mapping two old axes onto one new axis restricts a square
    // tensor to its diagonal.
    let square = Tensor::from_fn(vec![3, 3], |coords| 10 * coords[0] + coords[1]);
    let diagonal = square.reshape(vec![3], &[0, 0]);
    assert_eq!(diagonal.elems(), &[0, 11, 22]);
}

#[test]
#[should_panic]
fn test_shape_mismatch() {
    let left = Tensor::constant(vec![2], 0);
    let right = Tensor::constant(vec![3], 0);

    left.map2(&right, |a, b| a + b);
}
