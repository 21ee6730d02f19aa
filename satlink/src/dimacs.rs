//! Clause storage and DIMACS CNF serialization for the external
//! adapter.  A long-running search can emit millions of literals, so
//! clauses are buffered in fixed-size blocks: appending never has to
//! copy everything already buffered, the way one ever-doubling vector
//! would.
use super::Literal;
use std::io::Write;

/// Literals per block.  A clause longer than this gets a dedicated
/// block of exactly its size.
const BLOCK_LEN: usize = 1 << 16;

/// An append-only clause stream.  Each clause is stored as its
/// literals followed by a `0` sentinel, mirroring the DIMACS body
/// format so serialization is a single pass.
#[derive(Default)]
pub struct ClauseBuffer {
    blocks: Vec<Vec<Literal>>,
    clauses: u64,
}

impl ClauseBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clauses appended since construction or `clear`.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses == 0
    }

    /// Appends one clause.  Literals must be non-zero; zero is the
    /// sentinel and may not appear inside a clause.
    pub fn push(&mut self, literals: &[Literal]) {
        assert!(literals.iter().all(|&lit| lit != 0));

        let needed = literals.len() + 1;
        let fits = match self.blocks.last() {
            Some(block) => block.capacity() - block.len() >= needed,
            None => false,
        };
        if !fits {
            self.blocks.push(Vec::with_capacity(BLOCK_LEN.max(needed)));
        }

        let block = self.blocks.last_mut().expect("just ensured");
        block.extend_from_slice(literals);
        block.push(0);
        self.clauses += 1;
    }

    /// Drops all buffered clauses.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.clauses = 0;
    }

    /// Serializes the buffer as a DIMACS CNF problem: a
    /// `p cnf <variables> <clauses>` header, then one line per clause
    /// of space-separated literals terminated by `0`.
    ///
    /// # Errors
    ///
    /// Propagates any write failure.
    pub fn write_dimacs<W: Write>(&self, variables: u64, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "p cnf {} {}", variables, self.clauses)?;

        for block in self.blocks.iter() {
            let mut first = true;
            for &lit in block.iter() {
                if lit == 0 {
                    writeln!(out, " 0")?;
                    first = true;
                } else {
                    if !first {
                        write!(out, " ")?;
                    }
                    write!(out, "{}", lit)?;
                    first = false;
                }
            }
        }

        Ok(())
    }
}

#[test]
fn test_push_and_count() {
    // Three clauses across default blocks.
    let mut buffer = ClauseBuffer::new();

    assert!(buffer.is_empty());
    buffer.push(&[1, -2]);
    buffer.push(&[2, 3, -1]);
    buffer.push(&[-3]);
    assert_eq!(buffer.len(), 3);
}

#[test]
fn test_write_dimacs() {
    // The serialized form matches the DIMACS format byte for byte.
    let mut buffer = ClauseBuffer::new();

    buffer.push(&[1]);
    buffer.push(&[-1, 2]);
    buffer.push(&[1, -2, 3]);

    let mut bytes = Vec::new();
    buffer.write_dimacs(3, &mut bytes).expect("ok");
    assert_eq!(
        String::from_utf8(bytes).expect("utf8"),
        "p cnf 3 3\n1 0\n-1 2 0\n1 -2 3 0\n"
    );
}

#[test]
fn test_oversized_clause() {
    // A clause wider than one block still round-trips.
    let mut buffer = ClauseBuffer::new();
    let wide: Vec<Literal> = (1..=(BLOCK_LEN as Literal + 10)).collect();

    buffer.push(&[1]);
    buffer.push(&wide);
    assert_eq!(buffer.len(), 2);

    let mut bytes = Vec::new();
    buffer
        .write_dimacs(wide.len() as u64, &mut bytes)
        .expect("ok");
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.ends_with(" 0\n"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_clear() {
    // `clear` forgets everything.
    let mut buffer = ClauseBuffer::new();

    buffer.push(&[1, 2]);
    buffer.clear();
    assert!(buffer.is_empty());

    let mut bytes = Vec::new();
    buffer.write_dimacs(0, &mut bytes).expect("ok");
    assert_eq!(String::from_utf8(bytes).expect("utf8"), "p cnf 0 0\n");
}

#[test]
#[should_panic]
fn test_zero_literal_rejected() {
    ClauseBuffer::new().push(&[1, 0, 2]);
}
