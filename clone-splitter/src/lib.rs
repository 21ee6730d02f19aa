//! Deciding properties of finite relational and algebraic structures
//! by compiling them to SAT.
//!
//! The layering mirrors the two ways a property can be asked.  The
//! tensor algebra of `tensor`, `relation`, and `operation` is written
//! once against the carrier trait in `boolean`; run it over `Logic`
//! and it *evaluates* a property of concrete structures, run it over
//! `CnfAlgebra` (usually wrapped in `CachedOps` for structural gate
//! sharing) and the very same code *compiles* the property into
//! clauses for a `satlink` backend.  The searches in `search` play
//! the two modes against each other: SAT proposes a witness through
//! the over-approximate clone filters of `clones`, concrete
//! evaluation audits it, and every impostor caught by the audit is
//! learned into a filter before the next round.
//!
//! Everything is single-threaded and session-scoped: one `SatAlgebra`
//! value owns its solver, its counters, and its gate cache, and
//! `clear` is the only reset.
pub mod boolean;
pub mod cache;
pub mod clones;
pub mod cnf;
pub mod operation;
pub mod relation;
pub mod search;
pub mod tensor;

pub use boolean::BooleanAlgebra;
pub use boolean::Logic;
pub use cache::CachedOps;
pub use clones::GeneratedOps;
pub use clones::OperationBasis;
pub use clones::PreservedRels;
pub use clones::RelationBasis;
pub use cnf::CnfAlgebra;
pub use cnf::SatAlgebra;
pub use operation::Operation;
pub use relation::Domain;
pub use relation::ParseError;
pub use relation::Relation;
pub use search::count_assignments;
pub use search::operation_membership;
pub use search::relation_membership;
pub use search::Membership;
pub use search::Split;
pub use search::SplitFinder;
pub use tensor::Tensor;
