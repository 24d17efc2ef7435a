//! Typed invariant-violation reporting, the Rust rendition of the
//! `ASSERT(cond, msg)` macro used throughout the tree-invariant checkers this
//! crate is grounded on. `check_invariants` is a plain public function rather
//! than a debug-only assertion: callers (tests, or any caller that wants to
//! verify a tree after a custom mutation) invoke it explicitly.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node {0} is its own child")]
    SelfReferentialChild(u32),

    #[error("node {child} does not point back to its parent {parent}")]
    ParentMismatch { parent: u32, child: u32 },

    #[error("BST invariant violated at node {0}")]
    OutOfOrder(u32),

    #[error("red node {0} has a red child")]
    RedRedViolation(u32),

    #[error("black-height mismatch at node {node}: expected {expected}, found {found}")]
    BlackHeightMismatch {
        node: u32,
        expected: u32,
        found: u32,
    },

    #[error("avl balance factor at node {node} is {found}, outside [-1, 1]")]
    BalanceFactorOutOfRange { node: u32, found: i8 },

    #[error("cached height_diff at node {node} is {cached} but recomputed height difference is {actual}")]
    HeightDiffMismatch { node: u32, cached: i8, actual: i8 },

    #[error("metadata at node {0} does not match recompute(children)")]
    MetadataDrift(u32),
}

pub type InvariantResult<T = ()> = Result<T, InvariantViolation>;
