//! Property-based tests for hashing and tree invariants

mod determinism;
