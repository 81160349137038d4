//! End-to-end identity-reference tests.
//!
//! Resolution, semantic equality and membership diffs are driven against
//! an in-memory directory that evaluates the resolver's LDAP filters.

mod common;
mod reconciliation;
mod resolution;
