//! Integration test suite for Polyvault.
//!
//! These tests drive the public API of the core and wallet crates together:
//! seed files, derivation, transfer assembly against a state snapshot, and
//! offline signing, checked against decoded wire output.

pub mod helpers;
