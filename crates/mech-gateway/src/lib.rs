//! The `mech` binary's library half: CLI parsing, config loading,
//! bootstrap wiring, persisted memory, controller transport, and
//! diagnostics. Split from `main.rs` the way the teacher splits
//! `gateway` into a library crate plus a thin binary, so each piece is
//! unit-testable on its own.

pub mod bootstrap;
pub mod cli;
pub mod doctor;
pub mod memory;
pub mod state;
pub mod transport;
