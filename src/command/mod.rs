//! Command Module
//!
//! Commands are the unit of work of the store. Each command knows how to run in
//! two places:
//!
//! 1. **`resolve`** at the coordinator: find the owning node(s) through the
//!    `Router`, send the command (or per-node narrowed copies) and merge the
//!    partial results.
//! 2. **`apply`** at the owning node, inside its staged executor: perform the
//!    operation against local storage.
//!
//! The set of operations is closed (`CommandKind`), so both sides are exhaustive
//! matches rather than per-type overrides.

pub mod apply;
pub mod resolve;
pub mod types;

pub use types::{Command, CommandId, CommandKind, CommandResult};
