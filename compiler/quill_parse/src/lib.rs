//! Quill Parse - the recovery engine and declaration assembler.
//!
//! Fulfils the analysis engine's parser contract:
//!
//! - [`step`] advances a [`RecoveryState`] by one token; it is a
//!   deterministic function of (prior state, token), exposes whether end of
//!   input has been reached, and whether the current frame carries a
//!   synthesized recovery repair.
//! - [`assemble`] turns a token stream into the top-level declaration
//!   sequence, with recovery placeholders where syntax was repaired.
//!
//! # Module Organization
//!
//! - `token_set`: bitset token sets and recovery boundaries
//! - `recovery`: the deterministic recovery automaton
//! - `assemble`: declaration assembly

mod assemble;
mod recovery;
mod token_set;

pub use assemble::{assemble, Assembled};
pub use recovery::{replay, step, Frame, RecoveryState, Repair, RepairKind};
pub use token_set::{TokenSet, DECL_START, OPERAND, TYPE_START};
