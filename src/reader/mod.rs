//! XML event reading
//!
//! - Events: event and record types for pull parsing
//! - Stream: tokens to balanced events with well-formedness checks
//! - Bounded: depth/event limits and sequence numbering

pub mod bounded;
pub mod events;
pub mod stream;
