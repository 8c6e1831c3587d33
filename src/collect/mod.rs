//! Event stream consumers
//!
//! Each consumer owns its own iterator instance and reduces the stream on
//! the fly; nothing is shared across consumers or passes.
//!
//! - Dict: nested-mapping reduction (xmltodict conventions)
//! - Edges: per-path occurrence counting

pub mod dict;
pub mod edges;
