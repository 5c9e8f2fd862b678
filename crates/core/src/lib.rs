//! The runtime core of a flow-based programming engine: a dataflow executor
//! that loads a declarative graph of interconnected nodes, instantiates each
//! node as an independent concurrent worker, wires message queues between
//! them, and executes the resulting network until completion or external
//! stop.
//!
//! This crate deliberately has no opinion on the serialized flow file's
//! surface syntax beyond the `{imports, node}` shape it deserializes (see
//! [`loader`]); the editor, the component-catalog generator, and the
//! top-level CLI dispatcher are external collaborators, not part of this
//! crate.

pub mod error;
pub mod loader;
pub mod runtime;
#[cfg(test)]
mod test_support;
mod utils;

pub use error::{Error, FlowError, Result};
