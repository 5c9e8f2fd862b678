//! The root container a host embeds: owns the top-level [`Graph`], the
//! loader that built it, and the handful of lifecycle entry points described
//! in spec §4.7 (`from_file`, `run`, `run_sync`, `to_dict`).
//!
//! Grounded on the teacher's `Flow`/`FlowEngine` split
//! (`crates/core/src/runtime/flow.rs`, `engine.rs`): that teacher type carries
//! a great deal of Node-RED-specific state (groups, subflow instance wiring,
//! catch/complete node indexes) that has no counterpart here — this crate's
//! `Graph`/`GraphPort` splicing already generalizes the subflow mechanism, so
//! `Flow` is reduced to what's left: owning the root, driving it, and
//! answering `to_dict()`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::loader::decl::FlowDecl;
use crate::loader::Loader;
use crate::runtime::graph::Graph;
use crate::runtime::node::Node;
use crate::runtime::registry::ComponentRegistry;
use crate::runtime::RuntimeConfig;

/// The root of one loaded flow network (spec §4.7).
pub struct Flow {
    source_path: Option<PathBuf>,
    decl: FlowDecl,
    root: Arc<Graph>,
}

impl Flow {
    /// Loads `path` and every flow file it imports, and wires the result
    /// (spec §4.7 "from_file").
    pub async fn from_file(path: impl AsRef<Path>, registry: Arc<dyn ComponentRegistry>, config: &RuntimeConfig) -> crate::Result<Self> {
        let path = path.as_ref();
        let loader = Loader::new(registry, config.queue_capacity);
        let (root, decl) = loader.load_file(path).await?;
        Ok(Flow { source_path: Some(path.to_path_buf()), decl, root })
    }

    /// Wires an in-memory declaration with no filesystem-backed imports
    /// (only the builtin namespace is resolvable).
    pub async fn from_decl(decl: FlowDecl, registry: Arc<dyn ComponentRegistry>, config: &RuntimeConfig) -> crate::Result<Self> {
        let loader = Loader::new(registry, config.queue_capacity);
        let root = loader.load_decl(decl.clone()).await?;
        Ok(Flow { source_path: None, decl, root })
    }

    pub fn root(&self) -> &Arc<Graph> {
        &self.root
    }

    /// Spawns the root graph's run loop and returns immediately, leaving the
    /// caller free to drive its own event loop alongside it (spec §4.7
    /// "run: non-blocking").
    pub fn run(&self) -> tokio::task::JoinHandle<()> {
        let root = self.root.clone();
        tokio::spawn(async move { root.run().await })
    }

    /// Runs the root graph to completion on the current task, then runs
    /// every node's `shutdown` hook (spec §4.7 "run_sync: blocks until every
    /// required input has reached EOS or stop() was called, then runs
    /// shutdown hooks").
    pub async fn run_sync(&self) {
        self.root.clone().run().await;
    }

    /// Requests cooperative shutdown of every node in the network.
    pub fn stop(&self) {
        self.root.stop();
    }

    /// Forceful shutdown: unblocks any node parked in a blocking `get()`.
    pub fn terminate(&self) {
        self.root.terminate();
    }

    /// Awaits full quiescence of the root graph.
    pub async fn stopped(&self) {
        self.root.stopped().await;
    }

    /// Re-serializes the declaration this flow was loaded from, verbatim
    /// down to preserved layout data (spec §4.7 "to_dict": "round-trips the
    /// original declaration, including editor-only fields the runtime never
    /// interprets").
    pub fn to_dict(&self) -> crate::Result<serde_json::Value> {
        self.decl.to_json_value()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}
