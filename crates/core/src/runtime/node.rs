use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::port::{InputPort, OutputPort};
use super::variant::Variant;

/// Per-instance construction parameters handed to a
/// [`ComponentFactory`](crate::runtime::registry::ComponentFactory) or a
/// builtin node constructor once the graph builder has resolved and wired
/// every port (spec §4.4 step 2, "instantiate").
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub id: String,
    pub component_type: String,
    pub params: Variant,
}

impl NodeConfig {
    /// Looks up a key in `params` (expected to be a [`Variant::Object`]),
    /// the shape every builtin macro's configuration uses (spec §6).
    pub fn param(&self, key: &str) -> Option<&Variant> {
        self.params.as_object().and_then(|m| m.get(key))
    }
}

/// Shared bookkeeping every concrete node carries: its id, its bound ports,
/// and the two [`CancellationToken`]s used for cooperative shutdown (spec
/// §5). `stop` is observed by the node's own run loop only at iteration
/// boundaries; `stopped` is cancelled exactly once, by the node itself, when
/// its run loop returns, so [`Graph::stop`](crate::runtime::Graph) can await
/// full quiescence without polling.
#[derive(Debug)]
pub struct NodeState {
    pub id: String,
    pub display_name: Option<String>,
    pub inputs: HashMap<String, Arc<InputPort>>,
    /// The declared order of `inputs`' keys — a `HashMap` iterates in an
    /// arbitrary, run-to-run-randomized order, but spec §4.3's pull
    /// tie-break ("pull order is the declaration order of input pins") is
    /// observable, so every ordered pass over this node's inputs (the pull
    /// set, the sticky/static sample pass) must walk this `Vec` rather than
    /// `inputs.values()`.
    pub input_order: Vec<String>,
    pub outputs: HashMap<String, Arc<OutputPort>>,
    pub stop: CancellationToken,
    pub stopped: CancellationToken,
}

impl NodeState {
    pub fn new(
        id: impl Into<String>,
        inputs: HashMap<String, Arc<InputPort>>,
        input_order: Vec<String>,
        outputs: HashMap<String, Arc<OutputPort>>,
    ) -> Self {
        Self::with_display_name(id, None, inputs, input_order, outputs)
    }

    /// As [`NodeState::new`], additionally carrying the instance's optional
    /// human-readable `display_name` (spec §3 "Node identity"), used only for
    /// diagnostics — the runtime itself addresses every node by `id`.
    pub fn with_display_name(
        id: impl Into<String>,
        display_name: Option<String>,
        inputs: HashMap<String, Arc<InputPort>>,
        input_order: Vec<String>,
        outputs: HashMap<String, Arc<OutputPort>>,
    ) -> Self {
        debug_assert_eq!(
            input_order.len(),
            inputs.len(),
            "input_order must list exactly the keys of inputs, once each"
        );
        NodeState {
            id: id.into(),
            display_name,
            inputs,
            input_order,
            outputs,
            stop: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }

    /// This node's input ports in declared order (spec §4.3 tie-break).
    pub fn ordered_inputs(&self) -> impl Iterator<Item = &Arc<InputPort>> {
        self.input_order.iter().map(move |id| self.inputs.get(id).expect("input_order entry exists in inputs"))
    }

    /// Human-facing label for logs: the configured `display_name`, falling
    /// back to `id` when none was declared.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn input(&self, id: &str) -> Option<&Arc<InputPort>> {
        self.inputs.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&Arc<OutputPort>> {
        self.outputs.get(id)
    }

    /// Closes every output and marks the node quiescent. Called once by a
    /// node's own run loop on the way out, whatever the exit reason (spec §5,
    /// "on stop the node finishes its current iteration, then closes all its
    /// outputs").
    pub async fn finish(&self) {
        for out in self.outputs.values() {
            out.close().await;
        }
        self.stopped.cancel();
    }

    /// Forceful unblock (spec §4.4 "Terminate"): injects EOS into every
    /// input so a node parked in `get()` wakes immediately instead of
    /// waiting for cooperative stop.
    pub fn terminate(&self) {
        self.stop.cancel();
        for input in self.inputs.values() {
            input.force_eos();
        }
    }
}

/// The uniform unit of concurrent execution inside a
/// [`Graph`](crate::runtime::Graph): one worker task per instance, whether it
/// is a generic data-driven [`Component`](super::component::Component) or a
/// bespoke builtin macro node (spec §5, "every leaf component runs as its own
/// task").
#[async_trait]
pub trait Node: Send + Sync {
    fn state(&self) -> &NodeState;

    fn id(&self) -> &str {
        &self.state().id
    }

    /// Requests cooperative shutdown; observed by the node's run loop only at
    /// its next iteration boundary (spec §5).
    fn stop(&self) {
        self.state().stop.cancel();
    }

    /// Forceful shutdown: unblocks any in-flight `get()` immediately.
    fn terminate(&self) {
        self.state().terminate();
    }

    /// Awaits full quiescence: outputs closed, run loop returned.
    async fn stopped(&self) {
        self.state().stopped.cancelled().await;
    }

    /// Drives the node to completion: runs until every required input
    /// observes EOS, or `stop`/`terminate` is observed, then closes its
    /// outputs exactly once.
    async fn run(self: Arc<Self>);

    /// Optional hook run once, after `stopped` is observed, on the thread
    /// supervising this node (spec §4.4 "Shutdown"). The only place a node
    /// may touch thread-hostile resources. Most nodes have none and leave
    /// the default no-op.
    async fn shutdown(&self) {}
}
