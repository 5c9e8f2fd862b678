use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::node::{Node, NodeState};
use super::port::{GetOutcome, InputMode, Required};
use super::variant::Variant;

/// What a [`Process::process`] call produces for one tick (spec §4.3 step
/// 5). `Skip` lets a component consume a tick's inputs without emitting
/// anything on any output — e.g. a filter that drops a record.
#[derive(Debug, Clone)]
pub enum ProcessOutput {
    Emit(HashMap<String, Variant>),
    Skip,
}

/// The domain logic of a leaf node: a pure(ish) per-tick transform from
/// sampled inputs to emitted outputs, oblivious to ports, queues, and EOS
/// bookkeeping — all of that lives in [`Component`]'s generic pull loop
/// (spec §4.3, "the process function itself never touches the queue or EOS
/// directly").
#[async_trait]
pub trait Process: Send + Sync {
    async fn process(&self, inputs: &HashMap<String, Arc<Variant>>, node: &NodeState) -> crate::Result<ProcessOutput>;
}

/// The generic node kind that drives any [`Process`] implementation through
/// the uniform pull/sample/invoke/emit tick (spec §4.3). This is the home for
/// every ordinary data-transform component; the three builtin macros are
/// native [`Node`](super::node::Node) implementations instead, since their
/// self-terminating, zero-or-fixed-arity behavior does not fit this loop
/// (see [`crate::runtime::builtins`]).
pub struct Component {
    state: NodeState,
    process: Arc<dyn Process>,
}

impl Component {
    pub fn new(state: NodeState, process: Arc<dyn Process>) -> Self {
        Component { state, process }
    }

    /// The pull set `R` for one tick (spec §4.3 step 1): every `QUEUE`-mode
    /// input that is either `REQUIRED`, or `REQUIRED_IF_CONNECTED` and
    /// currently bound to at least one live producer. A `REQUIRED_IF_CONNECTED`
    /// pin with no producer at all is simply absent from every tick, forever.
    fn pull_set(&self) -> Vec<&str> {
        self.state
            .ordered_inputs()
            .filter(|p| p.mode == InputMode::Queue)
            .filter(|p| match p.required {
                Required::Required => true,
                Required::RequiredIfConnected => p.ref_count() > 0,
                Required::Optional => false,
            })
            .map(|p| p.id.as_str())
            .collect()
    }
}

#[async_trait]
impl Node for Component {
    fn state(&self) -> &NodeState {
        &self.state
    }

    async fn run(self: Arc<Self>) {
        'tick: loop {
            if self.state.stop.is_cancelled() {
                break;
            }

            let mut inputs = HashMap::with_capacity(self.state.inputs.len());

            // Step 1+2: pull every REQUIRED/bound-REQUIRED_IF_CONNECTED QUEUE
            // pin. Any one of them reaching EOS ends the node (spec §4.3
            // step 2, "EOS on any pulled input terminates the process").
            for id in self.pull_set() {
                let port = self.state.inputs.get(id).expect("pull_set id exists in inputs");
                match port.get().await {
                    GetOutcome::Value(v) => {
                        inputs.insert(id.to_string(), v);
                    }
                    GetOutcome::Eos => break 'tick,
                }
            }

            // Step 3: sample every STICKY/STATIC pin unconditionally (spec
            // §4.3 step 3 — Rust has no runtime reflection over a process's
            // argument list, so this is the strict superset of "referenced"
            // pins and is cheap: STATIC never blocks, STICKY blocks only
            // before its first item).
            for port in self.state.ordered_inputs() {
                if matches!(port.mode, InputMode::Sticky | InputMode::Static) {
                    inputs.insert(port.id.clone(), port.sample().await);
                }
            }

            // OPTIONAL and unbound-but-connected QUEUE pins: a non-blocking
            // peek, included only when something is already buffered.
            for port in self.state.ordered_inputs() {
                if port.mode != InputMode::Queue {
                    continue;
                }
                if port.required == Required::Optional
                    || (port.required == Required::RequiredIfConnected && port.ref_count() == 0)
                {
                    if let Some(GetOutcome::Value(v)) = port.try_get() {
                        inputs.insert(port.id.clone(), v);
                    }
                }
            }

            match self.process.process(&inputs, &self.state).await {
                Ok(ProcessOutput::Emit(values)) => {
                    for (port_id, value) in values {
                        if let Some(out) = self.state.output(&port_id) {
                            if let Err(e) = out.send(value).await {
                                log::warn!("node '{}' failed to send on output '{}': {}", self.state.label(), port_id, e);
                            }
                        } else {
                            log::warn!("node '{}' emitted on unknown output '{}'", self.state.label(), port_id);
                        }
                    }
                }
                Ok(ProcessOutput::Skip) => {}
                Err(e) => {
                    // spec §7 WorkerError: localized to this node, logged,
                    // and treated as this worker's own premature EOS — it
                    // does not propagate to siblings, who simply observe the
                    // early close on whatever this node feeds.
                    log::error!("node '{}' process() failed: {}", self.state.label(), e);
                    break 'tick;
                }
            }
        }

        self.state.finish().await;
    }
}
