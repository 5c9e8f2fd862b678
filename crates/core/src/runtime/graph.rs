use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::graph_port::{InputGraphPort, OutputGraphPort};
use super::node::{Node, NodeState};
use super::port::{InputMode, InputPort, OutputMode, OutputPort, Required, DEFAULT_QUEUE_CAPACITY};
use super::variant::Variant;

/// Declares one of this graph's own externally-visible input pins (spec
/// §4.5). Resolved and constructed by the loader from the flow file's own
/// `node` ports list before [`Graph::build`] is called.
#[derive(Debug, Clone)]
pub struct GraphInputSpec {
    pub id: String,
    pub type_hint: Option<String>,
    pub mode: InputMode,
    pub required: Required,
    pub default_value: Option<Variant>,
}

/// Declares one of this graph's own externally-visible output pins.
#[derive(Debug, Clone)]
pub struct GraphOutputSpec {
    pub id: String,
    pub type_hint: Option<String>,
    pub mode: OutputMode,
}

/// One already-constructed child instance: a leaf [`Component`](super::component::Component),
/// a builtin macro node, or a nested [`Graph`] — [`Node`] makes all three
/// interchangeable from this graph's point of view (spec §4.4, "a graph is
/// wired identically regardless of whether a child instance is itself a
/// graph").
pub struct InstanceSpec {
    pub id: String,
    pub node: Arc<dyn Node>,
}

/// One wire. `from_instance`/`to_instance` of `None` denotes this graph's own
/// boundary rather than a child instance — the substitution rule that lets
/// [`GraphPort`](super::graph_port) splicing reuse the exact same wiring
/// algorithm as ordinary child-to-child connections (spec §4.5).
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    pub from_instance: Option<String>,
    pub from_port: String,
    pub to_instance: Option<String>,
    pub to_port: String,
}

/// A wired, runnable network of instances (spec §4.4). Implements [`Node`]
/// itself, so a graph can be nested as an ordinary child instance of another
/// graph with no special-casing anywhere in the wiring algorithm.
pub struct Graph {
    state: NodeState,
    children: HashMap<String, Arc<dyn Node>>,
    input_splices: Vec<Arc<InputGraphPort>>,
    output_splices: Vec<Arc<OutputGraphPort>>,
}

impl Graph {
    /// Wires a fully-resolved set of child instances and boundary pins into
    /// a runnable graph (spec §4.4 steps 3-4: "wire" and "validate").
    pub async fn build(
        id: impl Into<String>,
        instances: Vec<InstanceSpec>,
        connections: Vec<ConnectionSpec>,
        graph_inputs: Vec<GraphInputSpec>,
        graph_outputs: Vec<GraphOutputSpec>,
        queue_capacity: Option<usize>,
    ) -> crate::Result<Arc<Graph>> {
        let id = id.into();
        let queue_capacity = queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let children: HashMap<String, Arc<dyn Node>> =
            instances.into_iter().map(|i| (i.id, i.node)).collect();

        let mut outer_inputs = HashMap::new();
        let mut outer_input_order = Vec::with_capacity(graph_inputs.len());
        let mut inner_outputs = HashMap::new();
        let mut input_splices = Vec::new();
        for spec in &graph_inputs {
            outer_input_order.push(spec.id.clone());
            let outer = Arc::new(InputPort::new(
                spec.id.clone(),
                spec.type_hint.clone(),
                spec.mode,
                spec.required,
                spec.default_value.clone(),
                queue_capacity,
            ));
            let inner = Arc::new(OutputPort::new(spec.id.clone(), spec.type_hint.clone(), OutputMode::Ref));
            outer_inputs.insert(spec.id.clone(), outer.clone());
            inner_outputs.insert(spec.id.clone(), inner.clone());
            input_splices.push(Arc::new(InputGraphPort::new(outer, inner)));
        }

        let mut outer_outputs = HashMap::new();
        let mut inner_inputs = HashMap::new();
        let mut output_splices = Vec::new();
        for spec in &graph_outputs {
            let outer = Arc::new(OutputPort::new(spec.id.clone(), spec.type_hint.clone(), spec.mode));
            let inner = Arc::new(InputPort::new(
                spec.id.clone(),
                spec.type_hint.clone(),
                InputMode::Queue,
                Required::Optional,
                None,
                queue_capacity,
            ));
            outer_outputs.insert(spec.id.clone(), outer.clone());
            inner_inputs.insert(spec.id.clone(), inner.clone());
            output_splices.push(Arc::new(OutputGraphPort::new(inner, outer)));
        }

        let resolve_output = |instance: &Option<String>, port: &str| -> crate::Result<Arc<OutputPort>> {
            match instance {
                None => inner_outputs
                    .get(port)
                    .cloned()
                    .ok_or_else(|| crate::FlowError::Connection(format!("unknown graph input pin '{}'", port)).into()),
                Some(instance_id) => {
                    let child = children.get(instance_id).ok_or_else(|| {
                        crate::Error::from(crate::FlowError::Connection(format!("unknown instance '{}'", instance_id)))
                    })?;
                    child.state().output(port).cloned().ok_or_else(|| {
                        crate::FlowError::Connection(format!("instance '{}' has no output '{}'", instance_id, port)).into()
                    })
                }
            }
        };

        let resolve_input = |instance: &Option<String>, port: &str| -> crate::Result<Arc<InputPort>> {
            match instance {
                None => inner_inputs
                    .get(port)
                    .cloned()
                    .ok_or_else(|| crate::FlowError::Connection(format!("unknown graph output pin '{}'", port)).into()),
                Some(instance_id) => {
                    let child = children.get(instance_id).ok_or_else(|| {
                        crate::Error::from(crate::FlowError::Connection(format!("unknown instance '{}'", instance_id)))
                    })?;
                    child.state().input(port).cloned().ok_or_else(|| {
                        crate::FlowError::Connection(format!("instance '{}' has no input '{}'", instance_id, port)).into()
                    })
                }
            }
        };

        for conn in &connections {
            let to = resolve_input(&conn.to_instance, &conn.to_port)?;
            let from = resolve_output(&conn.from_instance, &conn.from_port)?;
            to.inc_ref_count();
            from.connect(to.sender()).await;
        }

        for child in children.values() {
            let state = child.state();
            for input in state.inputs.values() {
                if input.required != Required::Required || input.ref_count() > 0 {
                    continue;
                }
                // A STATIC pin never has a connected queue at all — its
                // configured `value` is always its producer (spec §3). A
                // STICKY pin with a configured default never blocks either,
                // so it equally excuses the "has an upstream" requirement
                // (spec §3 "STICKY... returns value (the configured
                // default)"). Only QUEUE mode genuinely needs a connection.
                let excused = input.mode == InputMode::Static || (input.mode == InputMode::Sticky && input.has_default());
                if !excused {
                    return Err(crate::FlowError::Validation(format!(
                        "required input '{}' on node '{}' has no connected producer",
                        input.id, state.id
                    ))
                    .into());
                }
            }
        }

        let state = NodeState::new(id, outer_inputs, outer_input_order, outer_outputs);
        Ok(Arc::new(Graph { state, children, input_splices, output_splices }))
    }

    pub fn children(&self) -> &HashMap<String, Arc<dyn Node>> {
        &self.children
    }
}

#[async_trait]
impl Node for Graph {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn stop(&self) {
        self.state.stop.cancel();
        for child in self.children.values() {
            child.stop();
        }
    }

    fn terminate(&self) {
        self.state.terminate();
        for child in self.children.values() {
            child.terminate();
        }
    }

    async fn run(self: Arc<Self>) {
        let mut tasks = JoinSet::new();
        for child in self.children.values().cloned() {
            tasks.spawn(child.run());
        }
        for splice in self.input_splices.iter().cloned() {
            tasks.spawn(splice.run());
        }
        for splice in self.output_splices.iter().cloned() {
            tasks.spawn(splice.run());
        }
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                log::error!("graph '{}' child task panicked: {}", self.state.id, e);
            }
        }
        self.state.finish().await;

        // Shutdown hooks run on this supervising task, not on the children's
        // own worker tasks which have already exited (spec §4.4 "Shutdown").
        for child in self.children.values() {
            child.shutdown().await;
        }
    }
}
