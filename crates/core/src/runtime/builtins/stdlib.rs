use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::runtime::component::{Process, ProcessOutput};
use crate::runtime::node::{NodeConfig, NodeState};
use crate::runtime::port::{InputMode, OutputMode, Required};
use crate::runtime::registry::{InputPinSchema, OutputPinSchema};
use crate::runtime::variant::Variant;
use crate::{define_builtin_component, Result};

/// The small built-in standard library the loader can resolve without any
/// host-supplied registry (spec §4.6 "user packages and a small built-in
/// standard library"). Grounded on the teacher's simplest `common_nodes`:
/// `junction.rs` (bare passthrough) and `debug.rs` (logs every message it
/// receives).

struct Identity;

#[async_trait]
impl Process for Identity {
    async fn process(&self, inputs: &HashMap<String, Arc<Variant>>, _node: &NodeState) -> Result<ProcessOutput> {
        let v = inputs.get("in").expect("'in' is REQUIRED");
        let mut out = HashMap::with_capacity(1);
        out.insert("out".to_string(), (**v).clone());
        Ok(ProcessOutput::Emit(out))
    }
}

fn make_identity(_config: &NodeConfig, _state: &NodeState) -> Result<Arc<dyn Process>> {
    Ok(Arc::new(Identity))
}

define_builtin_component!(
    "std.Identity",
    inputs: [InputPinSchema { id: "in", type_hint: None, mode: InputMode::Queue, required: Required::Required }],
    outputs: [OutputPinSchema { id: "out", type_hint: None, mode: OutputMode::Ref }],
    make_identity
);

struct Debug;

#[async_trait]
impl Process for Debug {
    async fn process(&self, inputs: &HashMap<String, Arc<Variant>>, node: &NodeState) -> Result<ProcessOutput> {
        let v = inputs.get("in").expect("'in' is REQUIRED");
        log::info!("std.Debug '{}': {}", node.id, v);
        Ok(ProcessOutput::Skip)
    }
}

fn make_debug(_config: &NodeConfig, _state: &NodeState) -> Result<Arc<dyn Process>> {
    Ok(Arc::new(Debug))
}

define_builtin_component!(
    "std.Debug",
    inputs: [InputPinSchema { id: "in", type_hint: None, mode: InputMode::Queue, required: Required::Required }],
    outputs: [],
    make_debug
);

#[cfg(test)]
mod tests {
    use crate::runtime::registry::{ComponentRegistry, StdRegistry};

    #[test]
    fn stdlib_components_are_registered() {
        let registry = StdRegistry::with_builtins();
        assert!(registry.contains("std.Identity"));
        assert!(registry.contains("std.Debug"));
    }
}
