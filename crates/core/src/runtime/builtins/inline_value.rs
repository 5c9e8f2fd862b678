use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::runtime::node::{Node, NodeState};
use crate::runtime::port::{OutputMode, OutputPort};
use crate::runtime::variant::{typed_value_from_json, Variant};

#[derive(Debug, Deserialize)]
struct TypedValue {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MacroData {
    value: TypedValue,
    #[serde(default)]
    #[allow(dead_code)]
    label: Option<String>,
}

/// `InlineValue { value: {type, value}, label? }` (spec §6): a zero-input
/// source that emits its configured `value` exactly once on its single
/// `value` output, then EOS. Self-terminating, so it cannot be expressed as
/// a generic [`Component`](crate::runtime::component::Component) pull loop
/// (see `runtime/builtins/mod.rs`).
pub struct InlineValue {
    state: NodeState,
    value: Variant,
}

impl InlineValue {
    pub fn build(id: impl Into<String>, macro_data: Option<serde_json::Value>) -> crate::Result<Arc<dyn Node>> {
        let id = id.into();
        let raw = macro_data
            .ok_or_else(|| crate::FlowError::BadArguments(format!("InlineValue '{}' is missing macroData", id)))?;
        let data: MacroData = serde_json::from_value(raw).map_err(|e| {
            crate::FlowError::BadArguments(format!("InlineValue '{}' has malformed macroData: {}", id, e))
        })?;
        let value = typed_value_from_json(&data.value.type_name, &data.value.value)?;

        let mut outputs = HashMap::new();
        outputs.insert("value".to_string(), Arc::new(OutputPort::new("value", None, OutputMode::Ref)));
        let state = NodeState::new(id, HashMap::new(), Vec::new(), outputs);
        Ok(Arc::new(InlineValue { state, value }))
    }
}

#[async_trait]
impl Node for InlineValue {
    fn state(&self) -> &NodeState {
        &self.state
    }

    async fn run(self: Arc<Self>) {
        if !self.state.stop.is_cancelled() {
            if let Some(out) = self.state.output("value") {
                if let Err(e) = out.send(self.value.clone()).await {
                    log::error!("InlineValue '{}' failed to send: {}", self.state.id, e);
                }
            }
        }
        self.state.finish().await;
    }
}
