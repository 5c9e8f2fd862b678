use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::runtime::node::{Node, NodeState};
use crate::runtime::port::{GetOutcome, InputMode, InputPort, OutputMode, OutputPort, Required, DEFAULT_QUEUE_CAPACITY};
use crate::runtime::variant::Variant;

#[derive(Debug, Deserialize)]
struct KeyDecl {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MacroData {
    key: KeyDecl,
}

/// `GetAttribute { key: {type: "dynamic" | "string", value?: string} }`
/// (spec §6): indexes its `object` input by `key` — either a second
/// `key` input pin (`type = "dynamic"`) or the configured literal
/// (`type = "string"`, in which case the `key` pin does not exist at all) —
/// and emits `object[key]` on its single `value` output.
pub struct GetAttribute {
    state: NodeState,
    literal_key: Option<Variant>,
}

impl GetAttribute {
    pub fn build(
        id: impl Into<String>,
        macro_data: Option<serde_json::Value>,
        queue_capacity: Option<usize>,
    ) -> crate::Result<Arc<dyn Node>> {
        let id = id.into();
        let raw = macro_data
            .ok_or_else(|| crate::FlowError::BadArguments(format!("GetAttribute '{}' is missing macroData", id)))?;
        let data: MacroData = serde_json::from_value(raw).map_err(|e| {
            crate::FlowError::BadArguments(format!("GetAttribute '{}' has malformed macroData: {}", id, e))
        })?;
        let queue_capacity = queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let mut inputs = HashMap::new();
        let mut input_order = vec!["object".to_string()];
        inputs.insert(
            "object".to_string(),
            Arc::new(InputPort::new("object", None, InputMode::Queue, Required::Required, None, queue_capacity)),
        );

        let literal_key = match data.key.type_name.as_str() {
            "dynamic" => {
                input_order.push("key".to_string());
                inputs.insert(
                    "key".to_string(),
                    Arc::new(InputPort::new("key", None, InputMode::Queue, Required::Required, None, queue_capacity)),
                );
                None
            }
            "string" => {
                let literal = data.key.value.ok_or_else(|| {
                    crate::FlowError::BadArguments(format!("GetAttribute '{}' key has type 'string' but no value", id))
                })?;
                Some(Variant::String(literal))
            }
            other => {
                return Err(crate::FlowError::BadArguments(format!(
                    "GetAttribute '{}' has unsupported key type '{}'",
                    id, other
                ))
                .into())
            }
        };

        let mut outputs = HashMap::new();
        outputs.insert("value".to_string(), Arc::new(OutputPort::new("value", None, OutputMode::Ref)));

        let state = NodeState::new(id, inputs, input_order, outputs);
        Ok(Arc::new(GetAttribute { state, literal_key }))
    }
}

#[async_trait]
impl Node for GetAttribute {
    fn state(&self) -> &NodeState {
        &self.state
    }

    async fn run(self: Arc<Self>) {
        let object_port = self.state.input("object").expect("object pin always present");
        let key_port = self.state.input("key");

        'tick: loop {
            if self.state.stop.is_cancelled() {
                break;
            }

            // Declaration order: object, then key (spec §4.3 tie-break).
            let object = match object_port.get().await {
                GetOutcome::Value(v) => v,
                GetOutcome::Eos => break 'tick,
            };
            let key = match (&self.literal_key, key_port) {
                (Some(literal), _) => literal.clone(),
                (None, Some(key_port)) => match key_port.get().await {
                    GetOutcome::Value(v) => (*v).clone(),
                    GetOutcome::Eos => break 'tick,
                },
                (None, None) => unreachable!("dynamic key without a bound key pin"),
            };

            let result = object.get_attribute(&key);
            if let Some(out) = self.state.output("value") {
                if let Err(e) = out.send(result).await {
                    log::warn!("GetAttribute '{}' failed to send: {}", self.state.id, e);
                }
            }
        }

        self.state.finish().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::port::Frame;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn literal_key_indexes_by_configured_name() {
        let macro_data = serde_json::json!({ "key": { "type": "string", "value": "k" } });
        let node = GetAttribute::build("n1", Some(macro_data), None).unwrap();

        let (out_tx, mut out_rx) = tokio::sync::mpsc::channel(4);
        node.state().output("value").unwrap().connect(out_tx).await;

        let object_port = node.state().input("object").unwrap();
        object_port.inc_ref_count();
        let object_tx = object_port.sender();

        let handle = tokio::spawn(node.clone().run());

        let mut m = BTreeMap::new();
        m.insert("k".to_string(), Variant::Integer(42));
        object_tx.send(Frame::Item(Arc::new(Variant::Object(m)))).await.unwrap();
        object_tx.send(Frame::Eos).await.unwrap();

        match out_rx.recv().await.unwrap() {
            Frame::Item(v) => assert_eq!(*v, Variant::Integer(42)),
            Frame::Eos => panic!("expected item before eos"),
        }
        assert!(matches!(out_rx.recv().await.unwrap(), Frame::Eos));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn dynamic_key_reads_second_pin() {
        let macro_data = serde_json::json!({ "key": { "type": "dynamic" } });
        let node = GetAttribute::build("n1", Some(macro_data), None).unwrap();
        assert!(node.state().input("key").is_some());

        let (out_tx, mut out_rx) = tokio::sync::mpsc::channel(4);
        node.state().output("value").unwrap().connect(out_tx).await;

        let object_port = node.state().input("object").unwrap();
        object_port.inc_ref_count();
        let object_tx = object_port.sender();
        let key_port = node.state().input("key").unwrap();
        key_port.inc_ref_count();
        let key_tx = key_port.sender();

        let handle = tokio::spawn(node.clone().run());

        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Variant::Integer(1));
        m.insert("b".to_string(), Variant::Integer(2));
        object_tx.send(Frame::Item(Arc::new(Variant::Object(m)))).await.unwrap();
        key_tx.send(Frame::Item(Arc::new(Variant::String("b".to_string())))).await.unwrap();
        object_tx.send(Frame::Eos).await.unwrap();
        key_tx.send(Frame::Eos).await.unwrap();

        match out_rx.recv().await.unwrap() {
            Frame::Item(v) => assert_eq!(*v, Variant::Integer(2)),
            Frame::Eos => panic!("expected item before eos"),
        }
        handle.await.unwrap();
    }
}
