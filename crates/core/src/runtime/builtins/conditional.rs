use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::runtime::node::{Node, NodeState};
use crate::runtime::port::{GetOutcome, InputMode, InputPort, OutputMode, OutputPort, Required, DEFAULT_QUEUE_CAPACITY};
use crate::runtime::variant::{typed_value_from_json, Variant};

/// The closed enum of condition kinds `Conditional` supports. Spec §4.6
/// leaves this enumeration to the implementer ("a closed enum of condition
/// kinds"); resolved here and recorded in `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ConditionKind {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Truthy,
}

impl ConditionKind {
    fn needs_operand(self) -> bool {
        !matches!(self, ConditionKind::Truthy)
    }

    fn evaluate(self, value: &Variant, operand: Option<&Variant>) -> bool {
        match self {
            ConditionKind::Truthy => value.is_truthy(),
            ConditionKind::Equals => operand.is_some_and(|o| value == o),
            ConditionKind::NotEquals => operand.is_some_and(|o| value != o),
            ConditionKind::GreaterThan => {
                matches!((value.as_f64(), operand.and_then(Variant::as_f64)), (Some(a), Some(b)) if a > b)
            }
            ConditionKind::LessThan => {
                matches!((value.as_f64(), operand.and_then(Variant::as_f64)), (Some(a), Some(b)) if a < b)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperandDecl {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MacroData {
    kind: ConditionKind,
    #[serde(default)]
    operand: Option<OperandDecl>,
}

/// `Conditional`: routes its single `value` input to its `true` or `false`
/// output depending on `kind`'s evaluation against a configured `operand`
/// (spec §6). Implemented as a native [`Node`] rather than a generic
/// [`Component`](crate::runtime::component::Component), for consistency
/// with the other two macros (`runtime/builtins/mod.rs`).
pub struct Conditional {
    state: NodeState,
    kind: ConditionKind,
    operand: Option<Variant>,
}

impl Conditional {
    pub fn build(
        id: impl Into<String>,
        macro_data: Option<serde_json::Value>,
        queue_capacity: Option<usize>,
    ) -> crate::Result<Arc<dyn Node>> {
        let id = id.into();
        let raw = macro_data
            .ok_or_else(|| crate::FlowError::BadArguments(format!("Conditional '{}' is missing macroData", id)))?;
        let data: MacroData = serde_json::from_value(raw).map_err(|e| {
            crate::FlowError::BadArguments(format!("Conditional '{}' has malformed macroData: {}", id, e))
        })?;

        let operand = match &data.operand {
            Some(o) => Some(typed_value_from_json(&o.type_name, &o.value)?),
            None => None,
        };
        if data.kind.needs_operand() && operand.is_none() {
            return Err(crate::FlowError::BadArguments(format!(
                "Conditional '{}' kind {:?} requires an operand",
                id, data.kind
            ))
            .into());
        }

        let queue_capacity = queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY);
        let mut inputs = HashMap::new();
        inputs.insert(
            "value".to_string(),
            Arc::new(InputPort::new("value", None, InputMode::Queue, Required::Required, None, queue_capacity)),
        );
        let mut outputs = HashMap::new();
        outputs.insert("true".to_string(), Arc::new(OutputPort::new("true", None, OutputMode::Ref)));
        outputs.insert("false".to_string(), Arc::new(OutputPort::new("false", None, OutputMode::Ref)));

        let state = NodeState::new(id, inputs, vec!["value".to_string()], outputs);
        Ok(Arc::new(Conditional { state, kind: data.kind, operand }))
    }
}

#[async_trait]
impl Node for Conditional {
    fn state(&self) -> &NodeState {
        &self.state
    }

    async fn run(self: Arc<Self>) {
        let value_port = self.state.input("value").expect("value pin always present");

        loop {
            if self.state.stop.is_cancelled() {
                break;
            }
            let value = match value_port.get().await {
                GetOutcome::Value(v) => v,
                GetOutcome::Eos => break,
            };

            let branch = if self.kind.evaluate(&value, self.operand.as_ref()) { "true" } else { "false" };
            if let Some(out) = self.state.output(branch) {
                if let Err(e) = out.send((*value).clone()).await {
                    log::warn!("Conditional '{}' failed to send on '{}': {}", self.state.id, branch, e);
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

    async fn drain_one(rx: &mut tokio::sync::mpsc::Receiver<Frame>) -> Option<Variant> {
        match rx.recv().await {
            Some(Frame::Item(v)) => Some((*v).clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn routes_true_and_false_branches() {
        let macro_data = serde_json::json!({ "kind": "GreaterThan", "operand": { "type": "number", "value": 10 } });
        let node = Conditional::build("n1", Some(macro_data), None).unwrap();

        let (true_tx, mut true_rx) = tokio::sync::mpsc::channel(4);
        let (false_tx, mut false_rx) = tokio::sync::mpsc::channel(4);
        node.state().output("true").unwrap().connect(true_tx).await;
        node.state().output("false").unwrap().connect(false_tx).await;

        let value_port = node.state().input("value").unwrap();
        value_port.inc_ref_count();
        let value_tx = value_port.sender();

        let handle = tokio::spawn(node.clone().run());
        value_tx.send(Frame::Item(Arc::new(Variant::Integer(20)))).await.unwrap();
        value_tx.send(Frame::Item(Arc::new(Variant::Integer(5)))).await.unwrap();
        value_tx.send(Frame::Eos).await.unwrap();

        assert_eq!(drain_one(&mut true_rx).await, Some(Variant::Integer(20)));
        assert_eq!(drain_one(&mut false_rx).await, Some(Variant::Integer(5)));
        handle.await.unwrap();
    }

    #[test]
    fn truthy_needs_no_operand() {
        let macro_data = serde_json::json!({ "kind": "Truthy" });
        assert!(Conditional::build("n1", Some(macro_data), None).is_ok());
    }

    #[test]
    fn equals_without_operand_is_rejected() {
        let macro_data = serde_json::json!({ "kind": "Equals" });
        assert!(Conditional::build("n1", Some(macro_data), None).is_err());
    }
}
