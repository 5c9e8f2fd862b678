//! Serde models of the `{imports, node}` declaration shape (spec §4.6).
//!
//! The spec deliberately leaves the flow file's surface syntax unspecified
//! ("any well-defined structured format is acceptable"); this implementation
//! picks JSON via `serde_json`, mirroring the teacher's `red::json`
//! deserialization style (`#[serde(default)]`, field aliases, skip-and-
//! recompute fields) rather than inventing a bespoke parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::runtime::port::{InputMode, OutputMode, Required};
use crate::runtime::variant::{typed_value_from_json, Variant};

/// The `{type, value}` typed-value wrapper used throughout the declaration
/// format for configured defaults and macro data (spec §6 "Macro data
/// schema").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedValueDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl TypedValueDecl {
    pub fn to_variant(&self) -> crate::Result<Variant> {
        typed_value_from_json(&self.type_name, &self.value)
    }
}

/// One of a graph's own externally-visible input pins (spec §3 "Input port").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPinDecl {
    pub id: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub mode: InputMode,
    #[serde(default)]
    pub required: Required,
    #[serde(default)]
    pub value: Option<TypedValueDecl>,
}

/// One of a graph's own externally-visible output pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPinDecl {
    pub id: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub mode: OutputMode,
}

/// `{insId, pinId}` — one endpoint of a [`ConnectionDecl`] (spec §3
/// "Connection").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRefDecl {
    #[serde(rename = "insId")]
    pub ins_id: String,
    #[serde(rename = "pinId")]
    pub pin_id: String,
}

/// A directed wire between two instances, or between an instance and this
/// graph's own boundary (an absent/empty `insId` that equals the owning
/// node's own `id` denotes the graph's own port — see
/// [`crate::loader::Loader`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDecl {
    pub from: PortRefDecl,
    pub to: PortRefDecl,
    #[serde(default)]
    pub delayed: bool,
    #[serde(default)]
    pub hidden: bool,
}

/// `{id, nodeId, inputConfig, macroData?}` — one child instance (spec §4.6).
/// `nodeId` names either a concrete registered node class, an imported
/// nested-graph export, or is shaped `MACRO__<instanceId>` for one of the
/// closed set of builtin macros (spec §4.6, resolved by
/// [`crate::runtime::builtins::MacroKind::detect`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDecl {
    pub id: String,
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "inputConfig")]
    pub input_config: serde_json::Map<String, serde_json::Value>,
    #[serde(default, rename = "macroData")]
    pub macro_data: Option<serde_json::Value>,
}

/// The `node` half of a flow declaration: one graph's own boundary shape,
/// child instances, and wiring (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<InputPinDecl>,
    #[serde(default)]
    pub outputs: Vec<OutputPinDecl>,
    /// Editor layout data, preserved verbatim on round-trip and otherwise
    /// uninterpreted by the core (spec §6 "floating-point layout data...is
    /// preserved verbatim").
    #[serde(default, rename = "inputsPosition")]
    pub inputs_position: Vec<serde_json::Value>,
    #[serde(default, rename = "outputsPosition")]
    pub outputs_position: Vec<serde_json::Value>,
    #[serde(default)]
    pub instances: Vec<InstanceDecl>,
    #[serde(default)]
    pub connections: Vec<ConnectionDecl>,
}

/// The full `{imports, node}` shape of one flow declaration file (spec
/// §4.6). `imports` maps each source — a relative path to another
/// declaration file, or the distinguished built-in namespace
/// [`crate::loader::BUILTIN_NAMESPACE`] — to the list of names it exports
/// that this file uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDecl {
    #[serde(default)]
    pub imports: BTreeMap<String, Vec<String>>,
    pub node: NodeDecl,
}

impl FlowDecl {
    pub fn from_str(s: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json_value(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
