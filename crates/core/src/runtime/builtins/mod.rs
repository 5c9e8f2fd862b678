//! The closed set of macro nodes and the small built-in standard library the
//! loader can resolve a `nodeId` to without any host-supplied
//! [`ComponentRegistry`](super::registry::ComponentRegistry) (spec §4.6,
//! §6 "Macro data schema").
//!
//! The three macros — [`InlineValue`], [`GetAttribute`], [`Conditional`] —
//! are native [`Node`](super::node::Node) implementations rather than
//! generic [`Component`](super::component::Component)+[`Process`](super::component::Process)
//! wrappers, because `InlineValue` in particular must self-terminate after
//! exactly one emission, a shape the generic pull-loop (which only
//! terminates on upstream EOS or external `stop()`) cannot produce for a
//! zero-input source (see `SPEC_FULL.md` §4).

mod conditional;
mod get_attribute;
mod inline_value;
mod stdlib;

pub use conditional::{Conditional, ConditionKind};
pub use get_attribute::GetAttribute;
pub use inline_value::InlineValue;

/// The macro name embedded as the prefix of a `nodeId` formed as
/// `MACRO__<instanceId>` (spec §4.6). A closed set: unrecognized prefixes
/// fall through to ordinary [`ComponentRegistry`](super::registry::ComponentRegistry)
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    InlineValue,
    GetAttribute,
    Conditional,
}

impl MacroKind {
    pub const NAMES: [&'static str; 3] = ["InlineValue", "GetAttribute", "Conditional"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "InlineValue" => Some(MacroKind::InlineValue),
            "GetAttribute" => Some(MacroKind::GetAttribute),
            "Conditional" => Some(MacroKind::Conditional),
            _ => None,
        }
    }

    /// Detects a macro instance from its declared `nodeId` and the
    /// instance's own `id` (spec §4.6: "a macro whose name is formed as
    /// `MACRO__<instanceId>`"). Returns `None` for an ordinary concrete
    /// node class name, which the loader then resolves through imports and
    /// the [`ComponentRegistry`](super::registry::ComponentRegistry) instead.
    pub fn detect(node_id: &str, instance_id: &str) -> Option<Self> {
        let (prefix, suffix) = node_id.split_once("__")?;
        if suffix != instance_id {
            return None;
        }
        Self::from_name(prefix)
    }
}
