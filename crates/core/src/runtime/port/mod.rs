mod input;
mod output;

pub use input::InputPort;
pub use output::OutputPort;

use std::sync::Arc;

use crate::runtime::variant::Variant;

/// The unit of transport on a wire: either a data item or the distinguished
/// end-of-stream sentinel (spec §3 "EOS is constructed as a singleton
/// sentinel at runtime start and identified by reference equality").
///
/// A typed sum with an explicit `Eos` variant gives us that identity check
/// for free — matching on the variant *is* the reference-equality test the
/// spec describes, without needing a real singleton pointer.
#[derive(Debug, Clone)]
pub enum Frame {
    Item(Arc<Variant>),
    Eos,
}

/// What an [`InputPort::get`] call yields: a value, or the fact that the
/// port is permanently drained (its upstream reference count reached zero
/// with no buffered items left).
#[derive(Debug, Clone)]
pub enum GetOutcome {
    Value(Arc<Variant>),
    Eos,
}

/// Input port consumption semantics (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputMode {
    Queue,
    Sticky,
    Static,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Queue
    }
}

/// Input port requiredness (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Required {
    Required,
    Optional,
    RequiredIfConnected,
}

impl Default for Required {
    fn default() -> Self {
        Required::Required
    }
}

/// Output port fan-out semantics (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputMode {
    Ref,
    Value,
    Circle,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Ref
    }
}

/// Bound applied to every port's internal queue (spec §5 "Queues SHOULD be
/// bounded so a fast producer cannot exhaust memory; the bound is a
/// process-level config"). Overridable via [`crate::runtime::RuntimeConfig`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
