use std::sync::Arc;

use super::port::{GetOutcome, InputPort, OutputPort};

/// Splices a graph's externally-visible input pin into its internal wiring
/// (spec §4.5 "Graph ports"). The *outer* [`InputPort`] is what the parent
/// graph's construction algorithm wires as if this graph were an ordinary
/// leaf instance; the *inner* [`OutputPort`] is what nodes inside this graph
/// see as their upstream producer. A background relay task forwards frames
/// from one to the other, preserving object identity — REF fan-out through a
/// graph boundary must not silently degrade to VALUE semantics.
///
/// Grounded on the teacher's `SubflowState` relay task
/// (`crates/core/src/runtime/flow.rs`), generalized from a single fixed
/// fan-out to this spec's typed QUEUE/STICKY/STATIC, REQUIRED/OPTIONAL/
/// REQUIRED_IF_CONNECTED port model.
pub struct InputGraphPort {
    pub outer: Arc<InputPort>,
    pub inner: Arc<OutputPort>,
}

impl InputGraphPort {
    pub fn new(outer: Arc<InputPort>, inner: Arc<OutputPort>) -> Self {
        InputGraphPort { outer, inner }
    }

    /// Relays every item from the outer pin to the inner one until EOS, then
    /// closes the inner output. If the outer pin was left unwired by the
    /// parent (`ref_count() == 0` from construction), no producer will ever
    /// send it an EOS frame, so the relay closes immediately rather than
    /// blocking forever on a `get()` that can never resolve.
    pub async fn run(self: Arc<Self>) {
        if self.outer.ref_count() == 0 {
            self.inner.close().await;
            return;
        }
        loop {
            match self.outer.get().await {
                GetOutcome::Value(v) => self.inner.send_shared(v).await,
                GetOutcome::Eos => break,
            }
        }
        self.inner.close().await;
    }
}

/// The mirror image of [`InputGraphPort`]: relays a graph's internal output
/// to its externally-visible output pin.
pub struct OutputGraphPort {
    pub inner: Arc<InputPort>,
    pub outer: Arc<OutputPort>,
}

impl OutputGraphPort {
    pub fn new(inner: Arc<InputPort>, outer: Arc<OutputPort>) -> Self {
        OutputGraphPort { inner, outer }
    }

    pub async fn run(self: Arc<Self>) {
        if self.inner.ref_count() == 0 {
            self.outer.close().await;
            return;
        }
        loop {
            match self.inner.get().await {
                GetOutcome::Value(v) => self.outer.send_shared(v).await,
                GetOutcome::Eos => break,
            }
        }
        self.outer.close().await;
    }
}
