//! End-to-end exercises of the seven concrete scenarios in spec §8
//! "Testable properties", plus the output-port fan-out invariants of §3/§8
//! that don't need a full `Graph` to observe. Grounded on the teacher's
//! `crates/core/tests/engine.rs` style: thin `#[tokio::test]`s driving real
//! wired networks rather than mocked components.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use weft_core::runtime::graph::{ConnectionSpec, Graph, GraphOutputSpec, InstanceSpec};
use weft_core::runtime::node::{Node, NodeState};
use weft_core::runtime::port::{Frame, InputMode, InputPort, OutputMode, OutputPort, Required};
use weft_core::runtime::registry::StdRegistry;
use weft_core::runtime::variant::Variant;
use weft_core::runtime::{Component, Flow, Process, ProcessOutput, RuntimeConfig};

/// A self-terminating, zero-input source that emits a fixed sequence of
/// values on its single `out` pin, then EOS — built as a bespoke [`Node`]
/// for the same reason `InlineValue` is (see `runtime::builtins`): the
/// generic [`Component`] pull loop has no step that terminates a node with
/// no inputs to observe EOS on.
struct Source {
    state: NodeState,
    values: Vec<Variant>,
}

impl Source {
    fn new(id: &str, out_mode: OutputMode, values: Vec<Variant>) -> Arc<dyn Node> {
        let mut outputs = HashMap::new();
        outputs.insert("out".to_string(), Arc::new(OutputPort::new("out", None, out_mode)));
        let state = NodeState::new(id, HashMap::new(), Vec::new(), outputs);
        Arc::new(Source { state, values })
    }
}

#[async_trait]
impl Node for Source {
    fn state(&self) -> &NodeState {
        &self.state
    }

    async fn run(self: Arc<Self>) {
        let out = self.state.output("out").expect("Source always has an 'out' pin");
        for v in &self.values {
            if self.state.stop.is_cancelled() {
                break;
            }
            let _ = out.send(v.clone()).await;
        }
        self.state.finish().await;
    }
}

/// Records every tick's sampled input map, in arrival order, for later
/// assertion. A generic [`Process`] rather than a bespoke `Node` — exercises
/// the ordinary [`Component`] pull/sample loop itself, not just the port
/// primitives underneath it.
struct RecordingSink {
    ticks: Arc<Mutex<Vec<HashMap<String, Variant>>>>,
}

#[async_trait]
impl Process for RecordingSink {
    async fn process(&self, inputs: &HashMap<String, Arc<Variant>>, _node: &NodeState) -> weft_core::Result<ProcessOutput> {
        let snapshot = inputs.iter().map(|(k, v)| (k.clone(), (**v).clone())).collect();
        self.ticks.lock().await.push(snapshot);
        Ok(ProcessOutput::Skip)
    }
}

/// Builds a [`Component`] instance wired with the given input pins, wrapping
/// a [`RecordingSink`] that records every tick's sampled inputs.
fn recording_sink(
    id: &str,
    pins: Vec<(&str, InputMode, Required, Option<Variant>)>,
) -> (Arc<dyn Node>, Arc<Mutex<Vec<HashMap<String, Variant>>>>) {
    let mut inputs = HashMap::new();
    let mut input_order = Vec::with_capacity(pins.len());
    for (pin_id, mode, required, default) in pins {
        input_order.push(pin_id.to_string());
        inputs.insert(pin_id.to_string(), Arc::new(InputPort::new(pin_id, None, mode, required, default, 8)));
    }
    let state = NodeState::new(id, inputs, input_order, HashMap::new());
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let process = Arc::new(RecordingSink { ticks: ticks.clone() });
    (Arc::new(Component::new(state, process)), ticks)
}

async fn drain_all(mut rx: mpsc::Receiver<Frame>) -> Vec<Variant> {
    let mut items = Vec::new();
    while let Some(frame) = rx.recv().await {
        match frame {
            Frame::Item(v) => items.push((*v).clone()),
            Frame::Eos => break,
        }
    }
    items
}

// --- Output port fan-out invariants (spec §3, §8) ---------------------------

#[tokio::test]
async fn ref_fan_out_preserves_item_identity_across_consumers() {
    let out = OutputPort::new("out", None, OutputMode::Ref);
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    out.connect(tx_a).await;
    out.connect(tx_b).await;

    out.send(Variant::Integer(1)).await.unwrap();
    out.close().await;

    let (Frame::Item(a), Frame::Item(b)) = (rx_a.recv().await.unwrap(), rx_b.recv().await.unwrap()) else {
        panic!("expected items before EOS");
    };
    assert!(Arc::ptr_eq(&a, &b), "REF fan-out must share object identity across consumers");
    assert!(matches!(rx_a.recv().await.unwrap(), Frame::Eos));
    assert!(matches!(rx_b.recv().await.unwrap(), Frame::Eos));
}

#[tokio::test]
async fn value_fan_out_gives_each_consumer_an_independent_copy() {
    let out = OutputPort::new("out", None, OutputMode::Value);
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    out.connect(tx_a).await;
    out.connect(tx_b).await;

    let mut m = std::collections::BTreeMap::new();
    m.insert("k".to_string(), Variant::Integer(0));
    out.send(Variant::Object(m)).await.unwrap();

    let (Frame::Item(a), Frame::Item(b)) = (rx_a.recv().await.unwrap(), rx_b.recv().await.unwrap()) else {
        panic!("expected items");
    };
    assert_eq!(*a, *b, "VALUE fan-out copies must be equal by content");
    assert!(!Arc::ptr_eq(&a, &b), "VALUE fan-out must deep-copy per consumer, not share identity");
}

#[tokio::test]
async fn circle_fan_out_round_robins_across_consumers() {
    let out = OutputPort::new("out", None, OutputMode::Circle);
    let (tx_x, mut rx_x) = mpsc::channel(8);
    let (tx_y, mut rx_y) = mpsc::channel(8);
    let (tx_z, mut rx_z) = mpsc::channel(8);
    out.connect(tx_x).await;
    out.connect(tx_y).await;
    out.connect(tx_z).await;

    for ch in ['a', 'b', 'c', 'd', 'e'] {
        out.send(Variant::String(ch.to_string())).await.unwrap();
    }
    out.close().await;

    assert_eq!(drain_all(rx_x).await, vec![Variant::String("a".into()), Variant::String("d".into())]);
    assert_eq!(drain_all(rx_y).await, vec![Variant::String("b".into()), Variant::String("e".into())]);
    assert_eq!(drain_all(rx_z).await, vec![Variant::String("c".into())]);
}

// --- Full-network concrete scenarios (spec §8) ------------------------------

#[tokio::test]
async fn scenario_1_single_link_propagation() {
    let source = Source::new("src", OutputMode::Ref, vec![Variant::String("hello".to_string())]);
    let (sink, ticks) = recording_sink("sink", vec![("in", InputMode::Queue, Required::Required, None)]);

    let graph = Graph::build(
        "main",
        vec![InstanceSpec { id: "src".into(), node: source }, InstanceSpec { id: "sink".into(), node: sink }],
        vec![ConnectionSpec {
            from_instance: Some("src".into()),
            from_port: "out".into(),
            to_instance: Some("sink".into()),
            to_port: "in".into(),
        }],
        vec![],
        vec![],
        None,
    )
    .await
    .unwrap();

    graph.clone().run().await;

    let recorded = ticks.lock().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["in"], Variant::String("hello".to_string()));
}

#[tokio::test]
async fn scenario_5_sticky_latch_pairs_with_queue_in_arrival_order() {
    let source = Source::new(
        "q",
        OutputMode::Ref,
        vec![Variant::Integer(10), Variant::Integer(20), Variant::Integer(30)],
    );
    let (sink, ticks) = recording_sink(
        "concat",
        vec![
            ("sticky", InputMode::Sticky, Required::Required, Some(Variant::Integer(7))),
            ("q", InputMode::Queue, Required::Required, None),
        ],
    );

    let graph = Graph::build(
        "main",
        vec![InstanceSpec { id: "q".into(), node: source }, InstanceSpec { id: "concat".into(), node: sink }],
        vec![ConnectionSpec {
            from_instance: Some("q".into()),
            from_port: "out".into(),
            to_instance: Some("concat".into()),
            to_port: "q".into(),
        }],
        vec![],
        vec![],
        None,
    )
    .await
    .unwrap();

    graph.clone().run().await;

    let recorded = ticks.lock().await;
    assert_eq!(recorded.len(), 3);
    for (i, expected_q) in [10, 20, 30].into_iter().enumerate() {
        assert_eq!(recorded[i]["sticky"], Variant::Integer(7));
        assert_eq!(recorded[i]["q"], Variant::Integer(expected_q));
    }
}

#[tokio::test]
async fn scenario_6_nested_graph_eos_propagates_through_graph_port() {
    let inline = weft_core::runtime::builtins::InlineValue::build(
        "inline",
        Some(serde_json::json!({ "value": { "type": "string", "value": "x" } })),
    )
    .unwrap();

    let inner = Graph::build(
        "sub",
        vec![InstanceSpec { id: "inline".into(), node: inline }],
        vec![ConnectionSpec {
            from_instance: Some("inline".into()),
            from_port: "value".into(),
            to_instance: None,
            to_port: "value".into(),
        }],
        vec![],
        vec![GraphOutputSpec { id: "value".into(), type_hint: None, mode: OutputMode::Ref }],
        None,
    )
    .await
    .unwrap();

    let outer = Graph::build(
        "main",
        vec![InstanceSpec { id: "sub".into(), node: inner }],
        vec![ConnectionSpec {
            from_instance: Some("sub".into()),
            from_port: "value".into(),
            to_instance: None,
            to_port: "result".into(),
        }],
        vec![],
        vec![GraphOutputSpec { id: "result".into(), type_hint: None, mode: OutputMode::Ref }],
        None,
    )
    .await
    .unwrap();

    let (tx, rx) = mpsc::channel(8);
    outer.state().output("result").unwrap().connect(tx).await;

    outer.clone().run().await;

    assert_eq!(drain_all(rx).await, vec![Variant::String("x".to_string())]);
}

#[tokio::test]
async fn scenario_7_required_if_connected_blocks_only_when_wired() {
    // Case A: `opt` wired to a producer — the node must pull it every tick.
    let source_a = Source::new("opt_src", OutputMode::Ref, vec![Variant::Integer(1)]);
    let main_a = Source::new("main_src", OutputMode::Ref, vec![Variant::Integer(100)]);
    let (sink_a, ticks_a) = recording_sink(
        "sink",
        vec![
            ("main", InputMode::Queue, Required::Required, None),
            ("opt", InputMode::Queue, Required::RequiredIfConnected, None),
        ],
    );

    let graph_a = Graph::build(
        "main",
        vec![
            InstanceSpec { id: "opt_src".into(), node: source_a },
            InstanceSpec { id: "main_src".into(), node: main_a },
            InstanceSpec { id: "sink".into(), node: sink_a },
        ],
        vec![
            ConnectionSpec {
                from_instance: Some("opt_src".into()),
                from_port: "out".into(),
                to_instance: Some("sink".into()),
                to_port: "opt".into(),
            },
            ConnectionSpec {
                from_instance: Some("main_src".into()),
                from_port: "out".into(),
                to_instance: Some("sink".into()),
                to_port: "main".into(),
            },
        ],
        vec![],
        vec![],
        None,
    )
    .await
    .unwrap();

    graph_a.clone().run().await;
    assert_eq!(ticks_a.lock().await[0]["opt"], Variant::Integer(1));

    // Case B: `opt` left unconnected — the node runs without ever pulling it.
    let main_b = Source::new("main_src", OutputMode::Ref, vec![Variant::Integer(200)]);
    let (sink_b, ticks_b) = recording_sink(
        "sink",
        vec![
            ("main", InputMode::Queue, Required::Required, None),
            ("opt", InputMode::Queue, Required::RequiredIfConnected, None),
        ],
    );

    let graph_b = Graph::build(
        "main",
        vec![InstanceSpec { id: "main_src".into(), node: main_b }, InstanceSpec { id: "sink".into(), node: sink_b }],
        vec![ConnectionSpec {
            from_instance: Some("main_src".into()),
            from_port: "out".into(),
            to_instance: Some("sink".into()),
            to_port: "main".into(),
        }],
        vec![],
        vec![],
        None,
    )
    .await
    .unwrap();

    // Must complete without ever blocking on the unconnected `opt` pin.
    tokio::time::timeout(Duration::from_secs(2), graph_b.clone().run())
        .await
        .expect("node must not block forever pulling an unconnected REQUIRED_IF_CONNECTED pin");
    let recorded_b = ticks_b.lock().await;
    assert_eq!(recorded_b.len(), 1);
    assert!(!recorded_b[0].contains_key("opt"));
    assert_eq!(recorded_b[0]["main"], Variant::Integer(200));
}

/// Boundary case (spec §8): a graph with zero instances runs and stops
/// immediately.
#[tokio::test]
async fn empty_graph_stops_immediately() {
    let graph = Graph::build("main", vec![], vec![], vec![], vec![], None).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), graph.clone().run()).await.unwrap();
}

/// Boundary case: `stop()` is idempotent (spec §8 "Idempotence").
#[tokio::test]
async fn stop_called_twice_is_equivalent_to_once() {
    let source = Source::new("src", OutputMode::Ref, vec![Variant::Integer(1)]);
    source.stop();
    source.stop();
    source.clone().run().await;
    source.stopped().await;
}

/// `shutdown()` runs once per node after the graph's children are fully
/// quiesced (spec §4.4 "Shutdown").
#[tokio::test]
async fn shutdown_hook_runs_after_stopped() {
    struct TracksShutdown {
        state: NodeState,
        shutdown_called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Node for TracksShutdown {
        fn state(&self) -> &NodeState {
            &self.state
        }
        async fn run(self: Arc<Self>) {
            self.state.finish().await;
        }
        async fn shutdown(&self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
        }
    }

    let called = Arc::new(AtomicBool::new(false));
    let node: Arc<dyn Node> =
        Arc::new(TracksShutdown {
            state: NodeState::new("n", HashMap::new(), Vec::new(), HashMap::new()),
            shutdown_called: called.clone(),
        });

    let graph = Graph::build("main", vec![InstanceSpec { id: "n".into(), node }], vec![], vec![], vec![], None)
        .await
        .unwrap();
    graph.clone().run().await;

    assert!(called.load(Ordering::SeqCst));
}

/// End-to-end load from a fixture file on disk (spec §4.7 `from_file`),
/// exercising the loader, the builtin registry, and the macro/stdlib node
/// resolution path together.
#[tokio::test]
async fn loads_and_runs_a_fixture_flow_file() {
    let registry = Arc::new(StdRegistry::with_builtins());
    let flow = Flow::from_file("tests/data/flow.json", registry, &RuntimeConfig::default()).await.unwrap();
    flow.run_sync().await;
}
