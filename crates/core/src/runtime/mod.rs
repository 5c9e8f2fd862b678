pub mod builtins;
pub mod component;
pub mod config;
pub mod flow;
pub mod graph;
pub mod graph_port;
pub mod node;
pub mod port;
pub mod registry;
pub mod variant;

pub use component::{Component, Process, ProcessOutput};
pub use config::RuntimeConfig;
pub use flow::Flow;
pub use graph::Graph;
pub use node::{Node, NodeConfig, NodeState};
pub use port::{Frame, GetOutcome, InputMode, InputPort, OutputMode, OutputPort, Required};
pub use variant::Variant;
