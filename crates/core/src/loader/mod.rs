//! Parses a declarative flow description, resolves imports to concrete node
//! classes, and wires a runnable [`Graph`] (spec §4.6).

pub mod decl;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use decl::{ConnectionDecl, FlowDecl, InputPinDecl, InstanceDecl, OutputPinDecl};

use crate::runtime::builtins::{Conditional, GetAttribute, InlineValue, MacroKind};
use crate::runtime::component::Component;
use crate::runtime::graph::{ConnectionSpec, Graph, GraphInputSpec, GraphOutputSpec, InstanceSpec};
use crate::runtime::node::{Node, NodeConfig, NodeState};
use crate::runtime::port::{InputPort, OutputPort};
use crate::runtime::registry::{ComponentRegistry, RegisteredComponent};
use crate::runtime::variant::{typed_value_from_json, Variant};
use crate::FlowError;

/// The distinguished import source name reserved for macros and the small
/// built-in standard library (spec §4.6 "a module reference or the
/// distinguished built-in namespace"). Not itself a filesystem path.
pub const BUILTIN_NAMESPACE: &str = "builtin";

/// Loads a root flow declaration file, recursively resolving nested-graph
/// imports, and wires the result into a runnable [`Graph`] tree.
pub struct Loader {
    registry: Arc<dyn ComponentRegistry>,
    queue_capacity: usize,
}

impl Loader {
    pub fn new(registry: Arc<dyn ComponentRegistry>, queue_capacity: usize) -> Self {
        Loader { registry, queue_capacity }
    }

    /// Loads and wires `path` as the root graph (spec §4.7 `from_file`).
    pub async fn load_file(&self, path: impl AsRef<Path>) -> crate::Result<(Arc<Graph>, FlowDecl)> {
        let path = path.as_ref();

        let mut decls = HashMap::new();
        let mut sorter = crate::utils::TopologicalSorter::new();
        let mut stack = Vec::new();
        let root_canon = collect_decls(path, &mut decls, &mut sorter, &mut stack)?;
        // Redundant, independent cycle check over the whole accumulated
        // import graph (spec §4.6 loader/factory resolution notes).
        sorter.topological_sort()?;

        let root_decl = decls.get(&root_canon).expect("root was just inserted").clone();
        let root_base_dir = root_canon.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        let graph = self
            .build_graph(root_decl.node.id.clone(), &root_decl, &root_base_dir, &decls)
            .await?;
        Ok((graph, root_decl))
    }

    /// Loads and wires an in-memory declaration as the root graph, with no
    /// filesystem-backed nested imports resolvable (only the builtin
    /// namespace and a host's [`ComponentRegistry`] are available).
    pub async fn load_decl(&self, decl: FlowDecl) -> crate::Result<Arc<Graph>> {
        for source in decl.imports.keys() {
            if source != BUILTIN_NAMESPACE {
                return Err(FlowError::Load(format!(
                    "in-memory declarations cannot resolve filesystem import '{}'",
                    source
                ))
                .into());
            }
        }
        let decls = HashMap::new();
        let base_dir = PathBuf::from(".");
        self.build_graph(decl.node.id.clone(), &decl, &base_dir, &decls).await
    }

    fn build_graph<'a>(
        &'a self,
        graph_id: String,
        decl: &'a FlowDecl,
        base_dir: &'a Path,
        decls: &'a HashMap<PathBuf, FlowDecl>,
    ) -> Pin<Box<dyn Future<Output = crate::Result<Arc<Graph>>> + Send + 'a>> {
        Box::pin(async move {
            let graph_inputs =
                decl.node.inputs.iter().map(graph_input_spec).collect::<crate::Result<Vec<_>>>()?;
            let graph_outputs: Vec<GraphOutputSpec> = decl.node.outputs.iter().map(graph_output_spec).collect();

            let mut instances = Vec::with_capacity(decl.node.instances.len());
            for instance in &decl.node.instances {
                let node = self.build_instance(instance, decl, base_dir, decls).await?;
                instances.push(InstanceSpec { id: instance.id.clone(), node });
            }

            let connections: Vec<ConnectionSpec> =
                decl.node.connections.iter().map(|c| connection_spec(c, &decl.node.id)).collect();

            Graph::build(graph_id, instances, connections, graph_inputs, graph_outputs, Some(self.queue_capacity)).await
        })
    }

    async fn build_instance(
        &self,
        instance: &InstanceDecl,
        owner: &FlowDecl,
        base_dir: &Path,
        decls: &HashMap<PathBuf, FlowDecl>,
    ) -> crate::Result<Arc<dyn Node>> {
        if let Some(kind) = MacroKind::detect(&instance.node_id, &instance.id) {
            return build_macro_node(kind, instance, self.queue_capacity);
        }

        if let Some(source) = import_source_of(owner, &instance.node_id) {
            let sub_path = base_dir.join(source);
            let sub_canon = canonicalize_best_effort(&sub_path);
            let sub_decl = decls.get(&sub_canon).ok_or_else(|| {
                FlowError::Load(format!("nested flow '{}' was not pre-resolved", sub_path.display()))
            })?;
            let sub_base_dir = sub_canon.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let sub_graph: Arc<Graph> = self.build_graph(instance.id.clone(), sub_decl, &sub_base_dir, decls).await?;
            return Ok(sub_graph);
        }

        match self.registry.lookup(&instance.node_id) {
            Some(entry) => build_component_node(instance, entry, self.queue_capacity),
            None => Err(FlowError::UnknownNodeType(instance.node_id.clone()).into()),
        }
    }
}

fn import_source_of<'a>(owner: &'a FlowDecl, node_id: &str) -> Option<&'a str> {
    owner
        .imports
        .iter()
        .filter(|(source, _)| source.as_str() != BUILTIN_NAMESPACE)
        .find(|(_, names)| names.iter().any(|n| n == node_id))
        .map(|(source, _)| source.as_str())
}

fn build_macro_node(kind: MacroKind, instance: &InstanceDecl, queue_capacity: usize) -> crate::Result<Arc<dyn Node>> {
    match kind {
        MacroKind::InlineValue => InlineValue::build(instance.id.clone(), instance.macro_data.clone()),
        MacroKind::GetAttribute => GetAttribute::build(instance.id.clone(), instance.macro_data.clone(), Some(queue_capacity)),
        MacroKind::Conditional => Conditional::build(instance.id.clone(), instance.macro_data.clone(), Some(queue_capacity)),
    }
}

fn build_component_node(
    instance: &InstanceDecl,
    entry: RegisteredComponent,
    queue_capacity: usize,
) -> crate::Result<Arc<dyn Node>> {
    let mut inputs = HashMap::with_capacity(entry.inputs.len());
    let mut input_order = Vec::with_capacity(entry.inputs.len());
    for pin in entry.inputs {
        let default_value = extract_default(&instance.input_config, pin.id)?;
        input_order.push(pin.id.to_string());
        inputs.insert(
            pin.id.to_string(),
            Arc::new(InputPort::new(pin.id, pin.type_hint.map(str::to_string), pin.mode, pin.required, default_value, queue_capacity)),
        );
    }
    let mut outputs = HashMap::with_capacity(entry.outputs.len());
    for pin in entry.outputs {
        outputs.insert(pin.id.to_string(), Arc::new(OutputPort::new(pin.id, pin.type_hint.map(str::to_string), pin.mode)));
    }

    let params = Variant::from(serde_json::Value::Object(instance.input_config.clone()));
    let config = NodeConfig { id: instance.id.clone(), component_type: instance.node_id.clone(), params };
    let state =
        NodeState::with_display_name(instance.id.clone(), instance.display_name.clone(), inputs, input_order, outputs);
    let process = (entry.factory)(&config, &state)?;
    Ok(Arc::new(Component::new(state, process)))
}

/// Decodes one `inputConfig` entry into a port default. Accepts either the
/// `{type, value}` typed-value wrapper (spec §6) or a bare JSON value.
fn extract_default(input_config: &serde_json::Map<String, serde_json::Value>, pin_id: &str) -> crate::Result<Option<Variant>> {
    let Some(raw) = input_config.get(pin_id) else { return Ok(None) };
    if let Some(obj) = raw.as_object() {
        if let (Some(serde_json::Value::String(type_name)), Some(value)) = (obj.get("type"), obj.get("value")) {
            return Ok(Some(typed_value_from_json(type_name, value)?));
        }
    }
    Ok(Some(Variant::from(raw.clone())))
}

fn graph_input_spec(p: &InputPinDecl) -> crate::Result<GraphInputSpec> {
    Ok(GraphInputSpec {
        id: p.id.clone(),
        type_hint: p.type_name.clone(),
        mode: p.mode,
        required: p.required,
        default_value: p.value.as_ref().map(|v| v.to_variant()).transpose()?,
    })
}

fn graph_output_spec(p: &OutputPinDecl) -> GraphOutputSpec {
    GraphOutputSpec { id: p.id.clone(), type_hint: p.type_name.clone(), mode: p.mode }
}

fn connection_spec(c: &ConnectionDecl, own_id: &str) -> ConnectionSpec {
    ConnectionSpec {
        from_instance: if c.from.ins_id == own_id { None } else { Some(c.from.ins_id.clone()) },
        from_port: c.from.pin_id.clone(),
        to_instance: if c.to.ins_id == own_id { None } else { Some(c.to.ins_id.clone()) },
        to_port: c.to.pin_id.clone(),
    }
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Recursively parses `path` and every flow file it imports, populating
/// `decls` keyed by canonical path. Rejects a cyclic import the moment a
/// path reappears on the current recursion `stack` (spec §4.6 "the loader
/// must detect and reject cyclic imports"); `sorter` separately accumulates
/// every discovered edge for the secondary whole-graph check run once at the
/// top of [`Loader::load_file`].
fn collect_decls(
    path: &Path,
    decls: &mut HashMap<PathBuf, FlowDecl>,
    sorter: &mut crate::utils::TopologicalSorter<PathBuf>,
    stack: &mut Vec<PathBuf>,
) -> crate::Result<PathBuf> {
    let canon = canonicalize_best_effort(path);
    if stack.contains(&canon) {
        return Err(FlowError::CyclicImport(canon.display().to_string()).into());
    }
    if decls.contains_key(&canon) {
        return Ok(canon);
    }

    let text = std::fs::read_to_string(&canon)?;
    let decl = FlowDecl::from_str(&text)?;

    stack.push(canon.clone());
    sorter.add_vertex(canon.clone());
    let base_dir = canon.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    for (source, names) in decl.imports.iter() {
        if source == BUILTIN_NAMESPACE {
            continue;
        }
        let child_path = base_dir.join(source);
        let child_canon = collect_decls(&child_path, decls, sorter, stack)?;
        sorter.add_dep(canon.clone(), child_canon.clone());

        let child_decl = decls.get(&child_canon).expect("just inserted by the recursive call");
        for name in names {
            if name != &child_decl.node.id {
                return Err(FlowError::Load(format!(
                    "import '{}' from '{}' does not match the exported graph id '{}'",
                    name,
                    source,
                    child_decl.node.id
                ))
                .into());
            }
        }
    }

    stack.pop();
    decls.insert(canon.clone(), decl);
    Ok(canon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registry::StdRegistry;

    fn loader() -> Loader {
        Loader::new(Arc::new(StdRegistry::with_builtins()), 16)
    }

    #[tokio::test]
    async fn single_link_propagation() {
        let json = serde_json::json!({
            "imports": {},
            "node": {
                "id": "main",
                "inputs": [],
                "outputs": [],
                "instances": [
                    {
                        "id": "src",
                        "nodeId": "InlineValue__src",
                        "macroData": { "value": { "type": "string", "value": "hello" } }
                    },
                    { "id": "sink", "nodeId": "std.Debug" }
                ],
                "connections": [
                    { "from": { "insId": "src", "pinId": "value" }, "to": { "insId": "sink", "pinId": "in" } }
                ]
            }
        });
        let decl = FlowDecl::from_str(&json.to_string()).unwrap();
        let graph = loader().load_decl(decl).await.unwrap();
        graph.clone().run().await;
    }

    #[tokio::test]
    async fn unknown_node_type_is_a_load_error() {
        let json = serde_json::json!({
            "imports": {},
            "node": {
                "id": "main",
                "inputs": [],
                "outputs": [],
                "instances": [{ "id": "a", "nodeId": "not.a.real.type" }],
                "connections": []
            }
        });
        let decl = FlowDecl::from_str(&json.to_string()).unwrap();
        assert!(loader().load_decl(decl).await.is_err());
    }

    #[tokio::test]
    async fn required_input_without_connection_or_default_fails_validation() {
        let json = serde_json::json!({
            "imports": {},
            "node": {
                "id": "main",
                "inputs": [],
                "outputs": [],
                "instances": [{ "id": "sink", "nodeId": "std.Debug" }],
                "connections": []
            }
        });
        let decl = FlowDecl::from_str(&json.to_string()).unwrap();
        assert!(loader().load_decl(decl).await.is_err());
    }

    #[tokio::test]
    async fn empty_graph_runs_and_stops_immediately() {
        let json = serde_json::json!({
            "imports": {},
            "node": { "id": "main", "inputs": [], "outputs": [], "instances": [], "connections": [] }
        });
        let decl = FlowDecl::from_str(&json.to_string()).unwrap();
        let graph = loader().load_decl(decl).await.unwrap();
        graph.clone().run().await;
    }
}
