use std::collections::HashMap;
use std::sync::Arc;

use super::component::Process;
use super::node::{NodeConfig, NodeState};
use super::port::{InputMode, OutputMode, Required};

/// Builds a [`Process`] for one declared instance once its [`NodeState`]
/// (ports already wired, queue capacities already resolved) is ready. Plain
/// `fn` rather than a closure type so it can sit in a `'static`
/// [`inventory`]-collected descriptor (spec §4.4 step 2, grounded on the
/// teacher's `NodeFactory`/`define_builtin_flow_node!` pattern).
pub type ComponentFactory = fn(&NodeConfig, &NodeState) -> crate::Result<Arc<dyn Process>>;

/// One pin of a registered component type's fixed input shape (spec §9 "a
/// user-written node is trusted to honor its declared input/output shape").
/// Static for the lifetime of the process: a node class's port shape does
/// not vary per instance, only the default `value` an instance may supply
/// for it via its declared `inputConfig` does.
#[derive(Debug, Clone, Copy)]
pub struct InputPinSchema {
    pub id: &'static str,
    pub type_hint: Option<&'static str>,
    pub mode: InputMode,
    pub required: Required,
}

/// One pin of a registered component type's fixed output shape.
#[derive(Debug, Clone, Copy)]
pub struct OutputPinSchema {
    pub id: &'static str,
    pub type_hint: Option<&'static str>,
    pub mode: OutputMode,
}

/// One builtin component's registration, submitted at link time via
/// [`define_builtin_component!`]: its fixed port shape plus the factory that
/// builds its [`Process`] once that shape has been wired into a
/// [`NodeState`] by the loader.
pub struct BuiltinComponentDescriptor {
    pub type_name: &'static str,
    pub inputs: &'static [InputPinSchema],
    pub outputs: &'static [OutputPinSchema],
    pub factory: ComponentFactory,
}

inventory::collect!(BuiltinComponentDescriptor);

/// Registers a statically-linked component type, analogous to the teacher's
/// `define_builtin_flow_node!` macro over `inventory::submit!`.
#[macro_export]
macro_rules! define_builtin_component {
    ($type_name:literal, inputs: [$($in:expr),* $(,)?], outputs: [$($out:expr),* $(,)?], $factory:expr) => {
        inventory::submit! {
            $crate::runtime::registry::BuiltinComponentDescriptor {
                type_name: $type_name,
                inputs: &[$($in),*],
                outputs: &[$($out),*],
                factory: $factory,
            }
        }
    };
}

/// A registered type's fixed port shape plus its [`ComponentFactory`] — what
/// the loader needs to both build a [`NodeState`] for a declared instance and
/// then ask for its [`Process`] body (spec §4.6 "Loader and factory").
#[derive(Clone, Copy)]
pub struct RegisteredComponent {
    pub inputs: &'static [InputPinSchema],
    pub outputs: &'static [OutputPinSchema],
    pub factory: ComponentFactory,
}

/// Resolves a declared component type name to its port shape and a
/// [`Process`] constructor (spec §9 "Module resolution"). The spec describes
/// this as loading a "module" by name; since this is a library embedded into
/// a host process rather than a dynamically-loaded plugin host, resolution
/// is a lookup against a registry the host builds, not an OS `dlopen`.
/// Builtin general-purpose components register themselves automatically via
/// [`inventory`]; a host may layer its own domain-specific components on top
/// with [`StdRegistry::register`].
pub trait ComponentRegistry: Send + Sync {
    fn lookup(&self, type_name: &str) -> Option<RegisteredComponent>;
    fn contains(&self, type_name: &str) -> bool {
        self.lookup(type_name).is_some()
    }
}

/// The default [`ComponentRegistry`]: every `inventory`-collected builtin,
/// plus whatever a host registers with [`StdRegistry::register`].
pub struct StdRegistry {
    components: HashMap<String, RegisteredComponent>,
}

impl StdRegistry {
    /// Collects every statically-linked builtin component. Call once per
    /// process; the result is cheap to clone-by-reference (wrap in `Arc`).
    pub fn with_builtins() -> Self {
        let mut components = HashMap::new();
        for descriptor in inventory::iter::<BuiltinComponentDescriptor> {
            components.insert(
                descriptor.type_name.to_string(),
                RegisteredComponent { inputs: descriptor.inputs, outputs: descriptor.outputs, factory: descriptor.factory },
            );
        }
        StdRegistry { components }
    }

    /// Registers (or overrides) a single component type at runtime. Lets an
    /// embedding host extend the catalog without a second builtin pass.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        inputs: &'static [InputPinSchema],
        outputs: &'static [OutputPinSchema],
        factory: ComponentFactory,
    ) {
        self.components.insert(type_name.into(), RegisteredComponent { inputs, outputs, factory });
    }
}

impl Default for StdRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ComponentRegistry for StdRegistry {
    fn lookup(&self, type_name: &str) -> Option<RegisteredComponent> {
        self.components.get(type_name).copied()
    }
}
