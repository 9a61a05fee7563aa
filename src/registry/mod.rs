// Datatype registry: logical type name -> datatype descriptor
//
// Entries live in an arena of nodes. A node registered with a base type
// keeps only its own overrides plus the index of its parent node, and every
// other field is looked up through the parent at resolution time. A plain
// registration gets a root node whose fields are complete.
//
// Consequences worth knowing:
// - merging into an existing entry (re-registering without a base) mutates
//   its node in place, so entries extending it observe the change;
// - replacing or removing a name only unlinks the name, entries already
//   extending the old node keep following it.
pub mod builtins;
pub mod defaults;
pub mod literals;

pub use defaults::{RegistryDefaults, RegistryOptions};

use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

use crate::core::{
    ArraySerializer, ArraySupport, ArrayWrapper, ColumnFormatter, Datatype, DatatypeError,
    DatatypeOptions, PhysicalType, ScalarSerializer,
};

/// Longest allowed chain of `base_type` links
pub const MAX_INHERITANCE_DEPTH: usize = 8;

type NodeId = usize;

/// Fields of an entry that extends nothing. Always complete.
#[derive(Clone)]
struct RootFields {
    physical_type: Option<PhysicalType>,
    array_wrapper: Option<ArrayWrapper>,
    array_serializer: ArraySerializer,
    scalar_serializer: ScalarSerializer,
    column_formatter: ColumnFormatter,
}

/// Fields an extending entry set itself; the rest come from the parent.
#[derive(Clone, Default)]
struct Overrides {
    physical_type: Option<PhysicalType>,
    array_wrapper: ArraySupport,
    array_serializer: Option<ArraySerializer>,
    scalar_serializer: Option<ScalarSerializer>,
    column_formatter: Option<ColumnFormatter>,
}

enum Layer {
    Root(RootFields),
    Derived { parent: NodeId, overrides: Overrides },
}

struct Node {
    base_type: Option<String>,
    layer: Layer,
    /// 0 for roots, parent depth + 1 otherwise
    depth: usize,
    /// Whether a name currently points at this node
    named: bool,
    /// Number of live nodes using this one as parent
    dependents: usize,
}

enum Slot {
    Occupied(Node),
    Vacant,
}

pub struct DatatypeRegistry {
    defaults: RegistryDefaults,
    names: IndexMap<String, NodeId>,
    nodes: Vec<Slot>,
    free: Vec<NodeId>,
}

impl DatatypeRegistry {
    /// Registry pre-loaded with the built-in PostgreSQL datatypes
    #[must_use]
    pub fn new(defaults: RegistryDefaults) -> Self {
        let mut registry = Self::empty(defaults);

        for (name, options) in builtins::datatypes() {
            if let Err(err) = registry.register(name, options) {
                // The seed table lists every base before the entries extending it
                unreachable!("built-in datatype table is inconsistent: {err}");
            }
        }

        registry
    }

    /// Registry without any datatype
    #[must_use]
    pub fn empty(defaults: RegistryDefaults) -> Self {
        Self {
            defaults,
            names: IndexMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_options(options: &RegistryOptions) -> Self {
        Self::new(RegistryDefaults::from_options(options))
    }

    #[must_use]
    pub const fn defaults(&self) -> &RegistryDefaults {
        &self.defaults
    }

    /// Register a datatype, or update the one already registered as `name`
    ///
    /// - with `base_type`: a new entry extending that base replaces `name`
    /// - without, when `name` exists: the given fields are merged into it
    /// - without, when `name` is new: unset functions come from the defaults
    pub fn register(
        &mut self,
        name: impl Into<String>,
        options: DatatypeOptions,
    ) -> Result<&mut Self, DatatypeError> {
        let name = name.into();

        if let Some(base) = options.base_type.clone() {
            let parent = *self
                .names
                .get(&base)
                .ok_or_else(|| DatatypeError::UnknownBaseType {
                    name: name.clone(),
                    base: base.clone(),
                })?;

            let parent_depth = self.node(parent).depth;
            if parent_depth >= MAX_INHERITANCE_DEPTH {
                return Err(DatatypeError::InheritanceTooDeep {
                    name,
                    base,
                    depth: parent_depth,
                });
            }

            let node = Node {
                base_type: Some(base.clone()),
                layer: Layer::Derived {
                    parent,
                    overrides: Overrides {
                        physical_type: options.physical_type,
                        array_wrapper: options.array_wrapper,
                        array_serializer: options.array_serializer,
                        scalar_serializer: options.scalar_serializer,
                        column_formatter: options.column_formatter,
                    },
                },
                depth: parent_depth + 1,
                named: true,
                dependents: 0,
            };
            self.node_mut(parent).dependents += 1;
            let id = self.alloc(node);

            if let Some(previous) = self.names.insert(name.clone(), id) {
                self.detach(previous);
            }
            debug!(target: "pgr_datatypes::registry", "registered '{}' extending '{}'", name, base);
        } else if let Some(&id) = self.names.get(&name) {
            self.merge(id, options);
            debug!(target: "pgr_datatypes::registry", "merged options into '{}'", name);
        } else {
            let defaults = &self.defaults;
            let array_wrapper = match options.array_wrapper {
                ArraySupport::Inherit => Some(defaults.array_wrapper.clone()),
                ArraySupport::Disabled => None,
                ArraySupport::Wrapper(wrapper) => Some(wrapper),
            };
            let root = RootFields {
                physical_type: options.physical_type,
                array_wrapper,
                array_serializer: options
                    .array_serializer
                    .unwrap_or_else(|| defaults.array_serializer.clone()),
                scalar_serializer: options
                    .scalar_serializer
                    .unwrap_or_else(|| defaults.scalar_serializer.clone()),
                column_formatter: options
                    .column_formatter
                    .unwrap_or_else(|| defaults.column_formatter.clone()),
            };

            let id = self.alloc(Node {
                base_type: None,
                layer: Layer::Root(root),
                depth: 0,
                named: true,
                dependents: 0,
            });
            self.names.insert(name.clone(), id);
            debug!(target: "pgr_datatypes::registry", "registered '{}'", name);
        }

        Ok(self)
    }

    /// Remove a datatype. Unknown names are ignored.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        if let Some(id) = self.names.shift_remove(name) {
            self.detach(id);
            debug!(target: "pgr_datatypes::registry", "removed '{}'", name);
        }
        self
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Datatype> {
        let (name, &id) = self.names.get_key_value(name)?;
        Some(self.resolve_node(name, id))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Human-readable problems with the registered entries, empty if none
    ///
    /// Serializers and the column formatter cannot be missing (`Datatype`
    /// always carries them), so only the physical type and array support
    /// are checked.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (name, &id) in &self.names {
            let datatype = self.resolve_node(name, id);

            match &datatype.physical_type {
                None => problems.push(format!(
                    "physical type in datatype {name} must be a literal or a resolver, got: nothing"
                )),
                Some(PhysicalType::Literal(sql_type)) if sql_type.trim().is_empty() => problems.push(
                    format!("physical type in datatype {name} must not be an empty literal"),
                ),
                Some(_) => {}
            }

            if datatype.array_wrapper.is_none() {
                problems.push(format!(
                    "array wrapper in datatype {name} must be a function, got: nothing"
                ));
            }
        }

        problems
    }

    // === Arena internals ===

    fn node(&self, id: NodeId) -> &Node {
        match &self.nodes[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant => unreachable!("datatype node {id} used after release"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.nodes[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant => unreachable!("datatype node {id} used after release"),
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Slot::Occupied(node);
            id
        } else {
            self.nodes.push(Slot::Occupied(node));
            self.nodes.len() - 1
        }
    }

    /// Unlink a node from its name and release it (and any parents) once
    /// nothing references it anymore.
    fn detach(&mut self, id: NodeId) {
        self.node_mut(id).named = false;

        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if node.named || node.dependents > 0 {
                break;
            }

            current = match std::mem::replace(&mut self.nodes[id], Slot::Vacant) {
                Slot::Occupied(Node { layer: Layer::Derived { parent, .. }, .. }) => {
                    self.node_mut(parent).dependents -= 1;
                    Some(parent)
                }
                _ => None,
            };
            self.free.push(id);
        }
    }

    /// Shallow field-by-field overwrite of an existing entry
    fn merge(&mut self, id: NodeId, options: DatatypeOptions) {
        match &mut self.node_mut(id).layer {
            Layer::Root(root) => {
                if let Some(physical_type) = options.physical_type {
                    root.physical_type = Some(physical_type);
                }
                match options.array_wrapper {
                    ArraySupport::Inherit => {}
                    ArraySupport::Disabled => root.array_wrapper = None,
                    ArraySupport::Wrapper(wrapper) => root.array_wrapper = Some(wrapper),
                }
                if let Some(serializer) = options.array_serializer {
                    root.array_serializer = serializer;
                }
                if let Some(serializer) = options.scalar_serializer {
                    root.scalar_serializer = serializer;
                }
                if let Some(formatter) = options.column_formatter {
                    root.column_formatter = formatter;
                }
            }
            Layer::Derived { overrides, .. } => {
                if options.physical_type.is_some() {
                    overrides.physical_type = options.physical_type;
                }
                if !matches!(options.array_wrapper, ArraySupport::Inherit) {
                    overrides.array_wrapper = options.array_wrapper;
                }
                if options.array_serializer.is_some() {
                    overrides.array_serializer = options.array_serializer;
                }
                if options.scalar_serializer.is_some() {
                    overrides.scalar_serializer = options.scalar_serializer;
                }
                if options.column_formatter.is_some() {
                    overrides.column_formatter = options.column_formatter;
                }
            }
        }
    }

    /// Each field is taken from the nearest node in the parent chain that
    /// sets it; the root at the end of the chain sets all of them.
    fn resolve_node(&self, name: &str, id: NodeId) -> Datatype {
        let mut physical_type: Option<PhysicalType> = None;
        let mut array_wrapper: Option<Option<ArrayWrapper>> = None;
        let mut array_serializer: Option<ArraySerializer> = None;
        let mut scalar_serializer: Option<ScalarSerializer> = None;
        let mut column_formatter: Option<ColumnFormatter> = None;

        let mut current = id;
        loop {
            match &self.node(current).layer {
                Layer::Derived { parent, overrides } => {
                    if physical_type.is_none() {
                        physical_type.clone_from(&overrides.physical_type);
                    }
                    if array_wrapper.is_none() {
                        array_wrapper = match &overrides.array_wrapper {
                            ArraySupport::Inherit => None,
                            ArraySupport::Disabled => Some(None),
                            ArraySupport::Wrapper(wrapper) => Some(Some(wrapper.clone())),
                        };
                    }
                    if array_serializer.is_none() {
                        array_serializer.clone_from(&overrides.array_serializer);
                    }
                    if scalar_serializer.is_none() {
                        scalar_serializer.clone_from(&overrides.scalar_serializer);
                    }
                    if column_formatter.is_none() {
                        column_formatter.clone_from(&overrides.column_formatter);
                    }
                    current = *parent;
                }
                Layer::Root(root) => {
                    return Datatype {
                        name: name.to_string(),
                        base_type: self.node(id).base_type.clone(),
                        physical_type: physical_type.or_else(|| root.physical_type.clone()),
                        array_wrapper: array_wrapper.unwrap_or_else(|| root.array_wrapper.clone()),
                        array_serializer: array_serializer
                            .unwrap_or_else(|| root.array_serializer.clone()),
                        scalar_serializer: scalar_serializer
                            .unwrap_or_else(|| root.scalar_serializer.clone()),
                        column_formatter: column_formatter
                            .unwrap_or_else(|| root.column_formatter.clone()),
                    };
                }
            }
        }
    }

    #[cfg(test)]
    fn live_nodes(&self) -> usize {
        self.nodes.iter().filter(|slot| matches!(slot, Slot::Occupied(_))).count()
    }
}

impl Default for DatatypeRegistry {
    fn default() -> Self {
        Self::new(RegistryDefaults::default())
    }
}

impl fmt::Debug for DatatypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatatypeRegistry")
            .field("names", &self.names.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{same_fn, FieldDescriptor, Value};

    fn string_options() -> DatatypeOptions {
        DatatypeOptions::new()
            .type_resolver(|field| format!("VARCHAR({})", field.max.unwrap_or(255)))
            .scalar_serializer(|value, _| format!("'{value}'"))
    }

    fn empty_registry() -> DatatypeRegistry {
        DatatypeRegistry::empty(RegistryDefaults::default())
    }

    #[test]
    fn test_new_registry_loads_builtins_in_order() {
        let registry = DatatypeRegistry::default();
        let names: Vec<&str> = registry.names().collect();

        assert_eq!(names.len(), builtins::datatypes().len());
        assert_eq!(names[0], "json");
        assert!(registry.contains("string"));
        assert!(registry.validate().is_empty(), "{:?}", registry.validate());
    }

    #[test]
    fn test_register_fills_defaults() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();

        let datatype = registry.resolve("string").unwrap();
        assert!(datatype.supports_arrays());
        assert!(same_fn(&datatype.column_formatter, &registry.defaults().column_formatter));
        assert!(same_fn(&datatype.array_serializer, &registry.defaults().array_serializer));
        assert!(!same_fn(&datatype.scalar_serializer, &registry.defaults().scalar_serializer));
    }

    #[test]
    fn test_register_is_chainable() {
        let mut registry = empty_registry();
        registry
            .register("a", DatatypeOptions::new().physical_type("A"))
            .unwrap()
            .register("b", DatatypeOptions::extending("a"))
            .unwrap()
            .remove("a");

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_register_unknown_base() {
        let mut registry = empty_registry();
        let err = registry
            .register("big", DatatypeOptions::extending("string"))
            .unwrap_err();

        assert_eq!(
            err,
            DatatypeError::UnknownBaseType {
                name: "big".to_string(),
                base: "string".to_string(),
            }
        );
        assert!(!registry.contains("big"));
    }

    #[test]
    fn test_extending_inherits_unset_fields() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string").physical_type("TEXT"))
            .unwrap();

        let base = registry.resolve("string").unwrap();
        let big = registry.resolve("big").unwrap();
        let field = FieldDescriptor::new("a", "big");

        assert_eq!(big.base_type.as_deref(), Some("string"));
        assert_eq!(big.physical_type.unwrap().resolve(&field), "TEXT");
        assert!(same_fn(&big.scalar_serializer, &base.scalar_serializer));
        assert!(same_fn(&big.column_formatter, &base.column_formatter));
    }

    #[test]
    fn test_extending_follows_later_base_merge() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string").physical_type("TEXT"))
            .unwrap();
        registry
            .register("string", DatatypeOptions::new().scalar_serializer(|_, _| "'x'".to_string()))
            .unwrap();

        let base = registry.resolve("string").unwrap();
        let big = registry.resolve("big").unwrap();
        let field = FieldDescriptor::new("a", "big");

        assert!(same_fn(&big.scalar_serializer, &base.scalar_serializer));
        assert_eq!((big.scalar_serializer)(&Value::from("a"), &field), "'x'");
        // Own override is untouched
        assert_eq!(big.physical_type.unwrap().resolve(&field), "TEXT");
    }

    #[test]
    fn test_snapshot_entry_ignores_later_base_merge() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        let snapshot = DatatypeOptions::from(&registry.resolve("string").unwrap());
        registry.register("copy", snapshot).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string"))
            .unwrap();

        registry
            .register("string", DatatypeOptions::new().scalar_serializer(|_, _| "'x'".to_string()))
            .unwrap();

        let field = FieldDescriptor::new("a", "string");
        let copy = registry.resolve("copy").unwrap();
        let big = registry.resolve("big").unwrap();
        assert!(copy.base_type.is_none());
        assert_eq!((copy.scalar_serializer)(&Value::from("a"), &field), "'a'");
        assert_eq!((big.scalar_serializer)(&Value::from("a"), &field), "'x'");
    }

    #[test]
    fn test_merge_keeps_unmentioned_fields_and_position() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry.register("other", DatatypeOptions::new().physical_type("X")).unwrap();
        let before = registry.resolve("string").unwrap();

        registry
            .register("string", DatatypeOptions::new().physical_type("TEXT"))
            .unwrap();

        let after = registry.resolve("string").unwrap();
        assert!(same_fn(&before.scalar_serializer, &after.scalar_serializer));
        assert!(matches!(after.physical_type, Some(PhysicalType::Literal(ref t)) if t == "TEXT"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["string", "other"]);
    }

    #[test]
    fn test_merge_can_disable_arrays() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string"))
            .unwrap();
        registry
            .register("string", DatatypeOptions::new().without_arrays())
            .unwrap();

        assert!(!registry.resolve("string").unwrap().supports_arrays());
        assert!(!registry.resolve("big").unwrap().supports_arrays());

        registry
            .register("big", DatatypeOptions::new().array_wrapper(|t| format!("{t}[]")))
            .unwrap();
        assert!(registry.resolve("big").unwrap().supports_arrays());
        assert!(!registry.resolve("string").unwrap().supports_arrays());
    }

    #[test]
    fn test_remove_then_resolve() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry.remove("string").remove("missing");

        assert!(registry.resolve("string").is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.live_nodes(), 0);
    }

    #[test]
    fn test_child_outlives_removed_base() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string").physical_type("TEXT"))
            .unwrap();
        registry.remove("string");

        let big = registry.resolve("big").unwrap();
        let field = FieldDescriptor::new("a", "big");
        assert_eq!((big.scalar_serializer)(&Value::from("v"), &field), "'v'");
        assert_eq!(registry.live_nodes(), 2);

        registry.remove("big");
        assert_eq!(registry.live_nodes(), 0);
    }

    #[test]
    fn test_replacing_base_by_extension_keeps_old_chain() {
        let mut registry = empty_registry();
        registry.register("string", string_options()).unwrap();
        registry
            .register("big", DatatypeOptions::extending("string"))
            .unwrap();
        registry
            .register("string", DatatypeOptions::extending("big").physical_type("CITEXT"))
            .unwrap();

        let field = FieldDescriptor::new("a", "string").max(3);
        let big = registry.resolve("big").unwrap();
        let string = registry.resolve("string").unwrap();

        assert_eq!(big.physical_type.unwrap().resolve(&field), "VARCHAR(3)");
        assert_eq!(string.physical_type.unwrap().resolve(&field), "CITEXT");
        assert_eq!(string.base_type.as_deref(), Some("big"));
    }

    #[test]
    fn test_freed_nodes_are_reused() {
        let mut registry = empty_registry();
        for _ in 0..10 {
            registry.register("string", string_options()).unwrap();
            registry
                .register("big", DatatypeOptions::extending("string"))
                .unwrap();
            registry.remove("big").remove("string");
        }

        assert!(registry.nodes.len() <= 2);
    }

    #[test]
    fn test_inheritance_depth_is_bounded() {
        let mut registry = empty_registry();
        registry.register("t0", string_options()).unwrap();
        for depth in 1..=MAX_INHERITANCE_DEPTH {
            registry
                .register(format!("t{depth}"), DatatypeOptions::extending(format!("t{}", depth - 1)))
                .unwrap();
        }

        let err = registry
            .register("too_deep", DatatypeOptions::extending(format!("t{MAX_INHERITANCE_DEPTH}")))
            .unwrap_err();
        assert!(matches!(err, DatatypeError::InheritanceTooDeep { depth, .. } if depth == MAX_INHERITANCE_DEPTH));
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut registry = empty_registry();
        registry.register("untyped", DatatypeOptions::new()).unwrap();
        registry
            .register("blank", DatatypeOptions::new().physical_type("  ").without_arrays())
            .unwrap();
        registry.register("ok", string_options()).unwrap();

        let problems = registry.validate();
        assert_eq!(problems.len(), 3, "{problems:?}");
        assert!(problems[0].contains("datatype untyped"));
        assert!(problems[1].contains("datatype blank must not be an empty literal"));
        assert!(problems[2].starts_with("array wrapper in datatype blank"));
    }

    #[test]
    fn test_registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DatatypeRegistry>();
    }
}
