//! Capability markers and method dispatch of objects and interfaces.

use super::function_ident;
use crate::config::Config;
use crate::ir::Callable;
use crate::ir::Entity;
use crate::ir::EntityRef;
use crate::ir::Interface;
use crate::ir::Object;
use crate::ir::Property;
use crate::ir::Repository;
use crate::util;
use std::collections::BTreeSet;

/// Types a Handle type can be used as, proven by a zero-sized marker field for each.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Capabilities {
    markers: Vec<EntityRef>,
}

impl Capabilities {
    /// Implemented interfaces, then the ancestors root first, then the object itself.
    pub fn for_object(repository: &Repository, namespace: &str, object: &Object) -> Self {
        let mut markers = object.interfaces.clone();
        markers.extend(repository.ancestors(object));
        markers.push(EntityRef::new(namespace, &object.name));
        Self::dedup(markers)
    }

    /// Prerequisites, then the interface itself.
    pub fn for_interface(namespace: &str, interface: &Interface) -> Self {
        let mut markers = interface.prerequisites.clone();
        markers.push(EntityRef::new(namespace, &interface.name));
        Self::dedup(markers)
    }

    fn dedup(markers: Vec<EntityRef>) -> Self {
        let mut seen = BTreeSet::new();
        Self {
            markers: markers
                .into_iter()
                .filter(|marker| seen.insert(marker.clone()))
                .collect(),
        }
    }

    /// Whether the Handle type is a `target`.
    pub fn contains(&self, target: &EntityRef) -> bool {
        self.markers.contains(target)
    }

    pub fn render(&self) -> String {
        self.markers
            .iter()
            .map(|marker| format!("    {}: void = {{}},\n", marker_field(marker)))
            .collect()
    }
}

/// Name of the marker field proving a Handle type is a `target`.
pub(crate) fn marker_field(target: &EntityRef) -> String {
    format!("trait{}{}", &target.namespace, &target.name)
}

/// A member reachable through `callMethod`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Entry {
    /// Name callers pass to `callMethod`.
    pub key: String,

    /// Declaration implementing it.
    pub declaration: String,
}

/// Another dispatch table consulted when a name is not found locally.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Delegate {
    pub target: EntityRef,

    /// How the generated code refers to the delegate type.
    pub expression: String,
}

/// Static registry of the members of an object or interface.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DispatchTable {
    pub owner: EntityRef,
    pub entries: Vec<Entry>,
    pub delegates: Vec<Delegate>,
}

impl DispatchTable {
    /// Delegates to the parent first, then to the implemented interfaces.
    pub fn for_object(config: &Config, namespace: &str, object: &Object) -> Self {
        let mut delegates = Vec::new();
        if let Some(parent) = &object.parent {
            delegates.push(Delegate {
                target: parent.clone(),
                expression: "Parent".into(),
            });
        }
        delegates.extend(object.interfaces.iter().map(delegate));
        Self {
            owner: EntityRef::new(namespace, &object.name),
            entries: entries(
                config,
                &object.methods,
                &object.signals,
                &object.properties,
                if object.class_struct.is_some() {
                    &object.vfuncs[..]
                } else {
                    &[][..]
                },
            ),
            delegates,
        }
    }

    /// Delegates to the prerequisites.
    pub fn for_interface(config: &Config, namespace: &str, interface: &Interface) -> Self {
        Self {
            owner: EntityRef::new(namespace, &interface.name),
            entries: entries(
                config,
                &interface.methods,
                &interface.signals,
                &interface.properties,
                if interface.iface_struct.is_some() {
                    &interface.vfuncs[..]
                } else {
                    &[][..]
                },
            ),
            delegates: interface.prerequisites.iter().map(delegate).collect(),
        }
    }

    fn resolve(repository: &Repository, config: &Config, target: &EntityRef) -> Option<Self> {
        match repository.lookup(&target.namespace, &target.name) {
            Some(Entity::Object(object)) => {
                Some(Self::for_object(config, &target.namespace, object))
            }
            Some(Entity::Interface(interface)) => {
                Some(Self::for_interface(config, &target.namespace, interface))
            }
            _ => None,
        }
    }

    /// Finds the type declaring the member called `key`.
    ///
    /// Local entries come first, then the delegates depth-first. Delegates missing from the
    /// [Repository] are skipped.
    pub fn lookup(&self, repository: &Repository, config: &Config, key: &str) -> Option<EntityRef> {
        let mut visited = BTreeSet::new();
        self.lookup_inner(repository, config, key, &mut visited)
    }

    fn lookup_inner(
        &self,
        repository: &Repository,
        config: &Config,
        key: &str,
        visited: &mut BTreeSet<EntityRef>,
    ) -> Option<EntityRef> {
        if !visited.insert(self.owner.clone()) {
            return None;
        }
        if self.entries.iter().any(|entry| entry.key == key) {
            return Some(self.owner.clone());
        }
        self.delegates.iter().find_map(|delegate| {
            Self::resolve(repository, config, &delegate.target)?
                .lookup_inner(repository, config, key, visited)
        })
    }

    /// `CallMethod` resolving the return type of a member and `callMethod` invoking it.
    pub fn render(&self, handle: &str) -> String {
        let mut result = String::new();
        result.push_str("pub fn CallMethod(comptime method: []const u8) ?type {\n");
        result.push_str("    core.maybeUnused(method);\n");
        for entry in self.entries.iter() {
            result.push_str(&format!(
                "    if (std.mem.eql(u8, method, \"{}\")) return core.FnReturnType(@TypeOf(@This().{}));\n",
                &entry.key, &entry.declaration
            ));
        }
        for delegate in self.delegates.iter() {
            result.push_str(&format!(
                "    if ({}.CallMethod(method)) |some| return some;\n",
                &delegate.expression
            ));
        }
        result.push_str("    return null;\n}\n\n");

        result.push_str(&format!(
            r#"pub fn callMethod(self: {}, comptime method: []const u8, args: anytype) gen_return_type: {{
    if (CallMethod(method)) |some| {{
        break :gen_return_type some;
    }} else {{
        @compileError(std.fmt.comptimePrint("No such method {{s}}", .{{method}}));
    }}
}} {{
    core.maybeUnused(self);
    core.maybeUnused(args);
    if (false) {{
        return {{}};
    }}
"#,
            handle
        ));
        for entry in self.entries.iter() {
            result.push_str(&format!(
                "    else if (comptime std.mem.eql(u8, method, \"{}\")) {{\n        return @call(.auto, @This().{}, .{{self}} ++ args);\n    }}\n",
                &entry.key, &entry.declaration
            ));
        }
        for delegate in self.delegates.iter() {
            result.push_str(&format!(
                "    else if ({0}.CallMethod(method)) |_| {{\n        return self.into({0}).callMethod(method, args);\n    }}\n",
                &delegate.expression
            ));
        }
        result.push_str("    else {\n        @compileError(\"No such method\");\n    }\n}\n");
        result
    }
}

fn delegate(target: &EntityRef) -> Delegate {
    Delegate {
        target: target.clone(),
        expression: target.to_string(),
    }
}

/// Instance methods, signals, properties and virtual functions, skipping deprecated ones unless
/// configured otherwise.
fn entries(
    config: &Config,
    methods: &[Callable],
    signals: &[Callable],
    properties: &[Property],
    vfuncs: &[Callable],
) -> Vec<Entry> {
    let methods = methods
        .iter()
        .filter(|method| method.is_method && config.includes(method.deprecated))
        .map(|method| Entry {
            key: util::snake_to_camel(&method.name),
            declaration: function_ident(&method.name),
        });
    let signals = signals
        .iter()
        .filter(|signal| config.includes(signal.deprecated))
        .map(|signal| {
            let key = signal_accessor(&signal.name);
            Entry {
                declaration: key.clone(),
                key,
            }
        });
    let properties = properties
        .iter()
        .filter(|property| config.includes(property.deprecated))
        .map(|property| {
            let key = property_accessor(&property.name);
            Entry {
                declaration: key.clone(),
                key,
            }
        });
    let vfuncs = vfuncs
        .iter()
        .filter(|vfunc| config.includes(vfunc.deprecated))
        .map(|vfunc| {
            let key = vfunc_ident(&vfunc.name);
            Entry {
                declaration: key.clone(),
                key,
            }
        });
    methods.chain(signals).chain(properties).chain(vfuncs).collect()
}

pub(crate) fn signal_accessor(name: &str) -> String {
    format!("signal{}", util::snake_to_title(name))
}

pub(crate) fn property_accessor(name: &str) -> String {
    format!("property{}", util::snake_to_title(name))
}

pub(crate) fn vfunc_ident(name: &str) -> String {
    format!("{}V", util::snake_to_camel(name))
}
