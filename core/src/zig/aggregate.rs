//! Structs, unions, enumerations, objects and interfaces.
//!
//! Objects and interfaces are split into an Implementation type holding the raw layout and a
//! Handle type holding a pointer to it. Handle types carry one zero-sized marker field for every
//! type they can be used as, see [Capabilities].

use super::deprecated_line;
use super::dispatch::Capabilities;
use super::dispatch::DispatchTable;
use super::ident;
use super::indent;
use super::Container;
use super::Emitter;
use super::TypeOptions;
use crate::ir::Callable;
use crate::ir::Constant;
use crate::ir::EntityRef;
use crate::ir::Enumeration;
use crate::ir::Field;
use crate::ir::Interface;
use crate::ir::Object;
use crate::ir::Property;
use crate::ir::Record;
use crate::ir::TypeTag;
use crate::util;
use std::collections::BTreeSet;

/// Members shared by objects and interfaces.
struct Members<'m> {
    constants: &'m [Constant],
    methods: &'m [Callable],
    signals: &'m [Callable],
    properties: &'m [Property],
    vfuncs: &'m [Callable],
    vtable: Option<&'m EntityRef>,
}

impl<'a> Emitter<'a> {
    /// `extern struct`, `extern union` or `opaque` if no field is known.
    pub fn record(&mut self, record: &Record, is_union: bool) -> String {
        let mut result = deprecated_line(record.deprecated).to_string();
        if record.fields.is_empty() {
            result.push_str(&format!("pub const {} = opaque {{\n", &record.name));
        } else {
            let layout = if is_union { "union" } else { "struct" };
            result.push_str(&format!("pub const {} = extern {} {{\n", &record.name, layout));
            for (index, field) in record.fields.iter().enumerate() {
                result.push_str(&self.field(field, index == 0 && !is_union));
            }
        }
        let container = Container::new(&record.name, true);
        for method in record.methods.iter() {
            if !self.includes(method.deprecated) {
                continue;
            }
            result.push('\n');
            result.push_str(&indent(&self.method(method, container)));
        }
        result.push_str(&indent(&registered_type(record.gtype_init.as_deref(), None)));
        result.push_str("};\n");
        result
    }

    /// `name: T,`
    ///
    /// An instance embedded by value as the first field is the parent instance, which is only
    /// reachable through its Implementation type.
    fn field(&mut self, field: &Field, first: bool) -> String {
        let nullable = field.ty.pointer || field.ty.is_callback();
        let ty = self.scoped(&field.name, |this| {
            this.type_expr(&field.ty, TypeOptions::nullable(nullable))
        });
        let accessor = if first && field.ty.is_instance() && !field.ty.pointer {
            ".cType()"
        } else {
            ""
        };
        format!("    {}: {}{},\n", ident(&field.name), ty, accessor)
    }

    fn method(&mut self, method: &Callable, container: Container) -> String {
        self.scoped(&method.name, |this| this.function_wrapper(method, container))
    }

    /// `enum(T)` with one variant per distinct value.
    ///
    /// Flags are written as bit masks and accept any other bit combination.
    pub fn enumeration(&mut self, enumeration: &Enumeration, flags: bool) -> String {
        let mut result = deprecated_line(enumeration.deprecated).to_string();
        let storage = match enumeration.storage {
            TypeTag::Int8 => "(i8)",
            TypeTag::Uint8 => "(u8)",
            TypeTag::Int16 => "(i16)",
            TypeTag::Uint16 => "(u16)",
            TypeTag::Int32 => "(i32)",
            TypeTag::Uint32 => "(u32)",
            TypeTag::Int64 => "(i64)",
            TypeTag::Uint64 => "(u64)",
            ref other => {
                self.report(format!("Unsupported enum storage type {}", other.name()));
                ""
            }
        };
        result.push_str(&format!("pub const {} = enum{} {{\n", &enumeration.name, storage));

        let mut seen = BTreeSet::new();
        for value in enumeration.values.iter() {
            if !seen.insert(value.value) {
                log::debug!(
                    "`{}.{}` aliases an earlier value, skipping…",
                    &enumeration.name,
                    &value.name
                );
                continue;
            }
            let mut name = util::snake_to_title(&value.name);
            if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
                name = format!("@\"{}\"", name);
            }
            let literal = if !flags {
                value.value.to_string()
            } else if value.value >= 0 {
                format!("0x{:x}", value.value)
            } else {
                format!("~0x{:x}", !value.value)
            };
            result.push_str(&format!("    {} = {},\n", name, literal));
        }
        if flags {
            result.push_str("    _,\n");
        }

        let container = Container::new(&enumeration.name, false);
        for method in enumeration.methods.iter() {
            if !self.includes(method.deprecated) {
                continue;
            }
            result.push('\n');
            result.push_str(&indent(&self.method(method, container)));
        }
        result.push_str(&indent(&registered_type(
            enumeration.gtype_init.as_deref(),
            None,
        )));
        result.push_str("};\n");
        result
    }

    /// Implementation type, nullable wrapper, then the Handle type.
    pub fn object(&mut self, object: &Object) -> String {
        let name = object.name.as_str();
        let mut result = String::new();
        if object.fields.is_empty() {
            result.push_str(&format!("pub const {}Impl = opaque {{}};\n", name));
        } else {
            result.push_str(&format!("pub const {}Impl = extern struct {{\n", name));
            for (index, field) in object.fields.iter().enumerate() {
                result.push_str(&self.field(field, index == 0));
            }
            result.push_str("};\n");
        }
        result.push_str(&nullable(name));
        result.push_str(deprecated_line(object.deprecated));
        result.push_str(&format!("pub const {} = packed struct {{\n", name));
        result.push_str(&format!("    instance: *{}Impl,\n", name));

        let repository = self.repository;
        let namespace = &self.namespace.name;
        result.push_str(&Capabilities::for_object(repository, namespace, object).render());
        if let Some(parent) = &object.parent {
            result.push_str(&format!("\n    pub const Parent = {};\n", parent));
        }

        let table = DispatchTable::for_object(self.config, namespace, object);
        let members = Members {
            constants: &object.constants,
            methods: &object.methods,
            signals: &object.signals,
            properties: &object.properties,
            vfuncs: &object.vfuncs,
            vtable: object.class_struct.as_ref(),
        };
        result.push_str(&self.members(name, &members, &table));
        result.push_str(&self.handle_helpers(name, &table, object.gtype_init.as_deref()));
        result.push_str("};\n");
        result
    }

    /// Implementation type, nullable wrapper, then the Handle type.
    ///
    /// The Implementation type of an interface is its interface structure.
    pub fn interface(&mut self, interface: &Interface) -> String {
        let name = interface.name.as_str();
        let mut result = match &interface.iface_struct {
            Some(iface_struct) => format!("pub const {}Impl = {};\n", name, iface_struct),
            None => format!("pub const {}Impl = opaque {{}};\n", name),
        };
        result.push_str(&nullable(name));
        result.push_str(deprecated_line(interface.deprecated));
        result.push_str(&format!("pub const {} = packed struct {{\n", name));
        result.push_str(&format!("    instance: *{}Impl,\n", name));

        let namespace = &self.namespace.name;
        result.push_str(&Capabilities::for_interface(namespace, interface).render());

        let table = DispatchTable::for_interface(self.config, namespace, interface);
        let members = Members {
            constants: &interface.constants,
            methods: &interface.methods,
            signals: &interface.signals,
            properties: &interface.properties,
            vfuncs: &interface.vfuncs,
            vtable: interface.iface_struct.as_ref(),
        };
        result.push_str(&self.members(name, &members, &table));
        result.push_str(&self.handle_helpers(name, &table, interface.gtype_init.as_deref()));
        result.push_str("};\n");
        result
    }

    /// Constants, methods, signals, properties and virtual functions of a Handle type.
    fn members(&mut self, name: &str, members: &Members, table: &DispatchTable) -> String {
        let mut result = String::new();
        for constant in members.constants.iter() {
            if !self.includes(constant.deprecated) {
                continue;
            }
            result.push('\n');
            let code = self.scoped(&constant.name, |this| this.constant(constant));
            result.push_str(&indent(&code));
        }

        let container = Container::new(name, false);
        for method in members.methods.iter() {
            if !self.includes(method.deprecated) {
                continue;
            }
            result.push('\n');
            result.push_str(&indent(&self.method(method, container)));
        }
        for signal in members.signals.iter() {
            if !self.includes(signal.deprecated) {
                continue;
            }
            result.push('\n');
            let code = self.scoped(&signal.name, |this| this.signal(signal, name));
            result.push_str(&indent(&code));
        }
        for property in members.properties.iter() {
            if !self.includes(property.deprecated) {
                continue;
            }
            result.push('\n');
            let code = self.scoped(&property.name, |this| this.property(property, name, table));
            result.push_str(&indent(&code));
        }

        let container = Container {
            vtable: members.vtable,
            ..container
        };
        for vfunc in members.vfuncs.iter() {
            if !self.includes(vfunc.deprecated) {
                continue;
            }
            if container.vtable.is_none() {
                self.report(format!(
                    "Virtual function {} has no class structure",
                    &vfunc.name
                ));
                continue;
            }
            result.push('\n');
            result.push_str(&indent(&self.method(vfunc, container)));
        }
        result
    }

    /// Method dispatch, type identities, the is-a check and conversions.
    fn handle_helpers(
        &mut self,
        name: &str,
        table: &DispatchTable,
        gtype_init: Option<&str>,
    ) -> String {
        let mut result = String::new();
        result.push('\n');
        result.push_str(&indent(&table.render(name)));
        result.push_str(&indent(&registered_type(gtype_init, Some(name))));
        result.push('\n');
        result.push_str(&indent(&format!(
            "pub fn isAImpl(comptime T: type) bool {{\n    return meta.trait.hasField(\"trait{}{}\")(T);\n}}\n",
            &self.namespace.name, name
        )));
        result.push('\n');
        result.push_str(&indent(&into(name)));
        result
    }
}

/// `cType` of Handle types and `gType` of registered types.
fn registered_type(gtype_init: Option<&str>, instance: Option<&str>) -> String {
    let mut result = String::new();
    if let Some(name) = instance {
        result.push_str(&format!(
            "\npub fn cType() type {{\n    return {}Impl;\n}}\n",
            name
        ));
    }
    if let Some(symbol) = gtype_init {
        result.push_str(&format!(
            r#"
pub fn gType() core.GType {{
    return struct {{
        pub extern fn {0}() core.GType;
    }}.{0}();
}}
"#,
            symbol
        ));
    }
    result
}

/// Companion type of a Handle type which may hold no instance.
fn nullable(name: &str) -> String {
    format!(
        r#"pub const {0}Nullable = packed struct {{
    ptr: ?*{0}Impl,

    pub fn expect(self: {0}Nullable, message: []const u8) {0} {{
        if (self.ptr) |some| {{
            return {0}{{ .instance = some }};
        }} else @panic(message);
    }}

    pub fn wrap(self: {0}Nullable) ?{0} {{
        return if (self.ptr) |some| {0}{{ .instance = some }} else null;
    }}
}};
"#,
        name
    )
}

fn into(name: &str) -> String {
    format!(
        r#"pub fn into(self: {0}, comptime T: type) T {{
    return core.upCast(T, self);
}}

pub fn tryInto(self: {0}, comptime T: type) ?T {{
    return core.downCast(T, self);
}}

pub fn asSome(self: {0}) {0}Nullable {{
    return .{{ .ptr = self.instance }};
}}
"#,
        name
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::ir::sample;
    use crate::ir::Entity;
    use crate::ir::EnumValue;
    use crate::ir::InfoKind;
    use crate::ir::TypeInfo;
    use crate::normalize_source_code;
    use crate::Diagnostic;

    fn emit(entity: &Entity) -> (String, Vec<Diagnostic>) {
        let repository = sample::hierarchy();
        let config = Config::default();
        let mut emitter = Emitter::new(&repository, &config, &repository.namespaces[1]);
        let source = emitter.entity(entity);
        let generated = emitter.finish(source);
        (generated.source, generated.diagnostics)
    }

    fn demo_entity(name: &str) -> Entity {
        sample::hierarchy()
            .lookup("Demo", name)
            .cloned()
            .unwrap()
    }

    fn values(values: &[(&str, i64)]) -> Vec<EnumValue> {
        values
            .iter()
            .map(|(name, value)| EnumValue {
                name: name.to_string(),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn enum_aliases() {
        let enumeration = Enumeration {
            name: "Level".into(),
            values: values(&[("a", 0), ("b", 1), ("c", 1), ("d", 2), ("e", 0)]),
            ..Default::default()
        };
        let (actual, diagnostics) = emit(&Entity::Enum(enumeration));
        let expected = r#"
            pub const Level = enum(u32) {
                A = 0,
                B = 1,
                D = 2,
            };
        "#;
        assert_eq!(normalize_source_code(expected), normalize_source_code(&actual));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn flags() {
        let flags = Enumeration {
            name: "Mode".into(),
            storage: TypeTag::Int32,
            values: values(&[("read", 1), ("write", 2), ("2d", 4), ("all", -1)]),
            gtype_init: Some("demo_mode_get_type".into()),
            ..Default::default()
        };
        let (actual, _) = emit(&Entity::Flags(flags));
        let expected = r#"
            pub const Mode = enum(i32) {
                Read = 0x1,
                Write = 0x2,
                @"2d" = 0x4,
                All = ~0x0,
                _,

                pub fn gType() core.GType {
                    return struct {
                        pub extern fn demo_mode_get_type() core.GType;
                    }.demo_mode_get_type();
                }
            };
        "#;
        assert_eq!(normalize_source_code(expected), normalize_source_code(&actual));
        assert_eq!(1, actual.matches("_,").count());
    }

    #[test]
    fn enum_unsupported_storage() {
        let enumeration = Enumeration {
            name: "Odd".into(),
            storage: TypeTag::Float,
            values: values(&[("one", 1)]),
            ..Default::default()
        };
        let (actual, diagnostics) = emit(&Entity::Enum(enumeration));
        assert!(actual.starts_with("pub const Odd = enum {"));
        assert_eq!(1, diagnostics.len());
        assert_eq!(
            "Unsupported enum storage type float in `Odd`",
            diagnostics[0].message
        );
    }

    #[test]
    fn struct_with_methods() {
        let (actual, diagnostics) = emit(&demo_entity("Rect"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(actual.starts_with("pub const Rect = extern struct {\n    x: f64,\n    y: f64,\n"));
        assert!(actual.contains("\n    pub fn getOrigin(self: *Rect) f64 {\n"));
        assert!(actual.ends_with("};\n"));
        assert!(!actual.contains("gType"));
    }

    #[test]
    fn struct_fields() {
        let (actual, diagnostics) = emit(&demo_entity("LeafClass"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let expected = r#"
            pub const LeafClass = extern struct {
                parent_class: GObject.ObjectClass,
                draw: ?*const fn(Demo.Leaf, i32) callconv(.C) void,
            };
        "#;
        assert_eq!(normalize_source_code(expected), normalize_source_code(&actual));
    }

    #[test]
    fn embedded_parent_instance() {
        let record = Record {
            name: "Derived".into(),
            fields: vec![
                Field {
                    name: "parent_instance".into(),
                    ty: TypeInfo {
                        pointer: false,
                        ..TypeInfo::interface("GObject", "Object", InfoKind::Object)
                    },
                },
                Field {
                    name: "error".into(),
                    ty: TypeInfo::new(TypeTag::Int32),
                },
            ],
            ..Default::default()
        };
        let (actual, _) = emit(&Entity::Struct(record.clone()));
        assert!(actual.contains("    parent_instance: GObject.Object.cType(),\n"));
        assert!(actual.contains("    @\"error\": i32,\n"));

        let (actual, _) = emit(&Entity::Union(record));
        assert!(actual.starts_with("pub const Derived = extern union {"));
        assert!(actual.contains("    parent_instance: GObject.Object,\n"));
    }

    #[test]
    fn opaque_union() {
        let record = Record {
            name: "Blob".into(),
            ..Default::default()
        };
        let (actual, _) = emit(&Entity::Union(record));
        assert_eq!("pub const Blob = opaque {\n};\n", actual);
    }

    #[test]
    fn object_handle() {
        let (actual, diagnostics) = emit(&demo_entity("Leaf"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let expected = r#"
            pub const LeafImpl = opaque {};
            pub const LeafNullable = packed struct {
                ptr: ?*LeafImpl,

                pub fn expect(self: LeafNullable, message: []const u8) Leaf {
                    if (self.ptr) |some| {
                        return Leaf{ .instance = some };
                    } else @panic(message);
                }

                pub fn wrap(self: LeafNullable) ?Leaf {
                    return if (self.ptr) |some| Leaf{ .instance = some } else null;
                }
            };
            pub const Leaf = packed struct {
                instance: *LeafImpl,
                traitDemoIface: void = {},
                traitGObjectObject: void = {},
                traitDemoRoot: void = {},
                traitDemoMid: void = {},
                traitDemoLeaf: void = {},

                pub const Parent = Demo.Mid;
        "#;
        assert!(
            normalize_source_code(&actual).starts_with(&normalize_source_code(expected)),
            "{}",
            actual
        );
        assert!(actual.contains("    const SignalProxyActivate = struct {\n"));
        assert!(actual.contains("    const PropertyProxyLabel = struct {\n"));
        assert!(actual.contains("    pub fn drawV(self: Leaf, g_type: core.GType, arg_depth: i32) void {\n"));
        assert!(actual.contains("        if (std.mem.eql(u8, method, \"drawV\")) return"));
        assert!(actual.contains("        return meta.trait.hasField(\"traitDemoLeaf\")(T);\n"));
        assert!(actual.contains("    pub fn cType() type {\n        return LeafImpl;\n    }\n"));
        assert!(actual.contains("pub extern fn demo_leaf_get_type() core.GType;"));
        assert!(actual.contains("    pub fn asSome(self: Leaf) LeafNullable {\n"));
        assert!(actual.ends_with("    }\n};\n"));
    }

    #[test]
    fn object_without_parent() {
        let (actual, diagnostics) = emit(&demo_entity("Unrelated"));
        assert!(diagnostics.is_empty());
        assert!(actual.contains("    instance: *UnrelatedImpl,\n    traitDemoUnrelated: void = {},\n\n"));
        assert!(!actual.contains("Parent"));
        assert!(!actual.contains("gType"));
    }

    #[test]
    fn object_deprecated_members() {
        let mut root = match demo_entity("Root") {
            Entity::Object(root) => root,
            other => panic!("unexpected entity {:?}", other),
        };
        root.methods[0].deprecated = true;
        root.signals[0].deprecated = true;
        root.constants.push(sample::constant(
            "DEFAULT_NAME",
            TypeTag::Utf8,
            crate::ir::ConstantValue::Str("root".into()),
        ));
        let (actual, _) = emit(&Entity::Object(root));
        assert!(!actual.contains("getName"));
        assert!(!actual.contains("signalClosed"));
        assert!(actual.contains("\n    pub const DEFAULT_NAME = \"root\";\n"));
        assert!(actual.contains("pub fn getSelf(self: Root) Demo.Root {"));
    }

    #[test]
    fn object_vfunc_without_class() {
        let mut leaf = match demo_entity("Leaf") {
            Entity::Object(leaf) => leaf,
            other => panic!("unexpected entity {:?}", other),
        };
        leaf.class_struct = None;
        let (actual, diagnostics) = emit(&Entity::Object(leaf));
        assert!(!actual.contains("drawV"));
        assert_eq!(1, diagnostics.len());
        assert_eq!(
            "Virtual function draw has no class structure in `Leaf`",
            diagnostics[0].message
        );
    }

    #[test]
    fn interface_handle() {
        let (actual, diagnostics) = emit(&demo_entity("Iface"));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(actual.starts_with("pub const IfaceImpl = opaque {};\n"));
        assert!(actual.contains(
            "    instance: *IfaceImpl,\n    traitGObjectObject: void = {},\n    traitDemoIface: void = {},\n"
        ));
        assert!(actual.contains("    pub fn ping(self: Iface) void {\n"));
        assert!(actual.contains("        if (GObject.Object.CallMethod(method)) |some| return some;\n"));

        let mut iface = match demo_entity("Iface") {
            Entity::Interface(iface) => iface,
            other => panic!("unexpected entity {:?}", other),
        };
        iface.iface_struct = Some(EntityRef::new("Demo", "IfaceInterface"));
        let (actual, _) = emit(&Entity::Interface(iface));
        assert!(actual.starts_with("pub const IfaceImpl = Demo.IfaceInterface;\n"));
    }

    #[test]
    fn unsupported_member_is_contained() {
        let mut rect = match demo_entity("Rect") {
            Entity::Struct(rect) => rect,
            other => panic!("unexpected entity {:?}", other),
        };
        rect.methods.push(sample::method(
            "to_variant",
            vec![],
            TypeInfo::new(TypeTag::Unknown("variant".into())),
        ));
        let (actual, diagnostics) = emit(&Entity::Struct(rect));
        assert!(actual.contains("pub fn getOrigin(self: *Rect) f64 {"));
        assert!(actual.contains("pub fn toVariant(self: *Rect) core.Unsupported {"));
        assert_eq!(1, diagnostics.len());
        assert_eq!(
            "Unsupported type variant in `Rect.to_variant`",
            diagnostics[0].message
        );
    }

    #[test]
    fn whole_namespace_is_clean() {
        let repository = sample::hierarchy();
        let config = Config::default();
        for namespace in repository.namespaces.iter() {
            let mut emitter = Emitter::new(&repository, &config, namespace);
            for entity in namespace.entities.iter() {
                emitter.entity(entity);
            }
            let generated = emitter.finish(Default::default());
            assert!(generated.diagnostics.is_empty(), "{:?}", generated.diagnostics);
        }
    }
}
