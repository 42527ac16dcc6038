//! Zig support.
//!
//! Every namespace becomes one Zig source file. Entities are emitted in description order by an
//! [Emitter], which collects [Diagnostic]s for anything it cannot translate and substitutes the
//! `core.Unsupported` placeholder instead.

mod aggregate;
mod callable;
mod dispatch;
mod proxy;
mod types;

use crate::config::Config;
use crate::ir::Callable;
use crate::ir::Constant;
use crate::ir::ConstantValue;
use crate::ir::Entity;
use crate::ir::EntityRef;
use crate::ir::Namespace;
use crate::ir::Repository;
use crate::ir::TypeTag;
use crate::util;
use crate::Diagnostic;
use crate::Generated;
use crate::TargetCodeWriter;
use std::collections::BTreeSet;

pub(crate) use types::TypeOptions;

/// Namespace of the Gtk toolkit, which ships a template support module.
const GTK: &str = "Gtk";

/// Keywords and primitive type names that must be written as `@"name"`.
const RESERVED: &[&str] = &[
    "addrspace",
    "align",
    "allowzero",
    "and",
    "anyerror",
    "anyframe",
    "anyopaque",
    "anytype",
    "asm",
    "async",
    "await",
    "bool",
    "break",
    "callconv",
    "catch",
    "comptime",
    "const",
    "continue",
    "defer",
    "else",
    "enum",
    "errdefer",
    "error",
    "export",
    "extern",
    "f16",
    "f32",
    "f64",
    "f80",
    "f128",
    "false",
    "fn",
    "for",
    "if",
    "inline",
    "isize",
    "linksection",
    "noalias",
    "noinline",
    "noreturn",
    "nosuspend",
    "null",
    "opaque",
    "or",
    "orelse",
    "packed",
    "pub",
    "resume",
    "return",
    "struct",
    "suspend",
    "switch",
    "test",
    "threadlocal",
    "true",
    "try",
    "type",
    "undefined",
    "union",
    "unreachable",
    "usingnamespace",
    "usize",
    "var",
    "void",
    "volatile",
    "while",
];

/// Writes Zig bindings.
pub struct ZigWriter {
    config: Config,
}

impl ZigWriter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl TargetCodeWriter for ZigWriter {
    fn file_name(&self, namespace: &Namespace) -> String {
        format!("{}.zig", &namespace.name)
    }

    fn write_target_namespace(&self, namespace: &Namespace, repository: &Repository) -> Generated {
        let mut emitter = Emitter::new(repository, &self.config, namespace);
        let mut emitted = Emitted::default();
        let mut source = header(namespace);
        for entity in namespace.entities.iter() {
            if !self.config.includes(entity.deprecated()) {
                log::debug!(
                    "`{}.{}` is deprecated, skipping…",
                    &namespace.name,
                    entity.name()
                );
                continue;
            }
            if !emitted.insert(entity.name()) {
                continue;
            }
            source.push('\n');
            source.push_str(&emitter.entity(entity));
        }
        emitter.finish(source)
    }

    fn write_target_entity(
        &self,
        entity: &Entity,
        namespace: &Namespace,
        repository: &Repository,
    ) -> Generated {
        let mut emitter = Emitter::new(repository, &self.config, namespace);
        let source = if self.config.includes(entity.deprecated()) {
            emitter.entity(entity)
        } else {
            Default::default()
        };
        emitter.finish(source)
    }
}

/// Names of the entities already emitted into the current namespace.
#[derive(Debug, Default)]
pub struct Emitted {
    names: BTreeSet<String>,
}

impl Emitted {
    /// Records a name, returns `false` if it was already emitted.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.names.insert(name.to_string()) {
            true
        } else {
            log::debug!("`{}` is already emitted, skipping…", name);
            false
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// The type owning a callable, or nothing for free functions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Container<'c> {
    pub name: &'c str,

    /// `self` is passed as a pointer to the container.
    pub by_pointer: bool,

    /// Structure holding the function pointers of virtual functions.
    pub vtable: Option<&'c EntityRef>,
}

impl<'c> Container<'c> {
    pub fn free() -> Self {
        Self {
            name: "",
            by_pointer: false,
            vtable: None,
        }
    }

    pub fn new(name: &'c str, by_pointer: bool) -> Self {
        Self {
            name,
            by_pointer,
            vtable: None,
        }
    }
}

/// Per-namespace emission state.
pub(crate) struct Emitter<'a> {
    repository: &'a Repository,
    config: &'a Config,
    namespace: &'a Namespace,
    diagnostics: Vec<Diagnostic>,
    reported: BTreeSet<String>,

    /// Path of the entity and member being emitted, for diagnostics.
    scope: Vec<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(repository: &'a Repository, config: &'a Config, namespace: &'a Namespace) -> Self {
        Self {
            repository,
            config,
            namespace,
            diagnostics: Default::default(),
            reported: Default::default(),
            scope: Default::default(),
        }
    }

    pub fn finish(self, source: String) -> Generated {
        Generated {
            source,
            diagnostics: self.diagnostics,
        }
    }

    /// Records something that could not be translated.
    ///
    /// The same message is only reported once per namespace.
    pub fn report(&mut self, message: String) {
        let message = if self.scope.is_empty() {
            message
        } else {
            format!("{} in `{}`", message, self.scope.join("."))
        };
        if self.reported.insert(message.clone()) {
            log::warn!("{}: {}", &self.namespace.name, &message);
            self.diagnostics.push(Diagnostic {
                namespace: self.namespace.name.clone(),
                message,
            });
        }
    }

    /// Runs `f` with `name` appended to the diagnostic scope.
    fn scoped<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scope.push(name.to_string());
        let result = f(self);
        self.scope.pop();
        result
    }

    fn includes(&self, deprecated: bool) -> bool {
        self.config.includes(deprecated)
    }

    pub fn entity(&mut self, entity: &Entity) -> String {
        self.scoped(entity.name(), |this| match entity {
            Entity::Function(function) => this.function_wrapper(function, Container::free()),
            Entity::Callback(callback) => this.callback(callback),
            Entity::Struct(record) => this.record(record, false),
            Entity::Boxed(record) => this.record(record, record.is_union),
            Entity::Union(record) => this.record(record, true),
            Entity::Enum(enumeration) => this.enumeration(enumeration, false),
            Entity::Flags(enumeration) => this.enumeration(enumeration, true),
            Entity::Object(object) => this.object(object),
            Entity::Interface(interface) => this.interface(interface),
            Entity::Constant(constant) => this.constant(constant),
        })
    }

    /// `pub const NAME = value;`
    pub fn constant(&mut self, constant: &Constant) -> String {
        let name = if self.config.uppercase_constants {
            constant.name.clone()
        } else {
            util::screaming_to_snake(&constant.name)
        };
        let value = match (&constant.ty.tag, &constant.value) {
            (TypeTag::Boolean, ConstantValue::Bool(value)) => value.to_string(),
            (tag, ConstantValue::Int(value)) if is_integer(tag) => value.to_string(),
            (tag, ConstantValue::UInt(value)) if is_integer(tag) => value.to_string(),
            (TypeTag::Float, ConstantValue::Float(value))
            | (TypeTag::Double, ConstantValue::Float(value)) => format!("{:.6}", value),
            (TypeTag::Float, ConstantValue::Int(value))
            | (TypeTag::Double, ConstantValue::Int(value)) => format!("{:.6}", *value as f64),
            (TypeTag::Utf8, ConstantValue::Str(value)) => {
                format!("\"{}\"", value.escape_default())
            }
            (tag, _) => {
                self.report(format!(
                    "Unsupported constant type {} [{}]",
                    tag.name(),
                    &name
                ));
                return Default::default();
            }
        };
        format!(
            "{deprecated}pub const {name} = {value};\n",
            deprecated = deprecated_line(constant.deprecated),
            name = ident(&name),
            value = value,
        )
    }

    /// `pub const Name = *const fn(...) callconv(.C) R;`
    pub fn callback(&mut self, callback: &Callable) -> String {
        let comment = self.function_comment(callback);
        let signature = self.callback_signature(callback);
        format!(
            "{deprecated}/// {name}\n{comment}pub const {name} = {signature};\n",
            comment = comment,
            deprecated = deprecated_line(callback.deprecated),
            name = &callback.name,
            signature = signature,
        )
    }
}

fn is_integer(tag: &TypeTag) -> bool {
    matches!(
        tag,
        TypeTag::Int8
            | TypeTag::Uint8
            | TypeTag::Int16
            | TypeTag::Uint16
            | TypeTag::Int32
            | TypeTag::Uint32
            | TypeTag::Int64
            | TypeTag::Uint64
    )
}

/// Imports opening every generated file.
fn header(namespace: &Namespace) -> String {
    let mut result = format!("const {} = @This();\n\n", &namespace.name);
    for dependency in namespace.dependency_names() {
        result.push_str(&format!(
            "pub const {0} = @import(\"{0}.zig\");\n",
            dependency
        ));
        if dependency == GTK {
            result.push_str("pub const template = @import(\"template.zig\");\n");
        }
    }
    result.push_str("pub const core = @import(\"core.zig\");\n");
    if namespace.name == GTK {
        result.push_str("pub const template = @import(\"template.zig\");\n");
    }
    result.push_str(
        r#"const std = @import("std");
const meta = std.meta;
const assert = std.debug.assert;
const Allocator = std.mem.Allocator;
"#,
    );
    result
}

fn deprecated_line(deprecated: bool) -> &'static str {
    if deprecated {
        "/// (deprecated)\n"
    } else {
        ""
    }
}

/// Writes an identifier, escaping it if it is not a plain Zig identifier.
pub(crate) fn ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain && !RESERVED.contains(&name) && !is_integer_type(name) {
        name.to_string()
    } else {
        format!("@\"{}\"", name)
    }
}

/// `i7`, `u32` and the like are primitive types in Zig.
fn is_integer_type(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('i') | Some('u'))
        && name.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Name of the wrapper of a callable.
pub(crate) fn function_ident(name: &str) -> String {
    let name = util::snake_to_camel(name);
    if name == "self" {
        "getSelf".into()
    } else {
        ident(&name)
    }
}

/// Indents every non-empty line by one level.
pub(crate) fn indent(code: &str) -> String {
    code.lines()
        .map(|line| {
            if line.is_empty() {
                "\n".to_string()
            } else {
                format!("    {}\n", line)
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::sample;
    use crate::ir::TypeInfo;
    use crate::normalize_source_code;

    #[test]
    fn header_with_dependencies() {
        let namespace = Namespace {
            name: "Demo".into(),
            version: "1.0".into(),
            dependencies: vec!["GObject-2.0".into(), "Gtk-4.0".into()],
            entities: vec![],
        };
        let expected = r#"
            const Demo = @This();
            pub const GObject = @import("GObject.zig");
            pub const Gtk = @import("Gtk.zig");
            pub const template = @import("template.zig");
            pub const core = @import("core.zig");
            const std = @import("std");
            const meta = std.meta;
            const assert = std.debug.assert;
            const Allocator = std.mem.Allocator;
        "#;
        assert_eq!(
            normalize_source_code(expected),
            normalize_source_code(&header(&namespace))
        );
    }

    #[test]
    fn header_of_gtk() {
        let namespace = Namespace {
            name: "Gtk".into(),
            ..Default::default()
        };
        let actual = header(&namespace);
        assert!(actual.contains("pub const core = @import(\"core.zig\");\npub const template"));
    }

    #[test]
    fn identifiers() {
        assert_eq!("label", ident("label"));
        assert_eq!("@\"error\"", ident("error"));
        assert_eq!("@\"type\"", ident("type"));
        assert_eq!("@\"u8\"", ident("u8"));
        assert_eq!("u", ident("u"));
        assert_eq!("@\"2d\"", ident("2d"));
        assert_eq!("getSelf", function_ident("self"));
        assert_eq!("@\"continue\"", function_ident("continue"));
        assert_eq!("getChildVisible", function_ident("get_child_visible"));
    }

    #[test]
    fn indentation() {
        assert_eq!("    a\n\n    b\n", indent("a\n\nb"));
    }

    #[test]
    fn emitted_skips_duplicates() {
        let mut emitted = Emitted::default();
        assert!(emitted.insert("Widget"));
        assert!(!emitted.insert("Widget"));
        assert!(emitted.contains("Widget"));
        assert!(!emitted.contains("Button"));
    }

    #[test]
    fn constants() {
        let repository = Repository::default();
        let namespace = Namespace::default();
        let mut config = Config::default();
        let mut emitter = Emitter::new(&repository, &config, &namespace);

        let major = sample::constant("MAJOR_VERSION", TypeTag::Int32, ConstantValue::Int(4));
        assert_eq!("pub const MAJOR_VERSION = 4;\n", emitter.constant(&major));

        let ratio = sample::constant("RATIO", TypeTag::Double, ConstantValue::Float(0.5));
        assert_eq!("pub const RATIO = 0.500000;\n", emitter.constant(&ratio));

        let name = sample::constant(
            "NAME",
            TypeTag::Utf8,
            ConstantValue::Str("say \"hi\"".into()),
        );
        assert_eq!(
            "pub const NAME = \"say \\\"hi\\\"\";\n",
            emitter.constant(&name)
        );

        let flag = sample::constant("ENABLED", TypeTag::Boolean, ConstantValue::Bool(true));
        assert_eq!("pub const ENABLED = true;\n", emitter.constant(&flag));
        assert!(emitter.finish(Default::default()).diagnostics.is_empty());

        config.uppercase_constants = false;
        let mut emitter = Emitter::new(&repository, &config, &namespace);
        assert_eq!("pub const major_version = 4;\n", emitter.constant(&major));
    }

    #[test]
    fn constant_unsupported() {
        let repository = Repository::default();
        let namespace = Namespace {
            name: "Demo".into(),
            ..Default::default()
        };
        let config = Config::default();
        let mut emitter = Emitter::new(&repository, &config, &namespace);
        let mut constant =
            sample::constant("LIST", TypeTag::Glist, ConstantValue::Int(0));
        constant.ty = TypeInfo::new(TypeTag::Glist).pointer();

        assert_eq!("", emitter.constant(&constant));
        let generated = emitter.finish(Default::default());
        assert_eq!(1, generated.diagnostics.len());
        assert_eq!("Demo", generated.diagnostics[0].namespace);
        assert!(generated.diagnostics[0].message.contains("glist"));
    }

    #[test]
    fn callback() {
        let repository = Repository::default();
        let namespace = Namespace::default();
        let config = Config::default();
        let mut emitter = Emitter::new(&repository, &config, &namespace);
        let callback = Callable {
            name: "Visitor".into(),
            args: vec![
                sample::arg("value", TypeInfo::new(TypeTag::Int32)),
                sample::arg("user_data", TypeInfo::new(TypeTag::Void).pointer()),
            ],
            return_type: TypeInfo::new(TypeTag::Boolean),
            ..Default::default()
        };
        let expected = r#"
            /// Visitor
            /// @value: i32
            /// @user_data: *anyopaque
            /// Return: core.Boolean
            pub const Visitor = *const fn(i32, *anyopaque) callconv(.C) core.Boolean;
        "#;
        assert_eq!(
            normalize_source_code(expected),
            normalize_source_code(&emitter.callback(&callback))
        );
    }

    #[test]
    fn namespace_skips_deprecated_and_duplicates() {
        let mut repository = sample::hierarchy();
        let demo = &mut repository.namespaces[1];
        let mut deprecated = sample::function("old", vec![], TypeInfo::default());
        deprecated.deprecated = true;
        demo.entities.push(Entity::Function(deprecated));
        demo.entities.push(Entity::Function(sample::function(
            "fresh",
            vec![],
            TypeInfo::default(),
        )));
        demo.entities.push(Entity::Function(sample::function(
            "fresh",
            vec![],
            TypeInfo::default(),
        )));

        let writer = ZigWriter::new(Config::default());
        let generated = writer.write_target_namespace(&repository.namespaces[1], &repository);
        assert!(!generated.source.contains("demo_old"));
        assert_eq!(1, generated.source.matches("pub fn fresh(").count());

        let mut config = Config::default();
        config.include_deprecated = true;
        let writer = ZigWriter::new(config);
        let generated = writer.write_target_namespace(&repository.namespaces[1], &repository);
        assert!(generated.source.contains("/// (deprecated)\n"));
        assert!(generated.source.contains("demo_old"));
    }

    #[test]
    fn single_entity() {
        let repository = sample::hierarchy();
        let namespace = &repository.namespaces[1];
        let writer = ZigWriter::new(Config::default());
        let generated = writer.write_target_entity(&namespace.entities[0], namespace, &repository);
        assert!(generated.source.starts_with("pub const"));
        assert!(!generated.source.contains("const Demo = @This();"));
        assert_eq!("Demo.zig", writer.file_name(namespace));
    }
}
