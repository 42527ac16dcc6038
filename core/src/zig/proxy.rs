//! Signal and property proxies.
//!
//! A proxy is a small struct bound to one instance. Properties without direct accessors go
//! through `core.Value`, a tagged box filled and read by the generic `getProperty` and
//! `setProperty` methods.

use super::dispatch::property_accessor;
use super::dispatch::signal_accessor;
use super::dispatch::DispatchTable;
use super::types::UNSUPPORTED;
use super::Emitter;
use super::TypeOptions;
use crate::ir::ArrayKind;
use crate::ir::Callable;
use crate::ir::Direction;
use crate::ir::InfoKind;
use crate::ir::Property;
use crate::ir::TypeInfo;
use crate::ir::TypeTag;
use crate::util;
use itertools::Itertools;
use strum_macros::IntoStaticStr;

/// Name of the local holding the boxed value.
const VALUE: &str = "property_value";

/// Type tag of a `core.Value`.
#[derive(Clone, Copy, Debug, PartialEq, IntoStaticStr)]
enum ValueTag {
    Pointer,
    Boolean,
    Char,
    Uchar,
    Int,
    Uint,
    Long,
    Ulong,
    Int64,
    Uint64,
    Float,
    Double,
    Gtype,
    String,
    Boxed,
    Object,
    Enum,
    Flags,
}

impl ValueTag {
    /// Argument of `core.Value.init`.
    fn init_argument(self) -> String {
        match self {
            Self::Gtype => "core.gtypeGetType()".into(),
            tag => format!(".{}", <&'static str>::from(tag)),
        }
    }

    /// Suffix of the `get*` and `set*` accessors.
    fn accessor(self) -> &'static str {
        match self {
            Self::Char => "Schar",
            tag => tag.into(),
        }
    }
}

/// Conversion applied around an accessor of a [ValueTag].
#[derive(Clone, Copy, Debug, PartialEq)]
enum Conversion {
    Plain,
    Integer,
    Boxed,
    CArray,
    Instance,
    Enumeration,
}

impl<'a> Emitter<'a> {
    /// `SignalProxy{Name}` and the `signal{Name}` accessor.
    pub fn signal(&mut self, signal: &Callable, container: &str) -> String {
        let title = util::snake_to_title(&signal.name);
        let args = signal
            .args
            .iter()
            .map(|arg| {
                let options = TypeOptions::c()
                    .with_nullable(arg.optional || arg.nullable)
                    .with_out(arg.direction != Direction::In);
                let by_pointer = if arg.ty.is_struct_union() { "*" } else { "" };
                format!("{}{}", by_pointer, self.type_expr(&arg.ty, options))
            })
            .collect::<Vec<_>>();
        let return_type = self.type_expr(
            &signal.return_type,
            TypeOptions::c().with_nullable(signal.may_return_null),
        );
        let handler = std::iter::once(container.to_string())
            .chain(args.iter().cloned())
            .chain(std::iter::once("args...".to_string()))
            .join(", ");
        let types = std::iter::once(return_type.clone())
            .chain(std::iter::once(container.to_string()))
            .chain(args.into_iter())
            .join(", ");
        format!(
            r#"const SignalProxy{title} = struct {{
    object: {container},

    /// @handler: fn({handler}) {return_type}
    pub fn connect(self: SignalProxy{title}, comptime handler: anytype, args: anytype, comptime flags: core.ConnectFlagsZ) usize {{
        return core.connectZ(self.object.into(core.Object), "{signal}", handler, args, flags, &[_]type{{ {types} }});
    }}
}};

pub fn {accessor}(self: {container}) SignalProxy{title} {{
    return .{{ .object = self }};
}}
"#,
            accessor = signal_accessor(&signal.name),
            container = container,
            handler = handler,
            return_type = return_type,
            signal = &signal.name,
            title = title,
            types = types,
        )
    }

    /// `PropertyProxy{Name}` and the `property{Name}` accessor.
    ///
    /// `get` and `set` call the accessor symbols if known, or fall back to the value box.
    pub fn property(&mut self, property: &Property, container: &str, table: &DispatchTable) -> String {
        let title = util::snake_to_title(&property.name);
        let proxy = format!("PropertyProxy{}", title);
        let ty = self.type_expr(&property.ty, TypeOptions::c());
        let mut result = format!("const {} = struct {{\n    object: {},\n\n", proxy, container);
        result.push_str(&format!(
            r#"    pub fn connectNotify(self: {proxy}, comptime handler: anytype, args: anytype, comptime flags: core.ConnectFlagsZ) usize {{
        return core.connectZ(self.object.into(core.Object), "notify::{name}", handler, args, flags, &[_]type{{ void, {container}, core.ParamSpec }});
    }}
"#,
            container = container,
            name = &property.name,
            proxy = &proxy,
        ));

        if let Some(getter) = &property.getter {
            result.push_str(&format!(
                r#"
    extern fn {getter}({container}) {ty};
    pub fn get(self: {proxy}) {ty} {{
        return {getter}(self.object);
    }}
"#,
                container = container,
                getter = getter,
                proxy = &proxy,
                ty = &ty,
            ));
        } else if property.readable {
            self.check_reachable(table, "getProperty");
            let init = self.value_init(&property.ty);
            let get = self.value_get(&property.ty);
            result.push_str(&format!(
                r#"
    pub fn get(self: {proxy}) {ty} {{
        var {value} = std.mem.zeroes(core.Value);
        defer {value}.unset();
        {init}
        self.object.callMethod("getProperty", .{{ "{name}", &{value} }});
        return {get};
    }}
"#,
                get = get,
                init = init,
                name = &property.name,
                proxy = &proxy,
                ty = &ty,
                value = VALUE,
            ));
        }

        if let Some(setter) = &property.setter {
            result.push_str(&format!(
                r#"
    extern fn {setter}({container}, {ty}) void;
    pub fn set(self: {proxy}, value: {ty}) void {{
        {setter}(self.object, value);
    }}
"#,
                container = container,
                proxy = &proxy,
                setter = setter,
                ty = &ty,
            ));
        } else if property.writable && !property.construct_only {
            self.check_reachable(table, "setProperty");
            let init = self.value_init(&property.ty);
            let set = self.value_set(&property.ty, "value");
            result.push_str(&format!(
                r#"
    pub fn set(self: {proxy}, value: {ty}) void {{
        var {value} = std.mem.zeroes(core.Value);
        defer {value}.unset();
        {init}
        {set}
        self.object.callMethod("setProperty", .{{ "{name}", &{value} }});
    }}
"#,
                init = init,
                name = &property.name,
                proxy = &proxy,
                set = set,
                ty = &ty,
                value = VALUE,
            ));
        }

        result.push_str(&format!(
            "}};\n\npub fn {}(self: {}) {} {{\n    return .{{ .object = self }};\n}}\n",
            property_accessor(&property.name),
            container,
            &proxy
        ));
        result
    }

    /// The generic accessors live on `GObject.Object`, which may be outside the loaded
    /// description.
    fn check_reachable(&self, table: &DispatchTable, key: &str) {
        if table.lookup(self.repository, self.config, key).is_none() {
            log::debug!(
                "`{}` cannot be proven to reach `{}` from the loaded description",
                &table.owner,
                key
            );
        }
    }

    /// Picks the box tag of a type, or reports it.
    fn value_tag(&mut self, ty: &TypeInfo) -> Option<(ValueTag, Conversion)> {
        let wide = self.config.native_int_width != 32;
        let tag = match &ty.tag {
            TypeTag::Void if ty.pointer => (ValueTag::Pointer, Conversion::Plain),
            TypeTag::Boolean => (ValueTag::Boolean, Conversion::Plain),
            TypeTag::Int8 => (ValueTag::Char, Conversion::Plain),
            TypeTag::Uint8 => (ValueTag::Uchar, Conversion::Plain),
            TypeTag::Int16 => (ValueTag::Int, Conversion::Integer),
            TypeTag::Uint16 => (ValueTag::Uint, Conversion::Integer),
            TypeTag::Int32 if wide => (ValueTag::Long, Conversion::Integer),
            TypeTag::Int32 => (ValueTag::Int, Conversion::Integer),
            TypeTag::Uint32 if wide => (ValueTag::Ulong, Conversion::Integer),
            TypeTag::Uint32 => (ValueTag::Uint, Conversion::Integer),
            TypeTag::Int64 => (ValueTag::Int64, Conversion::Plain),
            TypeTag::Uint64 => (ValueTag::Uint64, Conversion::Plain),
            TypeTag::Float => (ValueTag::Float, Conversion::Plain),
            TypeTag::Double => (ValueTag::Double, Conversion::Plain),
            TypeTag::Gtype => (ValueTag::Gtype, Conversion::Plain),
            TypeTag::Utf8 | TypeTag::Filename => (ValueTag::String, Conversion::Plain),
            TypeTag::Array => match ty.array.as_deref().map(|array| array.kind) {
                Some(ArrayKind::C) => (ValueTag::Pointer, Conversion::CArray),
                Some(_) => (ValueTag::Boxed, Conversion::Boxed),
                None => return self.unsupported_value(ty.tag.name()),
            },
            TypeTag::Interface => match ty.info_kind() {
                Some(InfoKind::Object) | Some(InfoKind::Interface) => {
                    (ValueTag::Object, Conversion::Instance)
                }
                Some(InfoKind::Struct) | Some(InfoKind::Union) | Some(InfoKind::Boxed) => {
                    (ValueTag::Boxed, Conversion::Boxed)
                }
                Some(InfoKind::Enum) => (ValueTag::Enum, Conversion::Enumeration),
                Some(InfoKind::Flags) => (ValueTag::Flags, Conversion::Enumeration),
                Some(kind) => {
                    let kind: &'static str = kind.into();
                    self.report(format!("Unsupported value interface type {}", kind));
                    return None;
                }
                None => return self.unsupported_value(ty.tag.name()),
            },
            other => return self.unsupported_value(other.name()),
        };
        Some(tag)
    }

    fn unsupported_value(&mut self, tag: &str) -> Option<(ValueTag, Conversion)> {
        self.report(format!("Unsupported value type {}", tag));
        None
    }

    /// `_ = property_value.init(.Tag);`
    fn value_init(&mut self, ty: &TypeInfo) -> String {
        match self.value_tag(ty) {
            Some((tag, _)) => format!("_ = {}.init({});", VALUE, tag.init_argument()),
            None => format!("_ = {};", UNSUPPORTED),
        }
    }

    /// Expression reading the box as `ty`.
    fn value_get(&mut self, ty: &TypeInfo) -> String {
        let (tag, conversion) = match self.value_tag(ty) {
            Some(found) => found,
            None => return UNSUPPORTED.into(),
        };
        let call = format!("{}.get{}()", VALUE, tag.accessor());
        let target = self.type_expr(ty, TypeOptions::c());
        match conversion {
            Conversion::Plain => call,
            Conversion::Integer => format!("@intCast({}, {})", target, call),
            Conversion::Boxed => format!(
                "core.alignedPtrCast({}{}, {})",
                if ty.pointer { "" } else { "*" },
                target,
                call
            ),
            Conversion::CArray => format!("core.alignedPtrCast({}, {})", target, call),
            Conversion::Instance => format!("{}.tryInto({}).?", call, target),
            Conversion::Enumeration => format!("@intToEnum({}, {})", target, call),
        }
    }

    /// Statement filling the box with `value`.
    fn value_set(&mut self, ty: &TypeInfo, value: &str) -> String {
        let (tag, conversion) = match self.value_tag(ty) {
            Some(found) => found,
            None => return Default::default(),
        };
        let argument = match conversion {
            Conversion::Instance => format!("{}.into(core.Object)", value),
            Conversion::Enumeration => format!("@enumToInt({})", value),
            _ => value.to_string(),
        };
        format!("{}.set{}({});", VALUE, tag.accessor(), argument)
    }
}
