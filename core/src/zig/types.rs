//! Type expressions.

use super::Emitter;
use crate::ir::ArrayKind;
use crate::ir::ArraySizing;
use crate::ir::Callable;
use crate::ir::Direction;
use crate::ir::Entity;
use crate::ir::InfoKind;
use crate::ir::TypeInfo;
use crate::ir::TypeTag;
use itertools::Itertools;

/// Placeholder for anything that cannot be translated.
pub(crate) const UNSUPPORTED: &str = "core.Unsupported";

/// Context a type expression is written in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct TypeOptions {
    /// The value may be absent.
    pub nullable: bool,

    /// A C array is exposed as a slice.
    pub slice: bool,

    /// The value is written through an out pointer.
    pub out: bool,

    /// Fixed-size arrays decay to pointers as in C signatures.
    pub prefer_c: bool,
}

impl TypeOptions {
    pub fn nullable(nullable: bool) -> Self {
        Self {
            nullable,
            ..Default::default()
        }
    }

    /// Options for raw C signatures.
    pub fn c() -> Self {
        Self {
            prefer_c: true,
            ..Default::default()
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_slice(mut self, slice: bool) -> Self {
        self.slice = slice;
        self
    }

    pub fn with_out(mut self, out: bool) -> Self {
        self.out = out;
        self
    }
}

impl<'a> Emitter<'a> {
    /// Translates a type descriptor.
    pub fn type_expr(&mut self, ty: &TypeInfo, options: TypeOptions) -> String {
        let optional = if options.nullable { "?" } else { "" };
        let pointer = if ty.pointer || options.out { "*" } else { "" };
        let scalar = |name: &str| format!("{}{}{}", optional, pointer, name);
        match &ty.tag {
            TypeTag::Void => {
                let out = if ty.pointer && options.out { "*" } else { "" };
                let base = if pointer.is_empty() {
                    "void"
                } else {
                    "*anyopaque"
                };
                format!("{}{}{}", optional, out, base)
            }
            TypeTag::Boolean => scalar("core.Boolean"),
            TypeTag::Int8 => scalar("i8"),
            TypeTag::Uint8 => scalar("u8"),
            TypeTag::Int16 => scalar("i16"),
            TypeTag::Uint16 => scalar("u16"),
            TypeTag::Int32 => scalar("i32"),
            TypeTag::Uint32 => scalar("u32"),
            TypeTag::Int64 => scalar("i64"),
            TypeTag::Uint64 => scalar("u64"),
            TypeTag::Float => scalar("f32"),
            TypeTag::Double => scalar("f64"),
            TypeTag::Gtype => "core.GType".into(),
            TypeTag::Utf8 | TypeTag::Filename => {
                let out = if ty.pointer && options.out { "*" } else { "" };
                format!("{}{}[*:0]const u8", optional, out)
            }
            TypeTag::Array => match ty.array.as_deref() {
                Some(array) => match array.kind {
                    ArrayKind::Array => scalar("core.Array"),
                    ArrayKind::PtrArray => scalar("core.PtrArray"),
                    ArrayKind::ByteArray => scalar("core.ByteArray"),
                    ArrayKind::C => {
                        let shape = if options.slice {
                            "[]".to_string()
                        } else {
                            match array.sizing {
                                ArraySizing::None | ArraySizing::Length(_) => "[*]".into(),
                                ArraySizing::FixedSize(size) => {
                                    let decay = if options.prefer_c { "*" } else { "" };
                                    format!("{}[{}]", decay, size)
                                }
                                ArraySizing::ZeroTerminated => {
                                    if !array.element.pointer && array.element.tag.is_basic() {
                                        "[*:0]".into()
                                    } else {
                                        "[*:null]".into()
                                    }
                                }
                            }
                        };
                        let terminated = array.sizing == ArraySizing::ZeroTerminated;
                        let element_nullable = terminated
                            && (!array.element.tag.is_basic() || array.element.pointer);
                        let element =
                            self.type_expr(&array.element, TypeOptions::nullable(element_nullable));
                        let out = if options.out { "*" } else { "" };
                        format!("{}{}{}{}", optional, out, shape, element)
                    }
                },
                None => self.unsupported_type(&ty.tag),
            },
            TypeTag::Interface => match &ty.interface {
                Some(interface) => {
                    let qualified = format!("{}.{}", &interface.namespace, &interface.name);
                    match interface.kind {
                        InfoKind::Object | InfoKind::Interface => {
                            if options.nullable {
                                format!("{}Nullable", qualified)
                            } else {
                                qualified
                            }
                        }
                        InfoKind::Callback => {
                            let signature = if is_named_callback(&interface.name) {
                                qualified
                            } else if let Some(callback) = interface.callback.as_deref() {
                                self.callback_signature(callback)
                            } else {
                                let repository = self.repository;
                                match repository.lookup(&interface.namespace, &interface.name) {
                                    Some(Entity::Callback(callback)) => {
                                        self.callback_signature(callback)
                                    }
                                    _ => {
                                        self.report(format!(
                                            "Unsupported callback {}",
                                            &qualified
                                        ));
                                        UNSUPPORTED.into()
                                    }
                                }
                            };
                            format!("{}{}", optional, signature)
                        }
                        InfoKind::Struct
                        | InfoKind::Union
                        | InfoKind::Boxed
                        | InfoKind::Enum
                        | InfoKind::Flags => scalar(&qualified),
                        InfoKind::Unresolved => {
                            let kind: &'static str = interface.kind.into();
                            self.report(format!("Unsupported interface type {}", kind));
                            UNSUPPORTED.into()
                        }
                    }
                }
                None => self.unsupported_type(&ty.tag),
            },
            TypeTag::Glist => scalar("core.List"),
            TypeTag::Gslist => scalar("core.SList"),
            TypeTag::Ghash => scalar("core.HashTable"),
            TypeTag::Error => scalar("core.Error"),
            TypeTag::Unichar => scalar("core.Unichar"),
            TypeTag::Unknown(_) => self.unsupported_type(&ty.tag),
        }
    }

    fn unsupported_type(&mut self, tag: &TypeTag) -> String {
        self.report(format!("Unsupported type {}", tag.name()));
        UNSUPPORTED.into()
    }

    /// `*const fn(...) callconv(.C) R`
    pub fn callback_signature(&mut self, callback: &Callable) -> String {
        let params = callback
            .args
            .iter()
            .map(|arg| {
                let options = TypeOptions::c()
                    .with_nullable(arg.optional || arg.nullable)
                    .with_out(arg.direction != Direction::In);
                self.type_expr(&arg.ty, options)
            })
            .collect::<Vec<_>>();
        let return_type = self.type_expr(
            &callback.return_type,
            TypeOptions::c().with_nullable(callback.may_return_null),
        );
        format!(
            "*const fn({}) callconv(.C) {}",
            params.iter().join(", "),
            return_type
        )
    }
}

/// Callbacks with a capitalized name are exported by their namespace and referenced by name.
///
/// Anonymous callbacks get their signature inlined instead. This is a naming convention of the
/// introspection data, not a guarantee.
fn is_named_callback(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}
