//! Intermediate representations (IR).
//!
//! These types describe a foreign API as dumped by an introspection loader. They are loaded once,
//! never mutated during generation, and contain the information sufficient for generating target
//! code.
//!
//! Entities refer to each other by [EntityRef] and are resolved through the owning [Repository],
//! so the whole description is a read-only graph borrowed for the duration of a run.

#[cfg(test)]
pub mod sample;

use crate::ErrorSource;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Path;
use strum_macros::EnumString;
use strum_macros::IntoStaticStr;

/// Tag of a [TypeInfo].
///
/// Tags unknown to this generator are kept as [Unknown](TypeTag::Unknown) so that they can be
/// reported by name instead of failing the whole description.
#[derive(Clone, Debug, PartialEq, Eq, EnumString, IntoStaticStr, Deserialize)]
#[serde(from = "String")]
pub enum TypeTag {
    #[strum(serialize = "void")]
    Void,
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "int8")]
    Int8,
    #[strum(serialize = "uint8")]
    Uint8,
    #[strum(serialize = "int16")]
    Int16,
    #[strum(serialize = "uint16")]
    Uint16,
    #[strum(serialize = "int32")]
    Int32,
    #[strum(serialize = "uint32")]
    Uint32,
    #[strum(serialize = "int64")]
    Int64,
    #[strum(serialize = "uint64")]
    Uint64,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "double")]
    Double,

    /// Runtime type identifier.
    #[strum(serialize = "gtype")]
    Gtype,

    #[strum(serialize = "utf8")]
    Utf8,
    #[strum(serialize = "filename")]
    Filename,
    #[strum(serialize = "array")]
    Array,

    /// Reference to another entity, see [InterfaceRef].
    #[strum(serialize = "interface")]
    Interface,

    #[strum(serialize = "glist")]
    Glist,
    #[strum(serialize = "gslist")]
    Gslist,
    #[strum(serialize = "ghash")]
    Ghash,
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "unichar")]
    Unichar,

    #[strum(default)]
    Unknown(String),
}

impl TypeTag {
    /// Name of the tag as it appears in a description.
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown(name) => name.as_str(),
            known => <&'static str>::from(known),
        }
    }

    /// Numeric, boolean and type-id tags, plus `void`.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Void
                | Self::Boolean
                | Self::Int8
                | Self::Uint8
                | Self::Int16
                | Self::Uint16
                | Self::Int32
                | Self::Uint32
                | Self::Int64
                | Self::Uint64
                | Self::Float
                | Self::Double
                | Self::Gtype
        )
    }

    /// Values of these tags are plain scalars, so a zero value can terminate an array of them.
    pub fn is_basic(&self) -> bool {
        self.is_primitive() || *self == Self::Unichar
    }
}

impl From<String> for TypeTag {
    fn from(src: String) -> Self {
        src.parse().unwrap_or(Self::Unknown(src))
    }
}

impl Default for TypeTag {
    fn default() -> Self {
        Self::Void
    }
}

/// Kind of the entity an [InterfaceRef] resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InfoKind {
    Struct,
    Union,
    Boxed,
    Enum,
    Flags,
    Object,
    Interface,
    Callback,

    /// The loader could not resolve the target.
    Unresolved,
}

/// Container shape of an array type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayKind {
    /// Raw C array.
    C,
    Array,
    PtrArray,
    ByteArray,
}

impl Default for ArrayKind {
    fn default() -> Self {
        Self::C
    }
}

/// How the length of a C array is known.
///
/// At most one of these is ever active for a single array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArraySizing {
    None,
    FixedSize(usize),

    /// Index of the parameter carrying the element count.
    Length(usize),

    ZeroTerminated,
}

impl Default for ArraySizing {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ArrayInfo {
    #[serde(default)]
    pub kind: ArrayKind,

    pub element: TypeInfo,

    #[serde(default)]
    pub sizing: ArraySizing,
}

/// A type reference naming another entity.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InterfaceRef {
    pub namespace: String,
    pub name: String,
    pub kind: InfoKind,

    /// Signature of an anonymous callback type.
    ///
    /// Callbacks without an exported name are emitted inline from this signature.
    #[serde(default)]
    pub callback: Option<Box<Callable>>,
}

/// Type descriptor of a parameter, return value, field, property or constant.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TypeInfo {
    pub tag: TypeTag,
    pub pointer: bool,

    /// Present iff `tag` is [Array](TypeTag::Array).
    pub array: Option<Box<ArrayInfo>>,

    /// Present iff `tag` is [Interface](TypeTag::Interface).
    pub interface: Option<InterfaceRef>,
}

impl TypeInfo {
    pub fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            ..Default::default()
        }
    }

    /// Marks the type as passed through a pointer.
    pub fn pointer(mut self) -> Self {
        self.pointer = true;
        self
    }

    pub fn array(kind: ArrayKind, element: TypeInfo, sizing: ArraySizing) -> Self {
        Self {
            tag: TypeTag::Array,
            pointer: true,
            array: Some(Box::new(ArrayInfo {
                kind,
                element,
                sizing,
            })),
            interface: None,
        }
    }

    pub fn interface(namespace: &str, name: &str, kind: InfoKind) -> Self {
        Self {
            tag: TypeTag::Interface,
            pointer: matches!(kind, InfoKind::Object | InfoKind::Interface),
            array: None,
            interface: Some(InterfaceRef {
                namespace: namespace.into(),
                name: name.into(),
                kind,
                callback: None,
            }),
        }
    }

    /// Kind of the referenced entity, if this is an interface reference.
    pub fn info_kind(&self) -> Option<InfoKind> {
        match (&self.tag, &self.interface) {
            (TypeTag::Interface, Some(interface)) => Some(interface.kind),
            _ => None,
        }
    }

    /// References an object or an interface instance.
    pub fn is_instance(&self) -> bool {
        matches!(
            self.info_kind(),
            Some(InfoKind::Object) | Some(InfoKind::Interface)
        )
    }

    pub fn is_callback(&self) -> bool {
        self.info_kind() == Some(InfoKind::Callback)
    }

    /// A struct or union passed by value.
    pub fn is_struct_union(&self) -> bool {
        !self.pointer
            && matches!(
                self.info_kind(),
                Some(InfoKind::Struct) | Some(InfoKind::Union) | Some(InfoKind::Boxed)
            )
    }

    /// The C array information, if this is a C array.
    pub fn c_array(&self) -> Option<&ArrayInfo> {
        match (&self.tag, &self.array) {
            (TypeTag::Array, Some(array)) if array.kind == ArrayKind::C => Some(array),
            _ => None,
        }
    }

    pub fn is_fixed_size_array(&self) -> bool {
        matches!(
            self.c_array().map(|a| a.sizing),
            Some(ArraySizing::FixedSize(_))
        )
    }

    /// Index of the parameter holding the length of this C array.
    pub fn array_length(&self) -> Option<usize> {
        match self.c_array().map(|a| a.sizing) {
            Some(ArraySizing::Length(index)) => Some(index),
            _ => None,
        }
    }

    /// Lists and hash tables are returned as null when empty.
    pub fn is_list_like(&self) -> bool {
        matches!(self.tag, TypeTag::Glist | TypeTag::Gslist | TypeTag::Ghash)
    }

    /// Whether a caller-allocated value of this type can simply live on the stack.
    pub fn fits_on_stack(&self) -> bool {
        if self.pointer {
            return false;
        }
        match &self.tag {
            tag if tag.is_primitive() => true,
            TypeTag::Array => match &self.array {
                Some(array) => {
                    array.kind != ArrayKind::C || matches!(array.sizing, ArraySizing::FixedSize(_))
                }
                None => false,
            },
            TypeTag::Interface => matches!(
                self.info_kind(),
                Some(InfoKind::Struct)
                    | Some(InfoKind::Union)
                    | Some(InfoKind::Boxed)
                    | Some(InfoKind::Enum)
                    | Some(InfoKind::Flags)
            ),
            TypeTag::Glist | TypeTag::Gslist | TypeTag::Ghash | TypeTag::Error | TypeTag::Unichar => {
                true
            }
            _ => false,
        }
    }
}

/// Parameter direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    Inout,
}

impl Default for Direction {
    fn default() -> Self {
        Self::In
    }
}

/// Ownership transfer annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Transfer {
    #[serde(rename = "none")]
    Nothing,
    #[serde(rename = "container")]
    Container,
    #[serde(rename = "full")]
    Everything,
}

impl Default for Transfer {
    fn default() -> Self {
        Self::Nothing
    }
}

/// Lifetime of a callback parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    Call,
    Async,
    Notified,
    Forever,
}

/// Parameter of a [Callable].
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Arg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
    pub direction: Direction,
    pub transfer: Transfer,
    pub optional: bool,
    pub nullable: bool,
    pub caller_allocates: bool,
    pub scope: Option<Scope>,
}

/// Function, method, callback, signal or virtual function.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Callable {
    pub name: String,

    /// Exported symbol. Empty for signals, callbacks and virtual functions.
    pub symbol: String,

    pub args: Vec<Arg>,
    pub return_type: TypeInfo,
    pub may_return_null: bool,
    pub caller_owns: Transfer,
    pub instance_transfer: Transfer,

    /// Takes an implicit leading instance parameter.
    pub is_method: bool,

    /// Reports failures through a trailing error out-parameter.
    pub throws: bool,

    pub skip_return: bool,
    pub deprecated: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
}

/// Struct, union or boxed type.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Record {
    pub name: String,
    pub fields: Vec<Field>,
    pub methods: Vec<Callable>,

    /// Symbol returning the runtime type identity, absent for unregistered types.
    pub gtype_init: Option<String>,

    pub deprecated: bool,

    /// Only meaningful for boxed types, which may have either layout.
    pub is_union: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// Enumeration or bit flags.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Enumeration {
    pub name: String,
    pub storage: TypeTag,
    pub values: Vec<EnumValue>,
    pub methods: Vec<Callable>,
    pub gtype_init: Option<String>,
    pub deprecated: bool,
}

impl Default for Enumeration {
    fn default() -> Self {
        Self {
            name: Default::default(),
            storage: TypeTag::Uint32,
            values: Default::default(),
            methods: Default::default(),
            gtype_init: Default::default(),
            deprecated: Default::default(),
        }
    }
}

/// Reference to a named entity in some namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct EntityRef {
    pub namespace: String,
    pub name: String,
}

impl EntityRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
    #[serde(default = "default_true")]
    pub readable: bool,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub construct_only: bool,

    /// Symbol of a direct accessor.
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub setter: Option<String>,

    #[serde(default)]
    pub deprecated: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
    pub value: ConstantValue,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Object {
    pub name: String,
    pub parent: Option<EntityRef>,
    pub interfaces: Vec<EntityRef>,
    pub fields: Vec<Field>,
    pub constants: Vec<Constant>,
    pub methods: Vec<Callable>,
    pub signals: Vec<Callable>,
    pub properties: Vec<Property>,
    pub vfuncs: Vec<Callable>,

    /// Structure holding the virtual function table.
    pub class_struct: Option<EntityRef>,

    pub gtype_init: Option<String>,
    pub deprecated: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Interface {
    pub name: String,
    pub prerequisites: Vec<EntityRef>,
    pub constants: Vec<Constant>,
    pub methods: Vec<Callable>,
    pub signals: Vec<Callable>,
    pub properties: Vec<Property>,
    pub vfuncs: Vec<Callable>,

    /// Structure holding the virtual function table.
    pub iface_struct: Option<EntityRef>,

    pub gtype_init: Option<String>,
    pub deprecated: bool,
}

/// Top-level entity of a [Namespace].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Function(Callable),
    Callback(Callable),
    Struct(Record),
    Boxed(Record),
    Union(Record),
    Enum(Enumeration),
    Flags(Enumeration),
    Object(Object),
    Interface(Interface),
    Constant(Constant),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Self::Function(inner) | Self::Callback(inner) => &inner.name,
            Self::Struct(inner) | Self::Boxed(inner) | Self::Union(inner) => &inner.name,
            Self::Enum(inner) | Self::Flags(inner) => &inner.name,
            Self::Object(inner) => &inner.name,
            Self::Interface(inner) => &inner.name,
            Self::Constant(inner) => &inner.name,
        }
    }

    pub fn deprecated(&self) -> bool {
        match self {
            Self::Function(inner) | Self::Callback(inner) => inner.deprecated,
            Self::Struct(inner) | Self::Boxed(inner) | Self::Union(inner) => inner.deprecated,
            Self::Enum(inner) | Self::Flags(inner) => inner.deprecated,
            Self::Object(inner) => inner.deprecated,
            Self::Interface(inner) => inner.deprecated,
            Self::Constant(inner) => inner.deprecated,
        }
    }
}

/// Namespace.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Namespace {
    pub name: String,
    pub version: String,

    /// Namespaces this one depends on, in `Name-Version` form.
    pub dependencies: Vec<String>,

    pub entities: Vec<Entity>,
}

impl Namespace {
    /// Dependency names with their version suffix stripped.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .map(|dependency| dependency.split('-').next().unwrap_or_default())
    }
}

/// Repository.
///
/// This is the root of an IR tree.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub namespaces: Vec<Namespace>,
}

impl Repository {
    pub fn from_json(src: &str) -> serde_json::Result<Self> {
        serde_json::from_str(src)
    }

    /// Reads a description dump from the filesystem.
    pub async fn load(src: &Path) -> Result<Self, crate::Error> {
        log::info!("Reading `{}`", src.display());
        let raw = tokio::fs::read_to_string(src)
            .await
            .map_err(|err| crate::Error {
                file: src.to_owned(),
                source: ErrorSource::ReadDescription(err),
            })?;
        Self::from_json(&raw).map_err(|err| crate::Error {
            file: src.to_owned(),
            source: ErrorSource::ParseDescription(err),
        })
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    pub fn lookup(&self, namespace: &str, name: &str) -> Option<&Entity> {
        self.namespace(namespace)?
            .entities
            .iter()
            .find(|entity| entity.name() == name)
    }

    pub fn object(&self, target: &EntityRef) -> Option<&Object> {
        match self.lookup(&target.namespace, &target.name) {
            Some(Entity::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn interface(&self, target: &EntityRef) -> Option<&Interface> {
        match self.lookup(&target.namespace, &target.name) {
            Some(Entity::Interface(interface)) => Some(interface),
            _ => None,
        }
    }

    /// Ancestors of an object, root first, excluding the object itself.
    ///
    /// The walk stops at an ancestor missing from the repository (that ancestor is still
    /// included) or when a cycle is detected.
    pub fn ancestors(&self, object: &Object) -> Vec<EntityRef> {
        let mut result = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor = object.parent.clone();
        while let Some(current) = cursor {
            if !seen.insert(current.clone()) {
                log::warn!("Cyclic ancestry through `{}`", current);
                break;
            }
            cursor = self.object(&current).and_then(|o| o.parent.clone());
            result.push(current);
        }
        result.reverse();
        result
    }
}
