//! Sample IRs for testing.

use super::*;

pub(crate) fn arg(name: &str, ty: TypeInfo) -> Arg {
    Arg {
        name: name.into(),
        ty,
        ..Default::default()
    }
}

pub(crate) fn out_arg(name: &str, ty: TypeInfo) -> Arg {
    Arg {
        direction: Direction::Out,
        ..arg(name, ty)
    }
}

/// A free function exported as `demo_<name>`.
pub(crate) fn function(name: &str, args: Vec<Arg>, return_type: TypeInfo) -> Callable {
    Callable {
        name: name.into(),
        symbol: format!("demo_{}", name),
        args,
        return_type,
        ..Default::default()
    }
}

pub(crate) fn method(name: &str, args: Vec<Arg>, return_type: TypeInfo) -> Callable {
    Callable {
        is_method: true,
        ..function(name, args, return_type)
    }
}

pub(crate) fn constant(name: &str, tag: TypeTag, value: ConstantValue) -> Constant {
    let ty = TypeInfo::new(tag);
    Constant {
        name: name.into(),
        ty: if ty.tag == TypeTag::Utf8 {
            ty.pointer()
        } else {
            ty
        },
        value,
        deprecated: false,
    }
}

fn utf8() -> TypeInfo {
    TypeInfo::new(TypeTag::Utf8).pointer()
}

fn property(name: &str, ty: TypeInfo) -> Property {
    Property {
        name: name.into(),
        ty,
        readable: true,
        writable: false,
        construct_only: false,
        getter: None,
        setter: None,
        deprecated: false,
    }
}

fn gobject() -> Namespace {
    let value = TypeInfo {
        pointer: true,
        ..TypeInfo::interface("GObject", "Value", InfoKind::Struct)
    };
    let accessors = vec!["get_property", "set_property"]
        .into_iter()
        .map(|name| Callable {
            symbol: format!("g_object_{}", name),
            ..method(
                name,
                vec![arg("property_name", utf8()), arg("value", value.clone())],
                TypeInfo::default(),
            )
        })
        .collect();
    Namespace {
        name: "GObject".into(),
        version: "2.0".into(),
        dependencies: vec![],
        entities: vec![
            Entity::Object(Object {
                name: "Object".into(),
                methods: accessors,
                gtype_init: Some("g_object_get_type".into()),
                ..Default::default()
            }),
            Entity::Struct(Record {
                name: "Value".into(),
                gtype_init: Some("g_value_get_type".into()),
                ..Default::default()
            }),
        ],
    }
}

/// `Leaf` derives from `Mid` which derives from `Root`, all rooted at `GObject.Object`.
///
/// `Leaf` also implements `Iface`. `Unrelated` shares nothing with the others. Everything in
/// here translates without diagnostics.
pub(crate) fn hierarchy() -> Repository {
    let mut name = property("name", utf8());
    name.writable = true;
    name.getter = Some("demo_root_get_name".into());
    let root = Object {
        name: "Root".into(),
        parent: Some(EntityRef::new("GObject", "Object")),
        methods: vec![
            method("get_name", vec![], utf8()),
            method(
                "self",
                vec![],
                TypeInfo::interface("Demo", "Root", InfoKind::Object),
            ),
        ],
        signals: vec![Callable {
            name: "closed".into(),
            ..Default::default()
        }],
        properties: vec![name],
        gtype_init: Some("demo_root_get_type".into()),
        ..Default::default()
    };

    let mid = Object {
        name: "Mid".into(),
        parent: Some(EntityRef::new("Demo", "Root")),
        ..Default::default()
    };

    let mut label = property("label", utf8());
    label.writable = true;
    let mut draw = method(
        "draw",
        vec![arg("depth", TypeInfo::new(TypeTag::Int32))],
        TypeInfo::default(),
    );
    draw.symbol = Default::default();
    let leaf = Object {
        name: "Leaf".into(),
        parent: Some(EntityRef::new("Demo", "Mid")),
        interfaces: vec![EntityRef::new("Demo", "Iface")],
        signals: vec![Callable {
            name: "activate".into(),
            args: vec![arg("count", TypeInfo::new(TypeTag::Int32))],
            ..Default::default()
        }],
        properties: vec![label],
        vfuncs: vec![draw.clone()],
        class_struct: Some(EntityRef::new("Demo", "LeafClass")),
        gtype_init: Some("demo_leaf_get_type".into()),
        ..Default::default()
    };

    let mut draw_slot = TypeInfo::interface("Demo", "draw", InfoKind::Callback);
    if let Some(interface) = draw_slot.interface.as_mut() {
        interface.callback = Some(Box::new(Callable {
            args: vec![
                arg("self", TypeInfo::interface("Demo", "Leaf", InfoKind::Object)),
                arg("depth", TypeInfo::new(TypeTag::Int32)),
            ],
            ..draw
        }));
    }
    let leaf_class = Record {
        name: "LeafClass".into(),
        fields: vec![
            Field {
                name: "parent_class".into(),
                ty: TypeInfo::interface("GObject", "ObjectClass", InfoKind::Struct),
            },
            Field {
                name: "draw".into(),
                ty: draw_slot,
            },
        ],
        ..Default::default()
    };

    let iface = Interface {
        name: "Iface".into(),
        prerequisites: vec![EntityRef::new("GObject", "Object")],
        methods: vec![method("ping", vec![], TypeInfo::default())],
        gtype_init: Some("demo_iface_get_type".into()),
        ..Default::default()
    };

    let unrelated = Object {
        name: "Unrelated".into(),
        ..Default::default()
    };

    let rect = Record {
        name: "Rect".into(),
        fields: vec![
            Field {
                name: "x".into(),
                ty: TypeInfo::new(TypeTag::Double),
            },
            Field {
                name: "y".into(),
                ty: TypeInfo::new(TypeTag::Double),
            },
        ],
        methods: vec![method(
            "get_origin",
            vec![out_arg("x", TypeInfo::new(TypeTag::Double))],
            TypeInfo::default(),
        )],
        ..Default::default()
    };

    let mode = Enumeration {
        name: "Mode".into(),
        values: vec![
            EnumValue {
                name: "read".into(),
                value: 1,
            },
            EnumValue {
                name: "write".into(),
                value: 2,
            },
        ],
        ..Default::default()
    };

    let visitor = Callable {
        name: "Visitor".into(),
        args: vec![
            arg("value", TypeInfo::new(TypeTag::Int32)),
            arg("user_data", TypeInfo::new(TypeTag::Void).pointer()),
        ],
        return_type: TypeInfo::new(TypeTag::Boolean),
        ..Default::default()
    };

    let demo = Namespace {
        name: "Demo".into(),
        version: "1.0".into(),
        dependencies: vec!["GObject-2.0".into()],
        entities: vec![
            Entity::Object(root),
            Entity::Object(mid),
            Entity::Object(leaf),
            Entity::Struct(leaf_class),
            Entity::Interface(iface),
            Entity::Object(unrelated),
            Entity::Struct(rect),
            Entity::Flags(mode),
            Entity::Callback(visitor),
            Entity::Constant(constant(
                "MAJOR_VERSION",
                TypeTag::Int32,
                ConstantValue::Int(1),
            )),
        ],
    };

    Repository {
        namespaces: vec![gobject(), demo],
    }
}

/// One function with a type this generator does not know next to a perfectly fine one.
pub(crate) fn unsupported() -> Repository {
    let broken = function(
        "broken",
        vec![arg(
            "value",
            TypeInfo::new(TypeTag::Unknown("variant".into())),
        )],
        TypeInfo::default(),
    );
    let fine = function("fine", vec![], TypeInfo::default());
    Repository {
        namespaces: vec![Namespace {
            name: "Demo".into(),
            version: "1.0".into(),
            dependencies: vec![],
            entities: vec![Entity::Function(broken), Entity::Function(fine)],
        }],
    }
}
