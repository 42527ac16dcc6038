//! Wrappers of functions, methods and virtual functions.
//!
//! A wrapper reshapes a C call into a Zig-friendly one: arrays twinned with a length parameter
//! become slices, out parameters are returned instead of written through pointers, and failures
//! reported through an error out parameter or a boolean return become a `core.Result`.

use super::function_ident;
use super::ident;
use super::types::TypeOptions;
use super::Container;
use super::Emitter;
use crate::ir::Arg;
use crate::ir::Callable;
use crate::ir::Direction;
use crate::ir::Transfer;
use crate::ir::TypeInfo;
use crate::ir::TypeTag;
use crate::util;
use itertools::Itertools;

/// How a parameter is passed through a wrapper.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ParamClass {
    pub direction: Direction,
    pub caller_allocates: bool,
    pub optional: bool,
    pub nullable: bool,

    /// Refers to an object or interface instance, which carries its own nullability.
    pub instance: bool,

    /// This is a C array exposed as a slice, its length is passed in the parameter at this index.
    pub slice_length: Option<usize>,

    /// This is the length of the slice at this index, derived instead of supplied by the caller.
    pub length_of: Option<usize>,

    /// An earlier slice sharing the same length parameter.
    pub same_length_as: Option<usize>,
}

impl ParamClass {
    /// Supplied by the caller of the wrapper.
    pub fn is_input(&self) -> bool {
        self.direction != Direction::Out || self.caller_allocates
    }

    /// Returned from the wrapper.
    pub fn is_output(&self) -> bool {
        self.direction != Direction::In
    }

    pub fn is_slice(&self) -> bool {
        self.slice_length.is_some()
    }

    /// Passed by the caller without any output involved.
    fn is_plain_input(&self) -> bool {
        self.direction != Direction::Out && !self.nullable && !self.optional
    }
}

/// Classifies the parameters of a callable.
///
/// When two arrays are twinned with the same length parameter, the last one wins and the earlier
/// one is recorded as its sibling.
pub(crate) fn classify(args: &[Arg]) -> Vec<ParamClass> {
    let mut classes = vec![ParamClass::default(); args.len()];
    for (index, arg) in args.iter().enumerate() {
        let class = &mut classes[index];
        class.direction = arg.direction;
        class.nullable = arg.nullable;
        class.instance = arg.ty.is_instance();
        if arg.direction == Direction::Out {
            class.caller_allocates = arg.caller_allocates;
            class.optional = arg.optional;
        }

        // The callee always allocates, so there is nothing to omit.
        if class.direction == Direction::Out && !class.caller_allocates {
            class.optional = false;
        }
        // A stack slot is always present.
        if class.caller_allocates && arg.ty.fits_on_stack() {
            class.caller_allocates = false;
            class.optional = false;
        }

        if let Some(length) = arg.ty.array_length() {
            if length >= args.len() || length == index {
                log::warn!(
                    "Array `{}` refers to an invalid length parameter {}",
                    &arg.name,
                    length
                );
                continue;
            }
            classes[index].slice_length = Some(length);
            classes[index].same_length_as = classes[length].length_of;
            classes[length].length_of = Some(index);
        }
    }
    classes
}

/// Whether the type is `Gtk.Widget`, which constructors of widgets declare as their return type.
fn is_gtk_widget(ty: &TypeInfo) -> bool {
    matches!(&ty.interface, Some(interface) if interface.namespace == "Gtk" && interface.name == "Widget")
}

fn transfer_annotation(transfer: Transfer) -> &'static str {
    match transfer {
        Transfer::Nothing => "",
        Transfer::Container => "(transfer container) ",
        Transfer::Everything => "(transfer full) ",
    }
}

impl<'a> Emitter<'a> {
    /// Doc comment listing the annotations of every parameter and the return value.
    pub fn function_comment(&mut self, callable: &Callable) -> String {
        let mut lines = Vec::new();
        if callable.is_method {
            lines.push(format!(
                "/// @self: {}Self",
                transfer_annotation(callable.instance_transfer)
            ));
        }
        for arg in callable.args.iter() {
            let mut line = format!("/// @{}: ", &arg.name);
            match arg.direction {
                Direction::In => {}
                Direction::Out => line.push_str("(out) "),
                Direction::Inout => line.push_str("(inout) "),
            }
            line.push_str(transfer_annotation(arg.transfer));
            if arg.direction == Direction::Out && arg.optional {
                line.push_str("(optional) ");
            }
            if arg.nullable {
                line.push_str("(nullable) ");
            }
            if arg.direction == Direction::Out {
                line.push_str(if arg.caller_allocates {
                    "(caller-allocates) "
                } else {
                    "(callee-allocates) "
                });
            }
            if let Some(scope) = arg.scope {
                let scope: &'static str = scope.into();
                line.push_str(&format!("(scope {}) ", scope));
            }
            line.push_str(&self.type_expr(&arg.ty, TypeOptions::nullable(arg.nullable)));
            lines.push(line);
        }
        if callable.throws {
            lines.push("/// @error: core.Error".into());
        }
        let nullable = callable.may_return_null || callable.return_type.is_list_like();
        lines.push(format!(
            "/// Return: {}{}{}",
            transfer_annotation(callable.caller_owns),
            if nullable { "(nullable) " } else { "" },
            self.type_expr(&callable.return_type, TypeOptions::nullable(nullable))
        ));
        lines.into_iter().map(|line| line + "\n").collect()
    }

    /// Declaration of the C symbol behind a wrapper.
    pub fn extern_declaration(&mut self, callable: &Callable, container: Container) -> String {
        let mut params = Vec::new();
        if callable.is_method {
            params.push(format!(
                "{}{}",
                if container.by_pointer { "*" } else { "" },
                container.name
            ));
        }
        for arg in callable.args.iter() {
            let options = TypeOptions::c()
                .with_nullable(arg.optional || arg.nullable)
                .with_out(arg.direction != Direction::In);
            params.push(self.type_expr(&arg.ty, options));
        }
        if callable.throws {
            params.push("*?*core.Error".into());
        }
        let return_type = self.constructed_type(callable, container).unwrap_or_else(|| {
            let nullable = callable.may_return_null || callable.return_type.is_list_like();
            self.type_expr(
                &callable.return_type,
                TypeOptions::c().with_nullable(nullable),
            )
        });
        format!(
            "extern fn {}({}) {};\n",
            &callable.symbol,
            params.iter().join(", "),
            return_type
        )
    }

    /// Widget constructors return the container instead of the `Gtk.Widget` they declare.
    fn constructed_type(&self, callable: &Callable, container: Container) -> Option<String> {
        if !container.name.is_empty()
            && callable.name.starts_with("new")
            && is_gtk_widget(&callable.return_type)
        {
            Some(container.name.to_string())
        } else {
            None
        }
    }

    /// Wrapper of a function, method or virtual function.
    ///
    /// Virtual functions are dispatched through the structure in [Container::vtable] and take the
    /// runtime type of the implementation.
    pub fn function_wrapper(&mut self, callable: &Callable, container: Container) -> String {
        if callable.symbol.is_empty() && container.vtable.is_none() {
            self.report(format!("Function {} has no symbol", &callable.name));
            return Default::default();
        }

        let args = &callable.args;
        let classes = classify(args);
        let mut result = String::new();
        if callable.deprecated {
            result.push_str("/// (deprecated)\n");
        }
        result.push_str(&self.function_comment(callable));

        // Prototype
        let name = match container.vtable {
            Some(_) => format!("{}V", util::snake_to_camel(&callable.name)),
            None => function_ident(&callable.name),
        };
        let mut params = Vec::new();
        if callable.is_method {
            params.push(format!(
                "self: {}{}",
                if container.by_pointer { "*" } else { "" },
                container.name
            ));
        }
        if container.vtable.is_some() {
            params.push("g_type: core.GType".into());
        }
        for (arg, class) in args.iter().zip(classes.iter()) {
            if !class.is_input() || class.length_of.is_some() {
                continue;
            }
            let options = TypeOptions::nullable(class.nullable || class.optional)
                .with_slice(class.is_slice());
            params.push(format!("arg_{}: {}", &arg.name, self.type_expr(&arg.ty, options)));
        }

        // Result type
        let return_type = &callable.return_type;
        let skip_return = callable.skip_return
            || (!return_type.pointer && return_type.tag == TypeTag::Void)
            || (callable.throws && return_type.tag == TypeTag::Boolean);
        let output_count = classes
            .iter()
            .filter(|class| class.length_of.is_none() && class.is_output())
            .count();
        // A boolean next to other outputs only reports success.
        let boolean_error =
            !skip_return && return_type.tag == TypeTag::Boolean && output_count > 0;
        let returns_value = !skip_return && !boolean_error;
        let mut fields = Vec::new();
        if returns_value {
            let ty = self.constructed_type(callable, container).unwrap_or_else(|| {
                let nullable = callable.may_return_null || return_type.is_list_like();
                self.type_expr(return_type, TypeOptions::nullable(nullable))
            });
            fields.push(("ret".to_string(), ty));
        }
        for (arg, class) in args.iter().zip(classes.iter()) {
            if class.length_of.is_some() || !class.is_output() {
                continue;
            }
            let options = TypeOptions::nullable(class.nullable || class.optional)
                .with_slice(class.is_slice());
            fields.push((ident(&arg.name), self.type_expr(&arg.ty, options)));
        }
        let value_type = match fields.len() {
            0 => "void".to_string(),
            1 => fields[0].1.clone(),
            _ => format!(
                "struct {{\n{}}}",
                fields
                    .iter()
                    .map(|(name, ty)| format!("    {}: {},\n", name, ty))
                    .join("")
            ),
        };
        let wrapper_type = if callable.throws {
            format!("core.Result({}, *core.Error)", value_type)
        } else if boolean_error {
            format!("core.Result({}, void)", value_type)
        } else {
            value_type
        };
        result.push_str(&format!(
            "pub fn {}({}) {} {{\n",
            name,
            params.iter().join(", "),
            wrapper_type
        ));

        // Locals
        for (arg, class) in args.iter().zip(classes.iter()) {
            let local = ident(&arg.name);
            if let Some(slice) = class.length_of {
                let ty = self.type_expr(&arg.ty, Default::default());
                let slice_arg = &args[slice].name;
                if classes[slice].is_input() {
                    let length = if classes[slice].nullable || classes[slice].optional {
                        format!("if (arg_{}) |some| some.len else 0", slice_arg)
                    } else {
                        format!("arg_{}.len", slice_arg)
                    };
                    result.push_str(&format!(
                        "    var {}: {} = @intCast({}, {});\n",
                        local, ty, ty, length
                    ));
                } else {
                    result.push_str(&format!("    var {}: {} = 0;\n", local, ty));
                }
            } else if class.is_slice() {
                if class.is_input() {
                    if class.nullable || class.optional {
                        result.push_str(&format!(
                            "    var {} = if (arg_{}) |some| some.ptr else undefined;\n",
                            local, &arg.name
                        ));
                    } else {
                        result.push_str(&format!("    var {} = arg_{}.ptr;\n", local, &arg.name));
                    }
                } else {
                    let ty = self.type_expr(&arg.ty, Default::default());
                    result.push_str(&format!("    var {}: {} = undefined;\n", local, ty));
                }
            } else if class.is_input() {
                if class.direction == Direction::In {
                    continue;
                }
                let fallback = if class.optional && !class.instance {
                    " orelse undefined"
                } else {
                    ""
                };
                result.push_str(&format!(
                    "    var {0}_mut = arg_{0}{1};\n",
                    &arg.name, fallback
                ));
            } else {
                let ty = self.type_expr(&arg.ty, Default::default());
                result.push_str(&format!("    var {}_mut: {} = undefined;\n", &arg.name, ty));
            }
        }
        if callable.throws {
            result.push_str("    var err: ?*core.Error = null;\n");
        }
        for (arg, class) in args.iter().zip(classes.iter()) {
            if let Some(sibling) = class.same_length_as {
                if class.is_plain_input() && classes[sibling].is_plain_input() {
                    result.push_str(&format!(
                        "    assert(arg_{}.len == arg_{}.len);\n",
                        &arg.name, &args[sibling].name
                    ));
                }
            }
        }

        // Call
        if let Some(vtable) = container.vtable {
            result.push_str(&format!(
                "    const class = core.alignedPtrCast(*{}.{}, core.typeClassPeek(g_type));\n",
                &vtable.namespace, &vtable.name
            ));
            result.push_str(&format!(
                "    const {0}_fn = class.{0}.?;\n",
                &callable.name
            ));
        }
        result.push_str(if skip_return { "    _ = " } else { "    var ret = " });
        match container.vtable {
            Some(_) => result.push_str(&format!("{}_fn(", &callable.name)),
            None => {
                let declaration = self.extern_declaration(callable, container);
                result.push_str(&format!(
                    "struct {{\n        pub {}    }}.{}(",
                    declaration, &callable.symbol
                ));
            }
        }
        let mut call_args = Vec::new();
        if callable.is_method {
            call_args.push("self".to_string());
        }
        for (arg, class) in args.iter().zip(classes.iter()) {
            call_args.push(call_argument(arg, class));
        }
        if callable.throws {
            call_args.push("&err".into());
        }
        result.push_str(&call_args.iter().join(", "));
        result.push_str(");\n");

        // Result
        if callable.throws {
            result.push_str("    if (err) |some| return .{ .Err = some };\n");
            result.push_str("    return .{ .Ok = ");
        } else if boolean_error {
            result.push_str("    if (!ret.toBool()) return .{ .Err = {} };\n");
            result.push_str("    return .{ .Ok = ");
        } else {
            result.push_str("    return ");
        }
        let mut values = Vec::new();
        if returns_value {
            let value = if callable.may_return_null && !return_type.is_instance() {
                "if (ret) |some| some else null"
            } else {
                "ret"
            };
            values.push(("ret".to_string(), value.to_string()));
        }
        for (arg, class) in args.iter().zip(classes.iter()) {
            if class.length_of.is_some() || !class.is_output() {
                continue;
            }
            let wrapped = class.optional && class.caller_allocates && !class.instance;
            let mut value = String::new();
            if wrapped {
                value.push_str(&format!("if (arg_{}) |_| ", &arg.name));
            }
            match class.slice_length {
                Some(length) => value.push_str(&format!(
                    "{}[0 .. @intCast(usize, {})]",
                    ident(&arg.name),
                    ident(&args[length].name)
                )),
                None => value.push_str(&format!("{}_mut", &arg.name)),
            }
            if wrapped {
                value.push_str(" else null");
            }
            values.push((ident(&arg.name), value));
        }
        match values.len() {
            0 => result.push_str("{}"),
            1 => result.push_str(&values[0].1),
            _ => result.push_str(&format!(
                ".{{ {} }}",
                values
                    .iter()
                    .map(|(name, value)| format!(".{} = {}", name, value))
                    .join(", ")
            )),
        }
        if callable.throws || boolean_error {
            result.push_str(" }");
        }
        result.push_str(";\n}\n");
        result
    }
}

/// Expression passing one parameter to the C function.
fn call_argument(arg: &Arg, class: &ParamClass) -> String {
    let caller_slot = class.optional
        && class.caller_allocates
        && class.length_of.is_none()
        && !class.instance;
    let nullable_input = class.direction == Direction::In
        && class.nullable
        && !class.is_slice()
        && class.length_of.is_none()
        && !class.instance;

    let mut result = String::new();
    if caller_slot {
        result.push_str(&format!("if (arg_{}) |_| ", &arg.name));
    }
    if nullable_input {
        result.push_str(&format!("if (arg_{}) |some| ", &arg.name));
    }
    if (class.is_output() && !class.caller_allocates) || arg.ty.is_fixed_size_array() {
        result.push('&');
    }
    if class.length_of.is_some() || class.is_slice() {
        result.push_str(&ident(&arg.name));
    } else if class.direction == Direction::In {
        if nullable_input {
            result.push_str("some");
        } else {
            result.push_str(&format!("arg_{}", &arg.name));
        }
    } else {
        result.push_str(&format!("{}_mut", &arg.name));
    }
    if caller_slot || nullable_input {
        result.push_str(" else null");
    }
    result
}
