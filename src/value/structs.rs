//! Struct reflection: an ordered field list with host offset, device
//! offset, and shader name (spec §6), registered once per context in
//! insertion order (spec §8 "struct insertion order uniqueness").
//!
//! Rust has no stable reflection, so (per spec §9's redesign note) struct
//! shape comes from an explicit trait implemented through the
//! [`shader_struct!`] macro rather than from runtime introspection —
//! the build-step registry the spec allows as an alternative to a derive
//! macro.

use crate::builder;
use crate::error::AuthoringError;
use crate::layout::{struct_field_offsets, FieldDesc, ShaderType};

use super::ShaderTypeTag;

/// A reflected struct type: its GLSL name, its ordered field list, and a
/// way to serialize a host value into a std430-laid-out byte buffer for
/// upload (spec §6 "host/device byte sizes").
pub trait ShaderStruct: ShaderTypeTag {
    fn struct_name() -> &'static str;
    fn fields() -> Vec<FieldDesc>;
    fn write_host_bytes(&self, out: &mut [u8]);

    fn device_size() -> usize {
        crate::layout::std430_layout(&ShaderType::Struct(Self::fields())).size
    }

    fn field_offsets() -> Vec<(String, usize)> {
        struct_field_offsets(&Self::fields())
    }
}

/// Builds the GLSL struct declaration text and registers it with the
/// active context if it hasn't been declared there yet.
pub fn register_struct<T: ShaderStruct>() -> Result<(), AuthoringError> {
    let name = T::struct_name().to_string();
    let already = builder::with_context("register_struct", |ctx| ctx.has_struct(&name))?;
    if already {
        return Ok(());
    }
    let mut text = format!("struct {name} {{\n");
    for field in T::fields() {
        text.push_str(&format!("    {} {};\n", shader_field_type(&field), field.name));
    }
    text.push_str("};\n");
    builder::with_context("register_struct", |ctx| ctx.add_struct(name, text))
}

pub(crate) fn shader_field_type(field: &FieldDesc) -> String {
    match &field.ty {
        crate::layout::ShaderType::Scalar(k) => scalar_name(*k).to_string(),
        crate::layout::ShaderType::Vector(k, len) => format!("{}vec{len}", scalar_prefix(*k)),
        crate::layout::ShaderType::Matrix(_, rows, cols) if rows == cols => format!("mat{rows}"),
        crate::layout::ShaderType::Matrix(_, rows, cols) => format!("mat{cols}x{rows}"),
        crate::layout::ShaderType::Array(elem, len) => {
            format!("{}[{len}]", shader_field_type(&FieldDesc { name: String::new(), ty: (**elem).clone() }))
        }
        crate::layout::ShaderType::Struct(_) => field.name.clone(),
    }
}

fn scalar_name(kind: crate::layout::ScalarKind) -> &'static str {
    match kind {
        crate::layout::ScalarKind::Bool => "bool",
        crate::layout::ScalarKind::Int => "int",
        crate::layout::ScalarKind::UInt => "uint",
        crate::layout::ScalarKind::Float => "float",
    }
}

fn scalar_prefix(kind: crate::layout::ScalarKind) -> &'static str {
    match kind {
        crate::layout::ScalarKind::Bool => "b",
        crate::layout::ScalarKind::Int => "i",
        crate::layout::ScalarKind::UInt => "u",
        crate::layout::ScalarKind::Float => "",
    }
}

/// Declares a host struct plus its [`ShaderStruct`] implementation.
///
/// ```ignore
/// shader_struct! {
///     struct Particle {
///         pos: Vec3 => glam::Vec3,
///         vel: Vec3 => glam::Vec3,
///         life: F32 => f32,
///         ty: I32 => i32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! shader_struct {
    (struct $name:ident { $($field:ident : $shader_ty:ty => $host_ty:ty),+ $(,)? }) => {
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Zeroable)]
        pub struct $name {
            $(pub $field: $host_ty),+
        }

        impl $crate::value::ShaderTypeTag for $name {
            fn shader_type_name() -> &'static str {
                stringify!($name)
            }
            fn device_type() -> $crate::layout::ShaderType {
                $crate::layout::ShaderType::Struct(<$name as $crate::value::structs::ShaderStruct>::fields())
            }
        }

        impl $crate::value::structs::ShaderStruct for $name {
            fn struct_name() -> &'static str {
                stringify!($name)
            }

            fn fields() -> Vec<$crate::layout::FieldDesc> {
                vec![$(
                    $crate::layout::FieldDesc {
                        name: stringify!($field).to_string(),
                        ty: <$shader_ty as $crate::value::ShaderTypeTag>::device_type(),
                    }
                ),+]
            }

            fn write_host_bytes(&self, out: &mut [u8]) {
                let offsets = <$name as $crate::value::structs::ShaderStruct>::field_offsets();
                let mut offsets = offsets.into_iter();
                $(
                    let (_, offset) = offsets.next().expect("field_offsets matches declared field count");
                    let bytes = bytemuck::bytes_of(&self.$field);
                    out[offset..offset + bytes.len()].copy_from_slice(bytes);
                )+
            }
        }
    };
}

/// A struct-typed shader variable: field access reads/writes
/// `self.name().field` as a sub-variable, without a dedicated
/// `Node::MemberAccess` wrapper — the field's full dotted path is the
/// variable's name (mirrors `include/IR/Value/VarStruct.h`'s per-field
/// sub-variable handles).
impl<T: ShaderStruct> super::Var<T> {
    pub fn field<F: ShaderTypeTag>(&self, field_name: &str) -> super::Var<F> {
        super::Var::from_existing_name(format!("{}.{field_name}", self.name()))
    }
}
