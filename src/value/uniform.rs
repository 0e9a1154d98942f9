//! Uniform values: host-resident scalars/vectors/structs whose current
//! value is pushed to the compiled program at every dispatch (spec §6
//! "uniform" value kind, §4.3 "uniform descriptors with shader type/name/
//! host ptr/uploader").

use std::cell::RefCell;
use std::rc::Rc;

use crate::builder;
use crate::context::UniformSink;
use crate::error::AuthoringError;
use crate::ir::Node;
use crate::layout::std430_layout;

use super::matrix::{Mat2, Mat3, Mat4};
use super::scalar::{F32, I32, U32};
use super::structs::{shader_field_type, register_struct, ShaderStruct};
use super::vector::{IVec2, IVec3, IVec4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};
use super::{Expr, ShaderTypeTag, Var};

/// Pairs a scalar/vector/matrix shader type tag with the concrete,
/// `bytemuck::Pod` host type [`Uniform<T>`] stores and uploads for it. The
/// tag types themselves are zero-sized (they exist only to carry GLSL type
/// identity through `Var<T>`/`Expr<T>`), so a uniform needs this separate
/// host-side representation to actually hold a value.
pub trait UniformType: ShaderTypeTag {
    type Host: bytemuck::Pod + Copy;
}

macro_rules! uniform_host {
    ($tag:ty, $host:ty) => {
        impl UniformType for $tag {
            type Host = $host;
        }
    };
}

uniform_host!(F32, f32);
uniform_host!(I32, i32);
uniform_host!(U32, u32);
uniform_host!(Vec2, glam::Vec2);
uniform_host!(Vec3, glam::Vec3);
uniform_host!(Vec4, glam::Vec4);
uniform_host!(IVec2, glam::IVec2);
uniform_host!(IVec3, glam::IVec3);
uniform_host!(IVec4, glam::IVec4);
uniform_host!(UVec2, glam::UVec2);
uniform_host!(UVec3, glam::UVec3);
uniform_host!(UVec4, glam::UVec4);
uniform_host!(Mat2, glam::Mat2);
uniform_host!(Mat3, glam::Mat3);
uniform_host!(Mat4, glam::Mat4);

/// A uniform value backed by host storage. `load()` registers the uniform
/// with the active context (assigning it the shader name `uN`) the first
/// time it's used and returns a `Var` bound to that name.
pub struct Uniform<T: UniformType> {
    host: Rc<RefCell<T::Host>>,
}

impl<T: UniformType> Uniform<T> {
    pub fn new(initial: T::Host) -> Uniform<T> {
        Uniform { host: Rc::new(RefCell::new(initial)) }
    }

    pub fn set(&self, value: T::Host) {
        *self.host.borrow_mut() = value;
    }

    pub fn get(&self) -> T::Host {
        *self.host.borrow()
    }

    /// Registers this uniform with the active context (if not already
    /// registered under this `Uniform`'s handle) and returns a `Var`
    /// reading its shader-assigned name.
    pub fn load(&self) -> Result<Var<T>, AuthoringError> {
        let host = Rc::clone(&self.host);
        let shader_name = builder::with_context("Uniform::load", |ctx| {
            ctx.register_uniform(
                T::shader_type_name().to_string(),
                Rc::new(move |sink: &mut dyn UniformSink, name: &str| {
                    let value = *host.borrow();
                    sink.upload(name, bytemuck::bytes_of(&value));
                }),
            )
        })?;
        Ok(Var::from_existing_name(shader_name))
    }
}

impl<T: UniformType> Clone for Uniform<T> {
    fn clone(&self) -> Uniform<T> {
        Uniform { host: Rc::clone(&self.host) }
    }
}

/// A reflected-struct uniform. The host struct isn't `bytemuck::Pod` (its
/// std430 field offsets don't generally match its Rust layout), so it can't
/// upload as a single blob the way [`Uniform<T>`] does — instead each field
/// is registered as its own uniform, and `load()` composes them into a
/// struct-typed local variable (spec §4.4 "upload per field by composed
/// name").
pub struct StructUniform<T: ShaderStruct> {
    host: Rc<RefCell<T>>,
}

impl<T: ShaderStruct + Clone + 'static> StructUniform<T> {
    pub fn new(initial: T) -> StructUniform<T> {
        StructUniform { host: Rc::new(RefCell::new(initial)) }
    }

    pub fn set(&self, value: T) {
        *self.host.borrow_mut() = value;
    }

    pub fn get(&self) -> T {
        self.host.borrow().clone()
    }

    /// Registers one uniform per field, then declares and initializes a
    /// local struct variable from them, returning a `Var` bound to it.
    pub fn load(&self) -> Result<Var<T>, AuthoringError> {
        register_struct::<T>()?;

        let fields = T::fields();
        let offsets = T::field_offsets();
        let mut field_names = Vec::with_capacity(fields.len());

        for (field, (_, offset)) in fields.iter().zip(offsets.iter()) {
            let host = Rc::clone(&self.host);
            let offset = *offset;
            let size = std430_layout(&field.ty).size;
            let shader_type = shader_field_type(field);
            let shader_name = builder::with_context("StructUniform::load", |ctx| {
                ctx.register_uniform(
                    shader_type,
                    Rc::new(move |sink: &mut dyn UniformSink, name: &str| {
                        let mut bytes = vec![0u8; T::device_size()];
                        host.borrow().write_host_bytes(&mut bytes);
                        sink.upload(name, &bytes[offset..offset + size]);
                    }),
                )
            })?;
            field_names.push(shader_name);
        }

        let name = builder::with_context("StructUniform::load", |ctx| ctx.assign_var_name())?;
        builder::build(&Node::LocalVariable { name: name.clone(), ty: T::struct_name().to_string() })?;
        builder::build(&Node::Store {
            target: Box::new(Node::load(name.clone())),
            value: Box::new(Node::UserCall {
                name: T::struct_name().to_string(),
                args: field_names.into_iter().map(Node::load).collect(),
            }),
        })?;
        Ok(Var::from_existing_name(name))
    }
}

impl<T: ShaderStruct> Clone for StructUniform<T> {
    fn clone(&self) -> StructUniform<T> {
        StructUniform { host: Rc::clone(&self.host) }
    }
}

/// A uniform literal baked directly into the kernel's construction
/// closure, without host-side storage — for values that never change
/// between dispatches of this particular compiled kernel instance.
pub fn constant<T: ShaderTypeTag>(node: Node) -> Expr<T> {
    Expr::from_node(node)
}
