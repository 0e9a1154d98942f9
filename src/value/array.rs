//! Fixed-length local arrays (spec §5 "array" value kind; IR
//! `Node::LocalArray`/`Node::ArrayAccess`).

use std::marker::PhantomData;

use crate::builder;
use crate::error::AuthoringError;
use crate::ir::Node;
use crate::layout::ShaderType;

use super::{Expr, ShaderTypeTag};

/// A marker type pairing an element [`ShaderTypeTag`] with a compile-time
/// length, itself usable as a `ShaderTypeTag` wherever an array needs to
/// nest inside a struct field or buffer element type.
#[derive(Debug, Clone)]
pub struct ArrayOf<T: ShaderTypeTag, const N: usize>(PhantomData<T>);

impl<T: ShaderTypeTag, const N: usize> ShaderTypeTag for ArrayOf<T, N> {
    fn shader_type_name() -> &'static str {
        // GLSL spells array types as `elem name[len]`, which has no single
        // token form; callers needing the element type or length use
        // `ArrayOf::<T, N>::element_type_name()`/`LEN` instead of this.
        T::shader_type_name()
    }

    fn device_type() -> ShaderType {
        ShaderType::Array(Box::new(T::device_type()), N)
    }
}

impl<T: ShaderTypeTag, const N: usize> ArrayOf<T, N> {
    pub const LEN: usize = N;

    pub fn element_type_name() -> &'static str {
        T::shader_type_name()
    }
}

/// A declared fixed-length local array. Unlike [`super::Var`], indexing
/// does not return a `Var` — element access is always through
/// `Node::ArrayAccess`, matching the IR's array-access shape directly.
#[derive(Debug, Clone)]
pub struct VarArray<T: ShaderTypeTag, const N: usize> {
    name: String,
    _marker: PhantomData<T>,
}

impl<T: ShaderTypeTag, const N: usize> VarArray<T, N> {
    pub fn new() -> Result<VarArray<T, N>, AuthoringError> {
        let name = builder::with_context("VarArray::new", |ctx| ctx.assign_var_name())?;
        builder::build(&Node::LocalArray {
            name: name.clone(),
            elem_ty: T::shader_type_name().to_string(),
            len: N,
        })?;
        Ok(VarArray { name, _marker: PhantomData })
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn at(&self, index: Expr<super::scalar::I32>) -> Expr<T> {
        Expr::from_node(Node::ArrayAccess {
            target: Box::new(Node::load(self.name.clone())),
            index: Box::new(index.into_node()),
        })
    }

    pub fn set(&self, index: Expr<super::scalar::I32>, value: Expr<T>) -> Result<(), AuthoringError> {
        builder::build(&Node::Store {
            target: Box::new(Node::ArrayAccess {
                target: Box::new(Node::load(self.name.clone())),
                index: Box::new(index.into_node()),
            }),
            value: Box::new(value.into_node()),
        })
    }
}
