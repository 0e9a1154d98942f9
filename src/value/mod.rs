//! Typed value surface: [`Var<T>`] (named, addressable) and [`Expr<T>`]
//! (anonymous, immutable) wrap IR nodes without emitting anything until
//! declared, stored, or used as a statement (spec §5, original_source
//! `include/IR/Value/Value.h`).

pub mod array;
pub mod buffer;
pub mod matrix;
pub mod scalar;
pub mod structs;
pub mod texture;
pub mod uniform;
pub mod vector;

use std::marker::PhantomData;

use crate::builder;
use crate::error::AuthoringError;
use crate::ir::{IncrDirection, Node, Opcode};
use crate::layout::ShaderType;

/// A type usable as a shader value: its GLSL spelling and its std430
/// device-layout descriptor.
pub trait ShaderTypeTag: Clone {
    fn shader_type_name() -> &'static str;
    fn device_type() -> ShaderType;
}

/// An anonymous, immutable shader value: the result of an operator, a
/// load, a call, or a literal. Constructing one never emits anything; it
/// is realized only when stored into a [`Var`], passed as a call argument,
/// or used directly as a statement's operand.
#[derive(Debug, Clone)]
pub struct Expr<T: ShaderTypeTag> {
    node: Node,
    _marker: PhantomData<T>,
}

impl<T: ShaderTypeTag> Expr<T> {
    pub fn from_node(node: Node) -> Expr<T> {
        Expr { node, _marker: PhantomData }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}

/// A named, addressable shader variable. Declaring one emits a
/// `Node::LocalVariable` statement through the active `Builder` binding;
/// reading or writing it builds `Load`/`Store` nodes.
#[derive(Debug, Clone)]
pub struct Var<T: ShaderTypeTag> {
    name: String,
    _marker: PhantomData<T>,
}

impl<T: ShaderTypeTag> Var<T> {
    /// Declares a fresh local variable, optionally initialized from `init`.
    pub fn new(init: Option<Expr<T>>) -> Result<Var<T>, AuthoringError> {
        let name = builder::with_context("Var::new", |ctx| ctx.assign_var_name())?;
        builder::build(&Node::LocalVariable {
            name: name.clone(),
            ty: T::shader_type_name().to_string(),
        })?;
        let var = Var { name, _marker: PhantomData };
        if let Some(init) = init {
            var.set(init)?;
        }
        Ok(var)
    }

    /// Wraps an already-declared shader-side name (a uniform, a struct
    /// field, a for-loop induction variable) without emitting a
    /// declaration of its own.
    pub fn from_existing_name(name: impl Into<String>) -> Var<T> {
        Var { name: name.into(), _marker: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Expr<T> {
        Expr::from_node(Node::load(self.name.clone()))
    }

    pub fn set(&self, value: Expr<T>) -> Result<(), AuthoringError> {
        builder::build(&Node::Store {
            target: Box::new(Node::load(self.name.clone())),
            value: Box::new(value.into_node()),
        })
    }

    pub fn compound_assign(&self, op: Opcode, value: Expr<T>) -> Result<(), AuthoringError> {
        builder::build(&Node::CompoundAssignment {
            op,
            lvalue: Box::new(Node::load(self.name.clone())),
            value: Box::new(value.into_node()),
        })
    }

    /// Emits `++self` / `self++` and returns the read value the spec's
    /// increment/decrement semantics assign it (pre vs post).
    pub fn increment(&self, prefix: bool) -> Result<Expr<T>, AuthoringError> {
        builder::build(&Node::Increment {
            direction: IncrDirection::Increment,
            target: Box::new(Node::load(self.name.clone())),
            prefix,
        })?;
        Ok(self.get())
    }

    pub fn decrement(&self, prefix: bool) -> Result<Expr<T>, AuthoringError> {
        builder::build(&Node::Increment {
            direction: IncrDirection::Decrement,
            target: Box::new(Node::load(self.name.clone())),
            prefix,
        })?;
        Ok(self.get())
    }
}
