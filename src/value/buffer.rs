//! Storage buffer references: binding allocation, indexed element access
//! (spec §6 "buffer ref" value kind; external binding convention "buffers
//! start at 0 with a separate per-kernel counter").

use std::marker::PhantomData;

use crate::builder;
use crate::context::AccessMode;
use crate::error::AuthoringError;
use crate::ir::Node;

use super::scalar::I32;
use super::{Expr, ShaderTypeTag};

/// A registered storage buffer of `T` elements, readable and/or writable
/// from shader code via `[]` indexing.
#[derive(Debug, Clone)]
pub struct BufferRef<T: ShaderTypeTag> {
    binding: u32,
    name: String,
    mode: AccessMode,
    _marker: PhantomData<T>,
}

impl<T: ShaderTypeTag> BufferRef<T> {
    /// Registers a new buffer binding in the active context. Bindings are
    /// allocated in first-use order starting at 0 (spec §6 external
    /// interfaces).
    pub fn register(mode: AccessMode) -> Result<BufferRef<T>, AuthoringError> {
        builder::with_context("BufferRef::register", |ctx| {
            let binding = ctx.allocate_binding();
            let name = format!("buf{binding}");
            ctx.register_buffer(binding, T::shader_type_name().to_string(), name.clone(), mode);
            BufferRef { binding, name, mode, _marker: PhantomData }
        })
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn read(&self, index: Expr<I32>) -> Expr<T> {
        Expr::from_node(Node::ArrayAccess {
            target: Box::new(Node::load(self.name.clone())),
            index: Box::new(index.into_node()),
        })
    }

    pub fn write(&self, index: Expr<I32>, value: Expr<T>) -> Result<(), AuthoringError> {
        builder::build(&Node::Store {
            target: Box::new(Node::ArrayAccess {
                target: Box::new(Node::load(self.name.clone())),
                index: Box::new(index.into_node()),
            }),
            value: Box::new(value.into_node()),
        })
    }

    /// Binds a runtime buffer handle (an opaque driver-side resource id)
    /// to this binding slot for the next dispatch.
    pub fn bind_runtime(&self, handle: u64) -> Result<(), AuthoringError> {
        builder::with_context("BufferRef::bind_runtime", |ctx| ctx.bind_runtime_buffer(self.binding, handle))
    }
}
