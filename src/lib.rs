//! A host-embedded eDSL for authoring GPU compute and fragment kernels in
//! plain Rust: build a typed expression tree with ordinary function calls,
//! operators and closures, and get back lowered GLSL compiled to SPIR-V and
//! dispatched through `wgpu` — no hand-written shader source.
//!
//! ```ignore
//! use gpu_dsl::prelude::*;
//!
//! let kernel = Kernel1D::new("increment", || {
//!     let input = BufferRef::<I32>::register(AccessMode::ReadOnly)?;
//!     let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
//!     for_("i", Expr::literal(0), Expr::literal(25600), Expr::literal(1), |i| {
//!         output.write(i.get(), input.read(i.get()) + Expr::literal(1))
//!     })
//! })?;
//! # Ok::<(), gpu_dsl::error::GpuDslError>(())
//! ```

pub mod builder;
pub mod callable;
pub mod context;
pub mod driver;
pub mod error;
pub mod flow;
pub mod ir;
pub mod kernel;
pub mod layout;
pub mod value;

/// Re-exports of the surface most authoring code needs, without pulling in
/// the registry/lowering internals.
pub mod prelude {
    pub use crate::callable::Callable1;
    pub use crate::context::AccessMode;
    pub use crate::error::{GpuDslError, Result};
    pub use crate::flow::{break_, continue_, do_while, for_, if_, return_value, return_void, while_, IfChain};
    pub use crate::kernel::profiler::KernelProfiler;
    pub use crate::kernel::{FragmentKernel2D, Kernel1D, Kernel2D, Kernel3D, ReadbackToken};
    pub use crate::shader_struct;
    pub use crate::value::array::{ArrayOf, VarArray};
    pub use crate::value::buffer::BufferRef;
    pub use crate::value::matrix::{Mat2, Mat3, Mat4};
    pub use crate::value::scalar::{Bool, BoolExpr, FloatExpr, IntExpr, UIntExpr, F32, I32, U32};
    pub use crate::value::structs::ShaderStruct;
    pub use crate::value::texture::{PixelFormat, TextureRef};
    pub use crate::value::uniform::{StructUniform, Uniform};
    pub use crate::value::vector::{Component, IVec2, IVec3, IVec4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};
    pub use crate::value::{Expr, ShaderTypeTag, Var};
}
