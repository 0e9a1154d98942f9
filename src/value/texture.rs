//! Texture references: pixel formats, binding allocation, and
//! `read`/`write`/`sample` operations (spec §6 "texture ref" value kind;
//! original_source `include/Runtime/PixelFormat.h`).

use std::marker::PhantomData;

use crate::builder;
use crate::error::AuthoringError;
use crate::ir::Node;

use super::vector::{IVec2, Vec2, Vec4};
use super::{Expr, ShaderTypeTag};

/// Device pixel format for a texture resource, ported from
/// `PixelFormat.h`'s enum of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgba8,
    R16F,
    Rg16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgba32F,
    R32I,
    Rg32I,
    Rgba32I,
    R32UI,
    Rg32UI,
    Rgba32UI,
}

impl PixelFormat {
    /// The GLSL `image2D` format-qualifier spelling (`GetGLSLFormatQualifier`
    /// in the original).
    pub fn glsl_format_qualifier(self) -> &'static str {
        match self {
            PixelFormat::R8 => "r8",
            PixelFormat::Rg8 => "rg8",
            PixelFormat::Rgba8 => "rgba8",
            PixelFormat::R16F => "r16f",
            PixelFormat::Rg16F => "rg16f",
            PixelFormat::Rgba16F => "rgba16f",
            PixelFormat::R32F => "r32f",
            PixelFormat::Rg32F => "rg32f",
            PixelFormat::Rgba32F => "rgba32f",
            PixelFormat::R32I => "r32i",
            PixelFormat::Rg32I => "rg32i",
            PixelFormat::Rgba32I => "rgba32i",
            PixelFormat::R32UI => "r32ui",
            PixelFormat::Rg32UI => "rg32ui",
            PixelFormat::Rgba32UI => "rgba32ui",
        }
    }

    /// Bytes per texel on the host side, used to size readback buffers.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgba8 => 4,
            PixelFormat::R16F => 2,
            PixelFormat::Rg16F => 4,
            PixelFormat::Rgba16F => 8,
            PixelFormat::R32F | PixelFormat::R32I | PixelFormat::R32UI => 4,
            PixelFormat::Rg32F | PixelFormat::Rg32I | PixelFormat::Rg32UI => 8,
            PixelFormat::Rgba32F | PixelFormat::Rgba32I | PixelFormat::Rgba32UI => 16,
        }
    }
}

/// A registered texture of `T`-typed texels, readable/writable as a
/// compute image or samplable in a fragment kernel.
#[derive(Debug, Clone)]
pub struct TextureRef<T: ShaderTypeTag> {
    binding: u32,
    name: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    _marker: PhantomData<T>,
}

impl<T: ShaderTypeTag> TextureRef<T> {
    pub fn register(format: PixelFormat, width: u32, height: u32) -> Result<TextureRef<T>, AuthoringError> {
        builder::with_context("TextureRef::register", |ctx| {
            let binding = ctx.allocate_texture_binding();
            let name = format!("tex{binding}");
            ctx.register_texture(binding, format.glsl_format_qualifier().to_string(), name.clone(), width, height);
            TextureRef { binding, name, width, height, format, _marker: PhantomData }
        })
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `imageLoad(tex, coord)` (compute-shader texture access).
    pub fn read(&self, coord: Expr<IVec2>) -> Expr<T> {
        Expr::from_node(Node::IntrinsicCall {
            name: "imageLoad".to_string(),
            args: vec![Node::load(self.name.clone()), coord.into_node()],
        })
    }

    /// `imageStore(tex, coord, value)`.
    pub fn write(&self, coord: Expr<IVec2>, value: Expr<T>) -> Result<(), AuthoringError> {
        builder::build(&Node::IntrinsicCall {
            name: "imageStore".to_string(),
            args: vec![Node::load(self.name.clone()), coord.into_node(), value.into_node()],
        })
    }

    pub fn bind_runtime(&self, handle: u64) -> Result<(), AuthoringError> {
        builder::with_context("TextureRef::bind_runtime", |ctx| ctx.bind_runtime_texture(self.binding, handle))
    }
}

/// `sample`/`texture(sampler, uv)`, valid only against a fragment
/// context's `sampler2D` declarations (spec §6: sampling is fragment-only).
impl TextureRef<Vec4> {
    pub fn sample(&self, uv: Expr<Vec2>) -> Expr<Vec4> {
        Expr::from_node(Node::IntrinsicCall {
            name: "texture".to_string(),
            args: vec![Node::load(self.name.clone()), uv.into_node()],
        })
    }
}
