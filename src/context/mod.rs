//! The per-kernel mutable state: the `BuildContext` trait and the registry
//! types shared by [`kernel::KernelBuildContext`], [`fragment::FragmentBuildContext`]
//! and [`collector::CollectorContext`].

pub mod collector;
pub mod fragment;
pub mod kernel;

use std::rc::Rc;

/// Access mode a buffer was registered with, mirroring GLSL's
/// `readonly`/`writeonly`/read-write storage qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn glsl_qualifier(self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "readonly",
            AccessMode::WriteOnly => "writeonly",
            AccessMode::ReadWrite => "",
        }
    }
}

/// A registered buffer's declaration-time metadata.
#[derive(Debug, Clone)]
pub struct BufferDecl {
    pub binding: u32,
    pub elem_type: String,
    pub name: String,
    pub mode: AccessMode,
}

/// A registered texture's declaration-time metadata.
#[derive(Debug, Clone)]
pub struct TextureDecl {
    pub binding: u32,
    pub format_qualifier: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Destination for a uniform upload at dispatch time. The concrete GPU
/// program implements this; the context never depends on the driver crate
/// directly (spec §1: the driver is an opaque collaborator).
pub trait UniformSink {
    fn upload(&mut self, shader_name: &str, bytes: &[u8]);
}

/// A closure that knows how to push one registered uniform's current host
/// value into a compiled program. Reflected-struct uniforms compose one
/// call per field, using the field's shader-qualified name.
pub type Uploader = Rc<dyn Fn(&mut dyn UniformSink, &str)>;

/// A registered uniform's declaration-time metadata.
#[derive(Clone)]
pub struct UniformDecl {
    pub shader_name: String,
    pub shader_type: String,
    pub uploader: Uploader,
}

impl std::fmt::Debug for UniformDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformDecl")
            .field("shader_name", &self.shader_name)
            .field("shader_type", &self.shader_type)
            .finish()
    }
}

/// Declared/defined bookkeeping for one [`crate::callable::Callable`] within
/// one context, keyed by the callable's monotonic id (spec §9: Rust
/// closures have no stable address, so identity is an assigned id rather
/// than a pointer).
#[derive(Debug, Default, Clone, Copy)]
pub struct CallableGenState {
    pub declared: bool,
    pub defined: bool,
}

/// Per-kernel mutable state: the emitted statement stream, the fresh-name
/// generator, and the struct/uniform/buffer/texture/callable registries.
///
/// Implemented by [`kernel::KernelBuildContext`] (the real owner of this
/// state), [`fragment::FragmentBuildContext`] (delegates to an inner
/// `KernelBuildContext`), and [`collector::CollectorContext`] (buffers
/// statement lines privately, delegates every registration to a parent).
pub trait BuildContext {
    fn push_translated_code(&mut self, line: String);
    fn assign_var_name(&mut self) -> String;

    fn has_struct(&self, name: &str) -> bool;
    fn add_struct(&mut self, name: String, shader_text: String);
    fn get_structs(&self) -> Vec<(String, String)>;

    fn allocate_binding(&mut self) -> u32;
    fn register_buffer(&mut self, binding: u32, elem_type: String, name: String, mode: AccessMode);
    fn get_buffer_decls(&self) -> Vec<BufferDecl>;
    fn bind_runtime_buffer(&mut self, binding: u32, handle: u64);
    fn get_runtime_buffers(&self) -> Vec<(u32, u64)>;

    fn allocate_texture_binding(&mut self) -> u32;
    fn register_texture(&mut self, binding: u32, format_qualifier: String, name: String, width: u32, height: u32);
    fn get_texture_decls(&self) -> Vec<TextureDecl>;
    fn bind_runtime_texture(&mut self, binding: u32, handle: u64);
    fn get_runtime_textures(&self) -> Vec<(u32, u64)>;

    fn register_uniform(&mut self, shader_type: String, uploader: Uploader) -> String;
    fn get_uniform_decls(&self) -> Vec<UniformDecl>;

    fn callable_state(&mut self, id: u64) -> CallableGenState;
    fn set_callable_state(&mut self, id: u64, state: CallableGenState);
    fn add_callable_declaration(&mut self, proto: String);
    fn add_callable_body_generator(&mut self, id: u64, generator: Rc<dyn Fn()>);
    fn push_callable_body(&mut self);
    fn pop_callable_body(&mut self) -> String;
    fn get_callable_declarations(&self) -> Vec<String>;
    fn take_callable_body_generators(&mut self) -> Vec<(u64, Rc<dyn Fn()>)>;
    fn push_callable_body_text(&mut self, text: String);
    fn get_callable_bodies(&self) -> Vec<String>;
}
