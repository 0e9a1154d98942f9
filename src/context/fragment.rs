//! The fragment-kernel build context: wraps a [`KernelBuildContext`] for its
//! registries and statement stream, but assembles a vertex+fragment GLSL
//! pair instead of a compute shader (spec §4.6, original_source
//! `FragmentBuildContext : KernelBuildContext`).

use std::rc::Rc;

use super::kernel::{Dimension, KernelBuildContext};
use super::{AccessMode, BufferDecl, BuildContext, CallableGenState, TextureDecl, UniformDecl, Uploader};

/// The fixed full-screen-triangle vertex stage every fragment kernel shares.
/// Three vertices, no vertex buffer, clip-space position derived from
/// `gl_VertexIndex` (grounded on
/// `examples/POPOBE97-node-forge-render-server/src/renderer.rs`'s
/// `build_pass_wgsl_bundle` full-screen-triangle vertex entry, restated in
/// GLSL for this crate's GLSL-lowering target).
const FULLSCREEN_TRIANGLE_VERTEX_SHADER: &str = "\
#version 450
layout(location = 0) out vec2 v_uv;
void main() {
    vec2 pos = vec2((gl_VertexIndex << 1) & 2, gl_VertexIndex & 2);
    v_uv = pos;
    gl_Position = vec4(pos * 2.0 - 1.0, 0.0, 1.0);
}
";

pub struct FragmentBuildContext {
    inner: KernelBuildContext,
    width: u32,
    height: u32,
    valid: bool,
}

impl FragmentBuildContext {
    pub fn new(width: u32, height: u32) -> FragmentBuildContext {
        FragmentBuildContext {
            inner: KernelBuildContext::new(Dimension::default_2d()),
            width,
            height,
            valid: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Changes the target resolution, invalidating any previously compiled
    /// program for this context (spec §C: `FragmentBuildContext::set_resolution`
    /// cache invalidation, ported from `FragmentBuildContext::SetResolution`/
    /// `InvalidateShader`).
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.valid = false;
        }
    }

    pub fn is_shader_valid(&self) -> bool {
        self.valid
    }

    pub fn mark_shader_valid(&mut self) {
        self.valid = true;
    }

    pub fn vertex_source(&self) -> &'static str {
        FULLSCREEN_TRIANGLE_VERTEX_SHADER
    }

    /// Assembles the fragment-stage source: version directive, struct defs,
    /// uniforms, callable forward declarations, generated bodies, texture
    /// declarations as `sampler2D`/`image2D` depending on access mode, then
    /// the entry function writing `out_color` from the captured statement
    /// stream (spec §4.6's override of "Composition into final source").
    pub fn assemble_fragment(&mut self, callable_bodies: &str) -> String {
        let mut out = String::new();
        out.push_str("#version 450\n\n");
        out.push_str("layout(location = 0) in vec2 v_uv;\n");
        out.push_str("layout(location = 0) out vec4 out_color;\n\n");

        for (_, text) in self.inner.get_structs() {
            out.push_str(&text);
            out.push('\n');
        }
        for (binding, uniform) in self.inner.get_uniform_decls().into_iter().enumerate() {
            out.push_str(&format!(
                "layout(std140, set = 2, binding = {binding}) uniform UniformBlock{binding} {{ {} {}; }};\n",
                uniform.shader_type, uniform.shader_name
            ));
        }
        for decl in self.inner.get_callable_declarations() {
            out.push_str(&decl);
            out.push_str(";\n");
        }
        if !callable_bodies.is_empty() {
            out.push_str(callable_bodies);
            out.push('\n');
        }
        for tex in self.inner.get_texture_decls() {
            out.push_str(&format!(
                "layout(set = 1, binding = {}) uniform sampler2D {};\n",
                tex.binding, tex.name
            ));
        }
        for buf in self.inner.get_buffer_decls() {
            let qualifier = buf.mode.glsl_qualifier();
            let qualifier = if qualifier.is_empty() { String::new() } else { format!("{qualifier} ") };
            out.push_str(&format!(
                "layout(std430, binding = {}) {}buffer Buf{} {{ {} {}[]; }};\n",
                buf.binding, qualifier, buf.binding, buf.elem_type, buf.name
            ));
        }

        out.push_str("\nvoid main() {\n");
        out.push_str("    vec2 uv = v_uv;\n");
        for line in self.inner.statement_lines() {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push_str("}\n");
        out
    }
}

impl BuildContext for FragmentBuildContext {
    fn push_translated_code(&mut self, line: String) {
        self.inner.push_translated_code(line);
    }

    fn assign_var_name(&mut self) -> String {
        self.inner.assign_var_name()
    }

    fn has_struct(&self, name: &str) -> bool {
        self.inner.has_struct(name)
    }

    fn add_struct(&mut self, name: String, shader_text: String) {
        self.inner.add_struct(name, shader_text);
    }

    fn get_structs(&self) -> Vec<(String, String)> {
        self.inner.get_structs()
    }

    fn allocate_binding(&mut self) -> u32 {
        self.inner.allocate_binding()
    }

    fn register_buffer(&mut self, binding: u32, elem_type: String, name: String, mode: AccessMode) {
        self.inner.register_buffer(binding, elem_type, name, mode);
    }

    fn get_buffer_decls(&self) -> Vec<BufferDecl> {
        self.inner.get_buffer_decls()
    }

    fn bind_runtime_buffer(&mut self, binding: u32, handle: u64) {
        self.inner.bind_runtime_buffer(binding, handle);
    }

    fn get_runtime_buffers(&self) -> Vec<(u32, u64)> {
        self.inner.get_runtime_buffers()
    }

    fn allocate_texture_binding(&mut self) -> u32 {
        self.inner.allocate_texture_binding()
    }

    fn register_texture(&mut self, binding: u32, format_qualifier: String, name: String, width: u32, height: u32) {
        self.inner.register_texture(binding, format_qualifier, name, width, height);
    }

    fn get_texture_decls(&self) -> Vec<TextureDecl> {
        self.inner.get_texture_decls()
    }

    fn bind_runtime_texture(&mut self, binding: u32, handle: u64) {
        self.inner.bind_runtime_texture(binding, handle);
    }

    fn get_runtime_textures(&self) -> Vec<(u32, u64)> {
        self.inner.get_runtime_textures()
    }

    fn register_uniform(&mut self, shader_type: String, uploader: Uploader) -> String {
        self.inner.register_uniform(shader_type, uploader)
    }

    fn get_uniform_decls(&self) -> Vec<UniformDecl> {
        self.inner.get_uniform_decls()
    }

    fn callable_state(&mut self, id: u64) -> CallableGenState {
        self.inner.callable_state(id)
    }

    fn set_callable_state(&mut self, id: u64, state: CallableGenState) {
        self.inner.set_callable_state(id, state);
    }

    fn add_callable_declaration(&mut self, proto: String) {
        self.inner.add_callable_declaration(proto);
    }

    fn add_callable_body_generator(&mut self, id: u64, generator: Rc<dyn Fn()>) {
        self.inner.add_callable_body_generator(id, generator);
    }

    fn push_callable_body(&mut self) {
        self.inner.push_callable_body();
    }

    fn pop_callable_body(&mut self) -> String {
        self.inner.pop_callable_body()
    }

    fn get_callable_declarations(&self) -> Vec<String> {
        self.inner.get_callable_declarations()
    }

    fn take_callable_body_generators(&mut self) -> Vec<(u64, Rc<dyn Fn()>)> {
        self.inner.take_callable_body_generators()
    }

    fn push_callable_body_text(&mut self, text: String) {
        self.inner.push_callable_body_text(text);
    }

    fn get_callable_bodies(&self) -> Vec<String> {
        self.inner.get_callable_bodies()
    }
}
