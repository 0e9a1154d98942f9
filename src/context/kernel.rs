//! The compute-kernel build context: per-kernel statement stream, registries,
//! and GLSL compute-shader assembly.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{
    AccessMode, BufferDecl, BuildContext, CallableGenState, TextureDecl, UniformDecl, Uploader,
};

/// The compute dispatch shape a `KernelBuildContext` was created for,
/// determining the default workgroup size (spec §4.7, original_source
/// `KernelBuildContext(int Dimension)`: 256/1/1, 16/16/1, 8/8/4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    D1 { workgroup_x: u32 },
    D2 { workgroup_x: u32, workgroup_y: u32 },
    D3 { workgroup_x: u32, workgroup_y: u32, workgroup_z: u32 },
}

impl Dimension {
    pub fn default_1d() -> Dimension {
        Dimension::D1 { workgroup_x: 256 }
    }
    pub fn default_2d() -> Dimension {
        Dimension::D2 { workgroup_x: 16, workgroup_y: 16 }
    }
    pub fn default_3d() -> Dimension {
        Dimension::D3 { workgroup_x: 8, workgroup_y: 8, workgroup_z: 4 }
    }

    pub fn workgroup_size(self) -> (u32, u32, u32) {
        match self {
            Dimension::D1 { workgroup_x } => (workgroup_x, 1, 1),
            Dimension::D2 { workgroup_x, workgroup_y } => (workgroup_x, workgroup_y, 1),
            Dimension::D3 { workgroup_x, workgroup_y, workgroup_z } => {
                (workgroup_x, workgroup_y, workgroup_z)
            }
        }
    }
}

#[derive(Default)]
struct CallableBodyState {
    in_body: bool,
    stack: Vec<String>,
    current: String,
    bodies: Vec<String>,
}

/// Owns the IR stream, registries, and uniform list for one compute kernel
/// build (spec §3 "Build Context").
pub struct KernelBuildContext {
    pub dimension: Dimension,

    code: Vec<String>,
    var_counter: u64,

    struct_names: Vec<String>,
    struct_defs: HashMap<String, String>,

    next_buffer_binding: u32,
    buffers: Vec<BufferDecl>,
    runtime_buffers: HashMap<u32, u64>,

    next_texture_binding: u32,
    textures: Vec<TextureDecl>,
    runtime_textures: HashMap<u32, u64>,

    uniform_counter: u64,
    uniforms: Vec<UniformDecl>,

    callable_states: HashMap<u64, CallableGenState>,
    callable_declarations: Vec<String>,
    callable_generators: Vec<(u64, Rc<dyn Fn()>)>,
    callable_body: CallableBodyState,
}

impl KernelBuildContext {
    pub fn new(dimension: Dimension) -> KernelBuildContext {
        KernelBuildContext {
            dimension,
            code: Vec::new(),
            var_counter: 0,
            struct_names: Vec::new(),
            struct_defs: HashMap::new(),
            next_buffer_binding: 0,
            buffers: Vec::new(),
            runtime_buffers: HashMap::new(),
            next_texture_binding: 0,
            textures: Vec::new(),
            runtime_textures: HashMap::new(),
            uniform_counter: 0,
            uniforms: Vec::new(),
            callable_states: HashMap::new(),
            callable_declarations: Vec::new(),
            callable_generators: Vec::new(),
            callable_body: CallableBodyState::default(),
        }
    }

    /// The main statement stream accumulated so far, in emission order.
    /// Used by `FragmentBuildContext` to assemble a fragment entry function
    /// from the same underlying registries without duplicating the
    /// statement buffer.
    pub fn statement_lines(&self) -> &[String] {
        &self.code
    }

    /// Assembles the full compute-shader source: version directive, struct
    /// defs in insertion order, uniforms, callable forward declarations,
    /// generated callable bodies, textures, buffers, then the entry
    /// function wrapping the main statement stream (spec §4.3
    /// "Composition into final source").
    pub fn assemble(&mut self, callable_bodies: &str) -> String {
        let (wx, wy, wz) = self.dimension.workgroup_size();
        let mut out = String::new();
        out.push_str("#version 450\n\n");

        for name in &self.struct_names {
            out.push_str(self.struct_defs.get(name).expect("struct registered"));
            out.push('\n');
        }
        for (binding, uniform) in self.uniforms.iter().enumerate() {
            out.push_str(&format!(
                "layout(std140, set = 2, binding = {binding}) uniform UniformBlock{binding} {{ {} {}; }};\n",
                uniform.shader_type, uniform.shader_name
            ));
        }
        for decl in &self.callable_declarations {
            out.push_str(decl);
            out.push_str(";\n");
        }
        if !callable_bodies.is_empty() {
            out.push_str(callable_bodies);
            out.push('\n');
        }
        for tex in &self.textures {
            out.push_str(&format!(
                "layout({}, set = 1, binding = {}) uniform image2D {};\n",
                tex.format_qualifier, tex.binding, tex.name
            ));
        }
        for buf in &self.buffers {
            let qualifier = buf.mode.glsl_qualifier();
            let qualifier = if qualifier.is_empty() {
                String::new()
            } else {
                format!("{qualifier} ")
            };
            out.push_str(&format!(
                "layout(std430, binding = {}) {}buffer Buf{} {{ {} {}[]; }};\n",
                buf.binding, qualifier, buf.binding, buf.elem_type, buf.name
            ));
        }

        out.push_str(&format!("layout(local_size_x = {wx}, local_size_y = {wy}, local_size_z = {wz}) in;\n"));
        out.push_str("void main() {\n");
        for line in &self.code {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push_str("}\n");
        out
    }
}

impl BuildContext for KernelBuildContext {
    fn push_translated_code(&mut self, line: String) {
        if self.callable_body.in_body {
            self.callable_body.current.push_str(&line);
        } else {
            self.code.push(line);
        }
    }

    fn assign_var_name(&mut self) -> String {
        let name = format!("v{}", self.var_counter);
        self.var_counter += 1;
        name
    }

    fn has_struct(&self, name: &str) -> bool {
        self.struct_defs.contains_key(name)
    }

    fn add_struct(&mut self, name: String, shader_text: String) {
        if self.struct_defs.contains_key(&name) {
            return;
        }
        self.struct_names.push(name.clone());
        self.struct_defs.insert(name, shader_text);
    }

    fn get_structs(&self) -> Vec<(String, String)> {
        self.struct_names
            .iter()
            .map(|n| (n.clone(), self.struct_defs[n].clone()))
            .collect()
    }

    fn allocate_binding(&mut self) -> u32 {
        let slot = self.next_buffer_binding;
        self.next_buffer_binding += 1;
        slot
    }

    fn register_buffer(&mut self, binding: u32, elem_type: String, name: String, mode: AccessMode) {
        self.buffers.push(BufferDecl { binding, elem_type, name, mode });
    }

    fn get_buffer_decls(&self) -> Vec<BufferDecl> {
        self.buffers.clone()
    }

    fn bind_runtime_buffer(&mut self, binding: u32, handle: u64) {
        self.runtime_buffers.insert(binding, handle);
    }

    fn get_runtime_buffers(&self) -> Vec<(u32, u64)> {
        self.runtime_buffers.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn allocate_texture_binding(&mut self) -> u32 {
        let slot = self.next_texture_binding;
        self.next_texture_binding += 1;
        slot
    }

    fn register_texture(&mut self, binding: u32, format_qualifier: String, name: String, width: u32, height: u32) {
        self.textures.push(TextureDecl { binding, format_qualifier, name, width, height });
    }

    fn get_texture_decls(&self) -> Vec<TextureDecl> {
        self.textures.clone()
    }

    fn bind_runtime_texture(&mut self, binding: u32, handle: u64) {
        self.runtime_textures.insert(binding, handle);
    }

    fn get_runtime_textures(&self) -> Vec<(u32, u64)> {
        self.runtime_textures.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn register_uniform(&mut self, shader_type: String, uploader: Uploader) -> String {
        let shader_name = format!("u{}", self.uniform_counter);
        self.uniform_counter += 1;
        self.uniforms.push(UniformDecl {
            shader_name: shader_name.clone(),
            shader_type,
            uploader,
        });
        shader_name
    }

    fn get_uniform_decls(&self) -> Vec<UniformDecl> {
        self.uniforms.clone()
    }

    fn callable_state(&mut self, id: u64) -> CallableGenState {
        *self.callable_states.entry(id).or_default()
    }

    fn set_callable_state(&mut self, id: u64, state: CallableGenState) {
        self.callable_states.insert(id, state);
    }

    fn add_callable_declaration(&mut self, proto: String) {
        self.callable_declarations.push(proto);
    }

    fn add_callable_body_generator(&mut self, id: u64, generator: Rc<dyn Fn()>) {
        self.callable_generators.push((id, generator));
    }

    fn push_callable_body(&mut self) {
        self.callable_body.stack.push(std::mem::take(&mut self.callable_body.current));
        self.callable_body.in_body = true;
    }

    fn pop_callable_body(&mut self) -> String {
        let finished = std::mem::take(&mut self.callable_body.current);
        self.callable_body.current = self.callable_body.stack.pop().unwrap_or_default();
        self.callable_body.in_body = !self.callable_body.stack.is_empty() || false;
        finished
    }

    fn get_callable_declarations(&self) -> Vec<String> {
        self.callable_declarations.clone()
    }

    fn take_callable_body_generators(&mut self) -> Vec<(u64, Rc<dyn Fn()>)> {
        std::mem::take(&mut self.callable_generators)
    }

    fn push_callable_body_text(&mut self, text: String) {
        self.callable_body.bodies.push(text);
    }

    fn get_callable_bodies(&self) -> Vec<String> {
        self.callable_body.bodies.clone()
    }
}

/// Used by the universal invariant "binding slots per kind are dense,
/// starting at 0, in first-use order" (spec §8).
pub fn bindings_are_dense(bindings: &[u32]) -> bool {
    let seen: HashSet<u32> = bindings.iter().copied().collect();
    (0..bindings.len() as u32).all(|i| seen.contains(&i))
}
