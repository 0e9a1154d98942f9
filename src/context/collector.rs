//! A `BuildContext` that buffers emitted statement lines privately while
//! delegating every registration to a parent context (spec §4.5 "control-flow
//! capture"; original_source `Flow/CodeCollectContext.h`). Used by `flow.rs`
//! to capture the body of an `if`/`for`/`while`/`do_while` block as text
//! before splicing it back into the parent's stream as a single statement.

use std::rc::Rc;

use super::{AccessMode, BufferDecl, BuildContext, CallableGenState, TextureDecl, UniformDecl, Uploader};

/// Buffers statement text privately; forwards every struct/buffer/texture/
/// uniform/callable registration to `parent`.
///
/// Holds a raw pointer to the parent rather than a borrow because the
/// parent is, at the time a collector is active, also the object bound in
/// the thread-local `Builder` cell — an ordinary `&mut` borrow would
/// conflict with that binding. Safety is maintained by `ScopedCapture`
/// (see below), which guarantees the parent outlives the collector and
/// that no other access to the parent happens while the collector is bound.
pub struct CollectorContext {
    parent: *mut dyn BuildContext,
    collected: Vec<String>,
}

impl CollectorContext {
    /// # Safety
    /// `parent` must be valid for the entire lifetime of the returned
    /// `CollectorContext`, and must not be accessed through any other
    /// pointer while this collector is alive.
    pub unsafe fn new(parent: *mut dyn BuildContext) -> CollectorContext {
        CollectorContext {
            parent,
            collected: Vec::new(),
        }
    }

    fn parent(&mut self) -> &mut dyn BuildContext {
        // SAFETY: upheld by the constructor's contract and by `ScopedCapture`.
        unsafe { &mut *self.parent }
    }

    /// Consumes the collector, returning the collected lines joined as one
    /// text blob, suitable for wrapping in a `Node::RawFragment`.
    pub fn into_text(self) -> String {
        self.collected.concat()
    }
}

impl BuildContext for CollectorContext {
    fn push_translated_code(&mut self, line: String) {
        self.collected.push(line);
    }

    fn assign_var_name(&mut self) -> String {
        self.parent().assign_var_name()
    }

    fn has_struct(&self, name: &str) -> bool {
        // SAFETY: read-only access, same justification as `parent()`.
        unsafe { (*self.parent).has_struct(name) }
    }

    fn add_struct(&mut self, name: String, shader_text: String) {
        self.parent().add_struct(name, shader_text);
    }

    fn get_structs(&self) -> Vec<(String, String)> {
        unsafe { (*self.parent).get_structs() }
    }

    fn allocate_binding(&mut self) -> u32 {
        self.parent().allocate_binding()
    }

    fn register_buffer(&mut self, binding: u32, elem_type: String, name: String, mode: AccessMode) {
        self.parent().register_buffer(binding, elem_type, name, mode);
    }

    fn get_buffer_decls(&self) -> Vec<BufferDecl> {
        unsafe { (*self.parent).get_buffer_decls() }
    }

    fn bind_runtime_buffer(&mut self, binding: u32, handle: u64) {
        self.parent().bind_runtime_buffer(binding, handle);
    }

    fn get_runtime_buffers(&self) -> Vec<(u32, u64)> {
        unsafe { (*self.parent).get_runtime_buffers() }
    }

    fn allocate_texture_binding(&mut self) -> u32 {
        self.parent().allocate_texture_binding()
    }

    fn register_texture(&mut self, binding: u32, format_qualifier: String, name: String, width: u32, height: u32) {
        self.parent().register_texture(binding, format_qualifier, name, width, height);
    }

    fn get_texture_decls(&self) -> Vec<TextureDecl> {
        unsafe { (*self.parent).get_texture_decls() }
    }

    fn bind_runtime_texture(&mut self, binding: u32, handle: u64) {
        self.parent().bind_runtime_texture(binding, handle);
    }

    fn get_runtime_textures(&self) -> Vec<(u32, u64)> {
        unsafe { (*self.parent).get_runtime_textures() }
    }

    fn register_uniform(&mut self, shader_type: String, uploader: Uploader) -> String {
        self.parent().register_uniform(shader_type, uploader)
    }

    fn get_uniform_decls(&self) -> Vec<UniformDecl> {
        unsafe { (*self.parent).get_uniform_decls() }
    }

    fn callable_state(&mut self, id: u64) -> CallableGenState {
        self.parent().callable_state(id)
    }

    fn set_callable_state(&mut self, id: u64, state: CallableGenState) {
        self.parent().set_callable_state(id, state);
    }

    fn add_callable_declaration(&mut self, proto: String) {
        self.parent().add_callable_declaration(proto);
    }

    fn add_callable_body_generator(&mut self, id: u64, generator: Rc<dyn Fn()>) {
        self.parent().add_callable_body_generator(id, generator);
    }

    fn push_callable_body(&mut self) {
        self.parent().push_callable_body();
    }

    fn pop_callable_body(&mut self) -> String {
        self.parent().pop_callable_body()
    }

    fn get_callable_declarations(&self) -> Vec<String> {
        unsafe { (*self.parent).get_callable_declarations() }
    }

    fn take_callable_body_generators(&mut self) -> Vec<(u64, Rc<dyn Fn()>)> {
        self.parent().take_callable_body_generators()
    }

    fn push_callable_body_text(&mut self, text: String) {
        self.parent().push_callable_body_text(text);
    }

    fn get_callable_bodies(&self) -> Vec<String> {
        unsafe { (*self.parent).get_callable_bodies() }
    }
}
