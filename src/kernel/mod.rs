//! Kernel orchestration: construction runs the user's authoring closure
//! under a fresh context, assembles and caches the shader source, compiles
//! lazily on first dispatch, and re-uses the compiled program across
//! dispatches until a source-affecting resource change invalidates it
//! (spec §4.7, original_source `include/Kernel/{KernelBuildContext,FragmentBuildContext}.h`).

pub mod profiler;

use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::builder;
use crate::context::fragment::FragmentBuildContext;
use crate::context::kernel::{Dimension, KernelBuildContext};
use crate::context::BuildContext;
use crate::driver::{CompiledProgram, GpuDriver, WgpuDriver};
use crate::error::{AuthoringError, GpuDslError};
use profiler::KernelProfiler;

/// Rebinds every recorded buffer and texture handle at its registered slot
/// (spec §4.7 "rebind all buffer and texture handles at their recorded
/// slots"), reading from whichever `BuildContext` the kernel owns.
fn rebind_resources(ctx: &dyn BuildContext, driver: &WgpuDriver) {
    for (binding, handle) in ctx.get_runtime_buffers() {
        driver.bind_buffer(binding, handle);
    }
    for (binding, handle) in ctx.get_runtime_textures() {
        driver.bind_texture(binding, handle);
    }
}

/// An in-flight asynchronous buffer/texture readback (spec §C). Wraps a
/// `crossbeam_channel` receiver fired by the driver once the mapped range
/// is ready; this crate only specifies the token contract, not the
/// backend's exact fence semantics (spec §9 Open Question).
pub struct ReadbackToken {
    receiver: crossbeam_channel::Receiver<()>,
    completed: std::cell::Cell<bool>,
}

impl ReadbackToken {
    pub fn new(receiver: crossbeam_channel::Receiver<()>) -> ReadbackToken {
        ReadbackToken { receiver, completed: std::cell::Cell::new(false) }
    }

    pub fn is_complete(&self) -> bool {
        if !self.completed.get() && self.receiver.try_recv().is_ok() {
            self.completed.set(true);
        }
        self.completed.get()
    }

    pub fn wait(&self, timeout: Duration) -> bool {
        if self.completed.get() {
            return true;
        }
        if self.receiver.recv_timeout(timeout).is_ok() {
            self.completed.set(true);
        }
        self.completed.get()
    }

    pub fn release(self) {}
}

fn div_ceil(value: u32, divisor: u32) -> u32 {
    (value + divisor - 1) / divisor
}

/// Runs `build` under a fresh `KernelBuildContext`, then drains callable
/// body generators while still bound, returning the assembled source.
fn assemble_compute(dimension: Dimension, build: impl FnOnce() -> Result<(), AuthoringError>) -> Result<(KernelBuildContext, String), AuthoringError> {
    let mut ctx = KernelBuildContext::new(dimension);
    let callable_bodies = builder::with_bound(&mut ctx, || {
        build()?;
        builder::generate_callable_bodies()
    })?;
    let source = ctx.assemble(&callable_bodies);
    Ok((ctx, source))
}

macro_rules! compute_kernel {
    ($name:ident, $default_dim:expr, $dispatch_doc:literal, ($($arg:ident : u32),+), $groups:expr) => {
        #[doc = $dispatch_doc]
        pub struct $name {
            ctx: KernelBuildContext,
            source: String,
            program: Option<CompiledProgram>,
            name: String,
            profiler: Option<Rc<KernelProfiler>>,
        }

        impl $name {
            pub fn new(name: impl Into<String>, build: impl FnOnce() -> Result<(), AuthoringError>) -> Result<$name, GpuDslError> {
                let (ctx, source) = assemble_compute($default_dim, build)?;
                Ok($name { ctx, source, program: None, name: name.into(), profiler: None })
            }

            /// Attaches a profiler that every future dispatch records its
            /// elapsed time to (spec §4.7 "if profiling is enabled").
            pub fn with_profiler(mut self, profiler: Rc<KernelProfiler>) -> $name {
                self.profiler = Some(profiler);
                self
            }

            pub fn source(&self) -> &str {
                &self.source
            }

            pub fn context(&self) -> &KernelBuildContext {
                &self.ctx
            }

            fn ensure_compiled(&mut self, driver: &WgpuDriver) -> Result<(), GpuDslError> {
                if self.program.is_none() {
                    self.program = Some(driver.compile_compute_program(&self.source)?);
                }
                Ok(())
            }

            /// Uploads current uniform values, rebinds every recorded
            /// buffer/texture handle, then dispatches `$($arg),+`
            /// work-items worth of workgroups, optionally blocking until
            /// the GPU finishes (spec §4.7 "honors sync-wait").
            pub fn dispatch(&mut self, driver: &mut WgpuDriver, $($arg: u32),+, wait: bool) -> Result<(), GpuDslError> {
                self.ensure_compiled(driver)?;
                for decl in self.ctx.get_uniform_decls() {
                    (decl.uploader)(driver, &decl.shader_name);
                }
                rebind_resources(&self.ctx, driver);
                let program = self.program.as_ref().expect("ensure_compiled populates program");
                let groups = $groups($($arg),+, &self.ctx.dimension);
                let started = Instant::now();
                driver.dispatch_compute(program, groups)?;
                if wait {
                    driver.synchronize();
                }
                if let Some(profiler) = &self.profiler {
                    profiler.record(&self.name, started.elapsed().as_secs_f64() * 1000.0, groups);
                }
                Ok(())
            }
        }
    };
}

fn groups_1d(count: u32, dimension: &Dimension) -> (u32, u32, u32) {
    let (wx, _, _) = dimension.workgroup_size();
    (div_ceil(count, wx), 1, 1)
}

fn groups_2d(width: u32, height: u32, dimension: &Dimension) -> (u32, u32, u32) {
    let (wx, wy, _) = dimension.workgroup_size();
    (div_ceil(width, wx), div_ceil(height, wy), 1)
}

fn groups_3d(width: u32, height: u32, depth: u32, dimension: &Dimension) -> (u32, u32, u32) {
    let (wx, wy, wz) = dimension.workgroup_size();
    (div_ceil(width, wx), div_ceil(height, wy), div_ceil(depth, wz))
}

compute_kernel!(Kernel1D, Dimension::default_1d(), "A 1-dimensional compute kernel.", (count: u32), groups_1d);
compute_kernel!(Kernel2D, Dimension::default_2d(), "A 2-dimensional compute kernel.", (width: u32, height: u32), groups_2d);
compute_kernel!(Kernel3D, Dimension::default_3d(), "A 3-dimensional compute kernel.", (width: u32, height: u32, depth: u32), groups_3d);

/// A fragment (pixel) kernel: runs the user's closure to build a fragment
/// stage wrapped in a fixed full-screen-triangle vertex stage, and
/// dispatches by drawing that triangle over the target texture (spec
/// §4.6).
pub struct FragmentKernel2D {
    ctx: FragmentBuildContext,
    source: Option<(String, String)>,
    program: Option<CompiledProgram>,
    name: String,
    profiler: Option<Rc<KernelProfiler>>,
}

impl FragmentKernel2D {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        build: impl FnOnce() -> Result<(), AuthoringError>,
    ) -> Result<FragmentKernel2D, GpuDslError> {
        let mut ctx = FragmentBuildContext::new(width, height);
        let callable_bodies = builder::with_bound(&mut ctx, || {
            build()?;
            builder::generate_callable_bodies()
        })?;
        let fragment_source = ctx.assemble_fragment(&callable_bodies);
        let vertex_source = ctx.vertex_source().to_string();
        ctx.mark_shader_valid();
        Ok(FragmentKernel2D { ctx, source: Some((vertex_source, fragment_source)), program: None, name: name.into(), profiler: None })
    }

    /// Attaches a profiler that every future dispatch records its elapsed
    /// time to (spec §4.7 "if profiling is enabled").
    pub fn with_profiler(mut self, profiler: Rc<KernelProfiler>) -> FragmentKernel2D {
        self.profiler = Some(profiler);
        self
    }

    pub fn width(&self) -> u32 {
        self.ctx.width()
    }

    pub fn height(&self) -> u32 {
        self.ctx.height()
    }

    /// The currently assembled `(vertex, fragment)` GLSL pair.
    pub fn source_pair(&self) -> (&str, &str) {
        let (vertex, fragment) = self.source.as_ref().expect("source assembled at construction");
        (vertex, fragment)
    }

    /// False once `set_resolution` has changed the target size and the
    /// fragment source hasn't been reassembled for the new size yet.
    pub fn needs_recompile(&self) -> bool {
        !self.ctx.is_shader_valid()
    }

    /// Changes the render target's resolution. If the resolution actually
    /// changes, the compiled program is invalidated and will be rebuilt on
    /// the next dispatch (spec §C).
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.ctx.set_resolution(width, height);
        if !self.ctx.is_shader_valid() {
            self.program = None;
        }
    }

    fn ensure_compiled(&mut self, driver: &WgpuDriver) -> Result<(), GpuDslError> {
        if self.program.is_none() {
            let (vertex, fragment) = self.source.as_ref().expect("source assembled at construction");
            self.program = Some(driver.compile_fragment_program(vertex, fragment)?);
            self.ctx.mark_shader_valid();
        }
        Ok(())
    }

    pub fn dispatch(&mut self, driver: &mut WgpuDriver, target_view: &wgpu::TextureView, wait: bool) -> Result<(), GpuDslError> {
        self.ensure_compiled(driver)?;
        for decl in self.ctx.get_uniform_decls() {
            (decl.uploader)(driver, &decl.shader_name);
        }
        rebind_resources(&self.ctx, driver);
        let program = self.program.as_ref().expect("ensure_compiled populates program");
        let started = Instant::now();
        driver.dispatch_fragment(program, target_view)?;
        if wait {
            driver.synchronize();
        }
        if let Some(profiler) = &self.profiler {
            profiler.record(&self.name, started.elapsed().as_secs_f64() * 1000.0, (self.ctx.width(), self.ctx.height(), 1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AccessMode;
    use crate::flow;
    use crate::value::buffer::BufferRef;
    use crate::value::scalar::I32;
    use crate::value::Expr;

    #[test]
    fn kernel1d_source_contains_workgroup_layout_and_entry_point() {
        let kernel = Kernel1D::new("increment", || {
            let input = BufferRef::<I32>::register(AccessMode::ReadOnly)?;
            let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
            flow::for_("i", Expr::literal(0), Expr::literal(25600), Expr::literal(1), |i| {
                output.write(i.get(), input.read(i.get()) + Expr::literal(1))
            })
        })
        .unwrap();
        assert!(kernel.source().contains("local_size_x = 256"));
        assert!(kernel.source().contains("void main() {"));
        assert!(kernel.source().contains("buffer Buf0"));
        assert!(kernel.source().contains("buffer Buf1"));
    }
}
