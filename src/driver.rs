//! The GPU driver boundary: GLSL-to-SPIR-V compilation (via `naga`) and
//! dispatch against a real device (via `wgpu`). Spec §1 names the GPU
//! driver as an opaque, out-of-scope collaborator; this module is the
//! concrete choice behind that boundary (see `DESIGN.md`).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::context::UniformSink;
use crate::error::{CompileError, Diagnostic, DispatchError, LinkError, ResourceError, Severity, ShaderStage};
use crate::value::texture::PixelFormat;

/// Compiles GLSL source for `stage` to SPIR-V, translating `naga`'s parse
/// errors into the structured `CompileError` shape spec §7 requires
/// (grounded on `examples/MrGunflame-big-gaming/game_render/src/backend/shader.rs`'s
/// `glsl_to_spirv`).
pub fn compile_glsl_to_spirv(source: &str, stage: ShaderStage, entry_point: &str) -> Result<Vec<u32>, CompileError> {
    let naga_stage = match stage {
        ShaderStage::Compute => naga::ShaderStage::Compute,
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let options = naga::front::glsl::Options::from(naga_stage);
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend.parse(&options, source).map_err(|errors| {
        let diagnostics = errors
            .errors
            .into_iter()
            .map(|err| Diagnostic {
                severity: Severity::Error,
                file: format!("{stage}.glsl"),
                line: 1,
                column: 1,
                message: err.to_string(),
            })
            .collect();
        CompileError { stage, source_text: source.to_string(), diagnostics }
    })?;

    let info = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|err| CompileError {
            stage,
            source_text: source.to_string(),
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                file: format!("{stage}.glsl"),
                line: 1,
                column: 1,
                message: err.to_string(),
            }],
        })?;

    let spirv = naga::back::spv::write_vec(
        &module,
        &info,
        &naga::back::spv::Options::default(),
        Some(&naga::back::spv::PipelineOptions {
            shader_stage: naga_stage,
            entry_point: entry_point.to_string(),
        }),
    )
    .map_err(|err| CompileError {
        stage,
        source_text: source.to_string(),
        diagnostics: vec![Diagnostic {
            severity: Severity::Error,
            file: format!("{stage}.glsl"),
            line: 1,
            column: 1,
            message: err.to_string(),
        }],
    })?;

    Ok(spirv)
}

/// A buffer-usage hint, mirroring `wgpu::BufferUsages` but without leaking
/// the driver crate into the rest of the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Storage,
    Uniform,
}

/// A compiled, linked program ready to dispatch.
pub struct CompiledProgram {
    handle: u64,
}

/// The GPU-driver boundary spec §1 names as an opaque collaborator: binding
/// a recorded buffer/texture handle to its slot ahead of a dispatch.
/// `WgpuDriver` is the concrete implementation; resource creation, program
/// compilation, dispatch and synchronization stay inherent methods on it
/// since they aren't part of the collaborator contract this trait captures.
pub trait GpuDriver {
    fn bind_buffer(&self, binding: u32, handle: u64);
    fn bind_texture(&self, binding: u32, handle: u64);
}

/// An opaque resource handle allocator + `wgpu` backend. Single-threaded
/// and host-cooperative (spec §5): every method here runs to completion on
/// the calling thread; only the GPU's own execution is concurrent with the
/// host.
pub struct WgpuDriver {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_handle: Cell<u64>,
    buffers: RefCell<HashMap<u64, wgpu::Buffer>>,
    textures: RefCell<HashMap<u64, (wgpu::Texture, wgpu::TextureView)>>,
    compute_pipelines: RefCell<HashMap<u64, wgpu::ComputePipeline>>,
    render_pipelines: RefCell<HashMap<u64, wgpu::RenderPipeline>>,
    pending_uniforms: RefCell<HashMap<String, Vec<u8>>>,
    pending_buffer_bindings: RefCell<HashMap<u32, u64>>,
    pending_texture_bindings: RefCell<HashMap<u32, u64>>,
}

impl WgpuDriver {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> WgpuDriver {
        WgpuDriver {
            device,
            queue,
            next_handle: Cell::new(0),
            buffers: RefCell::new(HashMap::new()),
            textures: RefCell::new(HashMap::new()),
            compute_pipelines: RefCell::new(HashMap::new()),
            render_pipelines: RefCell::new(HashMap::new()),
            pending_uniforms: RefCell::new(HashMap::new()),
            pending_buffer_bindings: RefCell::new(HashMap::new()),
            pending_texture_bindings: RefCell::new(HashMap::new()),
        }
    }

    fn alloc_handle(&self) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        handle
    }

    pub fn create_buffer(&self, size: usize, usage: BufferUsage) -> Result<u64, ResourceError> {
        if size == 0 {
            return Err(ResourceError { kind: "buffer", message: "size must be nonzero".to_string() });
        }
        let wgpu_usage = match usage {
            BufferUsage::Storage => {
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
            }
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: size as u64,
            usage: wgpu_usage,
            mapped_at_creation: false,
        });
        let handle = self.alloc_handle();
        self.buffers.borrow_mut().insert(handle, buffer);
        Ok(handle)
    }

    pub fn create_texture(&self, width: u32, height: u32, format: PixelFormat) -> Result<u64, ResourceError> {
        if width == 0 || height == 0 {
            return Err(ResourceError { kind: "texture", message: "width and height must be nonzero".to_string() });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu_texture_format(format),
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = self.alloc_handle();
        self.textures.borrow_mut().insert(handle, (texture, view));
        Ok(handle)
    }

    pub fn upload_buffer(&self, handle: u64, bytes: &[u8]) -> Result<(), DispatchError> {
        let buffers = self.buffers.borrow();
        let buffer = buffers
            .get(&handle)
            .ok_or_else(|| DispatchError { message: format!("unknown buffer handle {handle}") })?;
        self.queue.write_buffer(buffer, 0, bytes);
        Ok(())
    }

    pub fn compile_compute_program(&self, glsl_source: &str) -> Result<CompiledProgram, CompileError> {
        let spirv = compile_glsl_to_spirv(glsl_source, ShaderStage::Compute, "main")?;
        let module = unsafe {
            self.device.create_shader_module_spirv(&wgpu::ShaderModuleDescriptorSpirV {
                label: None,
                source: std::borrow::Cow::Owned(spirv),
            })
        };
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: None,
            layout: None,
            module: &module,
            entry_point: "main",
            compilation_options: Default::default(),
        });
        let handle = self.alloc_handle();
        self.compute_pipelines.borrow_mut().insert(handle, pipeline);
        Ok(CompiledProgram { handle })
    }

    pub fn compile_fragment_program(&self, vertex_source: &str, fragment_source: &str) -> Result<CompiledProgram, LinkError> {
        let vertex_spv = compile_glsl_to_spirv(vertex_source, ShaderStage::Vertex, "main")
            .map_err(|err| LinkError { log: err.to_string(), stages: vec![ShaderStage::Vertex] })?;
        let fragment_spv = compile_glsl_to_spirv(fragment_source, ShaderStage::Fragment, "main")
            .map_err(|err| LinkError { log: err.to_string(), stages: vec![ShaderStage::Fragment] })?;

        let vertex_module = unsafe {
            self.device.create_shader_module_spirv(&wgpu::ShaderModuleDescriptorSpirV {
                label: None,
                source: std::borrow::Cow::Owned(vertex_spv),
            })
        };
        let fragment_module = unsafe {
            self.device.create_shader_module_spirv(&wgpu::ShaderModuleDescriptorSpirV {
                label: None,
                source: std::borrow::Cow::Owned(fragment_spv),
            })
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: None,
            layout: None,
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: "main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: "main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let handle = self.alloc_handle();
        self.render_pipelines.borrow_mut().insert(handle, pipeline);
        Ok(CompiledProgram { handle })
    }

    /// Builds one bind group per resource kind that currently has recorded
    /// bindings — set 0 for buffers, set 1 for textures — against the
    /// pipeline's auto-inferred layout (spec §4.7 "rebind all buffer and
    /// texture handles at their recorded slots").
    fn bind_groups_for(&self, get_layout: impl Fn(u32) -> wgpu::BindGroupLayout) -> Result<Vec<(u32, wgpu::BindGroup)>, DispatchError> {
        let mut groups = Vec::new();

        let buffer_bindings = self.pending_buffer_bindings.borrow();
        if !buffer_bindings.is_empty() {
            let layout = get_layout(0);
            let buffers = self.buffers.borrow();
            let mut entries = Vec::with_capacity(buffer_bindings.len());
            for (binding, handle) in buffer_bindings.iter() {
                let buffer = buffers
                    .get(handle)
                    .ok_or_else(|| DispatchError { message: format!("unknown buffer handle {handle}") })?;
                entries.push(wgpu::BindGroupEntry { binding: *binding, resource: buffer.as_entire_binding() });
            }
            groups.push((0, self.device.create_bind_group(&wgpu::BindGroupDescriptor { label: None, layout: &layout, entries: &entries })));
        }

        let texture_bindings = self.pending_texture_bindings.borrow();
        if !texture_bindings.is_empty() {
            let layout = get_layout(1);
            let textures = self.textures.borrow();
            let mut entries = Vec::with_capacity(texture_bindings.len());
            for (binding, handle) in texture_bindings.iter() {
                let (_, view) = textures
                    .get(handle)
                    .ok_or_else(|| DispatchError { message: format!("unknown texture handle {handle}") })?;
                entries.push(wgpu::BindGroupEntry { binding: *binding, resource: wgpu::BindingResource::TextureView(view) });
            }
            groups.push((1, self.device.create_bind_group(&wgpu::BindGroupDescriptor { label: None, layout: &layout, entries: &entries })));
        }

        Ok(groups)
    }

    pub fn dispatch_compute(&self, program: &CompiledProgram, groups: (u32, u32, u32)) -> Result<(), DispatchError> {
        let pipelines = self.compute_pipelines.borrow();
        let pipeline = pipelines
            .get(&program.handle)
            .ok_or_else(|| DispatchError { message: "program is not a compiled compute program".to_string() })?;
        let bind_groups = self.bind_groups_for(|set| pipeline.get_bind_group_layout(set))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor { label: None, timestamp_writes: None });
            pass.set_pipeline(pipeline);
            for (set, group) in &bind_groups {
                pass.set_bind_group(*set, group, &[]);
            }
            pass.dispatch_workgroups(groups.0, groups.1, groups.2);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    pub fn dispatch_fragment(&self, program: &CompiledProgram, target_view: &wgpu::TextureView) -> Result<(), DispatchError> {
        let pipelines = self.render_pipelines.borrow();
        let pipeline = pipelines
            .get(&program.handle)
            .ok_or_else(|| DispatchError { message: "program is not a compiled fragment program".to_string() })?;
        let bind_groups = self.bind_groups_for(|set| pipeline.get_bind_group_layout(set))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            for (set, group) in &bind_groups {
                pass.set_bind_group(*set, group, &[]);
            }
            pass.draw(0..3, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Blocks until all submitted work has completed — the "synchronous
    /// wait" dispatch option in spec §4.7.
    pub fn synchronize(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

impl GpuDriver for WgpuDriver {
    fn bind_buffer(&self, binding: u32, handle: u64) {
        self.pending_buffer_bindings.borrow_mut().insert(binding, handle);
    }

    fn bind_texture(&self, binding: u32, handle: u64) {
        self.pending_texture_bindings.borrow_mut().insert(binding, handle);
    }
}

impl UniformSink for WgpuDriver {
    fn upload(&mut self, shader_name: &str, bytes: &[u8]) {
        self.pending_uniforms.borrow_mut().insert(shader_name.to_string(), bytes.to_vec());
    }
}

fn wgpu_texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Rg8 => wgpu::TextureFormat::Rg8Unorm,
        PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::R16F => wgpu::TextureFormat::R16Float,
        PixelFormat::Rg16F => wgpu::TextureFormat::Rg16Float,
        PixelFormat::Rgba16F => wgpu::TextureFormat::Rgba16Float,
        PixelFormat::R32F => wgpu::TextureFormat::R32Float,
        PixelFormat::Rg32F => wgpu::TextureFormat::Rg32Float,
        PixelFormat::Rgba32F => wgpu::TextureFormat::Rgba32Float,
        PixelFormat::R32I => wgpu::TextureFormat::R32Sint,
        PixelFormat::Rg32I => wgpu::TextureFormat::Rg32Sint,
        PixelFormat::Rgba32I => wgpu::TextureFormat::Rgba32Sint,
        PixelFormat::R32UI => wgpu::TextureFormat::R32Uint,
        PixelFormat::Rg32UI => wgpu::TextureFormat::Rg32Uint,
        PixelFormat::Rgba32UI => wgpu::TextureFormat::Rgba32Uint,
    }
}
