//! Uniform values: a scalar `Uniform<T>` and a reflected `StructUniform<T>`
//! both lower to valid GLSL uniform blocks with distinct bindings (spec
//! §4.3/§4.4, §6 "uniform").

use gpu_dsl::context::AccessMode;
use gpu_dsl::driver::compile_glsl_to_spirv;
use gpu_dsl::error::ShaderStage;
use gpu_dsl::flow::for_;
use gpu_dsl::shader_struct;
use gpu_dsl::value::buffer::BufferRef;
use gpu_dsl::value::scalar::{F32, I32};
use gpu_dsl::value::uniform::{StructUniform, Uniform};
use gpu_dsl::value::Expr;
use gpu_dsl::kernel::Kernel1D;

fn assert_compiles(source: &str) {
    compile_glsl_to_spirv(source, ShaderStage::Compute, "main")
        .unwrap_or_else(|err| panic!("generated source failed to compile:\n{source}\n{err}"));
}

#[test]
fn two_scalar_uniforms_lower_to_distinct_binding_blocks() {
    let scale = Uniform::<F32>::new(2.0);
    let offset = Uniform::<F32>::new(0.5);

    let kernel = Kernel1D::new("scale_and_offset", || {
        let output = BufferRef::<F32>::register(AccessMode::WriteOnly)?;
        let scale = scale.load()?;
        let offset = offset.load()?;
        for_("i", Expr::<gpu_dsl::value::scalar::I32>::literal(0), Expr::<gpu_dsl::value::scalar::I32>::literal(16), Expr::<gpu_dsl::value::scalar::I32>::literal(1), |i| {
            output.write(i.get(), scale.get() * Expr::<F32>::literal(1.0) + offset.get())
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("layout(std140, set = 2, binding = 0) uniform UniformBlock0 { float u0; };"));
    assert!(source.contains("layout(std140, set = 2, binding = 1) uniform UniformBlock1 { float u1; };"));
    assert_compiles(source);
}

#[test]
fn scalar_uniform_roundtrips_through_host_storage() {
    let time = Uniform::<F32>::new(0.0);
    assert_eq!(time.get(), 0.0);
    time.set(1.5);
    assert_eq!(time.get(), 1.5);
    let cloned = time.clone();
    cloned.set(3.0);
    assert_eq!(time.get(), 3.0);
}

shader_struct! {
    struct Tint {
        strength: F32 => f32,
        bias: F32 => f32,
    }
}

#[test]
fn struct_uniform_composes_fields_into_a_local_variable() {
    let tint = StructUniform::new(Tint { strength: 1.0, bias: 0.0 });

    let kernel = Kernel1D::new("apply_tint", || {
        let output = BufferRef::<F32>::register(AccessMode::WriteOnly)?;
        let tint = tint.load()?;
        let strength = tint.field::<F32>("strength");
        let bias = tint.field::<F32>("bias");
        output.write(Expr::literal(0), strength.get() + bias.get())
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("struct Tint {"));
    assert!(source.contains("layout(std140, set = 2, binding = 0) uniform UniformBlock0 { float u0; };"));
    assert!(source.contains("layout(std140, set = 2, binding = 1) uniform UniformBlock1 { float u1; };"));
    assert!(source.contains("Tint v0;"));
    assert!(source.contains("v0 = Tint(u0, u1);"));
    assert_compiles(source);
}
