//! End-to-end authoring scenarios: each kernel is built through the public
//! API, assembled to GLSL, and checked both structurally and by feeding the
//! result back through the same GLSL-to-SPIR-V path the driver uses before
//! a real dispatch (mirrors the teacher's WGSL-generation test, which
//! parses the generated shader without requiring a GPU).

use gpu_dsl::context::AccessMode;
use gpu_dsl::driver::compile_glsl_to_spirv;
use gpu_dsl::error::ShaderStage;
use gpu_dsl::flow::{for_, if_};
use gpu_dsl::kernel::Kernel1D;
use gpu_dsl::value::buffer::BufferRef;
use gpu_dsl::value::scalar::I32;
use gpu_dsl::value::Expr;

fn assert_compiles(source: &str) {
    compile_glsl_to_spirv(source, ShaderStage::Compute, "main")
        .unwrap_or_else(|err| panic!("generated source failed to compile:\n{source}\n{err}"));
}

#[test]
fn increment_kernel_writes_input_plus_one() {
    let kernel = Kernel1D::new("increment", || {
        let input = BufferRef::<I32>::register(AccessMode::ReadOnly)?;
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(25600), Expr::<I32>::literal(1), |i| {
            output.write(i.get(), input.read(i.get()) + Expr::<I32>::literal(1))
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("readonly buffer Buf0 { int buf0[]; };"));
    assert!(source.contains("writeonly buffer Buf1 { int buf1[]; };"));
    assert!(source.contains("for (int i = 0; i < 25600; i += 1) {"));
    assert!(source.contains("buf1[i] = (buf0[i] + 1);"));
    assert_compiles(source);
}

#[test]
fn vector_swizzle_reverses_components() {
    use gpu_dsl::value::vector::Vec4;

    let kernel = Kernel1D::new("swizzle", || {
        let input = BufferRef::<Vec4>::register(AccessMode::ReadOnly)?;
        let output = BufferRef::<Vec4>::register(AccessMode::WriteOnly)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(16), Expr::<I32>::literal(1), |i| {
            output.write(i.get(), input.read(i.get()).wzyx())
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("buf0[i].wzyx"));
    assert_compiles(source);
}

#[test]
fn reduction_with_callable_defines_body_exactly_once() {
    use gpu_dsl::callable::Callable1;
    use gpu_dsl::value::Var;

    let kernel = Kernel1D::new("square_reduce", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        let square = Callable1::<I32, I32>::new("square", |x: Var<I32>| Ok(x.get() * x.get()));
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(1023), Expr::<I32>::literal(1), |i| {
            let squared = square.call(i.get())?;
            output.write(i.get(), squared)
        })
    })
    .unwrap();

    let source = kernel.source();
    assert_eq!(source.matches("int square(int p0)").count(), 1);
    assert!(source.contains("square(i)"));
    assert_compiles(source);
}

#[test]
fn branching_doubles_even_triples_odd() {
    let kernel = Kernel1D::new("branch", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(255), Expr::<I32>::literal(1), |i| {
            let is_even = (i.get() % Expr::<I32>::literal(2)).eq(Expr::<I32>::literal(0));
            if_(is_even, || output.write(i.get(), i.get() * Expr::<I32>::literal(2)))?
                .else_(|| output.write(i.get(), i.get() * Expr::<I32>::literal(3)))?
                .end()
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("if (((i % 2) == 0)) {"));
    assert!(source.contains("} else {"));
    assert!(source.contains("buf0[i] = (i * 2);"));
    assert!(source.contains("buf0[i] = (i * 3);"));
    assert_compiles(source);
}
