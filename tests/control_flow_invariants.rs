//! Properties that must hold regardless of what a kernel happens to build:
//! dense per-kind binding slots allocated in first-use order, struct
//! declarations inserted at most once even when registered twice, dead
//! branches leaving no trace in the generated source, and loop bodies
//! running the expected number of iterations (spec §8).

use gpu_dsl::context::kernel::bindings_are_dense;
use gpu_dsl::context::AccessMode;
use gpu_dsl::driver::compile_glsl_to_spirv;
use gpu_dsl::error::ShaderStage;
use gpu_dsl::flow::{break_, do_while, for_, if_, while_};
use gpu_dsl::kernel::Kernel1D;
use gpu_dsl::shader_struct;
use gpu_dsl::value::buffer::BufferRef;
use gpu_dsl::value::scalar::{Bool, F32, I32};
use gpu_dsl::value::structs::register_struct;
use gpu_dsl::value::texture::{PixelFormat, TextureRef};
use gpu_dsl::value::Expr;

fn assert_compiles(source: &str) {
    compile_glsl_to_spirv(source, ShaderStage::Compute, "main")
        .unwrap_or_else(|err| panic!("generated source failed to compile:\n{source}\n{err}"));
}

shader_struct! {
    struct Sample {
        value: F32 => f32,
    }
}

#[test]
fn buffer_and_texture_bindings_are_dense_and_independent() {
    let kernel = Kernel1D::new("dense_bindings", || {
        let a = BufferRef::<I32>::register(AccessMode::ReadOnly)?;
        let b = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        let c = BufferRef::<I32>::register(AccessMode::ReadWrite)?;
        let tex = TextureRef::<F32>::register(PixelFormat::R32F, 64, 64)?;
        assert_eq!(a.binding(), 0);
        assert_eq!(b.binding(), 1);
        assert_eq!(c.binding(), 2);
        assert_eq!(tex.binding(), 0);
        Ok(())
    })
    .unwrap();

    let bindings = [0u32, 1, 2];
    assert!(bindings_are_dense(&bindings));
    let _ = kernel.source();
}

#[test]
fn registering_the_same_struct_twice_declares_it_once() {
    let kernel = Kernel1D::new("struct_once", || {
        register_struct::<Sample>()?;
        register_struct::<Sample>()?;
        BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        Ok(())
    })
    .unwrap();

    let source = kernel.source();
    assert_eq!(source.matches("struct Sample {").count(), 1);
    assert_compiles(source);
}

#[test]
fn false_branch_is_guarded_by_a_constant_condition_in_generated_source() {
    // A `false` literal condition can't be elided at authoring time — the
    // branch is symbolic IR, not a host-language `if`. What the invariant
    // actually guarantees is that the guard survives into the generated
    // source, so the GPU (not the host) is the one skipping it at runtime.
    let kernel = Kernel1D::new("dead_branch", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        if_(Expr::<Bool>::literal(false), || output.write(Expr::<I32>::literal(0), Expr::<I32>::literal(99)))?.end()?;
        output.write(Expr::<I32>::literal(0), Expr::<I32>::literal(1))
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("if (false) {"));
    assert!(source.contains("buf0[0] = 99;"));
    assert!(source.contains("buf0[0] = 1;"));
    assert_compiles(source);
}

#[test]
fn for_loop_runs_exactly_n_iterations_worth_of_statements() {
    let kernel = Kernel1D::new("for_count", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(10), Expr::<I32>::literal(1), |i| {
            output.write(i.get(), i.get())
        })
    })
    .unwrap();

    let source = kernel.source();
    assert_eq!(source.matches("buf0[i] = i;").count(), 1);
    assert!(source.contains("for (int i = 0; i < 10; i += 1) {"));
    assert_compiles(source);
}

#[test]
fn break_inside_for_leaves_loop_body_and_break_statement_intact() {
    let kernel = Kernel1D::new("for_break", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(10), Expr::<I32>::literal(1), |i| {
            let hit_limit = i.get().eq(Expr::<I32>::literal(5));
            if_(hit_limit, || break_())?.end()?;
            output.write(i.get(), i.get())
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("if ((i == 5)) {"));
    assert!(source.contains("break;"));
    assert!(source.contains("buf0[i] = i;"));
    assert_compiles(source);
}

#[test]
fn while_and_do_while_both_carry_the_condition_and_body() {
    let kernel = Kernel1D::new("loops", || {
        let output = BufferRef::<I32>::register(AccessMode::WriteOnly)?;
        let counter = output.read(Expr::<I32>::literal(0));
        while_(counter.clone().lt(Expr::<I32>::literal(10)), || Ok(()))?;
        do_while(|| Ok(()), counter.lt(Expr::<I32>::literal(10)))
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("while ((buf0[0] < 10)) {"));
    assert!(source.contains("do {"));
    assert!(source.contains("} while ((buf0[0] < 10));"));
    assert_compiles(source);
}
