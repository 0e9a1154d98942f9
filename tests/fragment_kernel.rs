//! Scenario 6: a fragment kernel writing `vec4(uv.x, uv.y, 0, 1)` for a
//! 16x16 target. No GPU is available in this environment, so this checks
//! the assembled vertex+fragment pair is syntactically valid GLSL and that
//! the fragment body assigns `out_color` from the screen UV the way the
//! scenario specifies (spec §8).

use gpu_dsl::driver::compile_glsl_to_spirv;
use gpu_dsl::error::ShaderStage;
use gpu_dsl::kernel::FragmentKernel2D;
use gpu_dsl::value::scalar::F32;
use gpu_dsl::value::vector::{Vec2, Vec4};
use gpu_dsl::value::{Expr, Var};

#[test]
fn fragment_kernel_writes_uv_as_red_green() {
    let kernel = FragmentKernel2D::new("uv_debug", 16, 16, || {
        let uv = Var::<Vec2>::from_existing_name("uv");
        let out_color = Var::<Vec4>::from_existing_name("out_color");
        let color = Expr::<Vec4>::new(uv.get().x(), uv.get().y(), Expr::<F32>::literal(0.0), Expr::<F32>::literal(1.0));
        out_color.set(color)
    })
    .unwrap();

    assert_eq!(kernel.width(), 16);
    assert_eq!(kernel.height(), 16);

    let (vertex, fragment) = kernel.source_pair();
    assert!(vertex.contains("gl_VertexIndex"));
    assert!(fragment.contains("vec2 uv = v_uv;"));
    assert!(fragment.contains("out_color = vec4(uv.x, uv.y, 0.0, 1.0);"));

    compile_glsl_to_spirv(vertex, ShaderStage::Vertex, "main")
        .unwrap_or_else(|err| panic!("vertex shader failed to compile:\n{vertex}\n{err}"));
    compile_glsl_to_spirv(fragment, ShaderStage::Fragment, "main")
        .unwrap_or_else(|err| panic!("fragment shader failed to compile:\n{fragment}\n{err}"));
}

#[test]
fn set_resolution_invalidates_cached_source_only_on_change() {
    let mut kernel = FragmentKernel2D::new("uv_debug_resize", 16, 16, || {
        let uv = Var::<Vec2>::from_existing_name("uv");
        let out_color = Var::<Vec4>::from_existing_name("out_color");
        out_color.set(Expr::<Vec4>::new(uv.get().x(), uv.get().y(), Expr::<F32>::literal(0.0), Expr::<F32>::literal(1.0)))
    })
    .unwrap();

    assert!(!kernel.needs_recompile());
    kernel.set_resolution(16, 16);
    assert!(!kernel.needs_recompile());
    kernel.set_resolution(32, 32);
    assert!(kernel.needs_recompile());
}
