//! Scenario 5: a struct-typed buffer is updated in place by a kernel, and
//! separately the std430 byte layout a host value serializes to is checked
//! against glam's own in-memory field values, confirming padding doesn't
//! corrupt data (spec §6, §8).

use gpu_dsl::context::AccessMode;
use gpu_dsl::driver::compile_glsl_to_spirv;
use gpu_dsl::error::ShaderStage;
use gpu_dsl::flow::for_;
use gpu_dsl::ir::Opcode;
use gpu_dsl::shader_struct;
use gpu_dsl::value::buffer::BufferRef;
use gpu_dsl::value::scalar::{F32, I32};
use gpu_dsl::value::structs::{register_struct, ShaderStruct};
use gpu_dsl::value::vector::Vec3;
use gpu_dsl::value::{Expr, Var};
use gpu_dsl::kernel::Kernel1D;

shader_struct! {
    struct Particle {
        pos: Vec3 => glam::Vec3,
        vel: Vec3 => glam::Vec3,
        life: F32 => f32,
        ty: I32 => i32,
    }
}

#[test]
fn kernel_integrates_position_and_decays_life() {
    let kernel = Kernel1D::new("integrate_particles", || {
        register_struct::<Particle>()?;
        let particles = BufferRef::<Particle>::register(AccessMode::ReadWrite)?;
        for_("i", Expr::<I32>::literal(0), Expr::<I32>::literal(1024), Expr::<I32>::literal(1), |i| {
            let p = Var::<Particle>::new(Some(particles.read(i.get())))?;
            let pos = p.field::<Vec3>("pos");
            let vel = p.field::<Vec3>("vel");
            let life = p.field::<F32>("life");
            pos.set(pos.get() + vel.get())?;
            life.compound_assign(Opcode::Sub, Expr::<F32>::literal(0.01))?;
            particles.write(i.get(), p.get())
        })
    })
    .unwrap();

    let source = kernel.source();
    assert!(source.contains("struct Particle {"));
    assert!(source.contains("vec3 pos;"));
    assert!(source.contains("vec3 vel;"));
    assert!(source.contains("float life;"));
    assert!(source.contains("int ty;"));
    assert!(source.contains("v0.pos = (v0.pos + v0.vel);"));
    assert!(source.contains("life -= 0.01;"));
    compile_glsl_to_spirv(source, ShaderStage::Compute, "main")
        .unwrap_or_else(|err| panic!("generated source failed to compile:\n{source}\n{err}"));
}

#[test]
fn std430_serialization_does_not_corrupt_field_values() {
    let particle = Particle {
        pos: glam::Vec3::new(1.0, 2.0, 3.0),
        vel: glam::Vec3::new(0.1, 0.2, 0.3),
        life: 0.75,
        ty: 2,
    };

    let mut bytes = vec![0u8; Particle::device_size()];
    particle.write_host_bytes(&mut bytes);

    let offsets = Particle::field_offsets();
    assert_eq!(offsets[0], ("pos".to_string(), 0));
    assert_eq!(offsets[1], ("vel".to_string(), 16));
    assert_eq!(offsets[2], ("life".to_string(), 32));
    assert_eq!(offsets[3], ("ty".to_string(), 36));

    let pos_back: [f32; 3] = bytemuck::cast_slice(&bytes[0..12]).try_into().unwrap();
    let vel_back: [f32; 3] = bytemuck::cast_slice(&bytes[16..28]).try_into().unwrap();
    let life_back: f32 = bytemuck::cast_slice::<u8, f32>(&bytes[32..36])[0];
    let ty_back: i32 = bytemuck::cast_slice::<u8, i32>(&bytes[36..40])[0];

    assert_eq!(pos_back, [1.0, 2.0, 3.0]);
    assert_eq!(vel_back, [0.1, 0.2, 0.3]);
    assert_eq!(life_back, 0.75);
    assert_eq!(ty_back, 2);
}
