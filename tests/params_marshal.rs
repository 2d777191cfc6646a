use std::f32::consts::PI;
use std::mem::{offset_of, size_of};

use bevy_particle_fluid::gpu::buffers::seed_particles;
use bevy_particle_fluid::gpu::ffi::{
    CameraUniform, GpuParticle, GpuSphState, GravityParams, SphParams, PARTICLE_COLOR_OFFSET,
    PARTICLE_POSITION_OFFSET,
};
use bevy_particle_fluid::gpu::pipeline::dispatch_group_count;
use bevy_particle_fluid::params::SimulationParams;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn record_layouts_match_the_shaders() {
    // all three views of the particle store must agree on these numbers
    assert_eq!(size_of::<GpuParticle>(), 48);
    assert_eq!(offset_of!(GpuParticle, position) as u64, PARTICLE_POSITION_OFFSET);
    assert_eq!(offset_of!(GpuParticle, color) as u64, PARTICLE_COLOR_OFFSET);
    assert_eq!(offset_of!(GpuParticle, velocity), 32);

    assert_eq!(size_of::<GpuSphState>(), 32);
    assert_eq!(offset_of!(GpuSphState, force), 16);

    assert_eq!(size_of::<SphParams>(), 96);
    assert_eq!(offset_of!(SphParams, bounds_min), 48);
    assert_eq!(offset_of!(SphParams, bounds_max), 64);
    assert_eq!(offset_of!(SphParams, poly6_constant), 80);

    assert_eq!(size_of::<GravityParams>(), 64);
    assert_eq!(offset_of!(GravityParams, particle_count), 16);
    assert_eq!(offset_of!(GravityParams, bounds_min), 32);

    assert_eq!(size_of::<CameraUniform>(), 96);
    assert_eq!(offset_of!(CameraUniform, up), 80);
}

#[test]
fn radius_change_rederives_kernel_constants() {
    let mut params = SimulationParams::default();
    for h in [0.05_f32, 0.2, 1.3] {
        params.set_smoothing_radius(h);
        assert_eq!(params.smoothing_radius(), h);
        assert_eq!(params.smoothing_radius_sq(), h * h);

        let poly6 = 315.0 / (64.0 * PI * h.powi(9));
        let spiky = -45.0 / (PI * h.powi(6));
        assert!((params.poly6_constant() - poly6).abs() <= poly6.abs() * 1e-6);
        assert!((params.spiky_constant() - spiky).abs() <= spiky.abs() * 1e-6);
    }
}

#[test]
fn pausing_forces_delta_time_to_zero() {
    let mut params = SimulationParams::default();
    params.delta_time = 0.016;

    params.simulate = false;
    assert_eq!(params.to_sph_gpu().delta_time, 0.0);
    assert_eq!(params.to_gravity_gpu().delta_time, 0.0);

    params.simulate = true;
    assert_eq!(params.to_sph_gpu().delta_time, 0.016);
    assert_eq!(params.to_gravity_gpu().delta_time, 0.016);

    // pausing only touches the time step
    params.simulate = false;
    let gpu = params.to_sph_gpu();
    assert_eq!(gpu.gravity, params.gravity);
    assert_eq!(gpu.bounce, params.bounce);
    assert_eq!(gpu.particle_count, params.particle_count);
}

#[test]
fn sph_uniform_carries_derived_fields() {
    let mut params = SimulationParams::default();
    params.set_smoothing_radius(0.25);
    let gpu = params.to_sph_gpu();
    assert_eq!(gpu.smoothing_radius, 0.25);
    assert_eq!(gpu.smoothing_radius_sq, 0.0625);
    assert_eq!(gpu.poly6_constant, params.poly6_constant());
    assert_eq!(gpu.spiky_constant, params.spiky_constant());
    assert_eq!(gpu.bounds_min, params.bounds.min.to_array());
    assert_eq!(gpu.bounds_max, params.bounds.max.to_array());
}

#[test]
fn group_count_covers_every_particle() {
    assert_eq!(dispatch_group_count(5000), 79);
    assert_eq!(dispatch_group_count(64), 1);
    assert_eq!(dispatch_group_count(65), 2);
    assert_eq!(dispatch_group_count(1), 1);
}

#[test]
fn seeding_is_deterministic_under_a_fixed_seed() {
    let params = SimulationParams::default();
    let a = seed_particles(128, &params.bounds, &mut StdRng::seed_from_u64(7));
    let b = seed_particles(128, &params.bounds, &mut StdRng::seed_from_u64(7));
    assert_eq!(bytemuck::cast_slice::<_, u8>(&a), bytemuck::cast_slice::<_, u8>(&b));
}

#[test]
fn seeded_particles_stay_inside_bounds() {
    let params = SimulationParams::default();
    let particles = seed_particles(512, &params.bounds, &mut StdRng::seed_from_u64(42));
    assert_eq!(particles.len(), 512);

    for p in &particles {
        for axis in 0..3 {
            assert!(p.position[axis] >= params.bounds.min[axis]);
            assert!(p.position[axis] <= params.bounds.max[axis]);
            assert!(p.velocity[axis] >= -0.2 && p.velocity[axis] <= 0.2);
        }
        assert_eq!(p.lifetime, 1.0);
        assert_eq!(p.color, [0.2, 0.1, 0.9, 1.0]);
    }
}

#[test]
fn sph_state_starts_at_unit_density() {
    let state = GpuSphState::default();
    assert_eq!(state.density, 1.0);
    assert_eq!(state.pressure, 0.0);
    assert_eq!(state.force, [0.0; 3]);
}
