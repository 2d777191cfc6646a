use bevy_particle_fluid::cpu::sph3d::{Particle, SphSolver};
use bevy_particle_fluid::gpu::buffers::seed_particles;
use bevy_particle_fluid::params::SimulationParams;
use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn make_solver(count: u32) -> SphSolver {
    let params = SimulationParams::default();
    let mut sph = SphSolver::from_params(&params);
    for p in seed_particles(count, &params.bounds, &mut StdRng::seed_from_u64(1)) {
        sph.particles.push(Particle::new(
            Vec3::from_array(p.position),
            Vec3::from_array(p.velocity),
        ));
    }
    sph
}

// all-pairs reference is O(N^2); keep the counts modest
fn bench_step(c: &mut Criterion) {
    let mut sph_512 = make_solver(512);
    c.bench_function("step_512", |b| b.iter(|| sph_512.step(0.001)));

    let mut sph_2k = make_solver(2048);
    c.bench_function("step_2k", |b| b.iter(|| sph_2k.step(0.001)));
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
