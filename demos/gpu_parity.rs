//! Runs the GPU kernels and the CPU reference solver from the same seed
//! state for a fixed number of steps, reads the particle store back and
//! compares positions and velocities.

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::render::render_resource::{Maintain, MapMode};
use bevy_particle_fluid::cpu::sph3d::{Particle, SphSolver};
use bevy_particle_fluid::gpu::buffers::{
    seed_particles, write_sph_params, AllowCopy, InitialParticles, ReadbackBuffer,
};
use bevy_particle_fluid::gpu::ffi::GpuParticle;
use bevy_particle_fluid::{SimulationParams, SphParticlePlugin};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEED: u64 = 11;
const NUM_PARTICLES: u32 = 256;
const DT: f32 = 0.004;
const STEPS: u32 = 10;
const WARMUP_FRAMES: u32 = 30; // pipeline compilation headroom

const MAX_POS_ERR: f32 = 1e-3;
const MAX_VEL_ERR: f32 = 5e-3;

fn main() {
    let mut params = SimulationParams::default();
    params.particle_count = NUM_PARTICLES;
    params.delta_time = DT;
    params.simulate = false; // frozen until the warmup is over

    let seed = seed_particles(NUM_PARTICLES, &params.bounds, &mut StdRng::seed_from_u64(SEED));

    let mut cpu = SphSolver::from_params(&params);
    for p in &seed {
        cpu.particles.push(Particle::new(
            Vec3::from_array(p.position),
            Vec3::from_array(p.velocity),
        ));
    }

    App::new()
        .add_plugins(DefaultPlugins)
        .insert_resource(params)
        .insert_resource(InitialParticles(seed))
        .insert_resource(CpuReference(cpu))
        .add_plugins(SphParticlePlugin)
        .add_systems(Startup, |mut commands: Commands| {
            commands.spawn(Camera3d::default());
        })
        .add_systems(Update, orchestrate.before(write_sph_params))
        .run();
}

#[derive(Resource)]
struct CpuReference(SphSolver);

fn orchestrate(
    mut params: ResMut<SimulationParams>,
    mut allow_copy: ResMut<AllowCopy>,
    mut cpu: ResMut<CpuReference>,
    readback: Option<Res<ReadbackBuffer>>,
    render_device: Res<bevy::render::renderer::RenderDevice>,
    mut exit: EventWriter<AppExit>,
    mut frame: Local<u32>,
    mut state: Local<u8>,
) {
    let Some(readback) = readback else { return };
    *frame += 1;

    match *state {
        // frozen warmup: kernels run with dt = 0 until pipelines are live
        0 => {
            if *frame >= WARMUP_FRAMES {
                params.simulate = true;
                *frame = 0;
                *state = 1;
                info!("warmup done, simulating {STEPS} steps");
            }
        }
        // exactly STEPS simulated frames, then freeze again
        1 => {
            if *frame >= STEPS {
                params.simulate = false;
                for _ in 0..STEPS {
                    cpu.0.step(DT);
                }
                *state = 2;
            }
        }
        2 => {
            allow_copy.0 = true;
            *state = 3;
        }
        3 => {
            allow_copy.0 = false;
            *state = 4;
        }
        4 => {
            *state = 5;
        }
        5 => {
            render_device.poll(Maintain::Wait);
            let slice = readback.buffer.slice(..);

            let status = std::sync::Arc::new(std::sync::atomic::AtomicU8::new(0));
            let cb = status.clone();
            slice.map_async(MapMode::Read, move |r| {
                cb.store(
                    if r.is_ok() { 1 } else { 2 },
                    std::sync::atomic::Ordering::SeqCst,
                )
            });

            // wait for map
            loop {
                render_device.poll(Maintain::Poll);
                match status.load(std::sync::atomic::Ordering::SeqCst) {
                    0 => std::thread::yield_now(),
                    1 => break,
                    2 => {
                        error!("readback map failed");
                        readback.buffer.unmap();
                        exit.write(AppExit::error());
                        return;
                    }
                    _ => unreachable!(),
                }
            }

            {
                let data = slice.get_mapped_range();
                let gpu: &[GpuParticle] = bytemuck::cast_slice(&data);
                assert_eq!(
                    gpu.len(),
                    cpu.0.particles.len(),
                    "GPU/CPU particle counts differ"
                );

                let mut max_pos_err: f32 = 0.0;
                let mut max_vel_err: f32 = 0.0;
                for (g, c) in gpu.iter().zip(cpu.0.particles.iter()) {
                    max_pos_err = max_pos_err.max((Vec3::from_array(g.position) - c.pos).length());
                    max_vel_err = max_vel_err.max((Vec3::from_array(g.velocity) - c.vel).length());
                }

                info!(
                    "{STEPS}-step parity (GPU vs CPU): pos max = {max_pos_err:.6}  |  vel max = {max_vel_err:.6}"
                );
                assert!(
                    max_pos_err <= MAX_POS_ERR,
                    "FAIL: position max {max_pos_err:.6} > {MAX_POS_ERR:.6}"
                );
                assert!(
                    max_vel_err <= MAX_VEL_ERR,
                    "FAIL: velocity max {max_vel_err:.6} > {MAX_VEL_ERR:.6}"
                );
            }

            readback.buffer.unmap();
            exit.write(AppExit::Success);
        }
        _ => {}
    }
}
