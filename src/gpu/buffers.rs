use bevy::core_pipeline::core_3d::graph::{Core3d, Node3d};
use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;
use bevy::render::render_graph::{RenderGraphApp, ViewNodeRunner};
use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer,
    BufferBindingType, BufferDescriptor, BufferInitDescriptor, BufferUsages,
    CommandEncoderDescriptor, ShaderStages,
};
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy::render::{Extract, ExtractSchedule, Render, RenderApp, RenderSet};
use rand::Rng;

use crate::gpu::draw_buffers::{
    extract_camera_buffer, extract_draw_layout, extract_quad_vertex_buffer, init_camera_buffer,
    init_draw_bind_group_layout, init_quad_vertex_buffer, prepare_draw_bind_group,
    update_camera_uniform,
};
use crate::gpu::draw_pass::{ParticlesDrawNode, ParticlesDrawPassLabel};
use crate::gpu::draw_pipeline::prepare_draw_pipeline;
use crate::gpu::ffi::{GpuParticle, GpuSphState, GravityParams, SphParams};
use crate::gpu::pipeline::{
    add_simulate_node_to_graph, prepare_gravity_pipeline, prepare_sph_pipelines,
};
use crate::params::{Bounds, SimulationParams};

// ==================== resources ======================================

/* interface of resources for the compute kernels -> actual resource binding
via BindGroup. All kernels share one layout: params UBO at 0, particle store
at 1, SPH state store at 2. */
#[derive(Resource, Clone)]
pub struct ComputeBindGroupLayout(pub BindGroupLayout);

#[derive(Resource, Clone, ExtractResource)]
pub struct ComputeBindGroup(pub BindGroup);

/// Device-resident particle and SPH state stores. Exclusively written by the
/// compute kernels; the draw pass only reads the particle buffer.
#[derive(Resource)]
pub struct ParticleBuffers {
    pub particle_buffer: Buffer,
    pub sph_state_buffer: Buffer,
    pub num_particles: u32,
}

// Rendering world copy
#[derive(Resource, Clone, ExtractResource)]
pub struct ExtractedParticleBuffers {
    pub particle_buffer: Buffer,
    pub sph_state_buffer: Buffer,
    pub num_particles: u32,
}

#[derive(Resource)]
pub struct SphParamsBuffer {
    pub buffer: Buffer,
}

#[derive(Resource)]
pub struct GravityParamsBuffer {
    pub buffer: Buffer,
}

#[derive(Resource, Clone, ExtractResource)]
pub struct ExtractedParamsBuffer {
    pub buffer: Buffer,
}

/// Optional seed state: insert before the plugin to take control of the
/// initial particle population (demos and parity checks do).
#[derive(Resource, Clone)]
pub struct InitialParticles(pub Vec<GpuParticle>);

/// When true, the simulate node copies the particle store into the readback
/// buffer after the compute passes. Used by the parity demo.
#[derive(Resource, Clone, ExtractResource)]
pub struct AllowCopy(pub bool);

#[derive(Resource)]
pub struct ReadbackBuffer {
    pub buffer: Buffer,
}

#[derive(Resource, Clone, ExtractResource)]
pub struct ExtractedReadbackBuffer {
    pub buffer: Buffer,
}

// =====================================================================

/// Seeds `count` particles uniformly inside `bounds`, velocities in
/// [-0.2, 0.2] per axis, lifetime 1.0, fixed color.
pub fn seed_particles(count: u32, bounds: &Bounds, rng: &mut impl Rng) -> Vec<GpuParticle> {
    let mut particles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        particles.push(GpuParticle {
            position: [
                rng.gen_range(bounds.min.x..=bounds.max.x),
                rng.gen_range(bounds.min.y..=bounds.max.y),
                rng.gen_range(bounds.min.z..=bounds.max.z),
            ],
            lifetime: 1.0,
            color: [0.2, 0.1, 0.9, 1.0],
            velocity: [
                rng.gen_range(-0.2..=0.2),
                rng.gen_range(-0.2..=0.2),
                rng.gen_range(-0.2..=0.2),
            ],
            _pad: 0.0,
        });
    }
    particles
}

// ========================== systems ==================================

// Startup systems that have to run only once

/// Creates both stores and uploads the seed state through a host-visible
/// staging buffer. The stores themselves are never host-mapped again; vertex
/// and storage usage does not guarantee mappability.
fn init_gpu_buffers(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    render_queue: Res<RenderQueue>,
    params: Res<SimulationParams>,
    seed: Option<Res<InitialParticles>>,
) {
    let particles = match seed {
        Some(seed) => seed.0.clone(),
        None => seed_particles(params.particle_count, &params.bounds, &mut rand::thread_rng()),
    };
    let num_particles = particles.len() as u32;
    let sph_states = vec![GpuSphState::default(); particles.len()];

    let particle_bytes: &[u8] = bytemuck::cast_slice(&particles);
    let sph_bytes: &[u8] = bytemuck::cast_slice(&sph_states);

    let particle_buffer = render_device.create_buffer(&BufferDescriptor {
        label: Some("particle_store"),
        size: particle_bytes.len() as u64,
        usage: BufferUsages::VERTEX
            | BufferUsages::STORAGE
            | BufferUsages::COPY_DST
            | BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let sph_state_buffer = render_device.create_buffer(&BufferDescriptor {
        label: Some("sph_state_store"),
        size: sph_bytes.len() as u64,
        usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    // staging buffers are written on the host, then copied across once
    let particle_staging = render_device.create_buffer(&BufferDescriptor {
        label: Some("particle_staging"),
        size: particle_bytes.len() as u64,
        usage: BufferUsages::COPY_SRC,
        mapped_at_creation: true,
    });
    particle_staging
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(particle_bytes);
    particle_staging.unmap();

    let sph_staging = render_device.create_buffer(&BufferDescriptor {
        label: Some("sph_state_staging"),
        size: sph_bytes.len() as u64,
        usage: BufferUsages::COPY_SRC,
        mapped_at_creation: true,
    });
    sph_staging
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(sph_bytes);
    sph_staging.unmap();

    let mut encoder = render_device
        .wgpu_device()
        .create_command_encoder(&CommandEncoderDescriptor {
            label: Some("particle_store_upload"),
        });
    encoder.copy_buffer_to_buffer(
        &particle_staging,
        0,
        &particle_buffer,
        0,
        particle_bytes.len() as u64,
    );
    encoder.copy_buffer_to_buffer(&sph_staging, 0, &sph_state_buffer, 0, sph_bytes.len() as u64);
    render_queue.submit([encoder.finish()]);

    let readback = render_device.create_buffer(&BufferDescriptor {
        label: Some("particle_readback"),
        size: particle_bytes.len() as u64,
        usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    info!("particle stores ready: {num_particles} particles");

    commands.insert_resource(ParticleBuffers {
        particle_buffer,
        sph_state_buffer,
        num_particles,
    });
    commands.insert_resource(ReadbackBuffer { buffer: readback });
}

fn init_compute_bind_group_layout(mut commands: Commands, render_device: Res<RenderDevice>) {
    let layout = render_device.create_bind_group_layout(
        Some("simulate_bind_group_layout"),
        &[
            // binding 0: simulation params (uniform)
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // binding 1: particle store (rw storage)
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // binding 2: SPH state store (rw storage)
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    );
    commands.insert_resource(ComputeBindGroupLayout(layout));
}

fn init_sph_params_buffer(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    params: Res<SimulationParams>,
) {
    let buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("sph_params_uniform"),
        contents: bytemuck::bytes_of(&params.to_sph_gpu()),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    commands.insert_resource(SphParamsBuffer { buffer });
}

fn init_gravity_params_buffer(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    params: Res<SimulationParams>,
) {
    let buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("gravity_params_uniform"),
        contents: bytemuck::bytes_of(&params.to_gravity_gpu()),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    commands.insert_resource(GravityParamsBuffer { buffer });
}

// Update systems that have to run per frame

pub fn write_sph_params(
    params: Res<SimulationParams>,
    ubo: Option<Res<SphParamsBuffer>>,
    render_queue: Res<RenderQueue>,
) {
    let Some(ubo) = ubo else {
        return;
    };
    let gpu_params: SphParams = params.to_sph_gpu();
    render_queue.write_buffer(&ubo.buffer, 0, bytemuck::bytes_of(&gpu_params));
}

pub fn write_gravity_params(
    params: Res<SimulationParams>,
    ubo: Option<Res<GravityParamsBuffer>>,
    render_queue: Res<RenderQueue>,
) {
    let Some(ubo) = ubo else {
        return;
    };
    let gpu_params: GravityParams = params.to_gravity_gpu();
    render_queue.write_buffer(&ubo.buffer, 0, bytemuck::bytes_of(&gpu_params));
}

// Extract systems that send from App to Render

fn extract_particle_buffers(
    mut commands: Commands,
    particle_buffers: Extract<Option<Res<ParticleBuffers>>>,
) {
    let Some(particle_buffers) = particle_buffers.as_ref() else {
        return;
    };
    commands.insert_resource(ExtractedParticleBuffers {
        particle_buffer: particle_buffers.particle_buffer.clone(),
        sph_state_buffer: particle_buffers.sph_state_buffer.clone(),
        num_particles: particle_buffers.num_particles,
    });
}

fn extract_compute_layout(mut commands: Commands, layout: Extract<Res<ComputeBindGroupLayout>>) {
    commands.insert_resource(ComputeBindGroupLayout(layout.0.clone()));
}

fn extract_sph_params_buffer(mut commands: Commands, ubo: Extract<Option<Res<SphParamsBuffer>>>) {
    let Some(ubo) = ubo.as_ref() else {
        return;
    };
    commands.insert_resource(ExtractedParamsBuffer {
        buffer: ubo.buffer.clone(),
    });
}

fn extract_gravity_params_buffer(
    mut commands: Commands,
    ubo: Extract<Option<Res<GravityParamsBuffer>>>,
) {
    let Some(ubo) = ubo.as_ref() else {
        return;
    };
    commands.insert_resource(ExtractedParamsBuffer {
        buffer: ubo.buffer.clone(),
    });
}

fn extract_readback(
    mut commands: Commands,
    allow_copy: Extract<Option<Res<AllowCopy>>>,
    readback: Extract<Option<Res<ReadbackBuffer>>>,
) {
    if let Some(allow_copy) = allow_copy.as_ref() {
        commands.insert_resource(AllowCopy(allow_copy.0));
    }
    if let Some(readback) = readback.as_ref() {
        commands.insert_resource(ExtractedReadbackBuffer {
            buffer: readback.buffer.clone(),
        });
    }
}

// Prepare systems that run in Render

fn prepare_compute_bind_group(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    layout: Option<Res<ComputeBindGroupLayout>>,
    buffers: Option<Res<ExtractedParticleBuffers>>,
    params: Option<Res<ExtractedParamsBuffer>>,
) {
    let (Some(layout), Some(buffers), Some(params)) = (layout, buffers, params) else {
        return;
    };
    let bind_group = render_device.create_bind_group(
        Some("simulate_bind_group"),
        &layout.0,
        &[
            BindGroupEntry {
                binding: 0,
                resource: params.buffer.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: buffers.particle_buffer.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: buffers.sph_state_buffer.as_entire_binding(),
            },
        ],
    );
    commands.insert_resource(ComputeBindGroup(bind_group));
}

// =====================================================================

// Plugins

/// Shared machinery: stores, compute bind group, billboard draw pass.
/// Installed by both simulation variants.
struct ParticleCorePlugin;

impl Plugin for ParticleCorePlugin {
    fn build(&self, app: &mut App) {
        // App
        app.init_resource::<SimulationParams>();
        if app.world().get_resource::<AllowCopy>().is_none() {
            app.insert_resource(AllowCopy(false));
        }
        app.add_systems(
            Startup,
            (
                init_gpu_buffers,
                init_compute_bind_group_layout,
                init_quad_vertex_buffer,
                init_camera_buffer,
                init_draw_bind_group_layout,
            ),
        )
        .add_systems(Update, update_camera_uniform);

        // Render
        let render_app = app.sub_app_mut(RenderApp);
        render_app
            .add_systems(
                ExtractSchedule,
                (
                    extract_particle_buffers,
                    extract_compute_layout,
                    extract_readback,
                    extract_camera_buffer,
                    extract_draw_layout,
                    extract_quad_vertex_buffer,
                ),
            )
            .add_systems(
                Render,
                (
                    prepare_compute_bind_group.in_set(RenderSet::Prepare),
                    prepare_draw_bind_group.in_set(RenderSet::Prepare),
                    prepare_draw_pipeline.in_set(RenderSet::Prepare),
                ),
            );

        render_app
            .add_render_graph_node::<ViewNodeRunner<ParticlesDrawNode>>(
                Core3d,
                ParticlesDrawPassLabel,
            )
            .add_render_graph_edges(
                Core3d,
                (
                    Node3d::MainTransparentPass,
                    ParticlesDrawPassLabel,
                    Node3d::EndMainPass,
                ),
            );
    }
}

/// SPH fluid variant: density-pressure, forces and integrate kernels run in
/// that order every frame, then the billboard pass draws the result.
pub struct SphParticlePlugin;

impl Plugin for SphParticlePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ParticleCorePlugin)
            .add_systems(Startup, init_sph_params_buffer)
            .add_systems(Update, write_sph_params);

        let render_app = app.sub_app_mut(RenderApp);
        render_app
            .add_systems(ExtractSchedule, extract_sph_params_buffer)
            .add_systems(Render, prepare_sph_pipelines.in_set(RenderSet::Prepare));

        add_simulate_node_to_graph(render_app);
    }
}

/// Simple variant: gravity plus boundary bounce in a single kernel, no
/// auxiliary SPH state is read or written.
pub struct GravityParticlePlugin;

impl Plugin for GravityParticlePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(ParticleCorePlugin)
            .add_systems(Startup, init_gravity_params_buffer)
            .add_systems(Update, write_gravity_params);

        let render_app = app.sub_app_mut(RenderApp);
        render_app
            .add_systems(ExtractSchedule, extract_gravity_params_buffer)
            .add_systems(Render, prepare_gravity_pipeline.in_set(RenderSet::Prepare));

        add_simulate_node_to_graph(render_app);
    }
}
