use std::borrow::Cow;

use bevy::prelude::*;
use bevy::render::graph::CameraDriverLabel;
use bevy::render::render_graph::{
    Node, NodeRunError, RenderGraph, RenderGraphContext, RenderLabel,
};
use bevy::render::render_resource::{
    CachedComputePipelineId, ComputePassDescriptor, ComputePipelineDescriptor, PipelineCache,
    PushConstantRange, Shader, ShaderDefVal,
};
use bevy::render::renderer::RenderContext;

use crate::gpu::buffers::{
    AllowCopy, ComputeBindGroup, ComputeBindGroupLayout, ExtractedParticleBuffers,
    ExtractedReadbackBuffer,
};

/// Lanes per workgroup in every compute kernel. Lanes past the particle
/// count no-op inside the shader.
pub const WORKGROUP_SIZE: u32 = 64;

/// Workgroups needed to cover `num_particles` at [`WORKGROUP_SIZE`].
pub const fn dispatch_group_count(num_particles: u32) -> u32 {
    num_particles.div_ceil(WORKGROUP_SIZE)
}

/// The three SPH kernels, in the order they must run. Each pass reads what
/// the previous one wrote; there is no other synchronization between them.
#[derive(Resource)]
pub struct SphPipelines {
    pub density_pressure: CachedComputePipelineId,
    pub forces: CachedComputePipelineId,
    pub integrate: CachedComputePipelineId,
}

#[derive(Resource)]
pub struct GravityPipeline(pub CachedComputePipelineId);

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct SimulatePassLabel;

#[derive(Default)]
struct SimulateNode;

impl Node for SimulateNode {
    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(bind_group) = world.get_resource::<ComputeBindGroup>() else {
            return Ok(());
        };
        let Some(extracted) = world.get_resource::<ExtractedParticleBuffers>() else {
            return Ok(());
        };
        let cache = world.resource::<PipelineCache>();

        // how many workgroups do we actually need?
        let workgroups = dispatch_group_count(extracted.num_particles.max(1));

        // collect the kernel sequence for whichever variant is installed
        let mut sequence = Vec::with_capacity(3);
        if let Some(sph) = world.get_resource::<SphPipelines>() {
            for id in [sph.density_pressure, sph.forces, sph.integrate] {
                let Some(pipeline) = cache.get_compute_pipeline(id) else {
                    return Ok(()); // still compiling; skip the whole batch
                };
                sequence.push(pipeline);
            }
        } else if let Some(gravity) = world.get_resource::<GravityPipeline>() {
            let Some(pipeline) = cache.get_compute_pipeline(gravity.0) else {
                return Ok(());
            };
            sequence.push(pipeline);
        } else {
            return Ok(());
        }

        {
            let mut pass = render_context
                .command_encoder()
                .begin_compute_pass(&ComputePassDescriptor::default());

            // dispatch boundaries order the storage writes: pass N+1 never
            // observes a mix of pre- and post-pass-N state
            for pipeline in sequence {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group.0, &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
        }

        // optional readback snapshot, after the kernels have run
        let allow_copy = world
            .get_resource::<AllowCopy>()
            .is_some_and(|allow| allow.0);
        if allow_copy {
            if let Some(readback) = world.get_resource::<ExtractedReadbackBuffer>() {
                render_context.command_encoder().copy_buffer_to_buffer(
                    &extracted.particle_buffer,
                    0,
                    &readback.buffer,
                    0,
                    readback.buffer.size(),
                );
            }
        }

        Ok(())
    }
}

fn queue_compute_pipeline(
    cache: &PipelineCache,
    layout: &ComputeBindGroupLayout,
    shader: Handle<Shader>,
    label: &'static str,
    entry_point: &'static str,
) -> CachedComputePipelineId {
    cache.queue_compute_pipeline(ComputePipelineDescriptor {
        label: Some(label.into()),
        layout: vec![layout.0.clone()],
        push_constant_ranges: Vec::<PushConstantRange>::new(),
        shader,
        shader_defs: Vec::<ShaderDefVal>::new(),
        entry_point: Cow::from(entry_point),
        zero_initialize_workgroup_memory: false,
    })
}

pub fn prepare_sph_pipelines(
    mut commands: Commands,
    pipeline_cache: Res<PipelineCache>,
    layout: Option<Res<ComputeBindGroupLayout>>,
    mut queued: Local<bool>,
    assets: Res<AssetServer>,
) {
    if *queued {
        return;
    }
    let Some(layout) = layout else {
        return;
    };

    let shader: Handle<Shader> = assets.load("shaders/sph_particles.wgsl");
    commands.insert_resource(SphPipelines {
        density_pressure: queue_compute_pipeline(
            &pipeline_cache,
            &layout,
            shader.clone(),
            "sph_density_pressure_pipeline",
            "compute_density_pressure",
        ),
        forces: queue_compute_pipeline(
            &pipeline_cache,
            &layout,
            shader.clone(),
            "sph_forces_pipeline",
            "compute_forces",
        ),
        integrate: queue_compute_pipeline(
            &pipeline_cache,
            &layout,
            shader,
            "sph_integrate_pipeline",
            "integrate",
        ),
    });
    *queued = true;
}

pub fn prepare_gravity_pipeline(
    mut commands: Commands,
    pipeline_cache: Res<PipelineCache>,
    layout: Option<Res<ComputeBindGroupLayout>>,
    mut queued: Local<bool>,
    assets: Res<AssetServer>,
) {
    if *queued {
        return;
    }
    let Some(layout) = layout else {
        return;
    };

    let shader: Handle<Shader> = assets.load("shaders/gravity_particles.wgsl");
    commands.insert_resource(GravityPipeline(queue_compute_pipeline(
        &pipeline_cache,
        &layout,
        shader,
        "gravity_simulate_pipeline",
        "simulate",
    )));
    *queued = true;
}

pub fn add_simulate_node_to_graph(render_app: &mut bevy::app::SubApp) {
    let mut graph = render_app.world_mut().resource_mut::<RenderGraph>();
    graph.add_node(SimulatePassLabel, SimulateNode::default());
    graph.add_node_edge(SimulatePassLabel, CameraDriverLabel);
}
