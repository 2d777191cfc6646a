use bevy::core_pipeline::core_3d::ViewDepthTexture;
use bevy::prelude::*;
use bevy::render::render_graph::{NodeRunError, RenderGraphContext, RenderLabel, ViewNode};
use bevy::render::render_resource::{PipelineCache, RenderPassDescriptor, StoreOp};
use bevy::render::renderer::RenderContext;
use bevy::render::view::ViewTarget;

use crate::gpu::buffers::ExtractedParticleBuffers;
use crate::gpu::draw_buffers::{DrawBindGroup, QuadVertexBuffer};
use crate::gpu::draw_pipeline::DrawPipeline;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct ParticlesDrawPassLabel;

/// Instanced billboard pass: 6 quad vertices per particle, instance data
/// read straight out of the particle store the compute node just updated.
#[derive(Default)]
pub struct ParticlesDrawNode;

impl ViewNode for ParticlesDrawNode {
    type ViewQuery = (&'static ViewTarget, &'static ViewDepthTexture);

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        rcx: &mut RenderContext,
        (view_target, view_depth): <Self::ViewQuery as bevy::ecs::query::QueryData>::Item<'_>,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(dp) = world.get_resource::<DrawPipeline>() else {
            return Ok(());
        };
        let cache = world.resource::<PipelineCache>();
        let Some(pipeline) = cache.get_render_pipeline(dp.0) else {
            return Ok(());
        };

        let Some(bg) = world.get_resource::<DrawBindGroup>() else {
            return Ok(());
        };
        let Some(quad) = world.get_resource::<QuadVertexBuffer>() else {
            return Ok(());
        };
        let Some(particles) = world.get_resource::<ExtractedParticleBuffers>() else {
            return Ok(());
        };
        if particles.num_particles == 0 {
            return Ok(());
        }

        let mut pass = rcx.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("ParticlesDrawPass"),
            color_attachments: &[Some(view_target.get_color_attachment())],
            depth_stencil_attachment: Some(view_depth.get_attachment(StoreOp::Store)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_render_pipeline(pipeline);
        pass.set_bind_group(0, &bg.0, &[]);
        pass.set_vertex_buffer(0, particles.particle_buffer.slice(..));
        pass.set_vertex_buffer(1, quad.buffer.slice(..));
        pass.draw(0..6, 0..particles.num_particles);
        Ok(())
    }
}
