use bevy::asset::AssetServer;
use bevy::core_pipeline::core_3d::CORE_3D_DEPTH_FORMAT;
use bevy::prelude::*;
use bevy::render::render_resource::TextureFormat;
use bevy::render::render_resource::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, CachedPipelineState,
    CachedRenderPipelineId, ColorTargetState, ColorWrites, CompareFunction, DepthStencilState,
    FragmentState, MultisampleState, PipelineCache, PrimitiveState, RenderPipelineDescriptor,
    Shader, VertexAttribute, VertexBufferLayout, VertexFormat, VertexState, VertexStepMode,
};

use super::draw_buffers::DrawBindGroupLayout;
use crate::gpu::ffi::{GpuParticle, PARTICLE_COLOR_OFFSET, PARTICLE_POSITION_OFFSET};

#[derive(Resource)]
pub struct DrawPipeline(pub CachedRenderPipelineId);

/// Slot 0: the particle store itself, stepped per instance. Only position
/// and color are exposed; velocity/lifetime stay opaque to the draw pass.
fn instance_buffer_layout() -> VertexBufferLayout {
    VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuParticle>() as u64,
        step_mode: VertexStepMode::Instance,
        attributes: vec![
            VertexAttribute {
                format: VertexFormat::Float32x3,
                offset: PARTICLE_POSITION_OFFSET,
                shader_location: 0,
            },
            VertexAttribute {
                format: VertexFormat::Float32x4,
                offset: PARTICLE_COLOR_OFFSET,
                shader_location: 1,
            },
        ],
    }
}

// Slot 1: quad-local corner offsets
fn quad_buffer_layout() -> VertexBufferLayout {
    VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: vec![VertexAttribute {
            format: VertexFormat::Float32x2,
            offset: 0,
            shader_location: 2,
        }],
    }
}

pub fn prepare_draw_pipeline(
    mut commands: Commands,
    cache: Res<PipelineCache>,
    bgl: Option<Res<DrawBindGroupLayout>>,
    assets: Res<AssetServer>,
    mut cached: Local<Option<CachedRenderPipelineId>>,
) {
    let Some(bgl) = bgl else {
        return;
    };

    if cached.is_none() {
        let shader: Handle<Shader> = assets.load("shaders/particles_draw.wgsl");

        let desc = RenderPipelineDescriptor {
            label: Some("particles_draw_pipeline".into()),
            layout: vec![bgl.0.clone()],
            vertex: VertexState {
                shader: shader.clone(),
                entry_point: "vs_main".into(),
                shader_defs: vec![],
                buffers: vec![instance_buffer_layout(), quad_buffer_layout()],
            },
            fragment: Some(FragmentState {
                shader,
                entry_point: "fs_main".into(),
                shader_defs: vec![],
                targets: vec![Some(ColorTargetState {
                    format: TextureFormat::Rgba8UnormSrgb,
                    // additive: particles accumulate brightness, never occlude
                    blend: Some(BlendState {
                        color: BlendComponent {
                            src_factor: BlendFactor::SrcAlpha,
                            dst_factor: BlendFactor::One,
                            operation: BlendOperation::Add,
                        },
                        alpha: BlendComponent {
                            src_factor: BlendFactor::Zero,
                            dst_factor: BlendFactor::One,
                            operation: BlendOperation::Add,
                        },
                    }),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            // depth test against the scene, but never write: particles must
            // not occlude each other
            depth_stencil: Some(DepthStencilState {
                format: CORE_3D_DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::Less,
                stencil: default(),
                bias: default(),
            }),
            multisample: MultisampleState {
                count: 4, // match the core 3d view target
                ..Default::default()
            },
            push_constant_ranges: vec![],
            zero_initialize_workgroup_memory: false,
        };

        *cached = Some(cache.queue_render_pipeline(desc));
        return;
    }

    if let Some(id) = *cached {
        match cache.get_render_pipeline_state(id) {
            &CachedPipelineState::Ok(_) => {
                commands.insert_resource(DrawPipeline(id));
            }
            &CachedPipelineState::Err(ref err) => {
                error!("particles_draw_pipeline ERROR: {err:?}");
            }
            _ => {}
        }
    }
}
