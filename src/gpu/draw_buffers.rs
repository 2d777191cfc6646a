use std::f32::consts::PI;

use bevy::prelude::*;
use bevy::render::render_resource::*;
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy::window::PrimaryWindow;

use bevy::render::Extract;
use bevy::render::extract_resource::ExtractResource;

use crate::gpu::buffers::ExtractedParticleBuffers;
use crate::gpu::ffi::CameraUniform;

// ---------------- Types ----------------

#[derive(Resource)]
pub struct CameraBuffer {
    pub buffer: Buffer,
}

#[derive(Resource, Clone, ExtractResource)]
pub struct ExtractedCameraBuffer {
    pub buffer: Buffer,
}

#[derive(Resource, Clone)]
pub struct DrawBindGroupLayout(pub BindGroupLayout);

#[derive(Resource)]
pub struct DrawBindGroup(pub BindGroup);

#[derive(Resource)]
pub struct QuadVertexBuffer {
    pub buffer: Buffer,
}

// one camera-facing quad, two triangles, expanded along right/up in the shader
const QUAD_VERTS: &[[f32; 2]] = &[
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// Fixed eye pose: pulled back three units and tilted down. No user camera
/// control; the uniform is recomputed every frame anyway so a controllable
/// camera only needs to change this function.
fn camera_uniform(aspect: f32) -> CameraUniform {
    let projection = Mat4::perspective_rh(2.0 * PI / 5.0, aspect, 1.0, 100.0);
    let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)) * Mat4::from_rotation_x(-0.2 * PI);
    let view_proj = projection * view;

    // rows of the view rotation are the camera basis in world space
    let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
    let up = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);

    CameraUniform {
        view_proj: view_proj.to_cols_array_2d(),
        right: right.to_array(),
        _pad0: 0.0,
        up: up.to_array(),
        _pad1: 0.0,
    }
}

// ---------------- Systems (App world) ----------------

pub fn init_camera_buffer(mut commands: Commands, rd: Res<RenderDevice>) {
    let buffer = rd.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("camera_uniform"),
        contents: bytemuck::bytes_of(&camera_uniform(16.0 / 9.0)),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    commands.insert_resource(CameraBuffer { buffer });
}

pub fn init_quad_vertex_buffer(mut commands: Commands, rd: Res<RenderDevice>) {
    let buffer = rd.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("billboard_quad_vb"),
        contents: bytemuck::cast_slice(QUAD_VERTS),
        usage: BufferUsages::VERTEX,
    });
    commands.insert_resource(QuadVertexBuffer { buffer });
}

// Layout: 0 = camera UBO, visible to the vertex stage
pub fn init_draw_bind_group_layout(mut commands: Commands, rd: Res<RenderDevice>) {
    let layout = rd.create_bind_group_layout(
        Some("particles_draw_bgl"),
        &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    );
    commands.insert_resource(DrawBindGroupLayout(layout));
}

/// Rewrites the camera uniform each frame from the window aspect ratio.
pub fn update_camera_uniform(
    rq: Res<RenderQueue>,
    camera: Option<Res<CameraBuffer>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Some(camera) = camera else {
        return;
    };
    let aspect = match windows.single() {
        Ok(window) => window.resolution.width() / window.resolution.height().max(1.0),
        Err(_) => 16.0 / 9.0,
    };
    rq.write_buffer(&camera.buffer, 0, bytemuck::bytes_of(&camera_uniform(aspect)));
}

// ---------------- Systems (Render world) ----------------

pub fn extract_camera_buffer(mut commands: Commands, camera: Extract<Option<Res<CameraBuffer>>>) {
    let Some(camera) = camera.as_ref() else {
        return;
    };
    commands.insert_resource(ExtractedCameraBuffer {
        buffer: camera.buffer.clone(),
    });
}

pub fn extract_draw_layout(mut commands: Commands, layout: Extract<Res<DrawBindGroupLayout>>) {
    commands.insert_resource(DrawBindGroupLayout(layout.0.clone()));
}

pub fn extract_quad_vertex_buffer(
    mut commands: Commands,
    quad: Extract<Option<Res<QuadVertexBuffer>>>,
) {
    let Some(quad) = quad.as_ref() else {
        return;
    };
    commands.insert_resource(QuadVertexBuffer {
        buffer: quad.buffer.clone(),
    });
}

pub fn prepare_draw_bind_group(
    mut commands: Commands,
    rd: Res<RenderDevice>,
    layout: Option<Res<DrawBindGroupLayout>>,
    camera: Option<Res<ExtractedCameraBuffer>>,
    particles: Option<Res<ExtractedParticleBuffers>>,
) {
    // the particle store is bound as a vertex buffer, not here, but its
    // presence gates the pass
    let (Some(layout), Some(camera), Some(_particles)) = (layout, camera, particles) else {
        return;
    };
    let bind_group = rd.create_bind_group(
        Some("particles_draw_bg"),
        &layout.0,
        &[BindGroupEntry {
            binding: 0,
            resource: camera.buffer.as_entire_binding(),
        }],
    );
    commands.insert_resource(DrawBindGroup(bind_group));
}
