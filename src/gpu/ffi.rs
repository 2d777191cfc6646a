use bytemuck::{Pod, Zeroable};

/// One particle as the shaders see it. 48-byte stride; the storage buffer,
/// the WGSL struct and the instance vertex layout must all agree on it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuParticle {
    // not using glam to make sure WGSL compatibility
    pub position: [f32; 3],
    pub lifetime: f32,
    pub color: [f32; 4],
    pub velocity: [f32; 3],
    pub _pad: f32,
}

/// Byte offset of `position` inside [`GpuParticle`] (instance attribute 0).
pub const PARTICLE_POSITION_OFFSET: u64 = 0;
/// Byte offset of `color` inside [`GpuParticle`] (instance attribute 1).
pub const PARTICLE_COLOR_OFFSET: u64 = 16;

/// Per-particle SPH scalars, auxiliary to the particle store (same index).
/// Density and pressure are rewritten by the density-pressure kernel, force
/// by the forces kernel; the integration kernel only reads them.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuSphState {
    pub density: f32,
    pub pressure: f32,
    pub _pad0: [f32; 2],
    pub force: [f32; 3],
    pub _pad1: f32,
}

impl Default for GpuSphState {
    fn default() -> Self {
        Self {
            density: 1.0,
            pressure: 0.0,
            _pad0: [0.0; 2],
            force: [0.0; 3],
            _pad1: 0.0,
        }
    }
}

/// Uniform block for the three SPH kernels. `smoothing_radius_sq`,
/// `poly6_constant` and `spiky_constant` are derived from `smoothing_radius`
/// on the host and must never drift from it; see `SimulationParams`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SphParams {
    pub delta_time: f32,
    pub bounce: f32,
    pub particle_count: u32,
    pub gravity: f32,
    pub smoothing_radius: f32,
    pub smoothing_radius_sq: f32,
    pub particle_mass: f32,
    pub rest_density: f32,
    pub pressure_constant: f32,
    pub viscosity_constant: f32,
    pub _pad0: [f32; 2],
    pub bounds_min: [f32; 3],
    pub _pad1: f32,
    pub bounds_max: [f32; 3],
    pub _pad2: f32,
    pub poly6_constant: f32,
    pub spiky_constant: f32,
    pub _pad3: [f32; 2],
}

/// Uniform block for the single-kernel gravity variant. 16 floats; the pads
/// keep `bounds_min`/`bounds_max` on 16-byte boundaries.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GravityParams {
    pub delta_time: f32,
    pub bounce: f32,
    pub _pad0: [f32; 2],
    pub particle_count: u32,
    pub gravity: f32,
    pub _pad1: [f32; 2],
    pub bounds_min: [f32; 3],
    pub _pad2: f32,
    pub bounds_max: [f32; 3],
    pub _pad3: f32,
}

/// Camera uniform for the billboard draw pass: clip transform plus the
/// camera-space right/up basis the quads are expanded along.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub right: [f32; 3],
    pub _pad0: f32,
    pub up: [f32; 3],
    pub _pad1: f32,
}
