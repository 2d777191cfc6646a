//! GPU particle simulator: a gravity/bounding-box variant and an SPH fluid
//! variant sharing one architecture. Particle state lives in GPU storage
//! buffers, physics runs as ordered compute kernels in the render graph, and
//! the result is drawn as camera-facing additive billboards.

pub mod params;

pub mod cpu {
    pub mod sph3d;
}

pub mod gpu {
    pub mod buffers;
    pub mod draw_buffers;
    pub mod draw_pass;
    pub mod draw_pipeline;
    pub mod ffi;
    pub mod pipeline;
}

pub use gpu::buffers::{GravityParticlePlugin, SphParticlePlugin};
pub use params::{Bounds, SimulationParams};
