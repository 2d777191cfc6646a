use std::f32::consts::PI;

use bevy::prelude::*;
use glam::Vec3;

use crate::gpu::ffi::{GravityParams, SphParams};

/// Axis-aligned box used both as the spawn volume and the collision boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        }
    }
}

/// Host-side simulation parameters, written to the GPU uniform every frame.
///
/// The smoothing radius and its derived values (`smoothing_radius_sq`,
/// `poly6_constant`, `spiky_constant`) are kept consistent by routing every
/// radius change through [`SimulationParams::set_smoothing_radius`]; the
/// derived fields are deliberately not public.
#[derive(Resource, Clone, Debug)]
pub struct SimulationParams {
    pub simulate: bool,
    pub delta_time: f32,
    pub gravity: f32,
    pub bounce: f32,
    pub particle_count: u32,
    pub bounds: Bounds,

    // SPH constants
    pub particle_mass: f32,
    pub rest_density: f32,
    pub pressure_constant: f32,
    pub viscosity_constant: f32,

    smoothing_radius: f32,
    smoothing_radius_sq: f32,
    poly6_constant: f32,
    spiky_constant: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let mut params = Self {
            simulate: true,
            delta_time: 0.01,
            gravity: -9.8,
            bounce: 0.7,
            particle_count: 10_000,
            bounds: Bounds::default(),
            particle_mass: 0.02,
            rest_density: 1.0,
            pressure_constant: 20.0,
            viscosity_constant: 0.1,
            smoothing_radius: 0.0,
            smoothing_radius_sq: 0.0,
            poly6_constant: 0.0,
            spiky_constant: 0.0,
        };
        params.set_smoothing_radius(0.2);
        params
    }
}

impl SimulationParams {
    /// Sets the smoothing radius and re-derives the squared radius and both
    /// kernel normalization constants in the same call, so they can never
    /// desynchronize from the radius itself.
    pub fn set_smoothing_radius(&mut self, h: f32) {
        self.smoothing_radius = h;
        self.smoothing_radius_sq = h * h;
        self.poly6_constant = 315.0 / (64.0 * PI * h.powi(9));
        self.spiky_constant = -45.0 / (PI * h.powi(6));
    }

    pub fn smoothing_radius(&self) -> f32 {
        self.smoothing_radius
    }

    pub fn smoothing_radius_sq(&self) -> f32 {
        self.smoothing_radius_sq
    }

    pub fn poly6_constant(&self) -> f32 {
        self.poly6_constant
    }

    pub fn spiky_constant(&self) -> f32 {
        self.spiky_constant
    }

    /// Effective time step: zero while the simulation is paused, which
    /// freezes the physics without stopping the render loop.
    fn effective_dt(&self) -> f32 {
        if self.simulate { self.delta_time } else { 0.0 }
    }

    /// Serializes into the SPH kernel uniform layout.
    pub fn to_sph_gpu(&self) -> SphParams {
        SphParams {
            delta_time: self.effective_dt(),
            bounce: self.bounce,
            particle_count: self.particle_count,
            gravity: self.gravity,
            smoothing_radius: self.smoothing_radius,
            smoothing_radius_sq: self.smoothing_radius_sq,
            particle_mass: self.particle_mass,
            rest_density: self.rest_density,
            pressure_constant: self.pressure_constant,
            viscosity_constant: self.viscosity_constant,
            _pad0: [0.0; 2],
            bounds_min: self.bounds.min.to_array(),
            _pad1: 0.0,
            bounds_max: self.bounds.max.to_array(),
            _pad2: 0.0,
            poly6_constant: self.poly6_constant,
            spiky_constant: self.spiky_constant,
            _pad3: [0.0; 2],
        }
    }

    /// Serializes into the gravity-variant uniform layout.
    pub fn to_gravity_gpu(&self) -> GravityParams {
        GravityParams {
            delta_time: self.effective_dt(),
            bounce: self.bounce,
            _pad0: [0.0; 2],
            particle_count: self.particle_count,
            gravity: self.gravity,
            _pad1: [0.0; 2],
            bounds_min: self.bounds.min.to_array(),
            _pad2: 0.0,
            bounds_max: self.bounds.max.to_array(),
            _pad3: 0.0,
        }
    }
}
