// smoothed particle hydrodynamics in 3D (CPU reference for the GPU kernels)
use bevy::prelude::Resource;
use glam::Vec3;

use crate::params::{Bounds, SimulationParams};

// 3D kernels, same normalization constants the GPU uniform carries

#[inline]
fn w_poly6(r2: f32, h: f32) -> f32 {
    let k = 315.0 / (64.0 * std::f32::consts::PI * h.powi(9));
    if r2 <= h * h {
        k * (h * h - r2).powi(3)
    } else {
        0.0
    }
}

#[inline]
fn grad_spiky(r: Vec3, h: f32) -> Vec3 {
    let r_len = r.length();
    let k = -45.0 / (std::f32::consts::PI * h.powi(6));
    if r_len == 0.0 || r_len >= h {
        Vec3::ZERO
    } else {
        k * (h - r_len).powi(2) * r.normalize()
    }
}

#[inline]
fn laplacian_visc(r: f32, h: f32) -> f32 {
    let k = 45.0 / (std::f32::consts::PI * h.powi(6));
    if r == 0.0 || r >= h { 0.0 } else { k * (h - r) }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec3,
    pub vel: Vec3,
    pub force: Vec3,
    pub rho: f32, // density
    pub p: f32,   // pressure
}

impl Particle {
    pub fn new(pos: Vec3, vel: Vec3) -> Self {
        Self {
            pos,
            vel,
            force: Vec3::ZERO,
            rho: 1.0,
            p: 0.0,
        }
    }
}

/// Exhaustive O(N²) reference solver. The GPU kernels must produce the same
/// fields for the same inputs; parity is checked in `demos/gpu_parity.rs`.
#[derive(Resource)]
pub struct SphSolver {
    pub h: f32,      // smoothing length
    pub m: f32,      // particle mass
    pub rho_0: f32,  // rest density
    pub k: f32,      // pressure (stiffness) constant
    pub mu: f32,     // viscosity constant
    pub gravity: f32,
    pub bounce: f32,
    pub bounds: Bounds,
    pub particles: Vec<Particle>,
}

impl SphSolver {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            h: params.smoothing_radius(),
            m: params.particle_mass,
            rho_0: params.rest_density,
            k: params.pressure_constant,
            mu: params.viscosity_constant,
            gravity: params.gravity,
            bounce: params.bounce,
            bounds: params.bounds,
            particles: Vec::new(),
        }
    }

    /// Density over all pairs (self pair included, so the estimate floors at
    /// the particle's own kernel contribution), then the linear equation of
    /// state `p = k (rho - rho_0)`.
    pub fn density_pressure(&mut self) {
        let h2 = self.h * self.h;
        let mut rho_vec = vec![0.0; self.particles.len()];

        for i in 0..self.particles.len() {
            let pos_i = self.particles[i].pos;
            let mut rho = 0.0;
            for particle_j in &self.particles {
                let r2 = (pos_i - particle_j.pos).length_squared();
                if r2 < h2 {
                    rho += self.m * w_poly6(r2, self.h);
                }
            }
            rho_vec[i] = rho;
        }
        for i in 0..self.particles.len() {
            self.particles[i].rho = rho_vec[i];
            self.particles[i].p = self.k * (rho_vec[i] - self.rho_0);
        }
    }

    /// Pressure-gradient, viscosity and gravity forces, reading the density
    /// and pressure the previous pass wrote.
    pub fn forces(&mut self) {
        let mut force_vec = vec![Vec3::ZERO; self.particles.len()];

        for i in 0..self.particles.len() {
            let particle_i = &self.particles[i];
            let pos_i = particle_i.pos;
            let p_i = particle_i.p;
            let vel_i = particle_i.vel;

            for (j, particle_j) in self.particles.iter().enumerate() {
                if i == j {
                    continue;
                }
                let r = pos_i - particle_j.pos;

                // pressure force, symmetrized between the pair's pressures
                let f_p = -self.m * (p_i + particle_j.p) / (2.0 * particle_j.rho)
                    * grad_spiky(r, self.h);

                // viscosity drives toward the neighbor velocity field
                let laplacian = laplacian_visc(r.length(), self.h);
                let f_v = self.mu * self.m * (particle_j.vel - vel_i) / particle_j.rho * laplacian;

                force_vec[i] += f_p + f_v;
            }

            // uniform gravity, weighted by density so acceleration stays g
            force_vec[i] += Vec3::new(0.0, self.gravity, 0.0) * particle_i.rho;
        }

        for i in 0..self.particles.len() {
            self.particles[i].force = force_vec[i];
        }
    }

    /// Semi-implicit Euler with per-axis boundary clamp and inelastic bounce.
    pub fn integrate(&mut self, dt: f32) {
        let bounds = self.bounds;
        let bounce = self.bounce;
        for p in &mut self.particles {
            p.vel += p.force / p.rho * dt;
            p.pos += p.vel * dt;

            for axis in 0..3 {
                if p.pos[axis] < bounds.min[axis] {
                    p.pos[axis] = bounds.min[axis];
                    p.vel[axis] *= -bounce;
                }
                if p.pos[axis] > bounds.max[axis] {
                    p.pos[axis] = bounds.max[axis];
                    p.vel[axis] *= -bounce;
                }
            }
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.density_pressure();
        self.forces();
        self.integrate(dt);
    }
}
