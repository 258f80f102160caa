// Copyright 2017 Matthew Plant. This file is part of Kinesim.
//
// Kinesim is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Kinesim is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Kinesim. If not, see <http://www.gnu.org/licenses/>.

//! Sphere scenarios stepped by the host once per frame.

use std::fmt;
use std::str::FromStr;

use cgmath::{Matrix4, Point3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::*;
use crate::geom::*;
use crate::physics::*;

/// The two mutually exclusive ways spheres interact.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhysicsMode {
    /// Random spheres bouncing off each other.
    Collision,
    /// A star and its planets under mutual gravity. No contacts.
    Gravity,
}

impl Default for PhysicsMode {
    fn default() -> Self {
        PhysicsMode::Collision
    }
}

impl fmt::Display for PhysicsMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PhysicsMode::Collision => write!(f, "collision"),
            PhysicsMode::Gravity => write!(f, "gravity"),
        }
    }
}

impl FromStr for PhysicsMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collision" | "collide" => Ok(PhysicsMode::Collision),
            "gravity" | "orbit" => Ok(PhysicsMode::Gravity),
            _ => Err(SimError::UnknownName { kind: "physics mode", name: s.to_string() }),
        }
    }
}

/// Tunables of a sphere scenario.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    pub mode: PhysicsMode,
    /// Restitution of spawned spheres and of the walls.
    pub restitution: f32,
    /// Box the spheres are kept in. `None` lets them fly off.
    pub bounds: Option<AABB>,
    pub gravity_constant: f32,
    /// Spheres spawned in collision mode.
    pub body_count: usize,
    pub body_radius: f32,
    pub body_mass: f32,
    /// Box that collision spheres spawn in.
    pub spawn: AABB,
    /// Largest initial velocity component of a collision sphere.
    pub spawn_speed: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        PhysicsParams {
            mode: PhysicsMode::default(),
            restitution: 1.0,
            bounds: None,
            gravity_constant: 6.67e-11,
            body_count: 10,
            body_radius: 1.0,
            body_mass: 1.0,
            spawn: AABB::from_corners(Point3::new(-15.0, 0.0, -15.0), Point3::new(15.0, 30.0, 15.0)),
            spawn_speed: 5.0,
        }
    }
}

impl PhysicsParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.restitution >= 0.0 && self.restitution <= 1.0) {
            return Err(SimError::InvalidParameter("restitution must lie in [0, 1]"));
        }
        if !(self.body_radius > 0.0) {
            return Err(SimError::InvalidParameter("radius must be positive"));
        }
        if !(self.body_mass > 0.0) {
            return Err(SimError::InvalidParameter("mass must be positive"));
        }
        if !(self.gravity_constant >= 0.0) {
            return Err(SimError::InvalidParameter("gravity constant must not be negative"));
        }
        if !(self.spawn_speed >= 0.0) {
            return Err(SimError::InvalidParameter("spawn speed must not be negative"));
        }
        Ok(())
    }
}

/// What the renderer needs to draw one sphere.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ObjectState {
    pub position: Point3<f32>,
    pub radius: f32,
    pub color: [f32; 3],
    /// Translation, rotation and scale of a unit sphere mesh.
    pub transform: Matrix4<f32>,
}

pub const STAR_MASS: f32 = 1.0e15;
pub const STAR_RADIUS: f32 = 10.0;
pub const STAR_COLOR: [f32; 3] = [0.9, 0.9, 0.0];
pub const PLANET_MASS: f32 = 10.0;

/// A star at the origin and four planets in the XZ plane.
///
/// Planet `i` sits at distance `20 + 10 i` along +Z with radius `i + 1` and
/// moves along +X at `sqrt(c G M / d)`, with `c = 1 + 0.1 i`: a circular
/// orbit for the first, increasingly eccentric ones after it.
pub fn orbital_system<R: Rng>(g: f32, rng: &mut R) -> Result<(Vec<Body>, Vec<[f32; 3]>)> {
    let mut bodies = vec![Body::sphere(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0),
                                       STAR_MASS, 0.0, STAR_RADIUS)?];
    let mut colors = vec![STAR_COLOR];
    for i in 0..4 {
        let coeff = 1.0 + 0.1 * i as f32;
        let d = 20.0 + 10.0 * i as f32;
        let speed = (coeff * g * STAR_MASS / d).sqrt();
        bodies.push(Body::sphere(Point3::new(0.0, 0.0, d), Vector3::new(speed, 0.0, 0.0),
                                 PLANET_MASS, 0.0, 1.0 + i as f32)?);
        colors.push(rng.gen());
    }
    Ok((bodies, colors))
}

/// `count` spheres at random places in `params.spawn`, moving randomly.
pub fn random_spheres<R: Rng>(params: &PhysicsParams, rng: &mut R) -> Result<(Vec<Body>, Vec<[f32; 3]>)> {
    let spawn = params.spawn.shrink(params.body_radius);
    let s = params.spawn_speed;
    let velocities = AABB { c: Point3::new(0.0, 0.0, 0.0), r: Vector3::new(s, s, s) };
    let mut bodies = Vec::with_capacity(params.body_count);
    let mut colors = Vec::with_capacity(params.body_count);
    for _ in 0..params.body_count {
        let x = spawn.sample(rng);
        let v = velocities.sample(rng) - velocities.c;
        bodies.push(Body::sphere(x, v, params.body_mass, params.restitution, params.body_radius)?);
        colors.push(rng.gen());
    }
    Ok((bodies, colors))
}

/// The spheres of one demo and how they are stepped.
///
/// Collision mode runs integrate, walls, then pairs. Gravity mode
/// accumulates gravity, then integrates.
#[derive(Clone, Debug)]
pub struct Scenario {
    params: PhysicsParams,
    bodies: Vec<Body>,
    colors: Vec<[f32; 3]>,
    walls: Option<StaticBody>,
}

impl Scenario {
    pub fn new<R: Rng>(params: PhysicsParams, rng: &mut R) -> Result<Self> {
        params.validate()?;
        let mut scenario = Scenario {
            params,
            bodies: Vec::new(),
            colors: Vec::new(),
            walls: params.bounds.map(|w| StaticBody::new(params.restitution, w)),
        };
        scenario.reset(rng)?;
        Ok(scenario)
    }

    /// A scenario over the given bodies. Colors default to white.
    pub fn with_bodies(params: PhysicsParams, bodies: Vec<Body>) -> Result<Self> {
        params.validate()?;
        Ok(Scenario {
            params,
            colors: vec![[1.0, 1.0, 1.0]; bodies.len()],
            bodies,
            walls: params.bounds.map(|w| StaticBody::new(params.restitution, w)),
        })
    }

    /// Throws away every body and spawns a fresh set for the current mode.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let (bodies, colors) = match self.params.mode {
            PhysicsMode::Collision => random_spheres(&self.params, rng)?,
            PhysicsMode::Gravity => orbital_system(self.params.gravity_constant, rng)?,
        };
        self.bodies = bodies;
        self.colors = colors;
        info!(mode = %self.params.mode, bodies = self.bodies.len(), "scenario reset");
        Ok(())
    }

    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Advances the simulation by `dt` and reports every sphere.
    pub fn step(&mut self, dt: f32) -> Vec<ObjectState> {
        match self.params.mode {
            PhysicsMode::Collision => {
                for body in self.bodies.iter_mut() {
                    body.integrate(dt);
                }
                if let Some(ref mut walls) = self.walls {
                    for body in self.bodies.iter_mut() {
                        resolve_walls(body, walls);
                    }
                }
                resolve_pairs(&mut self.bodies);
            },
            PhysicsMode::Gravity => {
                apply_gravity(&mut self.bodies, self.params.gravity_constant);
                for body in self.bodies.iter_mut() {
                    body.integrate(dt);
                }
            },
        }
        self.states()
    }

    pub fn states(&self) -> Vec<ObjectState> {
        self.bodies.iter().zip(self.colors.iter())
            .map(|(body, &color)| ObjectState {
                position: body.x,
                radius: body.radius(),
                color,
                transform: body.transform(),
            })
            .collect()
    }
}
