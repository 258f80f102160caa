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

//! Boid flocking.
//!
//! Every step runs in three phases over the whole flock: neighbor search,
//! steering and integration. Steering only reads positions and velocities,
//! so every agent sees the same snapshot regardless of its index.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, One, Point3, Quaternion, Vector3, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{info, trace};

use crate::collision::Contains;
use crate::error::*;
use crate::geom::*;
use crate::orientation::*;

/// Indices of other agents in the same flock.
pub type NeighborList = SmallVec<[usize; 16]>;

/// Tunables of a flock.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Agents closer than this push each other apart.
    pub avoidance_radius: f32,
    /// Agents closer than this are neighbors.
    pub cohesion_radius: f32,
    /// Number of agents spawned by `reset`.
    pub size: usize,
    pub cohesion_weight: f32,
    pub alignment_weight: f32,
    pub avoidance_weight: f32,
    /// Strength of the push back from outside `bounds`.
    pub boundary_weight: f32,
    pub max_speed: f32,
    /// Agents outside this box steer straight back in.
    pub bounds: AABB,
    pub spawn_position: AABB,
    /// Box that initial velocities are drawn from.
    pub spawn_velocity: AABB,
    /// The model axis that is turned to face the direction of travel.
    pub heading: Vector3<f32>,
}

impl Default for FlockParams {
    fn default() -> Self {
        FlockParams {
            avoidance_radius: 5.0,
            cohesion_radius: 15.0,
            size: 100,
            cohesion_weight: 10.0,
            alignment_weight: 10.0,
            avoidance_weight: 10.0,
            boundary_weight: 10.0,
            max_speed: 10.0,
            bounds: AABB::from_corners(Point3::new(-20.0, 10.0, -20.0), Point3::new(20.0, 50.0, 20.0)),
            spawn_position: AABB::from_corners(Point3::new(-10.0, 5.0, -10.0), Point3::new(10.0, 25.0, 10.0)),
            spawn_velocity: AABB::from_corners(Point3::new(-10.0, -10.0, -10.0), Point3::new(10.0, 10.0, 10.0)),
            heading: Vector3::unit_y(),
        }
    }
}

impl FlockParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.avoidance_radius >= 0.0 && self.cohesion_radius >= 0.0) {
            return Err(SimError::InvalidParameter("flock radii must not be negative"));
        }
        if !(self.max_speed > 0.0) {
            return Err(SimError::InvalidParameter("max speed must be positive"));
        }
        if self.size == 0 {
            return Err(SimError::InvalidParameter("flock needs at least one agent"));
        }
        if self.heading.magnitude2() < DEGENERATE_EPSILON {
            return Err(SimError::InvalidParameter("heading axis must not be zero"));
        }
        Ok(())
    }
}

/// One member of a flock.
///
/// Orientation is derived from velocity every update and is never
/// integrated on its own.
#[derive(Clone, Debug, PartialEq)]
pub struct FlockAgent {
    pub x: Point3<f32>,
    pub v: Vector3<f32>,
    pub q: Quaternion<f32>,
    pub force: Vector3<f32>,
    neighbors: NeighborList,
    close_neighbors: NeighborList,
}

impl FlockAgent {
    pub fn new(x: Point3<f32>, v: Vector3<f32>) -> Self {
        FlockAgent {
            x,
            v,
            q: Quaternion::one(),
            force: Vector3::zero(),
            neighbors: NeighborList::new(),
            close_neighbors: NeighborList::new(),
        }
    }

    /// Agents within the cohesion radius, as of the last neighbor search.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// The subset of `neighbors` within the avoidance radius.
    pub fn close_neighbors(&self) -> &[usize] {
        &self.close_neighbors
    }

    pub fn apply_force(&mut self, f: Vector3<f32>) {
        self.force += f;
    }

    /// Moves the agent without touching its velocity.
    pub fn translate(&mut self, d: Vector3<f32>) {
        self.x += d;
    }

    /// Integrates one step and clears the per-step state.
    ///
    /// Speed is clamped to `max_speed` before moving. The agent turns
    /// `heading` towards its velocity; a stopped agent keeps its orientation.
    pub fn update(&mut self, dt: f32, max_speed: f32, heading: Vector3<f32>) {
        self.v += self.force * dt;
        if self.v.magnitude2() > max_speed * max_speed {
            self.v = self.v.normalize() * max_speed;
        }
        self.x += self.v * dt;
        if self.v.magnitude2() > DEGENERATE_EPSILON {
            self.q = quaternion_from_vector_pair(heading, self.v.normalize());
        } else {
            trace!("agent at rest, keeping orientation");
        }
        self.force = Vector3::zero();
        self.neighbors.clear();
        self.close_neighbors.clear();
    }

    /// World transform for rendering: translation then rotation.
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.x.to_vec()) * quaternion_to_matrix(self.q)
    }
}

#[derive(Copy, Clone, Debug)]
enum Steering {
    Add(Vector3<f32>),
    Replace(Vector3<f32>),
}

#[derive(Clone, Debug)]
pub struct Flock {
    params: FlockParams,
    agents: Vec<FlockAgent>,
}

impl Flock {
    /// A flock of `params.size` randomly placed agents.
    pub fn new<R: Rng>(params: FlockParams, rng: &mut R) -> Result<Self> {
        params.validate()?;
        let mut flock = Flock { params, agents: Vec::new() };
        flock.reset(rng);
        Ok(flock)
    }

    /// A flock made of the given agents. `params.size` is ignored.
    pub fn with_agents(params: FlockParams, agents: Vec<FlockAgent>) -> Result<Self> {
        let size = agents.len();
        FlockParams { size: size.max(1), ..params }.validate()?;
        Ok(Flock { params: FlockParams { size, ..params }, agents })
    }

    /// Replaces every agent with a fresh random one.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        let params = &self.params;
        self.agents = (0..params.size)
            .map(|_| FlockAgent::new(params.spawn_position.sample(rng), params.spawn_velocity.sample(rng).to_vec()))
            .collect();
        info!(agents = self.agents.len(), "flock reset");
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    pub fn agents(&self) -> &[FlockAgent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [FlockAgent] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Rebuilds every agent's neighbor lists from scratch.
    ///
    /// Each unordered pair is tested once and recorded on both sides.
    pub fn find_neighbors(&mut self) {
        for agent in self.agents.iter_mut() {
            agent.neighbors.clear();
            agent.close_neighbors.clear();
        }
        let (cohesion, avoidance) = (self.params.cohesion_radius, self.params.avoidance_radius);
        for j in 1..self.agents.len() {
            let (head, tail) = self.agents.split_at_mut(j);
            let b = &mut tail[0];
            for (i, a) in head.iter_mut().enumerate() {
                let dist = (a.x - b.x).magnitude();
                if dist < cohesion {
                    a.neighbors.push(j);
                    b.neighbors.push(i);
                    if dist < avoidance {
                        a.close_neighbors.push(j);
                        b.close_neighbors.push(i);
                    }
                }
            }
        }
    }

    /// The steering force on agent `i` from the current neighbor lists.
    ///
    /// Outside the bounds this is the push back in and nothing else.
    pub fn steering_force(&self, i: usize) -> Vector3<f32> {
        match self.steering(i) {
            Steering::Add(f) | Steering::Replace(f) => f,
        }
    }

    fn steering(&self, i: usize) -> Steering {
        let agent = &self.agents[i];
        let p = &self.params;
        if let Some(push) = boundary_override(agent.x, &p.bounds, p.boundary_weight) {
            return Steering::Replace(push);
        }

        let mut force = Vector3::zero();
        if !agent.neighbors.is_empty() {
            let n = agent.neighbors.len() as f32;
            let velocity = agent.neighbors.iter()
                .fold(Vector3::zero(), |sum, &j| sum + self.agents[j].v) / n;
            force += normalize_or_zero(velocity) * p.alignment_weight;

            // Towards the average position itself, not the offset to it.
            let centroid = agent.neighbors.iter()
                .fold(Vector3::zero(), |sum, &j| sum + self.agents[j].x.to_vec()) / n;
            force += normalize_or_zero(centroid) * p.cohesion_weight;
        }

        if !agent.close_neighbors.is_empty() {
            let away = agent.close_neighbors.iter()
                .fold(Vector3::zero(), |sum, &j| sum + (agent.x - self.agents[j].x))
                / agent.close_neighbors.len() as f32;
            force += normalize_or_zero(away) * p.avoidance_weight;
        }
        Steering::Add(force)
    }

    /// Computes every agent's steering and applies it. Agents outside the
    /// bounds drop whatever force they had accumulated for the push back.
    pub fn steer(&mut self) {
        let steering: Vec<Steering> = (0..self.agents.len()).map(|i| self.steering(i)).collect();
        for (agent, s) in self.agents.iter_mut().zip(steering) {
            match s {
                Steering::Add(f) => agent.apply_force(f),
                Steering::Replace(f) => agent.force = f,
            }
        }
    }

    /// Integrates every agent, clearing forces and neighbor lists.
    pub fn update(&mut self, dt: f32) {
        let (max_speed, heading) = (self.params.max_speed, self.params.heading);
        for agent in self.agents.iter_mut() {
            agent.update(dt, max_speed, heading);
        }
    }

    /// One full step. Returns each agent's world transform.
    pub fn step(&mut self, dt: f32) -> Vec<Matrix4<f32>> {
        self.find_neighbors();
        self.steer();
        self.update(dt);
        self.transforms()
    }

    pub fn transforms(&self) -> Vec<Matrix4<f32>> {
        self.agents.iter().map(FlockAgent::transform).collect()
    }
}

/// The push back towards the inside of `bounds`, if `x` is outside it.
///
/// Axes are checked in the order -X, +X, -Z, +Z, -Y, +Y and the last
/// violated one wins; the push replaces all other steering.
pub fn boundary_override(x: Point3<f32>, bounds: &AABB, weight: f32) -> Option<Vector3<f32>> {
    if bounds.contains(&x) {
        return None;
    }
    let (lower, upper) = (bounds.min(), bounds.max());
    let mut push = None;
    for &axis in [0, 2, 1].iter() {
        let mut n = Vector3::zero();
        if x[axis] < lower[axis] {
            n[axis] = weight;
            push = Some(n);
        }
        if x[axis] > upper[axis] {
            n[axis] = -weight;
            push = Some(n);
        }
    }
    push
}
