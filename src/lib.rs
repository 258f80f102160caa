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

//! The simulation core behind a handful of small 3D demos: a walking rig
//! that follows a spline path, spheres that bounce or orbit, and a flock of
//! boids. Rendering, windows and input belong to the host; the host calls
//! into this crate once per frame and draws what comes back.
//!
//! # Overview
//!
//! - `Kernel` evaluates Catmull-Rom and uniform cubic B-spline segments.
//! - The orientation helpers convert between Euler angles, quaternions and
//!   4x4 rotation matrices, and find facing and shortest-arc rotations.
//! - `bake` turns control points into an `AnimationTrack` of poses, and an
//!   `Animator` plays a torso track and a looping leg swing back.
//! - `Body` and the `resolve_*` functions integrate spheres and resolve their
//!   contacts with impulses and positional correction, or pull them together
//!   with `apply_gravity`. `Scenario` wires them up as the demos do.
//! - `Flock` steers agents with cohesion, alignment and avoidance, and keeps
//!   them inside a box.
//!
//! Everything is single precision and single threaded. Degenerate inputs
//! (zero vectors, coincident centers) never panic or produce NaN; each is
//! resolved with a documented fallback. Only configuration is fallible, and
//! it fails with a `SimError`.

pub extern crate cgmath;
extern crate rand;
extern crate serde;
extern crate smallvec;
extern crate thiserror;
extern crate tracing;

#[cfg(test)]
#[macro_use]
extern crate approx;

mod error;
pub use error::*;

mod spline;
pub use spline::*;

mod orientation;
pub use orientation::*;

mod animation;
pub use animation::*;

mod geom;
pub use geom::*;

mod collision;
pub use collision::*;

mod physics;
pub use physics::*;

mod flock;
pub use flock::*;

mod scenario;
pub use scenario::*;
