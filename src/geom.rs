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

use std::ops::{AddAssign, SubAssign};

use cgmath::{EuclideanSpace, Point3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum tolerence for error, i.e. what we consider the x86 floating
/// point epsilon.
pub const COLLISION_EPSILON: f32 = 0.000001;

/// Axis Aligned Bounding Boxes are closed boxes aligned to the axes of the
/// coordinate system. AABBs are described by a point and three half widths.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub c: Point3<f32>,
    pub r: Vector3<f32>,
}

impl AABB {
    /// Builds the box spanning two opposite corners, in any order.
    pub fn from_corners(a: Point3<f32>, b: Point3<f32>) -> Self {
        let lower = Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let upper = Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        AABB {
            c: lower.midpoint(upper),
            r: (upper - lower) / 2.0,
        }
    }

    #[inline(always)]
    pub fn min(&self) -> Point3<f32> {
        self.c - self.r
    }

    #[inline(always)]
    pub fn max(&self) -> Point3<f32> {
        self.c + self.r
    }

    /// A point drawn uniformly from the box. Flat boxes are fine.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Point3<f32> {
        let (u, v, w): (f32, f32, f32) = rng.gen();
        self.c + Vector3::new(
            self.r.x * (2.0 * u - 1.0),
            self.r.y * (2.0 * v - 1.0),
            self.r.z * (2.0 * w - 1.0),
        )
    }

    /// The box shrunk by `s` on every side. Half widths never go negative.
    pub fn shrink(&self, s: f32) -> Self {
        AABB {
            r: Vector3::new((self.r.x - s).max(0.0), (self.r.y - s).max(0.0), (self.r.z - s).max(0.0)),
            ..*self
        }
    }
}

/// Spheres are a point and a distance.
/// Like AABBs, spheres as bounds are closed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub c: Point3<f32>,
    pub r: f32,
}

/// A type that describes a set of points in space.
///
/// Shapes can be moved around by adding or subtracting vectors.
pub trait Shape
    : AddAssign<Vector3<f32>>
    + SubAssign<Vector3<f32>>
{
    /// Returns the center of mass of the geometry, assuming a regular density.
    fn center(&self) -> Point3<f32>;

    /// Sets the center of the shape to p.
    fn set_pos(&mut self, p: Point3<f32>) {
        let disp = p - self.center();
        *self += disp;
    }
}
