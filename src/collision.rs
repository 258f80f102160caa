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

use std::ops::Neg;

use cgmath::{InnerSpace, Point3, Vector3};
use tracing::trace;

use crate::geom::*;

/// A type that can completely subsume another.
pub trait Contains<RHS> {
    /// Returns true if the current object contains the argument.
    fn contains(&self, rhs: &RHS) -> bool;
}

impl Contains<Point3<f32>> for AABB {
    fn contains(&self, p: &Point3<f32>) -> bool {
        (p.x - self.c.x).abs() <= self.r.x
            && (p.y - self.c.y).abs() <= self.r.y
            && (p.z - self.c.z).abs() <= self.r.z
    }
}

/// A penetration between two discrete objects at the end of a timestep.
///
/// The normal points from the collidee towards the collider, so moving the
/// collider along `n` by `depth` separates the two.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// Unit collision normal.
    pub n: Vector3<f32>,
    /// How far the objects interpenetrate along the normal.
    pub depth: f32,
}

impl Neg for Contact {
    type Output = Contact;

    /// Flip the normal, as seen from the other object.
    fn neg(self) -> Self {
        Contact {
            n: -self.n,
            ..self
        }
    }
}

/// Fallback normal for spheres whose centers coincide.
pub const COINCIDENT_NORMAL: Vector3<f32> = Vector3 { x: 0.0, y: 1.0, z: 0.0 };

/// A type that can report the contact it makes with another.
///
/// Touching is not intersecting: the objects must interpenetrate by a
/// positive depth.
pub trait Intersects<RHS> {
    /// Returns the contact, with its normal pointing towards `self`.
    fn intersection(&self, rhs: &RHS) -> Option<Contact>;
}

impl Intersects<Sphere> for Sphere {
    fn intersection(&self, rhs: &Sphere) -> Option<Contact> {
        let radii = self.r + rhs.r;
        let d = self.c - rhs.c;
        let dist2 = d.magnitude2();
        if dist2 >= radii * radii {
            return None;
        }
        if dist2 < COLLISION_EPSILON * COLLISION_EPSILON {
            trace!("coincident sphere centers, using fallback normal");
            return Some(Contact { n: COINCIDENT_NORMAL, depth: radii });
        }
        let dist = dist2.sqrt();
        Some(Contact { n: d / dist, depth: radii - dist })
    }
}

/// `a.intersection(b)` under the name used by the simulation loop.
#[inline(always)]
pub fn intersect_sphere_pair(a: &Sphere, b: &Sphere) -> Option<Contact> {
    a.intersection(b)
}

/// A type that can produce several contacts with another.
///
/// Contacts are handed to a closure, one per touching feature.
pub trait Contacts<RHS> {
    /// Calls the closure for each contact found. Returns true if any contact was
    /// found.
    fn contacts<F: FnMut(Contact)>(&self, rhs: &RHS, callback: F) -> bool;

    /// Returns the last contact found, if one exists.
    fn last_contact(&self, rhs: &RHS) -> Option<Contact> {
        let mut contact = None;
        self.contacts(rhs, |c|{ contact = Some(c); });
        contact
    }
}

impl Contacts<AABB> for Sphere {
    /// Treats the box as six walls enclosing the sphere and reports one
    /// contact per wall the sphere pokes through. Normals point inwards.
    fn contacts<F: FnMut(Contact)>(&self, walls: &AABB, mut callback: F) -> bool {
        let (lower, upper) = (walls.min(), walls.max());
        let mut hit = false;
        for i in 0..3 {
            let mut n = Vector3::new(0.0, 0.0, 0.0);
            let below = lower[i] - (self.c[i] - self.r);
            if below > 0.0 {
                n[i] = 1.0;
                callback(Contact { n, depth: below });
                hit = true;
            }
            let above = (self.c[i] + self.r) - upper[i];
            if above > 0.0 {
                n[i] = -1.0;
                callback(Contact { n, depth: above });
                hit = true;
            }
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    mod spheres {
        use cgmath::{Point3, Vector3};

        use crate::collision::*;
        use crate::geom::{Sphere, AABB};

        fn sphere(x: f32, y: f32, z: f32, r: f32) -> Sphere {
            Sphere { c: Point3::new(x, y, z), r }
        }

        #[test]
        fn test_sphere_pair() {
            let a = sphere(0.0, 0.0, 0.0, 1.0);
            let b = sphere(1.5, 0.0, 0.0, 1.0);
            let c = intersect_sphere_pair(&a, &b).unwrap();
            assert_relative_eq!(c.n, Vector3::new(-1.0, 0.0, 0.0));
            assert_relative_eq!(c.depth, 0.5);

            // Touching spheres do not intersect.
            assert!(intersect_sphere_pair(&a, &sphere(2.0, 0.0, 0.0, 1.0)).is_none());
        }

        #[test]
        fn test_sphere_pair_is_symmetric() {
            let pairs = [
                (sphere(0.0, 0.0, 0.0, 1.0), sphere(0.5, 1.0, -0.3, 0.75)),
                (sphere(3.0, 2.0, 1.0, 2.0), sphere(1.0, 1.0, 1.0, 0.5)),
                (sphere(0.0, 0.0, 0.0, 1.0), sphere(5.0, 0.0, 0.0, 1.0)),
            ];
            for &(a, b) in pairs.iter() {
                match (a.intersection(&b), b.intersection(&a)) {
                    (Some(ab), Some(ba)) => {
                        assert_relative_eq!(ab.depth, ba.depth);
                        assert_relative_eq!(ab.n, -ba.n);
                    },
                    (None, None) => (),
                    _ => panic!("asymmetric intersection"),
                }
            }
        }

        #[test]
        fn test_coincident_spheres() {
            let a = sphere(1.0, 1.0, 1.0, 1.0);
            let b = sphere(1.0, 1.0, 1.0, 2.0);
            let c = a.intersection(&b).unwrap();
            assert_eq!(c.n, COINCIDENT_NORMAL);
            assert_eq!(c.depth, 3.0);
        }

        #[test]
        fn test_wall_contacts() {
            let walls = AABB::from_corners(Point3::new(-15.0, 0.0, -15.0), Point3::new(15.0, 30.0, 15.0));
            let mut count = 0;
            assert!(!sphere(0.0, 10.0, 0.0, 1.0).contacts(&walls, |_| count += 1));
            assert_eq!(count, 0);

            let mut found = Vec::new();
            let s = sphere(14.5, 0.25, 0.0, 1.0);
            assert!(s.contacts(&walls, |c| found.push(c)));
            assert_eq!(found.len(), 2);
            assert_eq!(found[0].n, Vector3::new(-1.0, 0.0, 0.0));
            assert_relative_eq!(found[0].depth, 0.5);
            assert_eq!(found[1].n, Vector3::new(0.0, 1.0, 0.0));
            assert_relative_eq!(found[1].depth, 0.75);
            assert_eq!(s.last_contact(&walls), Some(found[1]));
        }

        #[test]
        fn test_box_contains_point() {
            let b = AABB { c: Point3::new(0.0, 0.0, 0.0), r: Vector3::new(1.0, 1.0, 1.0) };
            assert!(b.contains(&Point3::new(1.0, -1.0, 0.0)));
            assert!(!b.contains(&Point3::new(1.5, 0.0, 0.0)));
        }
    }
}
