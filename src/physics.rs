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

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, One, Point3, Quaternion, Vector3, Zero};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::collision::*;
use crate::error::*;
use crate::geom::*;

/// The collision volume of a body, relative to its position.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Sphere { r: f32 },
}

impl Component {
    /// Radius of the smallest sphere around the body's position enclosing
    /// the component.
    pub fn radius(&self) -> f32 {
        match *self {
            Component::Sphere { r } => r,
        }
    }
}

/// A body with linear motion only.
///
/// Rotation is carried along for rendering but never integrated; there is no
/// angular velocity and no inertia tensor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Body {
    pub x: Point3<f32>,
    pub v: Vector3<f32>,
    pub q: Quaternion<f32>,
    /// Force accumulated since the last integration.
    pub force: Vector3<f32>,
    pub mass: f32,
    /// Restitution is a measure of how much kinetic energy is retained in a
    /// collision. 100% of kinetic energy retention corresponds to a coefficient
    /// of one.
    pub restitution: f32,
    /// Stored but not used by resolution.
    pub friction: f32,
    pub shape: Component,
}

impl Body {
    /// Construct a new Body, at rest force-wise.
    pub fn new(
        x: Point3<f32>,
        v: Vector3<f32>,
        mass: f32,
        restitution: f32,
        friction: f32,
        shape: Component,
    ) -> Result<Self> {
        if !(mass > 0.0 && mass.is_finite()) {
            return Err(SimError::InvalidParameter("mass must be positive"));
        }
        if !(restitution >= 0.0 && restitution <= 1.0) {
            return Err(SimError::InvalidParameter("restitution must lie in [0, 1]"));
        }
        if !(shape.radius() > 0.0) {
            return Err(SimError::InvalidParameter("radius must be positive"));
        }
        Ok(Body {
            x,
            v,
            q: Quaternion::one(),
            force: Vector3::zero(),
            mass,
            restitution,
            friction,
            shape,
        })
    }

    /// Shorthand for a frictionless sphere.
    pub fn sphere(x: Point3<f32>, v: Vector3<f32>, mass: f32, restitution: f32, r: f32) -> Result<Self> {
        Body::new(x, v, mass, restitution, 0.0, Component::Sphere { r })
    }

    #[inline(always)]
    pub fn radius(&self) -> f32 {
        self.shape.radius()
    }

    /// The collider in world space.
    pub fn collider(&self) -> Sphere {
        Sphere { c: self.x, r: self.radius() }
    }

    /// Adds to the force applied on the next integration.
    pub fn apply_force(&mut self, f: Vector3<f32>) {
        self.force += f;
    }

    /// Moves the body without touching its velocity.
    pub fn translate(&mut self, d: Vector3<f32>) {
        self.x += d;
    }

    /// World transform for rendering: translation, rotation, then a uniform
    /// scale by the radius of a unit mesh.
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.x.to_vec())
            * Matrix4::from(self.q)
            * Matrix4::from_scale(self.radius())
    }
}

impl AddAssign<Vector3<f32>> for Body {
    fn add_assign(&mut self, v: Vector3<f32>) {
        self.x += v;
    }
}

impl SubAssign<Vector3<f32>> for Body {
    fn sub_assign(&mut self, v: Vector3<f32>) {
        self.x += -v;
    }
}

impl Shape for Body {
    /// The position of the body, which is also the center of its sphere.
    fn center(&self) -> Point3<f32> {
        self.x
    }
}

impl Intersects<Body> for Body {
    fn intersection(&self, rhs: &Body) -> Option<Contact> {
        self.collider().intersection(&rhs.collider())
    }
}

/// An immovable object: a set of walls enclosing the simulation.
#[derive(Copy, Clone, Debug)]
pub struct StaticBody {
    pub restitution: f32,
    pub walls: AABB,
}

impl StaticBody {
    /// Construct a new StaticBody from the box it encloses.
    pub fn new(restitution: f32, walls: AABB) -> Self {
        StaticBody {
            restitution,
            walls,
        }
    }
}

/// A description of the physical state of an object.
#[derive(Copy, Clone, Debug)]
pub struct PhysicsState {
    pub restitution: f32,
    /// We only ever need inverse mass for calcuations, plus it gives a neat
    /// advantage that we can represent immovable objects with an infinite mass,
    /// or an inverse mass of zero.
    pub inv_mass: f32,
    /// The linear velocity of the object
    pub v: Vector3<f32>,
}

/// A type that exhibits physical properties.
///
/// A PhysicsObject's primary function is to return a PhysicsState to be used
/// during collision resolution. Beyond that it has various methods to be updated
/// or choose to ignore such updates (for example, calling `apply_impulse` on a
/// StaticBody is a no-op).
pub trait PhysicsObject {
    /// Integrate the object over the timestep
    fn integrate(&mut self, dt: f32);

    /// Return the physics state of the object
    fn state(&self) -> PhysicsState;

    /// Apply a linear impulse to the object
    fn apply_impulse(&mut self, impulse: Vector3<f32>);

    /// Displace the object to correct penetration
    fn correct(&mut self, d: Vector3<f32>);
}

impl PhysicsObject for Body {
    /// Semi-implicit Euler: velocity first, then position with the new
    /// velocity. The force accumulator is cleared afterwards.
    fn integrate(&mut self, dt: f32) {
        self.v += self.force / self.mass * dt;
        self.x += self.v * dt;
        self.force = Vector3::zero();
    }

    fn state(&self) -> PhysicsState {
        PhysicsState {
            restitution: self.restitution,
            inv_mass: 1.0 / self.mass,
            v: self.v,
        }
    }

    fn apply_impulse(&mut self, impulse: Vector3<f32>) {
        self.v += impulse / self.mass;
    }

    fn correct(&mut self, d: Vector3<f32>) {
        self.x += d;
    }
}

impl PhysicsObject for StaticBody {
    #[inline(always)]
    fn integrate(&mut self, _dt: f32) {
        // Do nothing
    }

    fn state(&self) -> PhysicsState {
        PhysicsState {
            restitution: self.restitution,
            inv_mass: 0.0,  // Infinite mass
            v: Vector3::zero(),
        }
    }

    #[inline(always)]
    fn apply_impulse(&mut self, _impulse: Vector3<f32>) {
        // Do nothing
    }

    #[inline(always)]
    fn correct(&mut self, _d: Vector3<f32>) {
        // Do nothing
    }
}

impl PhysicsState {
    /// Resolve a contact whose normal points from `obj_b` towards `obj_a`.
    ///
    /// Both objects are first pushed apart along the normal, half the depth
    /// each, or the full depth for the only movable one. Then a normal
    /// impulse using the smaller restitution is applied if the objects are
    /// still approaching. Returns the impulse magnitude.
    pub fn resolve_contact<ObjA, ObjB>(obj_a: &mut ObjA, obj_b: &mut ObjB, contact: &Contact) -> f32
    where
        ObjA: PhysicsObject,
        ObjB: PhysicsObject,
    {
        let (state_a, state_b) = (obj_a.state(), obj_b.state());
        let inv_mass = state_a.inv_mass + state_b.inv_mass;
        if inv_mass <= 0.0 {
            return 0.0;
        }

        let (share_a, share_b) = match (state_a.inv_mass > 0.0, state_b.inv_mass > 0.0) {
            (true, true) => (0.5, 0.5),
            (true, false) => (1.0, 0.0),
            _ => (0.0, 1.0),
        };
        obj_a.correct(contact.n * (contact.depth * share_a));
        obj_b.correct(-contact.n * (contact.depth * share_b));

        let rel_v = (state_a.v - state_b.v).dot(contact.n);
        if rel_v >= 0.0 {
            trace!(rel_v, "separating contact, no impulse");
            return 0.0;
        }
        let restitution = state_a.restitution.min(state_b.restitution);
        let j = -(1.0 + restitution) * rel_v / inv_mass;
        obj_a.apply_impulse(contact.n * j);
        obj_b.apply_impulse(-contact.n * j);
        j
    }
}

/// Detects and resolves the contact between two bodies, if any.
pub fn resolve_pair(a: &mut Body, b: &mut Body) -> bool {
    match a.intersection(b) {
        Some(contact) => {
            PhysicsState::resolve_contact(a, b, &contact);
            true
        },
        None => false,
    }
}

/// Keeps a body inside the walls. Returns true if any wall was hit.
pub fn resolve_walls(body: &mut Body, walls: &mut StaticBody) -> bool {
    let mut contacts = SmallVec::<[Contact; 3]>::new();
    body.collider().contacts(&walls.walls, |c| contacts.push(c));
    for contact in contacts.iter() {
        PhysicsState::resolve_contact(body, walls, contact);
    }
    !contacts.is_empty()
}

/// Resolves every intersecting pair once, in index order. Returns the number
/// of pairs resolved.
pub fn resolve_pairs(bodies: &mut [Body]) -> usize {
    let mut resolved = 0;
    for j in 1..bodies.len() {
        let (head, tail) = bodies.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            if resolve_pair(a, b) {
                resolved += 1;
            }
        }
    }
    resolved
}

/// Adds the mutual gravitational pull of two bodies to their forces.
///
/// Bodies whose centers coincide exert nothing on each other.
pub fn accumulate_gravity(a: &mut Body, b: &mut Body, g: f32) {
    let diff = a.x - b.x;
    let d2 = diff.magnitude2();
    if d2 < COLLISION_EPSILON * COLLISION_EPSILON {
        trace!("coincident bodies, skipping gravity");
        return;
    }
    let f = g * a.mass * b.mass / d2;
    let n = diff / d2.sqrt();
    a.force -= n * f;
    b.force += n * f;
}

/// Accumulates gravity over every pair of bodies.
pub fn apply_gravity(bodies: &mut [Body], g: f32) {
    for j in 1..bodies.len() {
        let (head, tail) = bodies.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            accumulate_gravity(a, b, g);
        }
    }
}

#[cfg(test)]
mod tests {
    mod physics {
        use cgmath::{InnerSpace, Point3, Vector3, Vector4, Zero};

        use crate::collision::Contact;
        use crate::error::SimError;
        use crate::geom::{Shape, AABB};
        use crate::physics::*;

        fn ball(x: f32, vx: f32) -> Body {
            Body::sphere(Point3::new(x, 0.0, 0.0), Vector3::new(vx, 0.0, 0.0), 1.0, 1.0, 1.0).unwrap()
        }

        #[test]
        fn test_integrate() {
            let mut body = ball(0.0, 1.0);
            body.mass = 2.0;
            body.apply_force(Vector3::new(4.0, 0.0, 0.0));
            body.integrate(0.5);
            // v = 1 + 4 / 2 * 0.5, then x uses the new velocity.
            assert_relative_eq!(body.v, Vector3::new(2.0, 0.0, 0.0));
            assert_relative_eq!(body.x, Point3::new(1.0, 0.0, 0.0));
            assert_eq!(body.force, Vector3::zero());
        }

        #[test]
        fn test_head_on() {
            let mut a = ball(-0.9, 5.0);
            let mut b = ball(0.9, -5.0);
            assert!(resolve_pair(&mut a, &mut b));
            assert_relative_eq!(a.v, Vector3::new(-5.0, 0.0, 0.0), epsilon = 1.0e-5);
            assert_relative_eq!(b.v, Vector3::new(5.0, 0.0, 0.0), epsilon = 1.0e-5);
            // Half the penetration each way leaves them touching.
            assert_relative_eq!(a.x, Point3::new(-1.0, 0.0, 0.0), epsilon = 1.0e-5);
            assert_relative_eq!(b.x, Point3::new(1.0, 0.0, 0.0), epsilon = 1.0e-5);
        }

        #[test]
        fn test_elastic_swap() {
            // Equal masses, restitution 1: the normal components swap and the
            // tangential ones are untouched.
            let mut a = Body::sphere(Point3::new(0.0, 0.0, 0.0), Vector3::new(3.0, 1.0, -2.0), 2.0, 1.0, 1.0)
                .unwrap();
            let mut b = Body::sphere(Point3::new(1.0, 1.0, 0.0), Vector3::new(-1.0, 0.5, 4.0), 2.0, 1.0, 1.0)
                .unwrap();
            let n = (a.x - b.x).normalize();
            let (va, vb) = (a.v, b.v);
            let momentum = a.v * a.mass + b.v * b.mass;
            assert!(resolve_pair(&mut a, &mut b));
            assert_relative_eq!(a.v.dot(n), vb.dot(n), epsilon = 1.0e-5);
            assert_relative_eq!(b.v.dot(n), va.dot(n), epsilon = 1.0e-5);
            assert_relative_eq!(a.v - n * a.v.dot(n), va - n * va.dot(n), epsilon = 1.0e-5);
            assert_relative_eq!(a.v * a.mass + b.v * b.mass, momentum, epsilon = 1.0e-5);
        }

        #[test]
        fn test_separating_pair() {
            let mut a = ball(-0.9, -1.0);
            let mut b = ball(0.9, 1.0);
            assert!(resolve_pair(&mut a, &mut b));
            assert_eq!(a.v, Vector3::new(-1.0, 0.0, 0.0));
            assert_eq!(b.v, Vector3::new(1.0, 0.0, 0.0));
            assert_relative_eq!(a.x.x, -1.0, epsilon = 1.0e-5);
        }

        #[test]
        fn test_walls() {
            let walls = AABB::from_corners(Point3::new(-15.0, 0.0, -15.0), Point3::new(15.0, 30.0, 15.0));
            let mut floor = StaticBody::new(1.0, walls);
            let mut body = Body::sphere(Point3::new(0.0, 0.5, 0.0), Vector3::new(1.0, -3.0, 0.0), 1.0, 0.5, 1.0)
                .unwrap();
            assert!(resolve_walls(&mut body, &mut floor));
            assert_relative_eq!(body.x, Point3::new(0.0, 1.0, 0.0));
            assert_relative_eq!(body.v, Vector3::new(1.0, 1.5, 0.0));
            assert!(!resolve_walls(&mut body, &mut floor));
        }

        #[test]
        fn test_resolve_pairs() {
            let mut bodies = vec![ball(-0.5, 0.0), ball(0.5, 0.0), ball(10.0, 0.0)];
            assert_eq!(resolve_pairs(&mut bodies), 1);
            assert_relative_eq!(bodies[0].x.x, -1.0, epsilon = 1.0e-5);
            assert_relative_eq!(bodies[1].x.x, 1.0, epsilon = 1.0e-5);
        }

        #[test]
        fn test_gravity() {
            let mut star = Body::sphere(Point3::new(0.0, 0.0, 0.0), Vector3::zero(), 1.0e15, 0.0, 10.0).unwrap();
            let mut planet = Body::sphere(Point3::new(0.0, 0.0, 20.0), Vector3::zero(), 10.0, 0.0, 1.0).unwrap();
            accumulate_gravity(&mut star, &mut planet, 6.67e-11);
            let f = 6.67e-11 * 1.0e15 * 10.0 / 400.0;
            assert_relative_eq!(star.force, Vector3::new(0.0, 0.0, f), max_relative = 1.0e-5);
            assert_relative_eq!(planet.force, Vector3::new(0.0, 0.0, -f), max_relative = 1.0e-5);

            let mut twin = star;
            let before = star.force;
            accumulate_gravity(&mut star, &mut twin, 6.67e-11);
            assert_eq!(star.force, before);
        }

        #[test]
        fn test_gravity_at_short_range() {
            // Close but not coincident: same cutoff as sphere contacts.
            let mut a = Body::sphere(Point3::new(0.0, 0.0, 0.0), Vector3::zero(), 1.0, 0.0, 1.0).unwrap();
            let mut b = Body::sphere(Point3::new(1.0e-4, 0.0, 0.0), Vector3::zero(), 1.0, 0.0, 1.0).unwrap();
            accumulate_gravity(&mut a, &mut b, 1.0e-9);
            assert_relative_eq!(a.force, Vector3::new(0.1, 0.0, 0.0), max_relative = 1.0e-3);
            assert_relative_eq!(b.force, Vector3::new(-0.1, 0.0, 0.0), max_relative = 1.0e-3);
        }

        #[test]
        fn test_body_helpers() {
            let mut body = Body::sphere(Point3::new(1.0, 2.0, 3.0), Vector3::zero(), 1.0, 1.0, 2.0).unwrap();
            body.translate(Vector3::new(1.0, 0.0, 0.0));
            assert_eq!(body.center(), Point3::new(2.0, 2.0, 3.0));
            body.set_pos(Point3::new(0.0, 0.0, 0.0));
            assert_eq!(body.x, Point3::new(0.0, 0.0, 0.0));
            let m = body.transform();
            assert_relative_eq!(m * Vector4::new(1.0, 0.0, 0.0, 1.0), Vector4::new(2.0, 0.0, 0.0, 1.0));

            let contact = Contact { n: Vector3::unit_y(), depth: 0.0 };
            assert_eq!(-(-contact), contact);
        }

        #[test]
        fn test_invalid_bodies() {
            let o = Point3::new(0.0, 0.0, 0.0);
            assert!(Body::sphere(o, Vector3::zero(), 0.0, 1.0, 1.0).is_err());
            assert!(Body::sphere(o, Vector3::zero(), 1.0, 1.5, 1.0).is_err());
            assert_eq!(Body::sphere(o, Vector3::zero(), 1.0, 1.0, -1.0),
                       Err(SimError::InvalidParameter("radius must be positive")));
        }
    }
}
