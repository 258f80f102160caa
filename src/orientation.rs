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

//! Rotation helpers shared by animation baking and the simulations.
//!
//! Angles are radians unless a function says otherwise. Every function here
//! returns a unit quaternion or an orthonormal rotation, including for
//! degenerate input.

use cgmath::{Deg, InnerSpace, Matrix4, One, Quaternion, Rad, SquareMatrix, Vector3, Zero};

/// Squared magnitude under which a vector or quaternion is treated as zero.
pub const DEGENERATE_EPSILON: f32 = 1.0e-12;

/// Builds a rotation from Euler angles about the X (roll), Y (pitch) and
/// Z (yaw) axes, applied roll first: `q = qz * qy * qx`.
pub fn euler_to_quaternion(roll: f32, pitch: f32, yaw: f32) -> Quaternion<f32> {
    let (x, y, z) = (roll * 0.5, pitch * 0.5, yaw * 0.5);
    let qx = Quaternion::new(x.cos(), x.sin(), 0.0, 0.0);
    let qy = Quaternion::new(y.cos(), 0.0, y.sin(), 0.0);
    let qz = Quaternion::new(z.cos(), 0.0, 0.0, z.sin());
    qz * qy * qx
}

/// Converts a quaternion into a homogeneous rotation matrix.
///
/// The quaternion is normalized first. A zero quaternion yields the
/// identity.
pub fn quaternion_to_matrix(q: Quaternion<f32>) -> Matrix4<f32> {
    if q.magnitude2() < DEGENERATE_EPSILON {
        return Matrix4::identity();
    }
    Matrix4::from(q.normalize())
}

/// `atan2(a, b)`. Fed with the X and Z components of a tangent, in that
/// order, this is the yaw about +Y that turns the +Z axis onto the tangent.
#[inline(always)]
pub fn facing_angle_from_tangent(a: f32, b: f32) -> Rad<f32> {
    Rad(a.atan2(b))
}

/// Yaw about +Y that points the +Z axis along the horizontal part of
/// `tangent`.
pub fn facing_angle(tangent: Vector3<f32>) -> Rad<f32> {
    facing_angle_from_tangent(tangent.x, tangent.z)
}

/// Rotation that faces the +Z axis along `tangent`, ignoring its vertical
/// component.
pub fn facing_rotation(tangent: Vector3<f32>) -> Quaternion<f32> {
    euler_to_quaternion(0.0, facing_angle(tangent).0, 0.0)
}

/// Rotation matrix from Euler angles in degrees about X, Y and Z, composed
/// as `Ry * Rz * Rx`.
pub fn euler_degrees_to_matrix(angles: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_y(Deg(angles.y))
        * Matrix4::from_angle_z(Deg(angles.z))
        * Matrix4::from_angle_x(Deg(angles.x))
}

/// Same as `euler_to_quaternion` but with the angles in degrees packed as
/// `(roll, pitch, yaw)`.
pub fn euler_degrees_to_quaternion(angles: Vector3<f32>) -> Quaternion<f32> {
    let Rad(roll) = Rad::from(Deg(angles.x));
    let Rad(pitch) = Rad::from(Deg(angles.y));
    let Rad(yaw) = Rad::from(Deg(angles.z));
    euler_to_quaternion(roll, pitch, yaw)
}

/// Shortest-arc rotation that takes the direction of `from` onto the
/// direction of `to`.
///
/// Neither vector needs to be normalized. If either is zero the rotation is
/// the identity. Opposite vectors have no unique arc; the result is then a
/// half turn about some axis perpendicular to `from`.
pub fn quaternion_from_vector_pair(from: Vector3<f32>, to: Vector3<f32>) -> Quaternion<f32> {
    let (len2_from, len2_to) = (from.magnitude2(), to.magnitude2());
    if len2_from < DEGENERATE_EPSILON || len2_to < DEGENERATE_EPSILON {
        return Quaternion::one();
    }
    let q = Quaternion::from_sv((len2_from * len2_to).sqrt() + from.dot(to), from.cross(to));
    if q.magnitude2() > DEGENERATE_EPSILON * len2_from * len2_to {
        return q.normalize();
    }
    // Antiparallel: pick the cardinal axis least aligned with `from`.
    let axis = if from.x.abs() < from.y.abs().min(from.z.abs()) {
        Vector3::unit_x()
    } else if from.y.abs() < from.z.abs() {
        Vector3::unit_y()
    } else {
        Vector3::unit_z()
    };
    Quaternion::from_sv(0.0, from.cross(axis).normalize())
}

/// True when `q` cannot be normalized into a rotation.
pub(crate) fn is_degenerate(q: Quaternion<f32>) -> bool {
    q.magnitude2() < DEGENERATE_EPSILON || q.s.is_nan() || q.v.x.is_nan()
}

/// Sets `q` to the identity when it cannot be normalized.
pub(crate) fn normalize_or_identity(q: Quaternion<f32>) -> Quaternion<f32> {
    if is_degenerate(q) {
        Quaternion::one()
    } else {
        q.normalize()
    }
}

/// The zero vector when `v` cannot be normalized.
pub(crate) fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() < DEGENERATE_EPSILON {
        Vector3::zero()
    } else {
        v.normalize()
    }
}

#[cfg(test)]
mod tests {
    mod orientation {
        use std::f32::consts::{FRAC_PI_2, PI};

        use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, One, Quaternion, Rad, Rotation,
                     SquareMatrix, Vector3, Vector4};

        use crate::orientation::*;

        #[test]
        fn test_self_rotation_is_identity() {
            for v in [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.3, -2.0, 5.5),
                      Vector3::new(0.0, 0.0, -0.01)].iter() {
                let m = quaternion_to_matrix(quaternion_from_vector_pair(*v, *v));
                assert_relative_eq!(m, Matrix4::identity(), epsilon = 1.0e-6);
            }
        }

        #[test]
        fn test_vector_pair_maps_direction() {
            let from = Vector3::new(0.0, 1.0, 0.0);
            let to = Vector3::new(3.0, 0.0, 4.0);
            let q = quaternion_from_vector_pair(from, to);
            assert_relative_eq!(q.magnitude(), 1.0, epsilon = 1.0e-6);
            assert_relative_eq!(q.rotate_vector(from), to.normalize(), epsilon = 1.0e-6);
        }

        #[test]
        fn test_vector_pair_degenerate() {
            let zero = Vector3::new(0.0, 0.0, 0.0);
            assert_eq!(quaternion_from_vector_pair(zero, Vector3::unit_y()), Quaternion::one());
            assert_eq!(quaternion_from_vector_pair(Vector3::unit_y(), zero), Quaternion::one());

            // Opposite directions still produce a unit rotation that flips.
            for from in [Vector3::unit_y(), Vector3::new(1.0, 2.0, -0.5)].iter() {
                let q = quaternion_from_vector_pair(*from, -*from * 3.0);
                assert_relative_eq!(q.magnitude(), 1.0, epsilon = 1.0e-6);
                assert_relative_eq!(q.rotate_vector(from.normalize()), -from.normalize(),
                                    epsilon = 1.0e-5);
            }
        }

        #[test]
        fn test_euler_matches_axis_composition() {
            let angles = [(0.3, -1.1, 2.0), (PI, 0.25, -0.75), (-2.2, 1.4, 0.05)];
            for &(roll, pitch, yaw) in angles.iter() {
                let q = euler_to_quaternion(roll, pitch, yaw);
                let direct = Matrix4::from_angle_z(Rad(yaw))
                    * Matrix4::from_angle_y(Rad(pitch))
                    * Matrix4::from_angle_x(Rad(roll));
                let y = Vector4::new(0.0, 1.0, 0.0, 0.0);
                assert_relative_eq!(quaternion_to_matrix(q) * y, direct * y, epsilon = 1.0e-5);
            }
        }

        #[test]
        fn test_quaternion_to_matrix_normalizes() {
            let q = euler_to_quaternion(0.4, 0.2, -0.9);
            assert_relative_eq!(quaternion_to_matrix(q * 7.0), quaternion_to_matrix(q),
                                epsilon = 1.0e-6);
            assert_eq!(quaternion_to_matrix(Quaternion::new(0.0, 0.0, 0.0, 0.0)),
                       Matrix4::identity());

            // The rotation block stays orthonormal.
            let m = quaternion_to_matrix(Quaternion::new(3.0, -1.0, 2.0, 0.5));
            let r = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
            assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1.0e-6);
        }

        #[test]
        fn test_facing() {
            assert_relative_eq!(facing_angle(Vector3::new(0.0, 0.0, 1.0)), Rad(0.0));
            assert_relative_eq!(facing_angle(Vector3::new(1.0, 0.0, 0.0)), Rad(FRAC_PI_2));
            assert_relative_eq!(facing_angle_from_tangent(-1.0, 0.0), Rad(-FRAC_PI_2));

            let tangent = Vector3::new(-2.0, 0.7, 2.0);
            let forward = facing_rotation(tangent).rotate_vector(Vector3::unit_z());
            let flat = Vector3::new(tangent.x, 0.0, tangent.z).normalize();
            assert_relative_eq!(forward, flat, epsilon = 1.0e-6);
        }

        #[test]
        fn test_euler_degrees() {
            // A quarter turn of yaw in the matrix form maps +Z onto +X.
            let m = euler_degrees_to_matrix(Vector3::new(0.0, 90.0, 0.0));
            assert_relative_eq!(m * Vector4::new(0.0, 0.0, 1.0, 0.0), Vector4::new(1.0, 0.0, 0.0, 0.0),
                                epsilon = 1.0e-6);
            let q = euler_degrees_to_quaternion(Vector3::new(0.0, 90.0, 0.0));
            assert_relative_eq!(q, euler_to_quaternion(0.0, FRAC_PI_2, 0.0), epsilon = 1.0e-6);
        }

        #[test]
        fn test_normalize_guards() {
            assert_eq!(normalize_or_identity(Quaternion::new(0.0, 0.0, 0.0, 0.0)), Quaternion::one());
            assert_eq!(normalize_or_zero(Vector3::new(0.0, 0.0, 0.0)), Vector3::new(0.0, 0.0, 0.0));
            assert_relative_eq!(normalize_or_zero(Vector3::new(0.0, 3.0, 4.0)), Vector3::new(0.0, 0.6, 0.8));
        }
    }
}
