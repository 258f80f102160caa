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

use std::fmt;
use std::str::FromStr;

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::*;

// cgmath matrices are stored by column, so each row written below is a column
// of the constant: the constants hold the transpose of the textbook basis `M`,
// which is exactly what `Mᵀ·T` needs.
#[rustfmt::skip]
const CATMULL_ROM_BASIS: Matrix4<f32> = Matrix4 {
    x: Vector4 { x: -0.5, y:  1.5, z: -1.5, w:  0.5 },
    y: Vector4 { x:  1.0, y: -2.5, z:  2.0, w: -0.5 },
    z: Vector4 { x: -0.5, y:  0.0, z:  0.5, w:  0.0 },
    w: Vector4 { x:  0.0, y:  1.0, z:  0.0, w:  0.0 },
};

#[rustfmt::skip]
const B_SPLINE_BASIS: Matrix4<f32> = Matrix4 {
    x: Vector4 { x: -1.0 / 6.0, y:  3.0 / 6.0, z: -3.0 / 6.0, w: 1.0 / 6.0 },
    y: Vector4 { x:  3.0 / 6.0, y: -6.0 / 6.0, z:  3.0 / 6.0, w: 0.0 },
    z: Vector4 { x: -3.0 / 6.0, y:  0.0,       z:  3.0 / 6.0, w: 0.0 },
    w: Vector4 { x:  1.0 / 6.0, y:  4.0 / 6.0, z:  1.0 / 6.0, w: 0.0 },
};

/// A cubic interpolation basis.
///
/// Both kernels evaluate one segment of a curve from four control points
/// `p0..p3` at a segment-local parameter `t` in `[0, 1)`. Catmull-Rom passes
/// through `p1` and `p2`; the uniform B-spline only approximates them but is
/// C2 continuous across segments.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kernel {
    CatmullRom,
    BSpline,
}

impl Kernel {
    /// Maps the console selector used by the host (1 or 2) to a kernel.
    pub fn from_selector(selector: i32) -> Result<Self> {
        match selector {
            1 => Ok(Kernel::CatmullRom),
            2 => Ok(Kernel::BSpline),
            other => Err(SimError::UnknownKernel(other)),
        }
    }

    /// The basis matrix of the kernel.
    pub fn basis(self) -> Matrix4<f32> {
        match self {
            Kernel::CatmullRom => CATMULL_ROM_BASIS,
            Kernel::BSpline => B_SPLINE_BASIS,
        }
    }

    /// Evaluates the curve through the scalar control points at `t`.
    pub fn evaluate(self, p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        let t2 = t * t;
        self.weigh(Vector4::new(t2 * t, t2, t, 1.0), Vector4::new(p0, p1, p2, p3))
    }

    /// Evaluates the first derivative of the curve with respect to `t`.
    pub fn evaluate_tangent(self, p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        self.weigh(Vector4::new(3.0 * t * t, 2.0 * t, 1.0, 0.0), Vector4::new(p0, p1, p2, p3))
    }

    /// Evaluates a vector valued curve one axis at a time.
    pub fn evaluate_point(self, p: &[Vector3<f32>; 4], t: f32) -> Vector3<f32> {
        Vector3::new(
            self.evaluate(p[0].x, p[1].x, p[2].x, p[3].x, t),
            self.evaluate(p[0].y, p[1].y, p[2].y, p[3].y, t),
            self.evaluate(p[0].z, p[1].z, p[2].z, p[3].z, t),
        )
    }

    pub fn evaluate_point_tangent(self, p: &[Vector3<f32>; 4], t: f32) -> Vector3<f32> {
        Vector3::new(
            self.evaluate_tangent(p[0].x, p[1].x, p[2].x, p[3].x, t),
            self.evaluate_tangent(p[0].y, p[1].y, p[2].y, p[3].y, t),
            self.evaluate_tangent(p[0].z, p[1].z, p[2].z, p[3].z, t),
        )
    }

    #[inline(always)]
    fn weigh(self, params: Vector4<f32>, points: Vector4<f32>) -> f32 {
        (self.basis() * params).dot(points)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::CatmullRom
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kernel::CatmullRom => write!(f, "catmull-rom"),
            Kernel::BSpline => write!(f, "b-spline"),
        }
    }
}

impl FromStr for Kernel {
    type Err = SimError;

    /// Accepts either the numeric selector or the kernel name.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "catmull-rom" | "catmullrom" => Ok(Kernel::CatmullRom),
            "b-spline" | "bspline" => Ok(Kernel::BSpline),
            other => match other.parse::<i32>() {
                Ok(selector) => Kernel::from_selector(selector),
                Err(_) => Err(SimError::UnknownName { kind: "kernel", name: s.to_string() }),
            },
        }
    }
}

/// Linear interpolation between two keyframe values.
#[inline(always)]
pub fn lerp(p0: f32, p1: f32, t: f32) -> f32 {
    p0 + (p1 - p0) * t
}

/// Component-wise `lerp` for vectors.
pub fn lerp_vec(p0: Vector3<f32>, p1: Vector3<f32>, t: f32) -> Vector3<f32> {
    p0 + (p1 - p0) * t
}

#[cfg(test)]
mod tests {
    mod spline {
        use cgmath::{Matrix4, Vector3};

        use crate::error::SimError;
        use crate::spline::*;

        #[test]
        fn test_basis_matrices() {
            // Rows of the textbook basis, as columns.
            let catmull_rom = Matrix4::new(
                -0.5, 1.5, -1.5, 0.5,
                1.0, -2.5, 2.0, -0.5,
                -0.5, 0.0, 0.5, 0.0,
                0.0, 1.0, 0.0, 0.0,
            );
            assert_eq!(Kernel::CatmullRom.basis(), catmull_rom);
            let b_spline = Matrix4::new(
                -1.0, 3.0, -3.0, 1.0,
                3.0, -6.0, 3.0, 0.0,
                -3.0, 0.0, 3.0, 0.0,
                1.0, 4.0, 1.0, 0.0,
            ) / 6.0;
            assert_relative_eq!(Kernel::BSpline.basis(), b_spline, epsilon = 1.0e-7);
        }

        #[test]
        fn test_catmull_rom_interpolates() {
            let k = Kernel::CatmullRom;
            let (p0, p1, p2, p3) = (-3.0, 2.0, 7.5, 1.0);
            assert_relative_eq!(k.evaluate(p0, p1, p2, p3, 0.0), p1);
            assert_relative_eq!(k.evaluate(p0, p1, p2, p3, 0.9999), p2, epsilon = 0.01);
            // At t = 1 exactly the curve reaches the next control point.
            assert_relative_eq!(k.evaluate(p0, p1, p2, p3, 1.0), p2, epsilon = 1.0e-5);
        }

        #[test]
        fn test_catmull_rom_tangent() {
            // The tangent at p1 is half the chord p2 - p0.
            let k = Kernel::CatmullRom;
            assert_relative_eq!(k.evaluate_tangent(0.0, 1.0, 4.0, 2.0, 0.0), 2.0);
            assert_relative_eq!(k.evaluate_tangent(0.0, 1.0, 4.0, 2.0, 1.0), 0.5);
        }

        #[test]
        fn test_b_spline() {
            let k = Kernel::BSpline;
            // A uniform B-spline starts at (p0 + 4 p1 + p2) / 6.
            assert_relative_eq!(k.evaluate(6.0, 0.0, 12.0, 0.0, 0.0), 3.0, epsilon = 1.0e-6);
            // Constant control points reproduce the constant with zero slope.
            assert_relative_eq!(k.evaluate(2.0, 2.0, 2.0, 2.0, 0.37), 2.0, epsilon = 1.0e-6);
            assert_relative_eq!(k.evaluate_tangent(2.0, 2.0, 2.0, 2.0, 0.37), 0.0, epsilon = 1.0e-6);
        }

        #[test]
        fn test_linear_points() {
            // Collinear, evenly spaced points produce a straight, uniform curve
            // for both kernels.
            let p = [
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 2.0, 3.0),
                Vector3::new(2.0, 4.0, 6.0),
                Vector3::new(3.0, 6.0, 9.0),
            ];
            for &k in [Kernel::CatmullRom, Kernel::BSpline].iter() {
                assert_relative_eq!(k.evaluate_point(&p, 0.5), Vector3::new(1.5, 3.0, 4.5),
                                    epsilon = 1.0e-5);
                assert_relative_eq!(k.evaluate_point_tangent(&p, 0.25), Vector3::new(1.0, 2.0, 3.0),
                                    epsilon = 1.0e-5);
            }
        }

        #[test]
        fn test_lerp() {
            assert_eq!(lerp(135.0, 225.0, 0.0), 135.0);
            assert_eq!(lerp(135.0, 225.0, 0.5), 180.0);
            assert_eq!(lerp(135.0, 225.0, 1.0), 225.0);
            assert_eq!(lerp_vec(Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 4.0, -2.0), 0.5),
                       Vector3::new(1.0, 2.0, -1.0));
        }

        #[test]
        fn test_selectors() {
            assert_eq!(Kernel::from_selector(1), Ok(Kernel::CatmullRom));
            assert_eq!(Kernel::from_selector(2), Ok(Kernel::BSpline));
            assert_eq!(Kernel::from_selector(3), Err(SimError::UnknownKernel(3)));
            assert_eq!("2".parse::<Kernel>(), Ok(Kernel::BSpline));
            assert_eq!("Catmull-Rom".parse::<Kernel>(), Ok(Kernel::CatmullRom));
            assert!("hermite".parse::<Kernel>().is_err());
        }
    }
}
