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

//! Configuration errors.
//!
//! Nothing that happens inside a simulation step is an error; degenerate
//! geometry is handled where it occurs. These are only raised when a host
//! hands the core a configuration it cannot use.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Interpolation selector other than 1 (Catmull-Rom) or 2 (B-spline).
    #[error("unknown interpolation kernel: {0}")]
    UnknownKernel(i32),

    /// Orientation selector other than 1 (Euler) or 2 (quaternion).
    #[error("unknown orientation mode: {0}")]
    UnknownOrientationMode(i32),

    /// A mode given by name that matches none of the known names.
    #[error("unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    /// Bake step must lie in (0, 1].
    #[error("invalid bake step: {0}")]
    InvalidStep(f32),

    #[error("too few control points: need at least {needed}, got {got}")]
    TooFewControlPoints { needed: usize, got: usize },

    #[error("orientation mode requires orientation control points")]
    MissingOrientation,

    #[error("orientation control points ({orientations}) do not match position control points ({positions})")]
    MismatchedOrientation { positions: usize, orientations: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

pub type Result<T> = std::result::Result<T, SimError>;
