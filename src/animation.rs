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

//! Offline animation baking and frame-indexed playback.
//!
//! A track is baked once from a path of control points and then only read.
//! Torso tracks clamp at their last pose, leg swings loop.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use cgmath::{InnerSpace, Matrix4, Quaternion, SquareMatrix, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::*;
use crate::orientation::*;
use crate::spline::*;

/// A rigid placement in world space: translation then rotation.
pub type Pose = Matrix4<f32>;

/// Tolerance used when counting how many steps fit in a segment.
const STEP_TOLERANCE: f32 = 1.0e-3;

/// Number of samples taken over `[0, 1)` at the given step.
pub fn frame_count(step: f32) -> usize {
    ((1.0 / step) - STEP_TOLERANCE).ceil().max(1.0) as usize
}

/// How orientation is produced while baking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationMode {
    /// Interpolate three Euler channels, in degrees.
    Euler,
    /// Convert Euler control points to quaternions and interpolate those.
    Quaternion,
    /// Face along the tangent of the position curve.
    Facing,
}

impl OrientationMode {
    /// Maps the console selector (1 or 2) to a mode.
    pub fn from_selector(selector: i32) -> Result<Self> {
        match selector {
            1 => Ok(OrientationMode::Euler),
            2 => Ok(OrientationMode::Quaternion),
            other => Err(SimError::UnknownOrientationMode(other)),
        }
    }

    /// True if baking with this mode needs orientation control points.
    pub fn needs_control_points(self) -> bool {
        self != OrientationMode::Facing
    }
}

impl Default for OrientationMode {
    fn default() -> Self {
        OrientationMode::Facing
    }
}

impl fmt::Display for OrientationMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrientationMode::Euler => write!(f, "euler"),
            OrientationMode::Quaternion => write!(f, "quaternion"),
            OrientationMode::Facing => write!(f, "facing"),
        }
    }
}

impl FromStr for OrientationMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(OrientationMode::Euler),
            "quaternion" | "quat" => Ok(OrientationMode::Quaternion),
            "facing" | "tangent" => Ok(OrientationMode::Facing),
            other => match other.parse::<i32>() {
                Ok(selector) => OrientationMode::from_selector(selector),
                Err(_) => Err(SimError::UnknownName { kind: "orientation mode", name: s.to_string() }),
            },
        }
    }
}

/// An ordered path of at least four control points.
///
/// Position paths hold world coordinates. Orientation paths hold Euler
/// angles in degrees about X, Y and Z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vector3<f32>>")]
pub struct ControlPoints(Vec<Vector3<f32>>);

impl TryFrom<Vec<Vector3<f32>>> for ControlPoints {
    type Error = SimError;

    fn try_from(points: Vec<Vector3<f32>>) -> Result<Self> {
        ControlPoints::new(points)
    }
}

impl ControlPoints {
    /// Points needed for one spline window.
    pub const WINDOW: usize = 4;

    pub fn new(points: Vec<Vector3<f32>>) -> Result<Self> {
        if points.len() < Self::WINDOW {
            return Err(SimError::TooFewControlPoints { needed: Self::WINDOW, got: points.len() });
        }
        Ok(ControlPoints(points))
    }

    /// The default walking path: the corners of an 18 by 18 square visited
    /// in zigzag order, twice.
    pub fn walk_path() -> Self {
        let corners = [
            Vector3::new(-9.0, 0.0, -9.0),
            Vector3::new(-9.0, 0.0, 9.0),
            Vector3::new(9.0, 0.0, -9.0),
            Vector3::new(9.0, 0.0, 9.0),
        ];
        ControlPoints(corners.iter().chain(corners.iter()).cloned().collect())
    }

    /// Euler keyframes, in degrees, paired with `walk_path`.
    pub fn walk_orientations() -> Self {
        let keys = [
            Vector3::new(-180.0, 0.0, 0.0),
            Vector3::new(-90.0, -90.0, 0.0),
            Vector3::new(90.0, 90.0, 0.0),
            Vector3::new(180.0, 0.0, 0.0),
        ];
        ControlPoints(keys.iter().chain(keys.iter()).cloned().collect())
    }

    pub fn points(&self) -> &[Vector3<f32>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true; kept for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of sliding windows, one per baked segment.
    pub fn segments(&self) -> usize {
        self.0.len() + 1 - Self::WINDOW
    }

    /// Window `k` covers points `k..k + 4`.
    pub fn window(&self, k: usize) -> [Vector3<f32>; 4] {
        [self.0[k], self.0[k + 1], self.0[k + 2], self.0[k + 3]]
    }

    pub fn windows<'a>(&'a self) -> impl Iterator<Item = [Vector3<f32>; 4]> + 'a {
        (0..self.segments()).map(move |k| self.window(k))
    }
}

/// What happens when playback runs past the end of a track.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    /// Hold the last pose.
    Clamp,
    /// Wrap around to the start.
    Loop,
}

/// A baked, read-only sequence of poses. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTrack {
    poses: Vec<Pose>,
    playback: Playback,
}

impl AnimationTrack {
    fn from_poses(poses: Vec<Pose>, playback: Playback) -> Self {
        debug_assert!(!poses.is_empty());
        AnimationTrack { poses, playback }
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Returns the pose at `frame`, clamped or wrapped per the playback mode.
    pub fn sample(&self, frame: usize) -> Pose {
        let len = self.poses.len();
        if len == 0 {
            return Matrix4::identity();
        }
        let i = match self.playback {
            Playback::Clamp => frame.min(len - 1),
            Playback::Loop => frame % len,
        };
        self.poses[i]
    }
}

/// Free-standing form of `AnimationTrack::sample`.
#[inline(always)]
pub fn sample(track: &AnimationTrack, frame: usize) -> Pose {
    track.sample(frame)
}

/// Parameters of the two-phase leg swing.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegSwingConfig {
    /// The swing is sampled this many times coarser than the torso.
    pub step_multiplier: f32,
    /// Hip position relative to the torso.
    pub pivot: Vector3<f32>,
    /// Euler angles in degrees at the start of the forward sweep.
    pub from: Vector3<f32>,
    /// Euler angles in degrees at the end of the forward sweep.
    pub to: Vector3<f32>,
}

impl Default for LegSwingConfig {
    fn default() -> Self {
        LegSwingConfig {
            step_multiplier: 6.0,
            pivot: Vector3::new(0.0, 2.2, 0.0),
            from: Vector3::new(135.0, 0.0, 0.0),
            to: Vector3::new(225.0, 0.0, 0.0),
        }
    }
}

impl LegSwingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_multiplier > 0.0) {
            return Err(SimError::InvalidParameter("leg step multiplier must be positive"));
        }
        Ok(())
    }

    /// The swing's own step for a torso step. Coarse torso steps give a
    /// swing of one sample each way.
    pub fn leg_step(&self, step: f32) -> f32 {
        (step * self.step_multiplier).min(1.0)
    }

    fn pose(&self, angles: Vector3<f32>) -> Pose {
        Matrix4::from_translation(self.pivot) * euler_degrees_to_matrix(angles)
    }
}

/// Everything needed to bake a rig.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub kernel: Kernel,
    pub orientation: OrientationMode,
    /// Parameter step per frame within one segment, in `(0, 1]`.
    pub step: f32,
    pub leg: LegSwingConfig,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            kernel: Kernel::default(),
            orientation: OrientationMode::default(),
            step: 0.001,
            leg: LegSwingConfig::default(),
        }
    }
}

impl AnimationConfig {
    /// Checks the torso step alone.
    pub fn validate_step(&self) -> Result<()> {
        if !(self.step > 0.0 && self.step <= 1.0) {
            return Err(SimError::InvalidStep(self.step));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_step()?;
        self.leg.validate()
    }
}

/// Bakes a clamped track along `positions`.
///
/// Every window of four control points is sampled at `t = i * step` for
/// `t` in `[0, 1)` and the segments are concatenated in path order.
/// `orientations` must parallel `positions` unless the mode is `Facing`, in
/// which case it is ignored.
pub fn bake(
    positions: &ControlPoints,
    orientations: Option<&ControlPoints>,
    config: &AnimationConfig,
) -> Result<AnimationTrack> {
    config.validate_step()?;
    let orientations = if config.orientation.needs_control_points() {
        let o = orientations.ok_or(SimError::MissingOrientation)?;
        if o.len() != positions.len() {
            return Err(SimError::MismatchedOrientation {
                positions: positions.len(),
                orientations: o.len(),
            });
        }
        Some(o)
    } else {
        None
    };

    let kernel = config.kernel;
    let frames = frame_count(config.step);
    let mut poses = Vec::with_capacity(frames * positions.segments());
    for (k, window) in positions.windows().enumerate() {
        let keys = orientations.map(|o| o.window(k));
        let quats = keys.map(aligned_quaternions);
        for i in 0..frames {
            let t = i as f32 * config.step;
            let position = kernel.evaluate_point(&window, t);
            let rotation = match (config.orientation, keys, quats) {
                (OrientationMode::Euler, Some(keys), _) => {
                    euler_degrees_to_matrix(kernel.evaluate_point(&keys, t))
                },
                (OrientationMode::Quaternion, _, Some(q)) => {
                    let q = Quaternion::new(
                        kernel.evaluate(q[0].s, q[1].s, q[2].s, q[3].s, t),
                        kernel.evaluate(q[0].v.x, q[1].v.x, q[2].v.x, q[3].v.x, t),
                        kernel.evaluate(q[0].v.y, q[1].v.y, q[2].v.y, q[3].v.y, t),
                        kernel.evaluate(q[0].v.z, q[1].v.z, q[2].v.z, q[3].v.z, t),
                    );
                    quaternion_to_matrix(normalize_or_identity(q))
                },
                _ => quaternion_to_matrix(facing_rotation(kernel.evaluate_point_tangent(&window, t))),
            };
            poses.push(Matrix4::from_translation(position) * rotation);
        }
    }
    debug!(frames = poses.len(), %kernel, orientation = %config.orientation, "baked track");
    Ok(AnimationTrack::from_poses(poses, Playback::Clamp))
}

/// Converts a window of Euler keys to quaternions, flipping signs so that
/// neighbouring keys lie in the same hemisphere.
fn aligned_quaternions(keys: [Vector3<f32>; 4]) -> [Quaternion<f32>; 4] {
    let mut q = [
        euler_degrees_to_quaternion(keys[0]),
        euler_degrees_to_quaternion(keys[1]),
        euler_degrees_to_quaternion(keys[2]),
        euler_degrees_to_quaternion(keys[3]),
    ];
    for i in 1..4 {
        if q[i - 1].dot(q[i]) < 0.0 {
            q[i] = -q[i];
        }
    }
    q
}

/// A looping leg track and the frame at which the return sweep starts.
#[derive(Clone, Debug, PartialEq)]
pub struct LegSwing {
    pub track: AnimationTrack,
    /// Length of the forward sweep. Sampling at `frame + offset` gives the
    /// opposite phase.
    pub offset: usize,
}

/// Bakes the forward then backward leg sweep at `step * step_multiplier`,
/// capped at one.
pub fn bake_leg_swing(config: &LegSwingConfig, step: f32) -> Result<LegSwing> {
    if !(step > 0.0 && step <= 1.0) {
        return Err(SimError::InvalidStep(step));
    }
    config.validate()?;
    let leg_step = config.leg_step(step);
    let frames = frame_count(leg_step);
    let mut poses = Vec::with_capacity(2 * frames);
    for i in 0..frames {
        let t = i as f32 * leg_step;
        poses.push(config.pose(lerp_vec(config.from, config.to, t)));
    }
    let offset = poses.len();
    for k in 0..frames {
        let t = 1.0 - k as f32 * leg_step;
        poses.push(config.pose(lerp_vec(config.from, config.to, t)));
    }
    debug!(frames = poses.len(), offset, "baked leg swing");
    Ok(LegSwing { track: AnimationTrack::from_poses(poses, Playback::Loop), offset })
}

/// World transforms of the torso and both legs for one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RigPose {
    pub torso: Pose,
    pub left_leg: Pose,
    pub right_leg: Pose,
}

/// Plays a torso track with two legs swinging in antiphase.
///
/// The animator idles on frame 0 until `start` is called. Once the torso
/// track runs out the whole rig freezes on its last frame.
#[derive(Clone, Debug)]
pub struct Animator {
    path: ControlPoints,
    orientations: Option<ControlPoints>,
    config: AnimationConfig,
    torso: AnimationTrack,
    leg: LegSwing,
    frame: Option<usize>,
}

impl Animator {
    pub fn new(
        path: ControlPoints,
        orientations: Option<ControlPoints>,
        config: AnimationConfig,
    ) -> Result<Self> {
        let torso = bake(&path, orientations.as_ref(), &config)?;
        let leg = bake_leg_swing(&config.leg, config.step)?;
        Ok(Animator { path, orientations, config, torso, leg, frame: None })
    }

    /// Starts playback. Calling it again has no effect.
    pub fn start(&mut self) {
        if self.frame.is_none() {
            info!("animation started");
            self.frame = Some(0);
        }
    }

    pub fn is_started(&self) -> bool {
        self.frame.is_some()
    }

    /// The frame the next call to `advance_frame` reports.
    pub fn frame(&self) -> usize {
        self.frame.unwrap_or(0)
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn torso(&self) -> &AnimationTrack {
        &self.torso
    }

    pub fn leg_swing(&self) -> &LegSwing {
        &self.leg
    }

    /// True once the torso track has been played to its end.
    pub fn is_finished(&self) -> bool {
        self.frame() >= self.torso.len()
    }

    /// Returns the rig for the current frame and moves to the next one.
    pub fn advance_frame(&mut self) -> RigPose {
        let pose = self.pose_at(self.frame());
        if let Some(ref mut frame) = self.frame {
            *frame = frame.saturating_add(1);
        }
        pose
    }

    /// The rig at an arbitrary frame, without touching the counter.
    pub fn pose_at(&self, frame: usize) -> RigPose {
        let frame = frame.min(self.torso.len().saturating_sub(1));
        let torso = self.torso.sample(frame);
        RigPose {
            torso,
            left_leg: torso * self.leg.track.sample(frame),
            right_leg: torso * self.leg.track.sample(frame + self.leg.offset),
        }
    }

    /// Bakes new tracks with `config`. On failure the current tracks are
    /// kept and the error is returned. On success playback returns to idle.
    pub fn rebake(&mut self, config: AnimationConfig) -> Result<()> {
        let baked = bake(&self.path, self.orientations.as_ref(), &config)
            .and_then(|torso| Ok((torso, bake_leg_swing(&config.leg, config.step)?)));
        match baked {
            Ok((torso, leg)) => {
                info!(frames = torso.len(), kernel = %config.kernel, "rebaked animation");
                self.torso = torso;
                self.leg = leg;
                self.config = config;
                self.frame = None;
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "refusing to rebake animation");
                Err(e)
            },
        }
    }
}
