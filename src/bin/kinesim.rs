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

//! Headless driver for the simulation core.
//!
//! Steps one of the demos and prints what a renderer would draw. Set
//! `RUST_LOG=kinesim=debug` for the core's own logging.

use clap::{Parser, Subcommand};
use kinesim::cgmath::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kinesim::*;

/// Steps a kinesim demo without a window
#[derive(Parser, Debug)]
#[command(name = "kinesim")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    demo: Demo,

    /// Print only every n-th frame
    #[arg(long, default_value = "1", global = true)]
    every: usize,
}

#[derive(Subcommand, Debug)]
enum Demo {
    /// Walk the rig along the built-in zigzag path
    Animate {
        /// catmull-rom or b-spline (or 1 / 2)
        #[arg(short, long, default_value = "catmull-rom")]
        kernel: Kernel,

        /// facing, euler or quaternion
        #[arg(short, long, default_value = "facing")]
        orientation: OrientationMode,

        /// Parameter step per frame within a segment
        #[arg(short, long, default_value = "0.01")]
        step: f32,
    },
    /// Random spheres bouncing around
    Collide {
        #[arg(short, long, default_value = "300")]
        frames: usize,

        #[arg(long, default_value = "0.016")]
        dt: f32,

        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Keep the spheres inside a 30 x 30 x 30 box
        #[arg(long)]
        walls: bool,
    },
    /// A star and four planets
    Orbit {
        #[arg(short, long, default_value = "300")]
        frames: usize,

        #[arg(long, default_value = "0.016")]
        dt: f32,

        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// A flock of boids in a box
    Flock {
        #[arg(short, long, default_value = "300")]
        frames: usize,

        #[arg(long, default_value = "0.016")]
        dt: f32,

        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(short = 'n', long, default_value = "100")]
        size: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("kinesim: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let every = args.every.max(1);
    match args.demo {
        Demo::Animate { kernel, orientation, step } => {
            let config = AnimationConfig { kernel, orientation, step, ..AnimationConfig::default() };
            let orientations = if orientation.needs_control_points() {
                Some(ControlPoints::walk_orientations())
            } else {
                None
            };
            let mut animator = Animator::new(ControlPoints::walk_path(), orientations, config)?;
            info!(frames = animator.torso().len(), "baked walk");
            animator.start();
            while !animator.is_finished() {
                let frame = animator.frame();
                let rig = animator.advance_frame();
                if frame % every == 0 {
                    let t = rig.torso.w;
                    println!("{:6} torso ({:8.3}, {:8.3}, {:8.3})", frame, t.x, t.y, t.z);
                }
            }
        },
        Demo::Collide { frames, dt, seed, count, walls } => {
            let defaults = PhysicsParams::default();
            let params = PhysicsParams {
                mode: PhysicsMode::Collision,
                body_count: count,
                bounds: if walls { Some(defaults.spawn) } else { None },
                ..defaults
            };
            let mut scenario = Scenario::new(params, &mut StdRng::seed_from_u64(seed))?;
            step_scenario(&mut scenario, frames, dt, every);
        },
        Demo::Orbit { frames, dt, seed } => {
            let params = PhysicsParams { mode: PhysicsMode::Gravity, ..PhysicsParams::default() };
            let mut scenario = Scenario::new(params, &mut StdRng::seed_from_u64(seed))?;
            step_scenario(&mut scenario, frames, dt, every);
        },
        Demo::Flock { frames, dt, seed, size } => {
            let params = FlockParams { size, ..FlockParams::default() };
            let mut flock = Flock::new(params, &mut StdRng::seed_from_u64(seed))?;
            for frame in 0..frames {
                flock.step(dt);
                if frame % every == 0 {
                    let c = centroid(flock.agents().iter().map(|a| a.x));
                    println!("{:6} centroid ({:8.3}, {:8.3}, {:8.3})", frame, c.x, c.y, c.z);
                }
            }
        },
    }
    Ok(())
}

fn step_scenario(scenario: &mut Scenario, frames: usize, dt: f32, every: usize) {
    for frame in 0..frames {
        let states = scenario.step(dt);
        if frame % every != 0 {
            continue;
        }
        println!("frame {}", frame);
        for (i, s) in states.iter().enumerate() {
            println!("  {:3} ({:9.3}, {:9.3}, {:9.3}) r={}", i, s.position.x, s.position.y, s.position.z, s.radius);
        }
    }
}

fn centroid<I: Iterator<Item = Point3<f32>>>(points: I) -> Point3<f32> {
    let (mut sum, mut n) = (Point3::new(0.0, 0.0, 0.0), 0.0);
    for p in points {
        sum.x += p.x;
        sum.y += p.y;
        sum.z += p.z;
        n += 1.0;
    }
    if n > 0.0 { sum / n } else { sum }
}
