//! Synthetic tracking datasets.
//!
//! Generates a reproducible recording of people wandering through the
//! monitored area (27 m x 10 m). Each human follows a bounded random walk;
//! the reported position carries Gaussian sensor noise, the same way a
//! tracker reports a noisy estimate of the true position.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::dataset::{Dataset, Frame, Instance, InstanceFields};

/// Extent of the monitored area along X (metres).
pub const AREA_WIDTH: f64 = 27.0;
/// Extent of the monitored area along Y (metres).
pub const AREA_DEPTH: f64 = 10.0;

/// Walking speed change per second (standard deviation, m/s).
const SPEED_JITTER: f64 = 0.4;
/// Upper bound on walking speed (m/s).
const MAX_SPEED: f64 = 1.5;

/// Parameters of a synthetic recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// RNG seed; equal seeds give equal datasets
    pub seed: u64,
    /// Number of tracked humans
    pub humans: usize,
    /// Number of frames
    pub frames: usize,
    /// Timestamp of the first frame (ms since epoch)
    pub start_ms: u64,
    /// Spacing between frames (ms)
    pub frame_interval_ms: u64,
    /// Position noise standard deviation (metres)
    pub noise_std: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            humans: 5,
            frames: 600,
            start_ms: 1_662_896_400_000,
            frame_interval_ms: 100,
            noise_std: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
struct Walker {
    pos: [f64; 2],
    vel: [f64; 2],
}

impl Walker {
    fn spawn(rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos: [rng.gen_range(0.0..AREA_WIDTH), rng.gen_range(0.0..AREA_DEPTH)],
            vel: [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)],
        }
    }

    /// Advances one step of `dt` seconds, bouncing off the area bounds.
    fn step(&mut self, rng: &mut ChaCha8Rng, dt: f64) {
        let bounds = [AREA_WIDTH, AREA_DEPTH];
        for axis in 0..2 {
            let kick: f64 = rng.sample(StandardNormal);
            let v = self.vel[axis] + kick * SPEED_JITTER * dt.sqrt();
            self.vel[axis] = v.clamp(-MAX_SPEED, MAX_SPEED);

            let mut p = self.pos[axis] + self.vel[axis] * dt;
            if p < 0.0 {
                p = -p;
                self.vel[axis] = -self.vel[axis];
            } else if p > bounds[axis] {
                p = 2.0 * bounds[axis] - p;
                self.vel[axis] = -self.vel[axis];
            }
            self.pos[axis] = p.clamp(0.0, bounds[axis]);
        }
    }
}

/// Generates a dataset from `config`.
pub fn synthesize(config: &SynthConfig) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let dt = config.frame_interval_ms as f64 / 1000.0;

    // A non-finite noise_std disables noise
    let noise = Normal::new(0.0, config.noise_std.abs()).ok();

    let mut walkers: Vec<Walker> = (0..config.humans).map(|_| Walker::spawn(&mut rng)).collect();
    let mut frames = Vec::with_capacity(config.frames);

    for f in 0..config.frames {
        let timestamp = config.start_ms + f as u64 * config.frame_interval_ms;
        let mut instances = Vec::with_capacity(walkers.len());

        for (i, walker) in walkers.iter_mut().enumerate() {
            if f > 0 {
                walker.step(&mut rng, dt);
            }
            let (nx, ny) = match &noise {
                Some(n) => (n.sample(&mut rng), n.sample(&mut rng)),
                None => (0.0, 0.0),
            };
            let confidence: f64 = rng.gen_range(0.5..=1.0);

            instances.push(Instance {
                key: format!("human_{i}"),
                fields: InstanceFields {
                    pos_x: json!(round3(walker.pos[0] + nx)),
                    pos_y: json!(round3(walker.pos[1] + ny)),
                    vel_x: json!(round3(walker.vel[0])),
                    vel_y: json!(round3(walker.vel[1])),
                    confidence: json!(round3(confidence)),
                    sensors: json!(["lidar_0"]),
                },
            });
        }

        frames.push(Frame {
            timestamp: Some(timestamp),
            instances,
        });
    }

    debug!(
        seed = config.seed,
        humans = config.humans,
        frames = config.frames,
        "synthetic dataset generated"
    );
    Dataset::new(frames)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
