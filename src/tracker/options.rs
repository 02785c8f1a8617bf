use crate::graph::kinematics::{KinematicConstraint, DEFAULT_MAX_FRAME_GAP, DEFAULT_MAX_SPEED};
use crate::sampler::{Move, TrackSetSampler, DEFAULT_GAMMA, DEFAULT_ITERATIONS};
use crate::Errors;
use anyhow::Result;

pub const DEFAULT_WINDOW_CAPACITY: usize = 5;
pub const DEFAULT_SEED: u64 = 0x5eed;

/// Tracker configuration.
///
/// ```
/// use virtual_scan::tracker::options::TrackerOptions;
///
/// let opts = TrackerOptions::default()
///     .window_capacity(3)
///     .max_speed(15.0)
///     .iterations(200);
/// assert!(opts.validate().is_ok());
/// ```
///
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerOptions {
    pub(crate) window_capacity: usize,
    pub(crate) max_speed: f64,
    pub(crate) max_frame_gap: u64,
    pub(crate) iterations: usize,
    pub(crate) gamma: f64,
    pub(crate) moves: Vec<Move>,
    pub(crate) seed: u64,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            max_speed: DEFAULT_MAX_SPEED,
            max_frame_gap: DEFAULT_MAX_FRAME_GAP,
            iterations: DEFAULT_ITERATIONS,
            gamma: DEFAULT_GAMMA,
            moves: Move::ALL.to_vec(),
            seed: DEFAULT_SEED,
        }
    }
}

impl TrackerOptions {
    /// Number of frames kept in the neighborhood graph
    ///
    pub fn window_capacity(mut self, frames: usize) -> Self {
        self.window_capacity = frames;
        self
    }

    /// Maximal object speed, m/s
    ///
    pub fn max_speed(mut self, speed: f64) -> Self {
        self.max_speed = speed;
        self
    }

    /// Maximal distance in frames between a parent and a child hypothesis
    ///
    pub fn max_frame_gap(mut self, frames: u64) -> Self {
        self.max_frame_gap = frames;
        self
    }

    /// Sampler iterations per frame
    ///
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Probability to stop an extension after each added hypothesis
    ///
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Move types the sampler draws from
    ///
    pub fn moves(mut self, moves: &[Move]) -> Self {
        self.moves = moves.to_vec();
        self
    }

    /// Seed of the default random source
    ///
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(Errors::InvalidOption(
                "window_capacity",
                "the window must keep at least one frame".into(),
            )
            .into());
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(Errors::InvalidOption(
                "max_speed",
                format!("{} is not a positive speed", self.max_speed),
            )
            .into());
        }
        if self.max_frame_gap == 0 {
            return Err(Errors::InvalidOption(
                "max_frame_gap",
                "parents must be at least one frame older".into(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Errors::InvalidOption(
                "gamma",
                format!("{} is not a probability", self.gamma),
            )
            .into());
        }
        if self.moves.is_empty() {
            return Err(Errors::InvalidOption(
                "moves",
                "at least one move type is required".into(),
            )
            .into());
        }
        Ok(())
    }

    pub(crate) fn constraint(&self) -> KinematicConstraint {
        KinematicConstraint::new(self.max_speed, self.max_frame_gap)
    }

    pub(crate) fn sampler(&self) -> TrackSetSampler {
        TrackSetSampler::new(self.iterations, self.gamma, self.moves.clone())
    }
}
