use crate::hypothesis::Hypothesis;

/// Default maximal speed of a tracked object, m/s
pub const DEFAULT_MAX_SPEED: f64 = 20.0;

/// Default maximal number of frames between a parent and its child
pub const DEFAULT_MAX_FRAME_GAP: u64 = 2;

/// The struct defines when a hypothesis of a newer frame may continue a hypothesis of an
/// older frame.
///
/// Both must be of the same class, the newer one must come at most `max_frame_gap` frames
/// later, and the distance between their centers must be less than `dt * max_speed`, where
/// `dt` is the time between the frames.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicConstraint {
    max_speed: f64,
    max_frame_gap: u64,
}

impl Default for KinematicConstraint {
    fn default() -> Self {
        Self {
            max_speed: DEFAULT_MAX_SPEED,
            max_frame_gap: DEFAULT_MAX_FRAME_GAP,
        }
    }
}

impl KinematicConstraint {
    pub fn new(max_speed: f64, max_frame_gap: u64) -> Self {
        assert!(
            max_speed.is_finite() && max_speed > 0.0,
            "The speed is expected to be a positive float"
        );
        assert!(max_frame_gap > 0, "The frame gap must be at least one frame");
        Self {
            max_speed,
            max_frame_gap,
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn max_frame_gap(&self) -> u64 {
        self.max_frame_gap
    }

    /// Checks whether `child` is a feasible continuation of `parent`
    ///
    pub fn validate(&self, parent: &Hypothesis, child: &Hypothesis) -> bool {
        if parent.class() != child.class() || child.frame() <= parent.frame() {
            return false;
        }
        if child.frame() - parent.frame() > self.max_frame_gap {
            return false;
        }
        let dt = child.timestamp() - parent.timestamp();
        parent.pose().distance(child.pose()) < dt * self.max_speed
    }
}
