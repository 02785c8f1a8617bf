pub use crate::graph::kinematics::KinematicConstraint;
pub use crate::graph::{EdgeType, NeighborhoodGraph};
pub use crate::hypothesis::{BoxModel, Hypothesis, ObjectClass};
pub use crate::posterior::{ExponentialPosterior, TrackSetPosterior};
pub use crate::sampler::{Move, TrackSetSampler};
pub use crate::scan::{Frame, Scan, SegmentHypotheses};
pub use crate::track::{Track, TrackSet};
pub use crate::tracker::options::TrackerOptions;
pub use crate::tracker::Tracker;
pub use crate::utils::geometry::Pose;
pub use crate::utils::rng::RandomSource;
