//! Temporal multi-object tracking over LIDAR box hypotheses.
//!
//! Every frame brings a batch of rectangular hypotheses fitted to scan segments. They are
//! inserted into a sliding-window [neighborhood graph](graph::NeighborhoodGraph) and a
//! Markov-Chain Monte Carlo [sampler](sampler::TrackSetSampler) searches the space of
//! conflict-free [track-sets](track::TrackSet) for the best explanation of the scene.
//!
pub mod graph;
pub mod hypothesis;
pub mod likelihood;
pub mod posterior;
pub mod prelude;
pub mod sampler;
pub mod scan;
pub mod test_stuff;
pub mod track;
pub mod tracker;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Invalid value for option `{0}`: {1}")]
    InvalidOption(&'static str, String),
    #[error("Frame timestamp {current} must be greater than the previous frame timestamp {previous}")]
    NonMonotonicTimestamp { previous: f64, current: f64 },
    #[error("Box model is invalid: {0}")]
    InvalidBoxModel(String),
}

pub(crate) const EPS: f64 = 1e-9;
