use crate::graph::NeighborhoodGraph;
use crate::track::TrackSet;
use crate::Errors;
use anyhow::Result;

/// Scores a track-set against the measurements buffered in the graph.
///
/// The score must not increase when any `dn` or `c2` of an included hypothesis grows.
/// `None` stands for zero probability and is returned for the empty track-set and for every
/// inconsistent one.
///
pub trait TrackSetPosterior {
    /// Natural logarithm of the unnormalized posterior
    ///
    fn log_probability(&self, track_set: &TrackSet, graph: &NeighborhoodGraph) -> Option<f64>;

    fn probability(&self, track_set: &TrackSet, graph: &NeighborhoodGraph) -> f64 {
        self.log_probability(track_set, graph)
            .map_or(0.0, f64::exp)
    }
}

/// Posterior of the form `exp(reward - penalties)`:
///
/// ```text
/// length_reward * Σ|track| - track_penalty * #tracks
///     - fit_weight * Σdn - occlusion_weight * Σc2 - reserved_weight * Σc3
/// ```
///
/// Longer tracks explain more of the scene, every extra track costs a constant, and badly
/// fitted or see-through boxes are penalized.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialPosterior {
    pub length_reward: f64,
    pub track_penalty: f64,
    pub fit_weight: f64,
    pub occlusion_weight: f64,
    pub reserved_weight: f64,
}

impl Default for ExponentialPosterior {
    fn default() -> Self {
        Self {
            length_reward: 1.0,
            track_penalty: 0.5,
            fit_weight: 4.0,
            occlusion_weight: 2.0,
            reserved_weight: 0.0,
        }
    }
}

impl ExponentialPosterior {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("length_reward", self.length_reward),
            ("track_penalty", self.track_penalty),
            ("fit_weight", self.fit_weight),
            ("occlusion_weight", self.occlusion_weight),
            ("reserved_weight", self.reserved_weight),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Errors::InvalidOption(
                    name,
                    format!("{} must be a finite non-negative number", value),
                )
                .into());
            }
        }
        Ok(())
    }
}

impl TrackSetPosterior for ExponentialPosterior {
    fn log_probability(&self, track_set: &TrackSet, graph: &NeighborhoodGraph) -> Option<f64> {
        if track_set.is_empty() || !track_set.is_consistent(graph) {
            return None;
        }
        let length = track_set.hypothesis_count() as f64;
        let (dn, c2, c3) = track_set
            .tracks()
            .iter()
            .flat_map(|t| t.hypotheses())
            .map(|h| h.likelihood())
            .fold((0.0, 0.0, 0.0), |(dn, c2, c3), l| {
                (dn + l.dn, c2 + l.c2, c3 + l.c3)
            });

        Some(
            self.length_reward * length
                - self.track_penalty * track_set.len() as f64
                - self.fit_weight * dn
                - self.occlusion_weight * c2
                - self.reserved_weight * c3,
        )
    }
}
