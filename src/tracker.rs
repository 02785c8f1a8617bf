use crate::graph::NeighborhoodGraph;
use crate::posterior::{ExponentialPosterior, TrackSetPosterior};
use crate::sampler::{Move, MoveStats, TrackSetSampler};
use crate::scan::Frame;
use crate::track::TrackSet;
use crate::tracker::options::TrackerOptions;
use crate::utils::rng::RandomSource;
use anyhow::Result;
use log::{debug, log_enabled, trace, Level};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::mem;

/// Tracker configuration
pub mod options;

/// Frame-driven MCMC tracker.
///
/// The tracker owns the neighborhood graph, the random source and the best track-set found
/// so far. Every [update](Tracker::update) inserts a frame, keeps the best track-set in sync
/// with the graph window, and runs the sampler seeded from it.
///
pub struct Tracker<P = ExponentialPosterior, R = StdRng> {
    options: TrackerOptions,
    graph: NeighborhoodGraph,
    sampler: TrackSetSampler,
    posterior: P,
    rng: R,
    best: TrackSet,
    stats: Vec<(Move, MoveStats)>,
}

impl Tracker {
    /// Creates the tracker with the default posterior and a `StdRng` seeded from the options
    ///
    pub fn new(options: TrackerOptions) -> Result<Self> {
        let rng = StdRng::seed_from_u64(options.seed);
        Self::with_parts(options, ExponentialPosterior::default(), rng)
    }
}

impl<P, R> Tracker<P, R>
where
    P: TrackSetPosterior,
    R: RandomSource,
{
    pub fn with_parts(options: TrackerOptions, posterior: P, rng: R) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            graph: NeighborhoodGraph::new(options.window_capacity, options.constraint()),
            sampler: options.sampler(),
            options,
            posterior,
            rng,
            best: TrackSet::default(),
            stats: Vec::default(),
        })
    }

    /// Consumes the next frame and returns the best track-set, `None` when no track-set with a
    /// positive posterior is known.
    ///
    /// A frame rejected by the graph leaves the tracker untouched.
    ///
    pub fn update(&mut self, frame: Frame) -> Result<Option<&TrackSet>> {
        let update = self.graph.update(frame)?;

        self.best.grow(update.inserted);
        self.best.reindex(update.evicted);
        self.best.assert_consistent();
        assert_eq!(
            self.best.claimed().len(),
            self.graph.len(),
            "Track-set claims are out of sync with the graph"
        );

        let outcome = self.sampler.run(
            mem::take(&mut self.best),
            &self.graph,
            &self.posterior,
            &mut self.rng,
        );
        self.best = outcome.best;
        self.stats = outcome.stats;

        if log_enabled!(Level::Trace) {
            trace!("Neighborhood graph:\n{}", self.graph);
            trace!("Best track-set:\n{}", self.best);
        }
        debug!(
            "Frame {} processed: {} vertices, {} tracks over {} hypotheses, log probability {:?}",
            self.graph.frames_seen(),
            self.graph.len(),
            self.best.len(),
            self.best.hypothesis_count(),
            outcome.best_log_probability
        );

        Ok(self.best())
    }

    pub fn best(&self) -> Option<&TrackSet> {
        if self.best.is_empty() {
            None
        } else {
            Some(&self.best)
        }
    }

    pub fn best_log_probability(&self) -> Option<f64> {
        self.posterior.log_probability(&self.best, &self.graph)
    }

    pub fn graph(&self) -> &NeighborhoodGraph {
        &self.graph
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn posterior(&self) -> &P {
        &self.posterior
    }

    /// Per-move statistics of the last sampler run
    ///
    pub fn stats(&self) -> &[(Move, MoveStats)] {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use crate::hypothesis::ObjectClass;
    use crate::posterior::ExponentialPosterior;
    use crate::sampler::Move;
    use crate::test_stuff::{box_at, frame_with_boxes, SceneGen};
    use crate::tracker::options::TrackerOptions;
    use crate::tracker::Tracker;
    use crate::utils::rng::scripted::ScriptedSource;
    use crate::Errors;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn single_hypothesis() -> anyhow::Result<()> {
        init_logs();
        let mut tracker = Tracker::new(TrackerOptions::default())?;
        let best = tracker
            .update(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 5.0, 0.0)]]))?
            .unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best.track(0).indices().collect::<Vec<_>>(), vec![0]);
        assert!(tracker.best_log_probability().is_some());
        Ok(())
    }

    #[test]
    fn extension_joins_two_frames() -> anyhow::Result<()> {
        init_logs();
        let opts = TrackerOptions::default()
            .iterations(1)
            .gamma(0.3)
            .moves(&[Move::Birth, Move::Extension]);
        // birth of vertex 0 accepted, then extension at the back with vertex 1 accepted
        let rng = ScriptedSource::new(&[0, 0, 1, 0, 0, 0], &[0.5, 0.1, 0.5]);
        let mut tracker = Tracker::with_parts(opts, ExponentialPosterior::default(), rng)?;

        tracker.update(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 0.0, 0.0)]]))?;
        let best = tracker
            .update(frame_with_boxes(0.1, vec![vec![box_at(ObjectClass::Car, 1.0, 0.0)]]))?
            .unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best.track(0).indices().collect::<Vec<_>>(), vec![0, 1]);
        let timestamps = best.track(0).observations().map(|(_, t)| t).collect::<Vec<_>>();
        assert_eq!(timestamps, vec![0.0, 0.1]);
        assert_eq!(tracker.stats()[1].1.accepted, 1);
        Ok(())
    }

    #[test]
    fn evicted_tracks_disappear() -> anyhow::Result<()> {
        init_logs();
        let opts = TrackerOptions::default()
            .window_capacity(3)
            .iterations(1)
            .moves(&[Move::Birth]);
        let rng = ScriptedSource::new(&[0, 0, 0, 0, 0], &[0.5, 0.5, 0.5, 0.5]);
        let mut tracker = Tracker::with_parts(opts, ExponentialPosterior::default(), rng)?;

        tracker.update(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 0.0, 50.0)]]))?;
        tracker.update(frame_with_boxes(0.1, vec![]))?;
        let best = tracker.update(frame_with_boxes(0.2, vec![]))?.unwrap();
        assert_eq!(best.len(), 1);
        assert_eq!(best.claimed().len(), 1);

        let best = tracker.update(frame_with_boxes(0.3, vec![]))?;
        assert!(best.is_none());
        assert_eq!(tracker.graph().frame_count(), 3);
        assert!(tracker.graph().is_empty());
        assert_eq!(tracker.best_log_probability(), None);
        Ok(())
    }

    #[test]
    fn rejected_frame_keeps_state() -> anyhow::Result<()> {
        let mut tracker = Tracker::new(TrackerOptions::default().iterations(50))?;
        tracker.update(frame_with_boxes(1.0, vec![vec![box_at(ObjectClass::Car, 5.0, 0.0)]]))?;
        let err = tracker
            .update(frame_with_boxes(0.5, vec![vec![box_at(ObjectClass::Car, 5.0, 0.0)]]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::NonMonotonicTimestamp { .. })
        ));
        assert_eq!(tracker.graph().len(), 1);
        assert_eq!(tracker.best().map(|b| b.len()), Some(1));
        Ok(())
    }

    #[test]
    fn invalid_options() {
        assert!(Tracker::new(TrackerOptions::default().gamma(-0.1)).is_err());
    }

    #[test]
    fn same_seed_same_tracks() -> anyhow::Result<()> {
        init_logs();
        let run = |seed: u64| -> anyhow::Result<Vec<String>> {
            let mut tracker = Tracker::new(TrackerOptions::default().seed(seed).iterations(150))?;
            let mut dumps = vec![];
            for frame in SceneGen::new(3, 9).take(8) {
                let best = tracker.update(frame)?;
                dumps.push(best.map(|b| b.to_string()).unwrap_or_default());
                let graph = tracker.graph();
                if let Some(best) = tracker.best() {
                    assert!(best.is_consistent(graph));
                }
            }
            Ok(dumps)
        };
        assert_eq!(run(1)?, run(1)?);
        Ok(())
    }
}
