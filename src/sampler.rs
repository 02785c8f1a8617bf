use crate::graph::NeighborhoodGraph;
use crate::posterior::TrackSetPosterior;
use crate::track::TrackSet;
use crate::utils::rng::RandomSource;
use log::debug;
use std::fmt;

/// Track-set mutations
pub mod moves;

pub const DEFAULT_ITERATIONS: usize = 400;
pub const DEFAULT_GAMMA: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Birth,
    Extension,
    Reduction,
    Death,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Birth, Move::Extension, Move::Reduction, Move::Death];

    /// Applies the move to the track-set in place, returns `false` when the move had nothing
    /// to work on and left the track-set untouched
    ///
    pub fn apply<R: RandomSource + ?Sized>(
        &self,
        track_set: &mut TrackSet,
        graph: &NeighborhoodGraph,
        rng: &mut R,
        gamma: f64,
    ) -> bool {
        match self {
            Move::Birth => moves::birth(track_set, graph, rng, gamma),
            Move::Extension => moves::extension(track_set, graph, rng, gamma),
            Move::Reduction => moves::reduction(track_set, rng),
            Move::Death => moves::death(track_set, rng),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Birth => "birth",
            Move::Extension => "extension",
            Move::Reduction => "reduction",
            Move::Death => "death",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveStats {
    /// times the move was drawn
    pub proposed: usize,
    /// times the move changed the track-set
    pub applied: usize,
    /// times the changed track-set became the chain state
    pub accepted: usize,
}

/// Result of one sampler run
///
#[derive(Clone, Debug)]
pub struct SamplerOutcome {
    /// Best track-set seen during the run, including the initial one
    pub best: TrackSet,
    pub best_log_probability: Option<f64>,
    /// Chain state after the last iteration
    pub last: TrackSet,
    pub stats: Vec<(Move, MoveStats)>,
}

impl SamplerOutcome {
    pub fn accepted(&self) -> usize {
        self.stats.iter().map(|(_, s)| s.accepted).sum()
    }
}

/// Metropolis-Hastings search over track-sets.
///
/// Each iteration draws one of the enabled moves uniformly, applies it to a copy of the
/// current track-set and accepts the copy with probability `min(1, π(W')/π(W))`. The best
/// track-set ever accepted is kept apart from the chain state.
///
#[derive(Clone, Debug)]
pub struct TrackSetSampler {
    iterations: usize,
    gamma: f64,
    moves: Vec<Move>,
}

impl Default for TrackSetSampler {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS, DEFAULT_GAMMA, Move::ALL.to_vec())
    }
}

impl TrackSetSampler {
    /// # Parameters
    /// * `iterations` - proposals per run
    /// * `gamma` - probability to stop an extension after every added vertex
    /// * `moves` - move types drawn uniformly, must not be empty
    ///
    pub fn new(iterations: usize, gamma: f64, moves: Vec<Move>) -> Self {
        assert!(
            (0.0..=1.0).contains(&gamma),
            "Gamma must be a probability"
        );
        assert!(!moves.is_empty(), "At least one move type is required");
        Self {
            iterations,
            gamma,
            moves,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Draws a move and applies it to a copy of `current`. The copy is returned even when the
    /// move was a no-op, together with the flag telling whether anything changed.
    ///
    pub fn propose<R: RandomSource + ?Sized>(
        &self,
        current: &TrackSet,
        graph: &NeighborhoodGraph,
        rng: &mut R,
    ) -> (usize, TrackSet, bool) {
        let slot = rng.next_int(self.moves.len());
        let mut proposal = current.clone();
        let applied = self.moves[slot].apply(&mut proposal, graph, rng, self.gamma);
        proposal.assert_consistent();
        (slot, proposal, applied)
    }

    /// Acceptance probability from the log posteriors, `None` meaning zero probability.
    /// The proposal kernel is symmetric, so the Hastings correction is one.
    ///
    pub fn acceptance(proposal: Option<f64>, current: Option<f64>) -> f64 {
        match (proposal, current) {
            (None, _) => 0.0,
            (Some(_), None) => 1.0,
            (Some(p), Some(c)) => (p - c).exp().min(1.0),
        }
    }

    /// Runs the chain from `initial`
    ///
    pub fn run<P, R>(
        &self,
        initial: TrackSet,
        graph: &NeighborhoodGraph,
        posterior: &P,
        rng: &mut R,
    ) -> SamplerOutcome
    where
        P: TrackSetPosterior + ?Sized,
        R: RandomSource + ?Sized,
    {
        let mut current_log_probability = posterior.log_probability(&initial, graph);
        let mut best = initial.clone();
        let mut best_log_probability = current_log_probability;
        let mut current = initial;
        let mut stats = self
            .moves
            .iter()
            .map(|&m| (m, MoveStats::default()))
            .collect::<Vec<_>>();

        for _ in 0..self.iterations {
            let (slot, proposal, applied) = self.propose(&current, graph, rng);
            let proposal_log_probability = posterior.log_probability(&proposal, graph);
            let a = Self::acceptance(proposal_log_probability, current_log_probability);
            let u = rng.next_uniform();

            let s = &mut stats[slot].1;
            s.proposed += 1;
            if applied {
                s.applied += 1;
            }
            if u < a {
                if applied {
                    s.accepted += 1;
                }
                current = proposal;
                current_log_probability = proposal_log_probability;
                if is_better(current_log_probability, best_log_probability) {
                    best = current.clone();
                    best_log_probability = current_log_probability;
                }
            }
        }

        debug!(
            "Sampler finished {} iterations: best has {} tracks, log probability {:?}",
            self.iterations,
            best.len(),
            best_log_probability
        );

        SamplerOutcome {
            best,
            best_log_probability,
            last: current,
            stats,
        }
    }
}

fn is_better(candidate: Option<f64>, best: Option<f64>) -> bool {
    match (candidate, best) {
        (Some(c), Some(b)) => c > b,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::kinematics::KinematicConstraint;
    use crate::graph::{EdgeType, NeighborhoodGraph};
    use crate::hypothesis::ObjectClass;
    use crate::posterior::{ExponentialPosterior, TrackSetPosterior};
    use crate::sampler::{Move, TrackSetSampler};
    use crate::test_stuff::{box_at, frame_with_boxes, SceneGen};
    use crate::track::TrackSet;
    use crate::utils::rng::scripted::ScriptedSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn acceptance() {
        assert_eq!(TrackSetSampler::acceptance(None, Some(1.0)), 0.0);
        assert_eq!(TrackSetSampler::acceptance(None, None), 0.0);
        assert_eq!(TrackSetSampler::acceptance(Some(-100.0), None), 1.0);
        assert_eq!(TrackSetSampler::acceptance(Some(2.0), Some(1.0)), 1.0);
        let a = TrackSetSampler::acceptance(Some(1.0), Some(2.0));
        assert!((a - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn birth_from_empty() {
        let mut g = NeighborhoodGraph::new(3, KinematicConstraint::default());
        g.insert_frame(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 5.0, 0.0)]]))
            .unwrap();
        let sampler = TrackSetSampler::new(1, 0.5, vec![Move::Birth]);
        // move, vertex, accept draw
        let mut rng = ScriptedSource::new(&[0, 0], &[0.99]);
        let outcome = sampler.run(
            TrackSet::new(g.len()),
            &g,
            &ExponentialPosterior::default(),
            &mut rng,
        );
        assert!(rng.exhausted());
        assert_eq!(outcome.best.len(), 1);
        assert_eq!(outcome.best.track(0).indices().collect::<Vec<_>>(), vec![0]);
        assert!(outcome.best_log_probability.is_some());
        assert_eq!(outcome.accepted(), 1);
    }

    #[test]
    fn rejected_proposals_leave_state() {
        let mut g = NeighborhoodGraph::new(3, KinematicConstraint::default());
        g.insert_frame(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 5.0, 0.0)]]))
            .unwrap();
        let mut initial = TrackSet::new(g.len());
        initial.add_track(g.hypothesis(0).clone());

        // death empties the set, zero probability, always rejected
        let sampler = TrackSetSampler::new(3, 0.5, vec![Move::Death]);
        let mut rng = ScriptedSource::new(&[0, 0, 0, 0, 0, 0], &[0.0, 0.0, 0.0]);
        let outcome = sampler.run(initial, &g, &ExponentialPosterior::default(), &mut rng);
        assert_eq!(outcome.last.len(), 1);
        assert_eq!(outcome.best.len(), 1);
        assert_eq!(outcome.stats[0].1.proposed, 3);
        assert_eq!(outcome.stats[0].1.applied, 3);
        assert_eq!(outcome.accepted(), 0);
    }

    #[test]
    fn chain_keeps_invariants() {
        let mut g = NeighborhoodGraph::new(4, KinematicConstraint::default());
        let posterior = ExponentialPosterior::default();
        let sampler = TrackSetSampler::new(200, 0.3, Move::ALL.to_vec());
        let mut rng = StdRng::seed_from_u64(11);
        let mut best = TrackSet::default();

        for frame in SceneGen::new(3, 5).take(6) {
            let update = g.update(frame).unwrap();
            best.grow(update.inserted);
            best.reindex(update.evicted);
            let outcome = sampler.run(best, &g, &posterior, &mut rng);
            best = outcome.best;

            best.assert_consistent();
            assert!(best.is_consistent(&g));
            for track in best.tracks() {
                let indices = track.indices().collect::<Vec<_>>();
                for pair in indices.windows(2) {
                    assert!(g.vertex(pair[0]).has_edge(pair[1], EdgeType::Child));
                }
            }
            for v in 0..g.len() {
                if best.is_claimed(v) {
                    assert!(g
                        .vertex(v)
                        .neighbors(EdgeType::Sibling)
                        .all(|s| !best.is_claimed(s)));
                }
            }
            assert!(posterior.probability(&best, &g) > 0.0);
        }
        // three cars observed over four buffered frames
        assert!(best.hypothesis_count() >= 6);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let run = || {
            let mut g = NeighborhoodGraph::new(3, KinematicConstraint::default());
            let sampler = TrackSetSampler::new(100, 0.3, Move::ALL.to_vec());
            let mut rng = StdRng::seed_from_u64(42);
            let mut best = TrackSet::default();
            let mut dumps = vec![];
            for frame in SceneGen::new(2, 3).take(4) {
                let update = g.update(frame).unwrap();
                best.grow(update.inserted);
                best.reindex(update.evicted);
                best = sampler
                    .run(best, &g, &ExponentialPosterior::default(), &mut rng)
                    .best;
                dumps.push(best.to_string());
            }
            dumps
        };
        assert_eq!(run(), run());
    }

    #[test]
    #[should_panic]
    fn no_moves() {
        TrackSetSampler::new(10, 0.3, vec![]);
    }
}
