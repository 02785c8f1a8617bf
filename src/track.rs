use crate::graph::{EdgeType, NeighborhoodGraph};
use crate::hypothesis::Hypothesis;
use nalgebra::Vector2;
use std::collections::VecDeque;
use std::fmt;

/// Time-ordered chain of hypotheses describing one object.
///
/// The track keeps copies of the hypotheses, so it outlives the graph vertices it was built
/// from; graph indices are kept in sync by [Track::reindex].
///
#[derive(Clone, Debug, Default)]
pub struct Track {
    hypotheses: VecDeque<Hypothesis>,
}

impl Track {
    pub fn new(hypothesis: Hypothesis) -> Self {
        Self {
            hypotheses: VecDeque::from(vec![hypothesis]),
        }
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn hypotheses(&self) -> impl Iterator<Item = &Hypothesis> + '_ {
        self.hypotheses.iter()
    }

    pub fn first(&self) -> Option<&Hypothesis> {
        self.hypotheses.front()
    }

    pub fn last(&self) -> Option<&Hypothesis> {
        self.hypotheses.back()
    }

    /// Graph indices of the hypotheses, oldest first
    ///
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.hypotheses.iter().map(|h| h.index())
    }

    /// `(hypothesis, timestamp)` pairs, oldest first
    ///
    pub fn observations(&self) -> impl Iterator<Item = (&Hypothesis, f64)> + '_ {
        self.hypotheses.iter().map(|h| (h, h.timestamp()))
    }

    /// Velocity estimated from the two newest poses
    ///
    pub fn velocity(&self) -> Option<Vector2<f64>> {
        let n = self.hypotheses.len();
        if n < 2 {
            return None;
        }
        let (prev, last) = (&self.hypotheses[n - 2], &self.hypotheses[n - 1]);
        let dt = last.timestamp() - prev.timestamp();
        if dt <= 0.0 {
            return None;
        }
        Some((last.pose().position() - prev.pose().position()) / dt)
    }

    /// Checks that every pair of consecutive hypotheses is joined by a child edge of the graph
    ///
    pub fn is_linked(&self, graph: &NeighborhoodGraph) -> bool {
        self.hypotheses
            .iter()
            .zip(self.hypotheses.iter().skip(1))
            .all(|(parent, child)| {
                parent.index() < graph.len()
                    && child.index() < graph.len()
                    && graph.is_parent_of(parent.index(), child.index())
            })
    }

    /// Shifts the indices after `removed` vertices left the graph and drops the hypotheses
    /// that left with them. Returns the number of dropped hypotheses.
    ///
    pub(crate) fn reindex(&mut self, removed: usize) -> usize {
        let before = self.hypotheses.len();
        self.hypotheses.retain_mut(|h| h.shift_index(removed));
        before - self.hypotheses.len()
    }
}

/// Non-conflicting collection of tracks with a claim flag per graph vertex.
///
/// Every vertex belongs to at most one track, and a track-set never holds two sibling
/// vertices. Mutations go through claim-aware helpers which panic when a vertex would be
/// claimed twice or released while free.
///
#[derive(Clone, Debug, Default)]
pub struct TrackSet {
    tracks: Vec<Track>,
    claimed: Vec<bool>,
}

impl TrackSet {
    /// Empty track-set over a graph with `vertices` vertices
    ///
    pub fn new(vertices: usize) -> Self {
        Self {
            tracks: Vec::default(),
            claimed: vec![false; vertices],
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track: usize) -> &Track {
        &self.tracks[track]
    }

    /// Number of tracks
    ///
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn claimed(&self) -> &[bool] {
        &self.claimed
    }

    pub fn is_claimed(&self, vertex: usize) -> bool {
        self.claimed[vertex]
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.iter().filter(|&&c| c).count()
    }

    /// Total length of all tracks
    ///
    pub fn hypothesis_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Checks that the vertex is free and none of its siblings is claimed
    ///
    pub fn is_free(&self, graph: &NeighborhoodGraph, vertex: usize) -> bool {
        !self.claimed[vertex]
            && !graph
                .vertex(vertex)
                .neighbors(EdgeType::Sibling)
                .any(|s| self.claimed[s])
    }

    /// Vertices that may join the track-set (V*)
    ///
    pub fn free_vertices(&self, graph: &NeighborhoodGraph) -> Vec<usize> {
        (0..graph.len()).filter(|&v| self.is_free(graph, v)).collect()
    }

    pub fn has_free_vertex(&self, graph: &NeighborhoodGraph) -> bool {
        (0..graph.len()).any(|v| self.is_free(graph, v))
    }

    fn claim(&mut self, vertex: usize) {
        assert!(!self.claimed[vertex], "Vertex {} is already claimed", vertex);
        self.claimed[vertex] = true;
    }

    fn release(&mut self, vertex: usize) {
        assert!(self.claimed[vertex], "Vertex {} is not claimed", vertex);
        self.claimed[vertex] = false;
    }

    /// Starts a new track with the hypothesis, returns the track position
    ///
    pub(crate) fn add_track(&mut self, hypothesis: Hypothesis) -> usize {
        self.claim(hypothesis.index());
        self.tracks.push(Track::new(hypothesis));
        self.tracks.len() - 1
    }

    pub(crate) fn push_back(&mut self, track: usize, hypothesis: Hypothesis) {
        self.claim(hypothesis.index());
        self.tracks[track].hypotheses.push_back(hypothesis);
    }

    pub(crate) fn push_front(&mut self, track: usize, hypothesis: Hypothesis) {
        self.claim(hypothesis.index());
        self.tracks[track].hypotheses.push_front(hypothesis);
    }

    /// Keeps the first `keep` hypotheses of the track and releases the rest
    ///
    pub(crate) fn keep_head(&mut self, track: usize, keep: usize) {
        let tail = self.tracks[track].hypotheses.split_off(keep);
        for h in tail {
            self.release(h.index());
        }
    }

    /// Releases the first `count` hypotheses of the track
    ///
    pub(crate) fn drop_head(&mut self, track: usize, count: usize) {
        let head = self.tracks[track]
            .hypotheses
            .drain(..count)
            .collect::<Vec<_>>();
        for h in head {
            self.release(h.index());
        }
    }

    pub(crate) fn remove_track(&mut self, track: usize) -> Track {
        let removed = self.tracks.remove(track);
        for v in removed.indices() {
            self.release(v);
        }
        removed
    }

    /// Follows `added` vertices appended to the graph
    ///
    pub fn grow(&mut self, added: usize) {
        self.claimed.resize(self.claimed.len() + added, false);
    }

    /// Follows the eviction of the first `removed` graph vertices: shifts indices, drops the
    /// evicted hypotheses and the tracks left empty, shifts the claim array.
    ///
    pub fn reindex(&mut self, removed: usize) {
        if removed == 0 {
            return;
        }
        for track in self.tracks.iter_mut() {
            track.reindex(removed);
        }
        self.tracks.retain(|t| !t.is_empty());
        let removed = removed.min(self.claimed.len());
        self.claimed.drain(..removed);
    }

    /// Panics when the track lengths and the claim array disagree
    ///
    pub fn assert_consistent(&self) {
        assert_eq!(
            self.hypothesis_count(),
            self.claimed_count(),
            "Track lengths do not match the claimed vertices"
        );
    }

    /// Full check of the track-set against the graph: claims match track membership, no
    /// vertex is shared, no sibling conflicts, every track is non-empty and linked.
    ///
    pub fn is_consistent(&self, graph: &NeighborhoodGraph) -> bool {
        if self.claimed.len() != graph.len() {
            return false;
        }
        let mut seen = vec![false; graph.len()];
        for track in &self.tracks {
            if track.is_empty() || !track.is_linked(graph) {
                return false;
            }
            for v in track.indices() {
                if v >= graph.len() || seen[v] || !self.claimed[v] {
                    return false;
                }
                seen[v] = true;
            }
        }
        if seen != self.claimed {
            return false;
        }
        !(0..graph.len()).any(|v| {
            self.claimed[v]
                && graph
                    .vertex(v)
                    .neighbors(EdgeType::Sibling)
                    .any(|s| self.claimed[s])
        })
    }
}

impl fmt::Display for TrackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, track) in self.tracks.iter().enumerate() {
            write!(f, "track {} -", i)?;
            for (h, timestamp) in track.observations() {
                write!(f, " {}{}@{:.3}", h.class(), h.index(), timestamp)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
