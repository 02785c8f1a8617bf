use crate::graph::kinematics::KinematicConstraint;
use crate::hypothesis::Hypothesis;
use crate::scan::Frame;
use crate::Errors;
use anyhow::Result;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Feasibility rule for parent/child edges
pub mod kinematics;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeType {
    /// Alternative interpretation of the same segment in the same frame
    Sibling,
    /// Continuation in an older frame
    Parent,
    /// Continuation in a newer frame
    Child,
}

impl EdgeType {
    pub fn symbol(&self) -> char {
        match self {
            EdgeType::Sibling => 'S',
            EdgeType::Parent => 'P',
            EdgeType::Child => 'C',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub target: usize,
    pub kind: EdgeType,
}

#[derive(Clone, Debug)]
pub struct Vertex {
    hypothesis: Hypothesis,
    edges: Vec<Edge>,
}

impl Vertex {
    pub fn hypothesis(&self) -> &Hypothesis {
        &self.hypothesis
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn neighbors(&self, kind: EdgeType) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| e.target)
    }

    pub fn has_edge(&self, target: usize, kind: EdgeType) -> bool {
        self.edges.contains(&Edge { target, kind })
    }
}

/// Changes applied to the graph by [NeighborhoodGraph::update]
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphUpdate {
    /// vertices appended at the end
    pub inserted: usize,
    /// vertices removed from the front
    pub evicted: usize,
}

#[derive(Clone, Copy, Debug)]
struct BufferedFrame {
    sequence: u64,
    timestamp: f64,
}

/// Sliding-window graph of hypotheses.
///
/// Vertices are stored in frame order and addressed by their position. Sibling edges join
/// the alternatives fitted to one segment, parent/child edges join feasible continuations
/// across frames. When the window holds more than `capacity` frames the oldest frame leaves
/// the graph, which always removes a prefix of the vertex array; the remaining vertices and
/// edges are renumbered.
///
#[derive(Clone, Debug)]
pub struct NeighborhoodGraph {
    vertices: Vec<Vertex>,
    frames: VecDeque<BufferedFrame>,
    capacity: usize,
    constraint: KinematicConstraint,
    next_sequence: u64,
}

impl NeighborhoodGraph {
    /// Creates an empty graph
    ///
    /// # Parameters
    /// * `capacity` - number of frames kept in the window
    /// * `constraint` - feasibility rule for parent/child edges
    ///
    pub fn new(capacity: usize, constraint: KinematicConstraint) -> Self {
        assert!(capacity > 0, "The window must keep at least one frame");
        Self {
            vertices: Vec::default(),
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
            constraint,
            next_sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> &Vertex {
        &self.vertices[index]
    }

    pub fn hypothesis(&self, index: usize) -> &Hypothesis {
        &self.vertices[index].hypothesis
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn constraint(&self) -> &KinematicConstraint {
        &self.constraint
    }

    /// Number of frames currently buffered
    ///
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames inserted since the graph was created
    ///
    pub fn frames_seen(&self) -> u64 {
        self.next_sequence
    }

    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.frames.iter().map(|f| f.timestamp)
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.frames.back().map(|f| f.timestamp)
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.frames.front().map(|f| f.timestamp)
    }

    pub fn are_siblings(&self, a: usize, b: usize) -> bool {
        self.vertices[a].has_edge(b, EdgeType::Sibling)
    }

    pub fn is_parent_of(&self, parent: usize, child: usize) -> bool {
        self.vertices[parent].has_edge(child, EdgeType::Child)
    }

    /// Inserts the frame and evicts the oldest frame when the window overflows
    ///
    pub fn update(&mut self, frame: Frame) -> Result<GraphUpdate> {
        let inserted = self.insert_frame(frame)?;
        let mut evicted = 0;
        while self.frames.len() > self.capacity {
            evicted += self.evict_oldest_frame();
        }
        Ok(GraphUpdate { inserted, evicted })
    }

    /// Appends one vertex per box of the frame and links it to its siblings and to its feasible
    /// parents. Returns the number of inserted vertices.
    ///
    /// The frame is rejected as a whole when its timestamp does not follow the newest buffered
    /// one or when a box is malformed.
    ///
    pub fn insert_frame(&mut self, frame: Frame) -> Result<usize> {
        let timestamp = frame.timestamp();
        let previous = self.newest_timestamp();
        if !timestamp.is_finite() || previous.map_or(false, |p| timestamp <= p) {
            return Err(Errors::NonMonotonicTimestamp {
                previous: previous.unwrap_or(f64::NEG_INFINITY),
                current: timestamp,
            }
            .into());
        }
        for model in frame.segments.iter().flat_map(|s| s.boxes.iter()) {
            model.validate()?;
        }

        let sequence = self.next_sequence;
        let scan = Arc::new(frame.scan);
        let first = self.vertices.len();

        for (segment_id, segment) in frame.segments.into_iter().enumerate() {
            let points = Arc::new(segment.points);
            let start = self.vertices.len();
            let end = start + segment.boxes.len();
            for (offset, model) in segment.boxes.into_iter().enumerate() {
                let index = start + offset;
                let edges = (start..end)
                    .filter(|&sibling| sibling != index)
                    .map(|target| Edge {
                        target,
                        kind: EdgeType::Sibling,
                    })
                    .collect();
                self.vertices.push(Vertex {
                    hypothesis: Hypothesis::new(
                        model,
                        index,
                        sequence,
                        segment_id,
                        points.clone(),
                        scan.clone(),
                    ),
                    edges,
                });
            }
        }

        self.vertices[first..].par_iter().for_each(|v| {
            v.hypothesis.likelihood();
        });
        self.link_parents(first, sequence);

        self.frames.push_back(BufferedFrame {
            sequence,
            timestamp,
        });
        self.next_sequence += 1;

        let inserted = self.vertices.len() - first;
        if inserted == 0 {
            warn!("Frame {} at {:.3}s carries no hypotheses", sequence, timestamp);
        } else {
            debug!(
                "Frame {} at {:.3}s: {} vertices inserted, graph size {}",
                sequence,
                timestamp,
                inserted,
                self.vertices.len()
            );
        }
        Ok(inserted)
    }

    fn link_parents(&mut self, first: usize, sequence: u64) {
        let oldest_parent_frame = sequence.saturating_sub(self.constraint.max_frame_gap());
        let start = self.vertices[..first]
            .partition_point(|v| v.hypothesis.frame() < oldest_parent_frame);

        let links = (first..self.vertices.len())
            .flat_map(|child| (start..first).map(move |parent| (parent, child)))
            .filter(|&(parent, child)| {
                self.constraint.validate(
                    &self.vertices[parent].hypothesis,
                    &self.vertices[child].hypothesis,
                )
            })
            .collect::<Vec<_>>();

        for (parent, child) in links {
            self.vertices[child].edges.push(Edge {
                target: parent,
                kind: EdgeType::Parent,
            });
            self.vertices[parent].edges.push(Edge {
                target: child,
                kind: EdgeType::Child,
            });
        }
    }

    /// Removes every vertex of the oldest buffered frame and renumbers the rest.
    /// Returns the number of removed vertices.
    ///
    pub fn evict_oldest_frame(&mut self) -> usize {
        let victim = match self.frames.pop_front() {
            Some(frame) => frame,
            None => return 0,
        };

        let removed = self
            .vertices
            .iter()
            .take_while(|v| v.hypothesis.frame() == victim.sequence)
            .count();
        assert!(
            self.vertices[removed..]
                .iter()
                .all(|v| v.hypothesis.frame() > victim.sequence),
            "Vertices of the evicted frame must form a prefix of the graph"
        );

        self.vertices.drain(..removed);
        for (position, v) in self.vertices.iter_mut().enumerate() {
            assert!(
                v.hypothesis.shift_index(removed),
                "Vertex index became negative after eviction"
            );
            assert_eq!(v.hypothesis.index(), position);
            v.edges.retain(|e| e.target >= removed);
            for e in v.edges.iter_mut() {
                e.target -= removed;
            }
        }

        debug!(
            "Frame {} at {:.3}s evicted: {} vertices removed, graph size {}",
            victim.sequence,
            victim.timestamp,
            removed,
            self.vertices.len()
        );
        removed
    }
}

impl fmt::Display for NeighborhoodGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.vertices.iter().enumerate() {
            write!(f, "h {} {} -", i, v.hypothesis.class())?;
            for e in &v.edges {
                write!(f, " {}({}, {})", e.kind.symbol(), i, e.target)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::kinematics::KinematicConstraint;
    use crate::graph::{EdgeType, NeighborhoodGraph};
    use crate::hypothesis::{BoxModel, ObjectClass};
    use crate::test_stuff::{box_at, frame_with_boxes};
    use crate::utils::geometry::Pose;
    use crate::Errors;

    fn graph(capacity: usize) -> NeighborhoodGraph {
        NeighborhoodGraph::new(capacity, KinematicConstraint::new(20.0, 2))
    }

    fn assert_well_formed(g: &NeighborhoodGraph) {
        for (i, v) in g.vertices().iter().enumerate() {
            assert_eq!(v.hypothesis().index(), i);
            for e in v.edges() {
                assert!(e.target < g.len());
                let back = match e.kind {
                    EdgeType::Sibling => EdgeType::Sibling,
                    EdgeType::Parent => EdgeType::Child,
                    EdgeType::Child => EdgeType::Parent,
                };
                assert!(g.vertex(e.target).has_edge(i, back));
            }
        }
    }

    #[test]
    fn sibling_edges() -> anyhow::Result<()> {
        let mut g = graph(3);
        let inserted = g.insert_frame(frame_with_boxes(
            0.0,
            vec![
                vec![
                    box_at(ObjectClass::Car, 0.0, 0.0),
                    box_at(ObjectClass::Car, 0.5, 0.0),
                    box_at(ObjectClass::Bus, 0.0, 0.0),
                ],
                vec![box_at(ObjectClass::Car, 10.0, 0.0)],
            ],
        ))?;
        assert_eq!(inserted, 4);
        assert_eq!(g.vertex(0).neighbors(EdgeType::Sibling).collect::<Vec<_>>(), vec![1, 2]);
        assert!(g.are_siblings(2, 1));
        assert!(g.vertex(3).edges().is_empty());
        assert!(!g.are_siblings(0, 3));
        assert_eq!(g.hypothesis(3).segment(), 1);
        assert_well_formed(&g);
        Ok(())
    }

    #[test]
    fn parent_child_edges() -> anyhow::Result<()> {
        let mut g = graph(3);
        g.insert_frame(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 0.0, 0.0)]]))?;
        g.insert_frame(frame_with_boxes(
            0.1,
            vec![
                vec![box_at(ObjectClass::Car, 1.0, 0.0)],
                vec![box_at(ObjectClass::Car, 3.0, 0.0)],
                vec![box_at(ObjectClass::Bike, 0.5, 0.0)],
            ],
        ))?;
        assert!(g.is_parent_of(0, 1));
        assert!(g.vertex(1).has_edge(0, EdgeType::Parent));
        assert!(!g.is_parent_of(0, 2));
        assert!(!g.is_parent_of(0, 3));
        assert_eq!(g.vertex(0).neighbors(EdgeType::Child).count(), 1);
        assert_well_formed(&g);
        Ok(())
    }

    #[test]
    fn frame_gap_limits_parents() -> anyhow::Result<()> {
        let mut g = graph(5);
        for (i, ts) in [0.0, 0.1, 0.2, 0.3].into_iter().enumerate() {
            g.insert_frame(frame_with_boxes(
                ts,
                vec![vec![box_at(ObjectClass::Car, i as f64 * 0.5, 0.0)]],
            ))?;
        }
        let parents = g.vertex(3).neighbors(EdgeType::Parent).collect::<Vec<_>>();
        assert_eq!(parents, vec![1, 2]);
        assert_well_formed(&g);
        Ok(())
    }

    #[test]
    fn eviction_renumbers() -> anyhow::Result<()> {
        let mut g = graph(3);
        let mut evicted = 0;
        for (i, ts) in [0.0, 0.1, 0.2, 0.3].into_iter().enumerate() {
            let x = i as f64;
            let update = g.update(frame_with_boxes(
                ts,
                vec![vec![
                    box_at(ObjectClass::Car, x, 0.0),
                    box_at(ObjectClass::Bus, x, 0.0),
                ]],
            ))?;
            assert_eq!(update.inserted, 2);
            evicted += update.evicted;
        }
        assert_eq!(evicted, 2);
        assert_eq!(g.frame_count(), 3);
        assert_eq!(g.len(), 6);
        assert_eq!(g.oldest_timestamp(), Some(0.1));
        assert!(g.vertices().iter().all(|v| v.hypothesis().frame() >= 1));
        assert!(g.vertex(0).neighbors(EdgeType::Parent).next().is_none());
        assert!(g.is_parent_of(0, 2));
        assert_well_formed(&g);
        Ok(())
    }

    #[test]
    fn empty_frame_still_counts() -> anyhow::Result<()> {
        let mut g = graph(2);
        g.update(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 0.0, 0.0)]]))?;
        let update = g.update(frame_with_boxes(0.1, vec![]))?;
        assert_eq!(update.inserted, 0);
        assert_eq!(update.evicted, 0);
        let update = g.update(frame_with_boxes(0.2, vec![vec![]]))?;
        assert_eq!(update.evicted, 1);
        assert!(g.is_empty());
        assert_eq!(g.frames_seen(), 3);
        Ok(())
    }

    #[test]
    fn rejects_bad_frames() -> anyhow::Result<()> {
        let mut g = graph(2);
        g.insert_frame(frame_with_boxes(1.0, vec![vec![box_at(ObjectClass::Car, 0.0, 0.0)]]))?;

        let err = g
            .insert_frame(frame_with_boxes(1.0, vec![]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::NonMonotonicTimestamp { .. })
        ));

        let broken = BoxModel::new(ObjectClass::Car, Pose::new(0.0, 0.0, 0.0), -1.0, 1.0);
        let err = g
            .insert_frame(frame_with_boxes(2.0, vec![vec![broken]]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::InvalidBoxModel(_))
        ));
        assert_eq!(g.len(), 1);
        assert_eq!(g.frame_count(), 1);
        Ok(())
    }

    #[test]
    fn likelihood_precomputed() -> anyhow::Result<()> {
        let mut g = graph(2);
        g.insert_frame(frame_with_boxes(
            0.0,
            vec![vec![box_at(ObjectClass::Car, 0.0, 0.0), box_at(ObjectClass::Bus, 0.0, 0.0)]],
        ))?;
        assert!(g.vertices().iter().all(|v| v.hypothesis().is_likelihood_cached()));
        Ok(())
    }

    #[test]
    fn dump() -> anyhow::Result<()> {
        let mut g = graph(2);
        g.insert_frame(frame_with_boxes(0.0, vec![vec![box_at(ObjectClass::Car, 0.0, 0.0)]]))?;
        g.insert_frame(frame_with_boxes(0.1, vec![vec![box_at(ObjectClass::Car, 0.5, 0.0)]]))?;
        let text = g.to_string();
        assert_eq!(text, "h 0 C - C(0, 1)\nh 1 C - P(1, 0)\n");
        Ok(())
    }
}
