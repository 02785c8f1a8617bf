use crate::graph::{EdgeType, NeighborhoodGraph};
use crate::track::TrackSet;
use crate::utils::rng::RandomSource;

/// Starts a track at a random free vertex and tries to extend it right away.
/// Returns `false` when no vertex is free.
///
pub fn birth<R: RandomSource + ?Sized>(
    track_set: &mut TrackSet,
    graph: &NeighborhoodGraph,
    rng: &mut R,
    gamma: f64,
) -> bool {
    let free = track_set.free_vertices(graph);
    if free.is_empty() {
        return false;
    }
    let vertex = free[rng.next_int(free.len())];
    let track = track_set.add_track(graph.hypothesis(vertex).clone());
    extend_track(track_set, track, graph, rng, gamma);
    true
}

/// Extends a random track. Returns `false` when nothing was added.
///
pub fn extension<R: RandomSource + ?Sized>(
    track_set: &mut TrackSet,
    graph: &NeighborhoodGraph,
    rng: &mut R,
    gamma: f64,
) -> bool {
    if track_set.is_empty() {
        return false;
    }
    let track = rng.next_int(track_set.len());
    extend_track(track_set, track, graph, rng, gamma)
}

/// Grows the track one vertex at a time, at the back through a child edge or at the front
/// through a parent edge, until there is no free candidate or a `gamma` draw stops it.
///
fn extend_track<R: RandomSource + ?Sized>(
    track_set: &mut TrackSet,
    track: usize,
    graph: &NeighborhoodGraph,
    rng: &mut R,
    gamma: f64,
) -> bool {
    let mut extended = false;
    while track_set.has_free_vertex(graph) {
        let at_back = rng.next_int(2) == 0;
        let (end, kind) = if at_back {
            (track_set.track(track).last(), EdgeType::Child)
        } else {
            (track_set.track(track).first(), EdgeType::Parent)
        };
        let end = match end {
            Some(h) => h.index(),
            None => break,
        };

        let candidates = graph
            .vertex(end)
            .neighbors(kind)
            .filter(|&v| track_set.is_free(graph, v))
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            break;
        }

        let hypothesis = graph
            .hypothesis(candidates[rng.next_int(candidates.len())])
            .clone();
        if at_back {
            track_set.push_back(track, hypothesis);
        } else {
            track_set.push_front(track, hypothesis);
        }
        extended = true;

        if rng.next_uniform() < gamma {
            break;
        }
    }
    extended
}

/// Cuts a random track longer than two at a random inner position, keeping either the head
/// or the tail. Returns `false` when no track is long enough.
///
pub fn reduction<R: RandomSource + ?Sized>(track_set: &mut TrackSet, rng: &mut R) -> bool {
    let eligible = (0..track_set.len())
        .filter(|&t| track_set.track(t).len() > 2)
        .collect::<Vec<_>>();
    if eligible.is_empty() {
        return false;
    }
    let track = eligible[rng.next_int(eligible.len())];
    let len = track_set.track(track).len();
    let cut = rng.next_int(len - 2) + 1;
    if rng.next_int(2) == 0 {
        track_set.keep_head(track, cut + 1);
    } else {
        track_set.drop_head(track, cut);
    }
    true
}

/// Removes a random track. Returns `false` for an empty track-set.
///
pub fn death<R: RandomSource + ?Sized>(track_set: &mut TrackSet, rng: &mut R) -> bool {
    if track_set.is_empty() {
        return false;
    }
    let track = rng.next_int(track_set.len());
    track_set.remove_track(track);
    true
}
