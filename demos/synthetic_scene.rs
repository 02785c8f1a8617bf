use anyhow::Result;
use virtual_scan::prelude::{Tracker, TrackerOptions};
use virtual_scan::test_stuff::SceneGen;

fn main() -> Result<()> {
    env_logger::init();

    let mut tracker = Tracker::new(TrackerOptions::default().window_capacity(4).seed(7))?;

    for frame in SceneGen::new(4, 3).take(20) {
        let timestamp = frame.timestamp();
        match tracker.update(frame)? {
            None => eprintln!("{:.1}s: no tracks", timestamp),
            Some(best) => {
                eprintln!("{:.1}s: {} tracks", timestamp, best.len());
                for (i, track) in best.tracks().iter().enumerate() {
                    let last = track.last().map(|h| *h.pose());
                    eprintln!(
                        "  track {}: {} hypotheses, last pose {:?}, velocity {:?}",
                        i,
                        track.len(),
                        last,
                        track.velocity().map(|v| (v.x, v.y))
                    );
                }
            }
        }
    }

    for (m, stats) in tracker.stats() {
        eprintln!("{}: {:?}", m, stats);
    }
    Ok(())
}
