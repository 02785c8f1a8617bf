use crate::hypothesis::BoxModel;
use crate::utils::geometry::{normalize_theta, Pose};
use nalgebra::Point2;

/// Range used by the LIDAR front-end to drop far returns before segmentation
pub const DEFAULT_SCAN_RANGE: f64 = 30.0;

/// One LIDAR sweep projected to the ground plane.
///
/// Points are kept sorted by bearing, measured relative to the sensor heading.
///
#[derive(Clone, Debug)]
pub struct Scan {
    timestamp: f64,
    sensor: Pose,
    points: Vec<Point2<f64>>,
}

impl Scan {
    /// Creates the scan and sorts the points by bearing
    ///
    /// # Parameters
    /// * `timestamp` - acquisition time of the sweep, seconds
    /// * `sensor` - sensor pose in the world frame
    /// * `points` - world-frame returns
    ///
    pub fn new(timestamp: f64, sensor: Pose, mut points: Vec<Point2<f64>>) -> Self {
        points.sort_by(|a, b| bearing(&sensor, a).total_cmp(&bearing(&sensor, b)));
        Self {
            timestamp,
            sensor,
            points,
        }
    }

    /// Drops the returns farther than `range` from the sensor
    ///
    pub fn within_range(mut self, range: f64) -> Self {
        let origin = self.sensor.position();
        self.points
            .retain(|p| nalgebra::distance(&origin, p) < range);
        self
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn sensor(&self) -> &Pose {
        &self.sensor
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Bearing of the point as seen from the sensor, relative to the sensor heading
///
pub fn bearing(sensor: &Pose, point: &Point2<f64>) -> f64 {
    normalize_theta((point.y - sensor.y).atan2(point.x - sensor.x) - sensor.theta)
}

/// Alternative boxes fitted to one segment of the scan. The boxes are mutually exclusive
/// interpretations of the same points.
///
#[derive(Clone, Debug, Default)]
pub struct SegmentHypotheses {
    pub points: Vec<Point2<f64>>,
    pub boxes: Vec<BoxModel>,
}

impl SegmentHypotheses {
    pub fn new(points: Vec<Point2<f64>>, boxes: Vec<BoxModel>) -> Self {
        Self { points, boxes }
    }
}

/// Input of a tracker step: the sweep and the hypotheses fitted to its segments
///
#[derive(Clone, Debug)]
pub struct Frame {
    pub scan: Scan,
    pub segments: Vec<SegmentHypotheses>,
}

impl Frame {
    pub fn new(scan: Scan, segments: Vec<SegmentHypotheses>) -> Self {
        Self { scan, segments }
    }

    pub fn timestamp(&self) -> f64 {
        self.scan.timestamp()
    }

    /// Total number of boxes over all segments
    ///
    pub fn hypotheses_count(&self) -> usize {
        self.segments.iter().map(|s| s.boxes.len()).sum()
    }
}
