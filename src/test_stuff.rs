use crate::hypothesis::{BoxModel, ObjectClass};
use crate::scan::{Frame, Scan, SegmentHypotheses};
use crate::utils::geometry::{normalize_theta, OrientedRectangle, Pose};
use nalgebra::{Point2, Vector2};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::FRAC_PI_2;

/// Nominal box of the class at `(x, y)` heading along the x axis
///
pub fn box_at(class: ObjectClass, x: f64, y: f64) -> BoxModel {
    BoxModel::nominal(class, Pose::new(x, y, 0.0))
}

/// Frame without scan points, one segment per inner vector
///
pub fn frame_with_boxes(timestamp: f64, segments: Vec<Vec<BoxModel>>) -> Frame {
    Frame::new(
        Scan::new(timestamp, Pose::default(), vec![]),
        segments
            .into_iter()
            .map(|boxes| SegmentHypotheses::new(vec![], boxes))
            .collect(),
    )
}

/// Returns a sensor at `sensor` would get from the edges of the rectangle facing it,
/// sampled every `step` meters
///
pub fn visible_edges(
    rect: &OrientedRectangle,
    sensor: &Point2<f64>,
    step: f64,
) -> Vec<Point2<f64>> {
    let mut points = vec![];
    for (a, b) in rect.edges() {
        let d = b - a;
        let normal = Vector2::new(d.y, -d.x);
        let middle = a + d / 2.0;
        if normal.dot(&(sensor - middle)) <= 0.0 {
            continue;
        }
        let n = (d.norm() / step).ceil().max(1.0) as usize;
        points.extend((0..n).map(|i| a + d * (i as f64 / n as f64)));
    }
    points
}

/// Generates frames of a street scene: cars driving along the x axis in two lanes, observed by
/// a sensor at the origin. Each car is reported as a segment with two alternative boxes, the
/// correct one and the same box turned by 90 degrees.
///
pub struct SceneGen {
    objects: Vec<(Pose, Vector2<f64>)>,
    timestamp: f64,
    period: f64,
    gen: StdRng,
    noise: Uniform<f64>,
}

impl SceneGen {
    /// Scene with `objects` cars observed every 0.1 s, point noise seeded by `seed`
    ///
    pub fn new(objects: usize, seed: u64) -> Self {
        Self {
            objects: (0..objects)
                .map(|i| {
                    let lane = if i % 2 == 0 { 4.0 } else { -4.0 };
                    let speed = if i % 2 == 0 { 5.0 } else { -5.0 };
                    (
                        Pose::new(-12.0 + 7.0 * i as f64, lane, 0.0),
                        Vector2::new(speed, 0.0),
                    )
                })
                .collect(),
            timestamp: 0.0,
            period: 0.1,
            gen: StdRng::seed_from_u64(seed),
            noise: Uniform::new(-0.03, 0.03),
        }
    }
}

impl Iterator for SceneGen {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let sensor = Pose::default();
        let mut scan_points = vec![];
        let mut segments = vec![];

        for (pose, _) in &self.objects {
            let model = BoxModel::nominal(ObjectClass::Car, *pose);
            let points = visible_edges(&model.rectangle(), &sensor.position(), 0.25)
                .into_iter()
                .map(|p| {
                    Point2::new(
                        p.x + self.gen.sample(self.noise),
                        p.y + self.gen.sample(self.noise),
                    )
                })
                .collect::<Vec<_>>();
            let turned = BoxModel::nominal(
                ObjectClass::Car,
                Pose::new(pose.x, pose.y, normalize_theta(pose.theta + FRAC_PI_2)),
            );
            scan_points.extend(points.iter().copied());
            segments.push(SegmentHypotheses::new(points, vec![model, turned]));
        }

        let frame = Frame::new(Scan::new(self.timestamp, sensor, scan_points), segments);

        for (pose, velocity) in self.objects.iter_mut() {
            pose.x += velocity.x * self.period;
            pose.y += velocity.y * self.period;
        }
        self.timestamp += self.period;
        Some(frame)
    }
}
