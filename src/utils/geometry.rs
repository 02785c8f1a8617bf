use crate::EPS;
use geo::{Intersects, Line, LineString, Polygon};
use nalgebra::{Point2, Rotation2, Vector2};
use std::f64::consts::PI;

/// Planar pose (x, y, heading)
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn distance(&self, other: &Pose) -> f64 {
        nalgebra::distance(&self.position(), &other.position())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.theta.is_finite()
    }
}

/// Normalizes the angle into `(-PI, PI]`
///
pub fn normalize_theta(theta: f64) -> f64 {
    let mut t = theta % (2.0 * PI);
    if t > PI {
        t -= 2.0 * PI;
    } else if t <= -PI {
        t += 2.0 * PI;
    }
    t
}

/// Rectangle rotated by `theta` around its center. `length` is measured along the heading,
/// `width` across it.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedRectangle {
    pub center: Point2<f64>,
    pub theta: f64,
    pub length: f64,
    pub width: f64,
}

impl OrientedRectangle {
    pub fn new(pose: Pose, length: f64, width: f64) -> Self {
        Self {
            center: pose.position(),
            theta: pose.theta,
            length,
            width,
        }
    }

    /// Same center and heading, both dimensions multiplied by `scale`
    ///
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            length: self.length * scale,
            width: self.width * scale,
            ..*self
        }
    }

    /// Corners in counter-clockwise order, starting from the rear right one
    ///
    pub fn corners(&self) -> [Point2<f64>; 4] {
        let rotation = Rotation2::new(self.theta);
        let hl = self.length / 2.0;
        let hw = self.width / 2.0;
        [
            Vector2::new(-hl, -hw),
            Vector2::new(hl, -hw),
            Vector2::new(hl, hw),
            Vector2::new(-hl, hw),
        ]
        .map(|offset| self.center + rotation * offset)
    }

    /// Edges as `(start, end)` pairs, in the order of [corners](Self::corners)
    ///
    pub fn edges(&self) -> [(Point2<f64>, Point2<f64>); 4] {
        let [a, b, c, d] = self.corners();
        [(a, b), (b, c), (c, d), (d, a)]
    }

    /// Strict containment: four half-plane sign tests against the rotated edges.
    /// A point lying on an edge is outside.
    ///
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.edges().iter().all(|(start, end)| {
            let edge = end - start;
            let to_point = point - start;
            edge.x * to_point.y - edge.y * to_point.x > 0.0
        })
    }

    /// Distance from the point to the closest edge of the rectangle
    ///
    pub fn boundary_distance(&self, point: &Point2<f64>) -> f64 {
        self.edges()
            .iter()
            .map(|(start, end)| point_to_segment_distance(point, start, end))
            .fold(f64::INFINITY, f64::min)
    }

    /// Checks whether the ray going from `origin` to `target` crosses the rectangle
    ///
    pub fn crossed_by(&self, origin: &Point2<f64>, target: &Point2<f64>) -> bool {
        let ray = Line::new((origin.x, origin.y), (target.x, target.y));
        ray.intersects(&Polygon::from(self))
    }
}

impl From<&OrientedRectangle> for Polygon<f64> {
    fn from(r: &OrientedRectangle) -> Self {
        Polygon::new(
            LineString::from(
                r.corners()
                    .iter()
                    .map(|c| (c.x, c.y))
                    .collect::<Vec<_>>(),
            ),
            vec![],
        )
    }
}

pub fn point_inside_scaled_rectangle(
    point: &Point2<f64>,
    rectangle: &OrientedRectangle,
    scale: f64,
) -> bool {
    rectangle.scaled(scale).contains(point)
}

/// Distance between `point` and the segment `v`-`w`. The projection parameter is clamped to
/// the segment, a degenerate segment is treated as the point `v`.
///
pub fn point_to_segment_distance(point: &Point2<f64>, v: &Point2<f64>, w: &Point2<f64>) -> f64 {
    let segment = w - v;
    let l2 = segment.norm_squared();
    if l2 < EPS {
        return nalgebra::distance(point, v);
    }
    let t = ((point - v).dot(&segment) / l2).clamp(0.0, 1.0);
    nalgebra::distance(point, &(v + segment * t))
}

#[cfg(test)]
mod tests {
    use crate::utils::geometry::{
        normalize_theta, point_inside_scaled_rectangle, point_to_segment_distance,
        OrientedRectangle, Pose,
    };
    use crate::EPS;
    use nalgebra::Point2;
    use std::f64::consts::PI;

    #[test]
    fn center_is_inside() {
        for theta in [0.0, 0.3, PI / 2.0, -2.5, PI] {
            let r = OrientedRectangle::new(Pose::new(3.0, -1.0, theta), 4.5, 1.5);
            assert!(point_inside_scaled_rectangle(&r.center, &r, 1.0));
            assert!(point_inside_scaled_rectangle(&r.center, &r, 0.01));
        }
    }

    #[test]
    fn edge_points_are_outside() {
        let r = OrientedRectangle::new(Pose::new(0.0, 0.0, 0.0), 4.0, 2.0);
        assert!(!r.contains(&Point2::new(2.0, 0.0)));
        assert!(!r.contains(&Point2::new(0.0, -1.0)));
        assert!(!r.contains(&Point2::new(2.0, 1.0)));
        assert!(r.contains(&Point2::new(1.99, 0.99)));
    }

    #[test]
    fn rotated_containment() {
        let r = OrientedRectangle::new(Pose::new(0.0, 0.0, PI / 2.0), 4.0, 2.0);
        assert!(r.contains(&Point2::new(0.0, 1.9)));
        assert!(!r.contains(&Point2::new(1.9, 0.0)));
        assert!(point_inside_scaled_rectangle(&Point2::new(1.1, 0.0), &r, 1.3));
        assert!(!point_inside_scaled_rectangle(&Point2::new(0.8, 0.0), &r, 0.7));
    }

    #[test]
    fn segment_distance() {
        let v = Point2::new(0.0, 0.0);
        let w = Point2::new(2.0, 0.0);
        assert!((point_to_segment_distance(&Point2::new(1.0, 1.0), &v, &w) - 1.0).abs() < EPS);
        assert!((point_to_segment_distance(&Point2::new(-3.0, 4.0), &v, &w) - 5.0).abs() < EPS);
        assert!((point_to_segment_distance(&Point2::new(5.0, 4.0), &v, &w) - 5.0).abs() < EPS);
        // zero length segment
        let d = point_to_segment_distance(&Point2::new(3.0, 4.0), &v, &v);
        assert!((d - 5.0).abs() < EPS);
        assert!(d.is_finite());
    }

    #[test]
    fn boundary_distance_grows_outwards() {
        let r = OrientedRectangle::new(Pose::new(1.0, 1.0, 0.7), 4.0, 2.0);
        let [a, b, _, _] = r.corners();
        let mid = a + (b - a) / 2.0;
        let outward = (mid - r.center).normalize();
        let mut last = -1.0;
        for step in 0..20 {
            let p = mid + outward * (step as f64 * 0.05);
            let d = r.boundary_distance(&p);
            assert!(d >= last);
            last = d;
        }
        assert!(r.boundary_distance(&mid) < 1e-6);
    }

    #[test]
    fn ray_crossing() {
        let r = OrientedRectangle::new(Pose::new(10.0, 0.0, 0.0), 4.0, 2.0);
        let sensor = Point2::new(0.0, 0.0);
        assert!(r.crossed_by(&sensor, &Point2::new(20.0, 0.5)));
        assert!(!r.crossed_by(&sensor, &Point2::new(20.0, 10.0)));
        assert!(!r.crossed_by(&sensor, &Point2::new(5.0, 0.0)));
    }

    #[test]
    fn theta_normalization() {
        assert!((normalize_theta(5.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        assert!((normalize_theta(-PI) - PI).abs() < EPS);
        assert!((normalize_theta(PI / 4.0 + 4.0 * PI) - PI / 4.0).abs() < 1e-12);
        assert!((normalize_theta(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
    }
}
