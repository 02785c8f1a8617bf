use crate::scan::Scan;
use crate::utils::geometry::OrientedRectangle;
use itertools::{Either, Itertools};
use nalgebra::Point2;

/// Scale of the rectangle whose interior counts as "inside the object"
pub const INNER_SCALE: f64 = 0.7;

/// Scale of the rectangle bounding the boundary shell
pub const OUTER_SCALE: f64 = 1.3;

/// Split of a scan relative to a hypothesis rectangle
///
/// * `static_inside` (Zs_in) - inside the rectangle scaled by [INNER_SCALE]
/// * `dynamic` (Zd) - the shell: inside the [OUTER_SCALE] rectangle but not inside the inner one
/// * `static_outside` (Zs_out) - outside the [OUTER_SCALE] rectangle
///
#[derive(Debug, Default)]
pub struct MeasurementPartition<'a> {
    pub static_inside: Vec<&'a Point2<f64>>,
    pub dynamic: Vec<&'a Point2<f64>>,
    pub static_outside: Vec<&'a Point2<f64>>,
}

impl<'a> MeasurementPartition<'a> {
    pub fn new(rectangle: &OrientedRectangle, points: &'a [Point2<f64>]) -> Self {
        let outer = rectangle.scaled(OUTER_SCALE);
        let inner = rectangle.scaled(INNER_SCALE);

        let (near, static_outside): (Vec<_>, Vec<_>) =
            points.iter().partition(|p| outer.contains(p));
        let (static_inside, dynamic): (Vec<_>, Vec<_>) = near.into_iter().partition_map(|p| {
            if inner.contains(p) {
                Either::Left(p)
            } else {
                Either::Right(p)
            }
        });

        Self {
            static_inside,
            dynamic,
            static_outside,
        }
    }
}

/// Per-hypothesis likelihood components
///
/// * `dn` - boundary fit penalty: mean distance of the shell points to the rectangle edges
/// * `c2` - occlusion penalty: returns observed behind the object, normalized by the shell size
/// * `c3` - reserved, always zero
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Likelihood {
    pub dn: f64,
    pub c2: f64,
    pub c3: f64,
}

impl Likelihood {
    pub fn compute(rectangle: &OrientedRectangle, scan: &Scan) -> Self {
        let partition = MeasurementPartition::new(rectangle, scan.points());
        // Laplace smoothing keeps empty shells finite
        let normalizer = partition.dynamic.len() as f64 + 1.0;
        let sensor = scan.sensor().position();

        Self {
            dn: boundary_fit_penalty(rectangle, &partition.dynamic) / normalizer,
            c2: occlusion_violations(rectangle, &sensor, &partition.static_outside) as f64
                / normalizer,
            c3: 0.0,
        }
    }
}

/// Sum of the distances from the points to the closest rectangle edge
///
pub fn boundary_fit_penalty(rectangle: &OrientedRectangle, points: &[&Point2<f64>]) -> f64 {
    points.iter().map(|p| rectangle.boundary_distance(p)).sum()
}

/// Number of points that lie beyond the rectangle center, as seen from the sensor, and whose
/// ray crosses the rectangle. A real object would have blocked them.
///
pub fn occlusion_violations(
    rectangle: &OrientedRectangle,
    sensor: &Point2<f64>,
    points: &[&Point2<f64>],
) -> usize {
    let center_range = nalgebra::distance(sensor, &rectangle.center);
    points
        .iter()
        .filter(|&&p| {
            nalgebra::distance(sensor, p) > center_range && rectangle.crossed_by(sensor, p)
        })
        .count()
}
