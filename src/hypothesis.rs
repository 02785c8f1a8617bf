use crate::likelihood::Likelihood;
use crate::scan::Scan;
use crate::utils::geometry::{OrientedRectangle, Pose};
use crate::Errors;
use anyhow::Result;
use nalgebra::Point2;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Radius of the disc used to model a pedestrian
pub const PEDESTRIAN_RADIUS: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Pedestrian,
    Bike,
    Car,
    Bus,
}

impl ObjectClass {
    /// Typical `(length, width)` of the class in meters
    ///
    pub fn nominal_dimensions(&self) -> (f64, f64) {
        match self {
            ObjectClass::Pedestrian => (2.0 * PEDESTRIAN_RADIUS, 2.0 * PEDESTRIAN_RADIUS),
            ObjectClass::Bike => (2.1, 0.5),
            ObjectClass::Car => (4.5, 1.5),
            ObjectClass::Bus => (15.0, 2.5),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            ObjectClass::Pedestrian => 'P',
            ObjectClass::Bike => 'b',
            ObjectClass::Car => 'C',
            ObjectClass::Bus => 'B',
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Rectangle fitted to a scan segment as an object of a certain class
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxModel {
    pub class: ObjectClass,
    pub pose: Pose,
    pub length: f64,
    pub width: f64,
}

impl BoxModel {
    pub fn new(class: ObjectClass, pose: Pose, length: f64, width: f64) -> Self {
        Self {
            class,
            pose,
            length,
            width,
        }
    }

    /// Box with the nominal dimensions of the class
    ///
    pub fn nominal(class: ObjectClass, pose: Pose) -> Self {
        let (length, width) = class.nominal_dimensions();
        Self::new(class, pose, length, width)
    }

    pub fn rectangle(&self) -> OrientedRectangle {
        OrientedRectangle::new(self.pose, self.length, self.width)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.pose.is_finite() {
            return Err(Errors::InvalidBoxModel(format!("pose {:?} is not finite", self.pose)).into());
        }
        if !(self.length.is_finite() && self.length > 0.0) {
            return Err(Errors::InvalidBoxModel(format!("length {} must be positive", self.length)).into());
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(Errors::InvalidBoxModel(format!("width {} must be positive", self.width)).into());
        }
        Ok(())
    }
}

/// Candidate object kept as a vertex of the neighborhood graph.
///
/// The record never changes after creation except for its graph `index`, which is shifted when
/// the graph window slides. Likelihood components depend only on the box and the scan it was
/// fitted to, so they are computed once and travel with every copy of the hypothesis.
///
#[derive(Clone, Debug)]
pub struct Hypothesis {
    model: BoxModel,
    index: usize,
    frame: u64,
    segment: usize,
    points: Arc<Vec<Point2<f64>>>,
    scan: Arc<Scan>,
    likelihood: OnceCell<Likelihood>,
}

impl Hypothesis {
    pub(crate) fn new(
        model: BoxModel,
        index: usize,
        frame: u64,
        segment: usize,
        points: Arc<Vec<Point2<f64>>>,
        scan: Arc<Scan>,
    ) -> Self {
        Self {
            model,
            index,
            frame,
            segment,
            points,
            scan,
            likelihood: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &BoxModel {
        &self.model
    }

    pub fn class(&self) -> ObjectClass {
        self.model.class
    }

    pub fn pose(&self) -> &Pose {
        &self.model.pose
    }

    pub fn rectangle(&self) -> OrientedRectangle {
        self.model.rectangle()
    }

    /// Position of the vertex in the neighborhood graph
    ///
    pub fn index(&self) -> usize {
        self.index
    }

    /// Sequence number of the source frame
    ///
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn timestamp(&self) -> f64 {
        self.scan.timestamp()
    }

    /// Segment of the source frame the box was fitted to
    ///
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Points of the segment backing the box
    ///
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn scan(&self) -> &Scan {
        &self.scan
    }

    /// Likelihood components, computed on first access
    ///
    pub fn likelihood(&self) -> &Likelihood {
        self.likelihood
            .get_or_init(|| Likelihood::compute(&self.rectangle(), &self.scan))
    }

    pub(crate) fn is_likelihood_cached(&self) -> bool {
        self.likelihood.get().is_some()
    }

    /// Shifts the graph index after `removed` vertices left the front of the graph.
    /// Returns `false` when the hypothesis itself was among them.
    ///
    pub(crate) fn shift_index(&mut self, removed: usize) -> bool {
        match self.index.checked_sub(removed) {
            Some(index) => {
                self.index = index;
                true
            }
            None => false,
        }
    }
}
