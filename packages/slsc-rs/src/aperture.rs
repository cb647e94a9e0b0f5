//! f-number aperture selection
//!
//! A point lies inside the aperture of a reference element when its distance
//! from the element along the aperture axis is at most half the depth over
//! the f-number. With dynamic focusing the depth is that of the point itself;
//! otherwise it is the depth of a fixed focus.

use crate::error::{Result, SlscError};
use crate::geometry::Point3;
use nalgebra::Vector3;

/// Focusing rule for the aperture depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    /// Aperture grows with the depth of each point
    Dynamic,
    /// Aperture fixed by the depth of a focal point
    Fixed(Point3),
}

/// Binary aperture rule along one axis
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    fnum: f64,
    axis: Vector3<f64>,
    focus: Focus,
}

impl Aperture {
    /// Dynamic receive aperture along the array axis (x)
    pub fn dynamic(fnum: f64) -> Result<Self> {
        Self::new(fnum, Vector3::x(), Focus::Dynamic)
    }

    pub fn new(fnum: f64, axis: Vector3<f64>, focus: Focus) -> Result<Self> {
        if !fnum.is_finite() || fnum <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "fnum must be positive, got {}",
                fnum
            )));
        }
        let norm = axis.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(SlscError::InvalidGeometry(
                "aperture axis must be a non-zero vector".to_string(),
            ));
        }
        Ok(Self {
            fnum,
            axis: axis / norm,
            focus,
        })
    }

    pub fn fnum(&self) -> f64 {
        self.fnum
    }

    /// Whether `point` is inside the aperture of `reference`
    #[inline]
    pub fn contains(&self, reference: &Point3, point: &Point3) -> bool {
        let r = (point.coords - reference.coords).dot(&self.axis).abs();
        let depth = match self.focus {
            Focus::Dynamic => point.z - reference.z,
            Focus::Fixed(focus) => focus.z - reference.z,
        };
        2.0 * r <= depth / self.fnum
    }

    /// Mask of every point against one reference
    pub fn mask(&self, reference: &Point3, points: &[Point3]) -> Vec<bool> {
        points.iter().map(|p| self.contains(reference, p)).collect()
    }

    /// Indices of the elements whose aperture contains `point`, in element order
    pub fn active_elements(&self, elements: &[Point3], point: &Point3) -> Vec<usize> {
        elements
            .iter()
            .enumerate()
            .filter(|(_, e)| self.contains(e, point))
            .map(|(i, _)| i)
            .collect()
    }
}
