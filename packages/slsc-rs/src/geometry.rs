//! Geometry value types
//!
//! Element positions, reconstruction points and plane-wave transmit events.
//! Coordinates are in meters with x along the array, y across it and z as depth.

use crate::error::{Result, SlscError};
use nalgebra::Vector3;

/// A position in space, in meters
pub type Point3 = nalgebra::Point3<f64>;

/// Tolerance used when checking that a propagation normal has unit length
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// Check that a speed of sound is usable as a divisor
pub fn check_speed_of_sound(c: f64) -> Result<()> {
    if !c.is_finite() || c <= 0.0 {
        return Err(SlscError::InvalidGeometry(format!(
            "speed of sound must be positive and finite, got {}",
            c
        )));
    }
    Ok(())
}

/// Check that a propagation normal has unit length, without normalizing it
pub fn check_unit_normal(normal: &Vector3<f64>) -> Result<()> {
    let norm = normal.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        return Err(SlscError::InvalidGeometry(format!(
            "propagation normal ({:.6}, {:.6}, {:.6}) has length {:.6}, expected 1",
            normal.x, normal.y, normal.z, norm
        )));
    }
    Ok(())
}

/// Unit propagation normal for a plane wave steered by `alpha` in the x-z plane
/// and elevated by `beta` out of it (radians).
pub fn steering_normal(alpha: f64, beta: f64) -> Vector3<f64> {
    Vector3::new(alpha.sin() * beta.cos(), beta.sin(), alpha.cos() * beta.cos())
}

/// One steered plane-wave transmission
#[derive(Debug, Clone, PartialEq)]
pub struct TransmitEvent {
    spatial_reference: Point3,
    temporal_reference: f64,
    propagation_normal: Vector3<f64>,
    speed_of_sound: f64,
}

impl TransmitEvent {
    /// Create a transmit event
    ///
    /// # Arguments
    /// * `spatial_reference` - point the wavefront passes through at `temporal_reference`
    /// * `temporal_reference` - time (s) at which the wavefront crosses the reference
    /// * `propagation_normal` - unit direction of travel
    /// * `speed_of_sound` - assumed speed of sound (m/s)
    ///
    /// # Returns
    /// `InvalidGeometry` if the normal is not unit length or the speed of sound is not positive
    pub fn new(
        spatial_reference: Point3,
        temporal_reference: f64,
        propagation_normal: Vector3<f64>,
        speed_of_sound: f64,
    ) -> Result<Self> {
        check_unit_normal(&propagation_normal)?;
        check_speed_of_sound(speed_of_sound)?;
        if !temporal_reference.is_finite() {
            return Err(SlscError::InvalidGeometry(format!(
                "temporal reference must be finite, got {}",
                temporal_reference
            )));
        }

        Ok(Self {
            spatial_reference,
            temporal_reference,
            propagation_normal,
            speed_of_sound,
        })
    }

    pub fn spatial_reference(&self) -> &Point3 {
        &self.spatial_reference
    }

    pub fn temporal_reference(&self) -> f64 {
        self.temporal_reference
    }

    pub fn propagation_normal(&self) -> &Vector3<f64> {
        &self.propagation_normal
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    /// Time at which the wavefront reaches `point`
    #[inline]
    pub fn delay_to(&self, point: &Point3) -> f64 {
        (point.coords - self.spatial_reference.coords).dot(&self.propagation_normal) / self.speed_of_sound
            + self.temporal_reference
    }
}

/// Centered linear array: `x_i = pitch * (i - (n-1)/2)`, `y = z = 0`
pub fn linear_array(n: usize, pitch: f64) -> Vec<Point3> {
    let center = (n as f64 - 1.0) / 2.0;
    (0..n)
        .map(|i| Point3::new(pitch * (i as f64 - center), 0.0, 0.0))
        .collect()
}

/// Cartesian grid of reconstruction points, x outermost and z innermost
pub fn field_grid(xs: &[f64], ys: &[f64], zs: &[f64]) -> Vec<Point3> {
    let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for &x in xs {
        for &y in ys {
            for &z in zs {
                points.push(Point3::new(x, y, z));
            }
        }
    }
    points
}

/// `n` evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Values from `start` (inclusive) to `stop` (exclusive) in increments of `step`
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    // tolerate rounding in the span so an exact multiple does not gain a value
    let n = ((stop - start) / step - 1e-9).ceil() as usize;
    (0..n).map(|i| start + step * i as f64).collect()
}
