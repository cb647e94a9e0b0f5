//! Named data axes
//!
//! An [`AxisSet`] gives each dimension of a dataset a unique label and a
//! descriptor mapping indices to coordinate values.

use crate::error::{Result, SlscError};
use serde::{Deserialize, Serialize};

/// Axis name reported by descriptors used outside an [`AxisSet`]
pub const UNLABELLED_AXIS: &str = "<unlabelled>";

/// Index-to-value mapping of one dataset dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisDescriptor {
    /// Uniform grid: `start + i * delta`
    Sampled { start: f64, delta: f64, n: usize },
    /// Explicit coordinate per index
    Arbitrary { points: Vec<f64> },
}

impl AxisDescriptor {
    pub fn sampled(start: f64, delta: f64, n: usize) -> Self {
        AxisDescriptor::Sampled { start, delta, n }
    }

    pub fn arbitrary(points: Vec<f64>) -> Self {
        AxisDescriptor::Arbitrary { points }
    }

    /// Number of indices along the axis
    pub fn len(&self) -> usize {
        match self {
            AxisDescriptor::Sampled { n, .. } => *n,
            AxisDescriptor::Arbitrary { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate at index `i`; `OutOfRange` outside `[0, N)`.
    ///
    /// A bare descriptor does not know its label; [`AxisSet::geti`] reports it.
    pub fn geti(&self, i: usize) -> Result<f64> {
        self.check_index(UNLABELLED_AXIS, i)?;
        Ok(match self {
            AxisDescriptor::Sampled { start, delta, .. } => start + i as f64 * delta,
            AxisDescriptor::Arbitrary { points } => points[i],
        })
    }

    pub(crate) fn check_index(&self, label: &str, i: usize) -> Result<()> {
        let len = self.len();
        if i >= len {
            return Err(SlscError::OutOfRange {
                axis: label.to_string(),
                index: i,
                len,
            });
        }
        Ok(())
    }

    /// `(start, delta)` for uniform axes
    pub fn sampling(&self) -> Option<(f64, f64)> {
        match self {
            AxisDescriptor::Sampled { start, delta, .. } => Some((*start, *delta)),
            AxisDescriptor::Arbitrary { .. } => None,
        }
    }
}

/// Ordered, uniquely labelled set of axes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisSet {
    axes: Vec<(String, AxisDescriptor)>,
}

impl AxisSet {
    /// Build from labelled axes in order; repeated labels fail with `DuplicateLabel`
    pub fn new<I, S>(axes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, AxisDescriptor)>,
        S: Into<String>,
    {
        let mut set = AxisSet::default();
        for (label, axis) in axes {
            set = set.with(label, axis)?;
        }
        Ok(set)
    }

    /// Return a new set with `axis` appended under `label`
    pub fn with(mut self, label: impl Into<String>, axis: AxisDescriptor) -> Result<Self> {
        let label = label.into();
        if self.axes.iter().any(|(existing, _)| *existing == label) {
            return Err(SlscError::DuplicateLabel(label));
        }
        self.axes.push((label, axis));
        Ok(self)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.axes.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|(_, axis)| axis.len()).collect()
    }

    /// Product of the axis lengths
    pub fn total_len(&self) -> usize {
        self.axes.iter().map(|(_, axis)| axis.len()).product()
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn get(&self, label: &str) -> Option<&AxisDescriptor> {
        self.axes
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, axis)| axis)
    }

    /// Position of `label` in axis order
    pub fn position(&self, label: &str) -> Option<usize> {
        self.axes.iter().position(|(existing, _)| existing == label)
    }

    /// Coordinate of index `i` along `label`
    pub fn geti(&self, label: &str, i: usize) -> Result<f64> {
        let axis = self
            .get(label)
            .ok_or_else(|| SlscError::InvalidParameter(format!("unknown axis '{}'", label)))?;
        axis.check_index(label, i)?;
        axis.geti(i)
    }

    /// Row-major flat offset of a multi-index, checking every component
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.axes.len() {
            return Err(SlscError::shape("axis index", self.axes.len(), index.len()));
        }
        let mut offset = 0;
        for ((label, axis), &i) in self.axes.iter().zip(index) {
            axis.check_index(label, i)?;
            offset = offset * axis.len() + i;
        }
        Ok(offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AxisDescriptor)> {
        self.axes.iter().map(|(label, axis)| (label.as_str(), axis))
    }
}
