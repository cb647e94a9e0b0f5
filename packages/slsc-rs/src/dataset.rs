//! Raw acquisition datasets
//!
//! A raw acquisition arrives as one flat stream of `i16` samples. A
//! [`RawDataset`] pairs that flat input axis with the semantic output axes
//! `(rot, steer, ele, t)` and reindexes the stream into them.

use crate::axis::{AxisDescriptor, AxisSet};
use crate::error::{Result, SlscError};
use crate::interp::Resampler;
use serde::{Deserialize, Serialize};

pub const AXIS_SAMPLES: &str = "samples";
pub const AXIS_ROT: &str = "rot";
pub const AXIS_STEER: &str = "steer";
pub const AXIS_ELE: &str = "ele";
pub const AXIS_T: &str = "t";

/// Dataset with a flat input layout and a labelled output layout
pub trait RawDataset {
    /// Axes of the flat input stream
    fn axes_in(&self) -> &AxisSet;

    /// Semantic axes of the transformed data, in stable order
    fn axes_out(&self) -> &AxisSet;

    /// Consume a flat sample stream; its length must equal the input axis product
    fn transform(&mut self, raw: &[i16]) -> Result<()>;

    /// Transformed data in output-axis order, or `StateError` before `transform`
    fn data(&self) -> Result<&[f64]>;
}

/// Channel data for one rotation: `Ntx × Nrx × Nt`, row-major, sampled at `t0 + i * dt`
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTensor {
    data: Vec<f64>,
    ntx: usize,
    nrx: usize,
    nt: usize,
    t0: f64,
    dt: f64,
}

impl ChannelTensor {
    /// Wrap a flat buffer with declared `shape` (must be rank 3)
    pub fn new(data: Vec<f64>, shape: &[usize], t0: f64, dt: f64) -> Result<Self> {
        if shape.len() != 3 {
            return Err(SlscError::shape(
                "channel tensor rank",
                "3 (transmissions × elements × samples)",
                shape.len(),
            ));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(SlscError::size("channel tensor", expected, data.len()));
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "sampling period must be positive, got {}",
                dt
            )));
        }
        Ok(Self {
            data,
            ntx: shape[0],
            nrx: shape[1],
            nt: shape[2],
            t0,
            dt,
        })
    }

    /// `(transmissions, elements, samples)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.ntx, self.nrx, self.nt)
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Samples of receive channel `rx` for transmission `tx`
    pub fn channel(&self, tx: usize, rx: usize) -> &[f64] {
        let start = (tx * self.nrx + rx) * self.nt;
        &self.data[start..start + self.nt]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Layout parameters of an interleaved RF acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterRfParams {
    pub nrot: usize,
    pub nang: usize,
    pub nele: usize,
    pub nsamp: usize,
    /// Rotation step (rad)
    pub dphi: f64,
    /// Steering angle step (rad)
    pub dalpha: f64,
    /// Sampling period (s)
    pub ts: f64,
    /// Time of the first sample (s)
    pub tstart: f64,
    /// First steering angle; centered on zero when absent
    pub alpha0: Option<f64>,
    /// First rotation angle; zero when absent
    pub phi0: Option<f64>,
}

/// Interleaved RF dataset: rotations × steering angles × elements × samples
#[derive(Debug, Clone)]
pub struct InterRfDataset {
    params: InterRfParams,
    axes_in: AxisSet,
    axes_out: AxisSet,
    data: Option<Vec<f64>>,
}

impl InterRfDataset {
    pub fn new(params: InterRfParams) -> Result<Self> {
        if !params.ts.is_finite() || params.ts <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "sampling period must be positive, got {}",
                params.ts
            )));
        }

        let phi0 = params.phi0.unwrap_or(0.0);
        let alpha0 = params
            .alpha0
            .unwrap_or(-params.dalpha * (params.nang as f64 - 1.0) / 2.0);

        let axes_out = AxisSet::new(vec![
            (AXIS_ROT, AxisDescriptor::sampled(phi0, params.dphi, params.nrot)),
            (AXIS_STEER, AxisDescriptor::sampled(alpha0, params.dalpha, params.nang)),
            (AXIS_ELE, AxisDescriptor::sampled(0.0, 1.0, params.nele)),
            (AXIS_T, AxisDescriptor::sampled(params.tstart, params.ts, params.nsamp)),
        ])?;

        let total = axes_out.total_len();
        let axes_in = AxisSet::new(vec![(AXIS_SAMPLES, AxisDescriptor::sampled(0.0, 1.0, total))])?;

        Ok(Self {
            params,
            axes_in,
            axes_out,
            data: None,
        })
    }

    pub fn params(&self) -> &InterRfParams {
        &self.params
    }

    /// Steering angle of every transmission (rad)
    pub fn steering_angles(&self) -> Vec<f64> {
        let (start, delta) = self
            .axes_out
            .get(AXIS_STEER)
            .and_then(|axis| axis.sampling())
            .unwrap_or((0.0, 0.0));
        (0..self.params.nang)
            .map(|i| start + i as f64 * delta)
            .collect()
    }

    /// `(tstart, Ts)` of the time axis
    pub fn time_axis(&self) -> (f64, f64) {
        (self.params.tstart, self.params.ts)
    }

    /// One sample addressed by output axes
    pub fn sample(&self, rot: usize, steer: usize, ele: usize, t: usize) -> Result<f64> {
        let offset = self.axes_out.flat_index(&[rot, steer, ele, t])?;
        Ok(self.data()?[offset])
    }

    /// The time trace of one element for one transmission
    pub fn channel(&self, rot: usize, steer: usize, ele: usize) -> Result<&[f64]> {
        let start = self.axes_out.flat_index(&[rot, steer, ele, 0])?;
        Ok(&self.data()?[start..start + self.params.nsamp])
    }

    /// Extract one rotation as a `steer × ele × t` channel tensor
    pub fn channel_tensor(&self, rot: usize) -> Result<ChannelTensor> {
        let p = &self.params;
        let per_rot = p.nang * p.nele * p.nsamp;
        let start = self.axes_out.flat_index(&[rot, 0, 0, 0])?;
        let data = self.data()?[start..start + per_rot].to_vec();
        ChannelTensor::new(data, &[p.nang, p.nele, p.nsamp], p.tstart, p.ts)
    }

    /// Resample one channel at arbitrary times through the interpolation collaborator
    pub fn resample_channel(
        &self,
        rot: usize,
        steer: usize,
        ele: usize,
        times: &[f64],
        resampler: &dyn Resampler,
    ) -> Result<Vec<f64>> {
        let samples = self.channel(rot, steer, ele)?;
        let mut out = vec![0.0; times.len()];
        resampler.resample(samples, self.params.tstart, self.params.ts, times, &mut out)?;
        Ok(out)
    }
}

impl RawDataset for InterRfDataset {
    fn axes_in(&self) -> &AxisSet {
        &self.axes_in
    }

    fn axes_out(&self) -> &AxisSet {
        &self.axes_out
    }

    fn transform(&mut self, raw: &[i16]) -> Result<()> {
        let expected = self.axes_in.total_len();
        if raw.len() != expected {
            return Err(SlscError::size("raw acquisition", expected, raw.len()));
        }
        // acquisition order already matches (rot, steer, ele, t)
        self.data = Some(raw.iter().map(|&s| s as f64).collect());
        log::debug!(
            "Transformed {} raw samples into axes {:?} with shape {:?}",
            raw.len(),
            self.axes_out.labels(),
            self.axes_out.shape()
        );
        Ok(())
    }

    fn data(&self) -> Result<&[f64]> {
        self.data
            .as_deref()
            .ok_or_else(|| SlscError::StateError("dataset has not been transformed".to_string()))
    }
}
