//! Resampling of uniformly sampled channels at arbitrary times
//!
//! The coherence pipeline only relies on the [`Resampler`] contract: one value
//! per requested time, `fill` outside the sampled span. Linear and natural
//! cubic spline implementations are provided.

use crate::error::{Result, SlscError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A channel prepared for repeated evaluation
pub trait PreparedChannel: Send + Sync {
    /// Value at time `t`
    fn eval(&self, t: f64) -> f64;

    /// Values at every time in `times`, written to `out`
    fn eval_into(&self, times: &[f64], out: &mut [f64]) -> Result<()> {
        if out.len() != times.len() {
            return Err(SlscError::size("resample output", times.len(), out.len()));
        }
        for (o, &t) in out.iter_mut().zip(times) {
            *o = self.eval(t);
        }
        Ok(())
    }
}

/// Interpolation collaborator
pub trait Resampler: Send + Sync {
    /// Prepare `samples`, taken at `t0 + i * dt`, for evaluation
    fn prepare<'a>(
        &self,
        samples: &'a [f64],
        t0: f64,
        dt: f64,
    ) -> Result<Box<dyn PreparedChannel + 'a>>;

    /// One-shot resampling of `samples` at `times`
    fn resample(
        &self,
        samples: &[f64],
        t0: f64,
        dt: f64,
        times: &[f64],
        out: &mut [f64],
    ) -> Result<()> {
        self.prepare(samples, t0, dt)?.eval_into(times, out)
    }
}

/// Interpolation method selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    Linear,
    #[default]
    Cubic,
}

impl FromStr for InterpolationKind {
    type Err = SlscError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            _ => Err(SlscError::InvalidParameter(format!(
                "Unknown interpolation '{}'. Supported: linear, cubic",
                s
            ))),
        }
    }
}

impl InterpolationKind {
    pub fn build(self, fill: f64) -> Box<dyn Resampler> {
        match self {
            InterpolationKind::Linear => Box::new(LinearResampler { fill }),
            InterpolationKind::Cubic => Box::new(CubicResampler { fill }),
        }
    }
}

fn check_sampling(t0: f64, dt: f64) -> Result<()> {
    if !t0.is_finite() {
        return Err(SlscError::InvalidParameter(format!(
            "sample start time must be finite, got {}",
            t0
        )));
    }
    if !dt.is_finite() || dt <= 0.0 {
        return Err(SlscError::InvalidParameter(format!(
            "sampling period must be positive, got {}",
            dt
        )));
    }
    Ok(())
}

/// Locate `t` on the grid: knot index `j` (so that `j + 1` is valid) and the
/// fractional position within `[j, j + 1]`. `None` when outside the span.
#[inline]
fn locate(t: f64, t0: f64, dt: f64, n: usize) -> Option<(usize, f64)> {
    if n < 2 {
        return None;
    }
    let pos = (t - t0) / dt;
    let last = (n - 1) as f64;
    // NaN fails both comparisons and falls through to None
    if !(pos >= 0.0 && pos <= last) {
        return None;
    }
    let j = (pos.floor() as usize).min(n - 2);
    Some((j, pos - j as f64))
}

/// Piecewise-linear interpolation
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResampler {
    pub fill: f64,
}

struct LinearChannel<'a> {
    y: &'a [f64],
    t0: f64,
    dt: f64,
    fill: f64,
}

impl PreparedChannel for LinearChannel<'_> {
    fn eval(&self, t: f64) -> f64 {
        match locate(t, self.t0, self.dt, self.y.len()) {
            Some((j, b)) => self.y[j] * (1.0 - b) + self.y[j + 1] * b,
            None if self.y.len() == 1 && t == self.t0 => self.y[0],
            None => self.fill,
        }
    }
}

impl Resampler for LinearResampler {
    fn prepare<'a>(
        &self,
        samples: &'a [f64],
        t0: f64,
        dt: f64,
    ) -> Result<Box<dyn PreparedChannel + 'a>> {
        check_sampling(t0, dt)?;
        Ok(Box::new(LinearChannel {
            y: samples,
            t0,
            dt,
            fill: self.fill,
        }))
    }
}

/// Natural cubic spline interpolation (zero second derivative at both ends)
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicResampler {
    pub fill: f64,
}

struct CubicChannel<'a> {
    y: &'a [f64],
    y2: Vec<f64>,
    t0: f64,
    dt: f64,
    fill: f64,
}

/// Second derivatives of the natural spline through uniformly spaced `y`
fn spline_knots(y: &[f64], dt: f64) -> Vec<f64> {
    let n = y.len();
    let mut y2 = vec![0.0; n];
    if n < 3 {
        return y2;
    }
    let mut u = vec![0.0; n];
    let sig = 0.5;

    // forward sweep of the tridiagonal solve
    for i in 1..n - 1 {
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let d = (y[i + 1] - y[i]) / dt - (y[i] - y[i - 1]) / dt;
        u[i] = (6.0 * d / (2.0 * dt) - sig * u[i - 1]) / p;
    }

    y2[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        y2[k] = y2[k] * y2[k + 1] + u[k];
    }
    y2
}

impl PreparedChannel for CubicChannel<'_> {
    fn eval(&self, t: f64) -> f64 {
        match locate(t, self.t0, self.dt, self.y.len()) {
            Some((j, b)) => {
                let a = 1.0 - b;
                let h2 = self.dt * self.dt / 6.0;
                a * self.y[j]
                    + b * self.y[j + 1]
                    + ((a * a * a - a) * self.y2[j] + (b * b * b - b) * self.y2[j + 1]) * h2
            }
            None if self.y.len() == 1 && t == self.t0 => self.y[0],
            None => self.fill,
        }
    }
}

impl Resampler for CubicResampler {
    fn prepare<'a>(
        &self,
        samples: &'a [f64],
        t0: f64,
        dt: f64,
    ) -> Result<Box<dyn PreparedChannel + 'a>> {
        check_sampling(t0, dt)?;
        Ok(Box::new(CubicChannel {
            y: samples,
            y2: spline_knots(samples, dt),
            t0,
            dt,
            fill: self.fill,
        }))
    }
}
