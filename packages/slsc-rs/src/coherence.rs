//! Lag-N spatial coherence across a receive aperture
//!
//! For channels `x_0 .. x_{M-1}` aligned on a common time window, the lag-m
//! coherence is the mean Pearson correlation of the `M - m` pairs
//! `(x_i, x_{i+m})`. Zero-variance channels are reported, never turned into
//! NaN.

use crate::error::{Result, SlscError};

/// Per-channel mean-removed signals and their energies, computed once and
/// shared by every lag.
#[derive(Debug, Clone)]
pub struct ChannelStats {
    centered: Vec<Vec<f64>>,
    energy: Vec<f64>,
    flat: Vec<bool>,
    samples: usize,
}

/// Mean-removed copy of a channel, its energy, and whether it is flat.
///
/// A channel is flat when every sample is equal, or when the energy left after
/// removing the mean is within rounding of the mean's own contribution,
/// `(n * eps)^2 * sum(x^2)`.
fn center(ch: &[f64]) -> (Vec<f64>, f64, bool) {
    let n = ch.len() as f64;
    let mean = ch.iter().sum::<f64>() / n;
    let centered: Vec<f64> = ch.iter().map(|&x| x - mean).collect();
    let energy = centered.iter().map(|&x| x * x).sum::<f64>();

    let (lo, hi) = ch
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    let sum_sq = ch.iter().map(|&x| x * x).sum::<f64>();
    let tol = (n * f64::EPSILON).powi(2) * sum_sq;
    let flat = lo == hi || energy <= tol;
    (centered, energy, flat)
}

fn check_rectangular<C: AsRef<[f64]>>(channels: &[C]) -> Result<usize> {
    let nt = channels.first().map(|c| c.as_ref().len()).unwrap_or(0);
    for (i, ch) in channels.iter().enumerate() {
        let len = ch.as_ref().len();
        if len != nt {
            return Err(SlscError::shape(
                format!("channel {} length", i),
                nt,
                len,
            ));
        }
    }
    if nt == 0 && !channels.is_empty() {
        return Err(SlscError::shape("coherence window", "at least 1 sample", 0));
    }
    Ok(nt)
}

fn check_lag(nele: usize, lag: usize) -> Result<()> {
    if lag >= nele {
        return Err(SlscError::shape(
            format!("lag {} over {} channels", lag, nele),
            format!("lag < {}", nele),
            lag,
        ));
    }
    Ok(())
}

impl ChannelStats {
    /// Remove each channel's mean and accumulate its energy
    pub fn compute<C: AsRef<[f64]>>(channels: &[C]) -> Result<Self> {
        let samples = check_rectangular(channels)?;
        let mut centered = Vec::with_capacity(channels.len());
        let mut energy = Vec::with_capacity(channels.len());
        let mut flat = Vec::with_capacity(channels.len());

        for ch in channels {
            let (c, e, f) = center(ch.as_ref());
            centered.push(c);
            energy.push(e);
            flat.push(f);
        }

        Ok(Self {
            centered,
            energy,
            flat,
            samples,
        })
    }

    pub fn channels(&self) -> usize {
        self.centered.len()
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Pearson correlation of channels `i` and `j`
    pub fn correlation(&self, i: usize, j: usize) -> Result<f64> {
        for &ch in &[i, j] {
            if self.flat[ch] {
                return Err(SlscError::DegenerateChannel {
                    channel: ch,
                    point: None,
                });
            }
        }
        let cross: f64 = self.centered[i]
            .iter()
            .zip(&self.centered[j])
            .map(|(a, b)| a * b)
            .sum();
        Ok(cross / (self.energy[i] * self.energy[j]).sqrt())
    }

    /// Mean correlation over all pairs separated by `lag`
    pub fn lag_mean(&self, lag: usize) -> Result<f64> {
        let nele = self.channels();
        check_lag(nele, lag)?;
        let pairs = nele - lag;
        let mut total = 0.0;
        for i in 0..pairs {
            total += self.correlation(i, i + lag)?;
        }
        Ok(total / pairs as f64)
    }

    /// Coherence for every lag in `0..=max_lag`
    pub fn r_of_lag(&self, max_lag: usize) -> Result<Vec<f64>> {
        check_lag(self.channels(), max_lag)?;
        (0..=max_lag).map(|lag| self.lag_mean(lag)).collect()
    }
}

/// Mean lag-`lag` correlation coefficient across the aperture.
///
/// `channels` is `Nele × Nt`. Fails with `ShapeMismatch` when `lag >= Nele`
/// or rows are ragged, and with `DegenerateChannel` when a participating
/// channel has zero variance.
pub fn lag_coherence<C: AsRef<[f64]>>(channels: &[C], lag: usize) -> Result<f64> {
    check_lag(channels.len(), lag)?;
    ChannelStats::compute(channels)?.lag_mean(lag)
}

/// Coherence for lags `0..=max_lag` (default `Nele - 2`), computing each
/// channel's mean and energy once.
pub fn r_of_lag<C: AsRef<[f64]>>(channels: &[C], max_lag: Option<usize>) -> Result<Vec<f64>> {
    let nele = channels.len();
    let max_lag = match max_lag {
        Some(lag) => lag,
        None if nele >= 2 => nele - 2,
        None => {
            return Err(SlscError::shape("full-aperture coherence", "at least 2 channels", nele));
        }
    };
    check_lag(nele, max_lag)?;
    ChannelStats::compute(channels)?.r_of_lag(max_lag)
}

/// Pearson correlation of two equal-length signals, recomputing both means
pub fn pearson(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SlscError::shape("pearson input", a.len(), b.len()));
    }
    if a.is_empty() {
        return Err(SlscError::shape("pearson input", "at least 1 sample", 0));
    }
    let (ca, ea, flat_a) = center(a);
    let (cb, eb, flat_b) = center(b);
    if flat_a {
        return Err(SlscError::DegenerateChannel { channel: 0, point: None });
    }
    if flat_b {
        return Err(SlscError::DegenerateChannel { channel: 1, point: None });
    }
    let cross: f64 = ca.iter().zip(&cb).map(|(x, y)| x * y).sum();
    Ok(cross / (ea * eb).sqrt())
}

/// Coherence for lags `0..=max_lag`, recomputing every pair from scratch
pub fn direct_r_of_lag<C: AsRef<[f64]>>(channels: &[C], max_lag: usize) -> Result<Vec<f64>> {
    let nele = channels.len();
    check_lag(nele, max_lag)?;
    check_rectangular(channels)?;
    (0..=max_lag)
        .map(|lag| {
            let pairs = nele - lag;
            let mut total = 0.0;
            for i in 0..pairs {
                total += pearson(channels[i].as_ref(), channels[i + lag].as_ref()).map_err(
                    |e| match e {
                        SlscError::DegenerateChannel { channel, point } => {
                            SlscError::DegenerateChannel {
                                channel: if channel == 0 { i } else { i + lag },
                                point,
                            }
                        }
                        other => other,
                    },
                )?;
            }
            Ok(total / pairs as f64)
        })
        .collect()
}

/// SLSC value: sum of the lag curve over the selected lags
pub fn slsc_value(curve: &[f64], lags: &[usize]) -> Result<f64> {
    let mut total = 0.0;
    for &lag in lags {
        let r = curve.get(lag).ok_or_else(|| {
            SlscError::shape("lag selection", format!("lag < {}", curve.len()), lag)
        })?;
        total += r;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(n: usize, phase: f64) -> Vec<f64> {
        (0..n).map(|i| (0.3 * i as f64 + phase).sin()).collect()
    }

    #[test]
    fn test_identical_channels_are_fully_coherent() {
        let s = signal(64, 0.0);
        let rho = lag_coherence(&[s.clone(), s], 1).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negated_channels_are_anticoherent() {
        let s = signal(64, 0.4);
        let neg: Vec<f64> = s.iter().map(|x| -x).collect();
        let rho = lag_coherence(&[s, neg], 1).unwrap();
        assert!((rho + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lag_at_or_beyond_aperture_fails() {
        let chans = vec![signal(16, 0.0), signal(16, 0.1), signal(16, 0.2)];
        assert!(matches!(lag_coherence(&chans, 3), Err(SlscError::ShapeMismatch { .. })));
        assert!(matches!(lag_coherence(&chans, 7), Err(SlscError::ShapeMismatch { .. })));
        assert!(lag_coherence(&chans, 2).is_ok());
    }

    #[test]
    fn test_flat_channel_is_degenerate() {
        let chans = vec![signal(16, 0.0), vec![3.0; 16], signal(16, 0.2)];
        match lag_coherence(&chans, 1) {
            Err(SlscError::DegenerateChannel { channel, .. }) => assert_eq!(channel, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_inexact_constant_channel_is_degenerate() {
        // 0.1 has no exact binary form, so the removed mean leaves rounding residue
        let chans = vec![signal(10, 0.0), vec![0.1; 10]];
        match lag_coherence(&chans, 1) {
            Err(SlscError::DegenerateChannel { channel, .. }) => assert_eq!(channel, 1),
            other => panic!("unexpected result: {:?}", other),
        }
        match direct_r_of_lag(&chans, 1) {
            Err(SlscError::DegenerateChannel { channel, .. }) => assert_eq!(channel, 1),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            pearson(&[0.7; 12], &signal(12, 0.0)),
            Err(SlscError::DegenerateChannel { channel: 0, .. })
        ));
    }

    #[test]
    fn test_small_signal_on_large_offset_is_not_degenerate() {
        let chans: Vec<Vec<f64>> = (0..3)
            .map(|k| signal(32, 0.1 * k as f64).iter().map(|x| 1e3 + 1e-3 * x).collect())
            .collect();
        let rho = lag_coherence(&chans, 1).unwrap();
        assert!(rho > 0.9 && rho <= 1.0 + 1e-9);
    }

    #[test]
    fn test_non_participating_flat_channel_is_ignored() {
        // with lag 2 over 3 channels only (0, 2) is a pair
        let chans = vec![signal(16, 0.0), vec![0.0; 16], signal(16, 0.0)];
        let rho = lag_coherence(&chans, 2).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ragged_channels_rejected() {
        let chans = vec![signal(16, 0.0), signal(15, 0.0)];
        assert!(matches!(lag_coherence(&chans, 1), Err(SlscError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_lag_zero_is_one() {
        let chans = vec![signal(16, 0.0), signal(16, 1.0)];
        assert!((lag_coherence(&chans, 0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_of_lag_default_covers_aperture() {
        let chans: Vec<Vec<f64>> = (0..6).map(|i| signal(32, 0.2 * i as f64)).collect();
        let curve = r_of_lag(&chans, None).unwrap();
        assert_eq!(curve.len(), 5);
        assert!((curve[0] - 1.0).abs() < 1e-12);
        assert!(r_of_lag(&chans[..1], None).is_err());
        assert!(r_of_lag(&chans, Some(6)).is_err());
    }

    #[test]
    fn test_pearson_known_value() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.5];
        let r = pearson(&a, &b).unwrap();
        assert!(r > 0.99 && r < 1.0);
    }

    #[test]
    fn test_slsc_value_sums_selected_lags() {
        let curve = [1.0, 0.8, 0.5, 0.1];
        assert!((slsc_value(&curve, &[1, 2]).unwrap() - 1.3).abs() < 1e-12);
        assert!(slsc_value(&curve, &[4]).is_err());
    }
}
