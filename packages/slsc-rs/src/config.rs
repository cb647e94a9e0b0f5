//! Run configuration
//!
//! A run is described by one JSON document with four sections: the probe
//! (element count and pitch, keyed as in the probe file), the acquisition
//! layout, the reconstruction field and the SLSC options.

use crate::aperture::{Aperture, Focus};
use crate::dataset::InterRfParams;
use crate::error::{Result, SlscError};
use crate::geometry::{arange, field_grid, linear_array, linspace, Point3};
use crate::interp::InterpolationKind;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default speed of sound in soft tissue (m/s)
pub const DEFAULT_SPEED_OF_SOUND: f64 = 1540.0;

/// Probe description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(rename = "noElements")]
    pub no_elements: usize,
    /// Element pitch (m)
    pub pitch: f64,
    /// Elevation lens focal radius (m)
    #[serde(rename = "Rfocus", default, skip_serializing_if = "Option::is_none")]
    pub rfocus: Option<f64>,
    /// Element height (m)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ProbeConfig {
    /// Centered linear array positions
    pub fn element_positions(&self) -> Vec<Point3> {
        linear_array(self.no_elements, self.pitch)
    }
}

/// Acquisition layout and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_one")]
    pub nrot: usize,
    pub nang: usize,
    pub nsamp: usize,
    /// Center frequency (Hz)
    pub fc: f64,
    /// Sampling frequency (Hz); four times the center frequency when absent
    #[serde(default)]
    pub fs: Option<f64>,
    /// Time of the first sample (s)
    pub tstart: f64,
    /// Steering angle step (rad)
    pub dalpha: f64,
    /// Rotation step (rad)
    #[serde(default)]
    pub dphi: f64,
    /// First steering angle (rad); centered on zero when absent
    #[serde(default)]
    pub alpha0: Option<f64>,
    /// Speed of sound (m/s)
    #[serde(default = "default_speed_of_sound")]
    pub c: f64,
}

fn default_one() -> usize {
    1
}
fn default_speed_of_sound() -> f64 {
    DEFAULT_SPEED_OF_SOUND
}
fn default_window_samples() -> usize {
    9
}
fn default_lags() -> Vec<usize> {
    vec![1]
}
fn default_batch_size() -> usize {
    256
}

impl AcquisitionConfig {
    pub fn sampling_frequency(&self) -> f64 {
        self.fs.unwrap_or(4.0 * self.fc)
    }

    /// Sampling period (s)
    pub fn ts(&self) -> f64 {
        1.0 / self.sampling_frequency()
    }

    /// Total number of raw samples expected for this layout
    pub fn expected_samples(&self, nele: usize) -> usize {
        self.nrot * self.nang * nele * self.nsamp
    }
}

/// Reconstruction grid in the x-z plane at fixed `y`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub nx: usize,
    #[serde(default)]
    pub y: f64,
    pub z_min: f64,
    pub z_max: f64,
    /// Axial step (m); half a wavelength, `c / (2 fc)`, when absent
    #[serde(default)]
    pub dz: Option<f64>,
}

/// How a point with a degenerate channel or too small an aperture is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Abort processing with the error
    #[default]
    Fail,
    /// Report the point as masked and continue
    Mask,
}

fn default_aperture_axis() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

/// One f-number rule of the receive aperture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureRule {
    pub fnum: f64,
    /// Axis the f-number applies along; the array axis when absent
    #[serde(default = "default_aperture_axis")]
    pub axis: [f64; 3],
    /// Fixed focal point (m); dynamic focusing when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<[f64; 3]>,
}

impl ApertureRule {
    pub fn build(&self) -> Result<Aperture> {
        let focus = match self.focus {
            Some([x, y, z]) => Focus::Fixed(Point3::new(x, y, z)),
            None => Focus::Dynamic,
        };
        Aperture::new(self.fnum, Vector3::from(self.axis), focus)
    }
}

/// SLSC processing options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlscConfig {
    /// Lags summed into the SLSC value
    #[serde(default = "default_lags")]
    pub lags: Vec<usize>,
    /// Receive f-number along the array axis with dynamic focusing
    #[serde(default)]
    pub fnum: Option<f64>,
    /// Further aperture rules; an element must satisfy all of them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apertures: Vec<ApertureRule>,
    /// Samples in the coherence window (odd)
    #[serde(default = "default_window_samples")]
    pub window_samples: usize,
    /// Spacing of window samples (s); sampling period when absent
    #[serde(default)]
    pub window_spacing: Option<f64>,
    #[serde(default)]
    pub interpolation: InterpolationKind,
    #[serde(default)]
    pub degenerate: DegeneratePolicy,
    /// Points per batch between cancellation checks
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SlscConfig {
    fn default() -> Self {
        Self {
            lags: default_lags(),
            fnum: None,
            apertures: Vec::new(),
            window_samples: default_window_samples(),
            window_spacing: None,
            interpolation: InterpolationKind::default(),
            degenerate: DegeneratePolicy::default(),
            batch_size: default_batch_size(),
        }
    }
}

impl SlscConfig {
    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// Every aperture rule in effect; empty means the full aperture
    pub fn aperture_rules(&self) -> Result<Vec<Aperture>> {
        let shorthand = self.fnum.map(Aperture::dynamic);
        shorthand
            .into_iter()
            .chain(self.apertures.iter().map(ApertureRule::build))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.lags.is_empty() {
            return Err(SlscError::InvalidParameter(
                "at least one lag must be selected".to_string(),
            ));
        }
        if self.window_samples == 0 || self.window_samples % 2 == 0 {
            return Err(SlscError::InvalidParameter(format!(
                "window_samples must be odd and positive, got {}",
                self.window_samples
            )));
        }
        if let Some(fnum) = self.fnum {
            if !fnum.is_finite() || fnum <= 0.0 {
                return Err(SlscError::InvalidParameter(format!(
                    "fnum must be positive, got {}",
                    fnum
                )));
            }
        }
        self.aperture_rules()?;
        if let Some(spacing) = self.window_spacing {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(SlscError::InvalidParameter(format!(
                    "window_spacing must be positive, got {}",
                    spacing
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(SlscError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub probe: ProbeConfig,
    pub acquisition: AcquisitionConfig,
    pub field: FieldConfig,
    #[serde(default)]
    pub slsc: SlscConfig,
}

impl RunConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SlscError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.no_elements == 0 {
            return Err(SlscError::InvalidParameter(
                "probe must have at least one element".to_string(),
            ));
        }
        if !self.probe.pitch.is_finite() || self.probe.pitch <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "pitch must be positive, got {}",
                self.probe.pitch
            )));
        }
        let acq = &self.acquisition;
        if !acq.c.is_finite() || acq.c <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "speed of sound must be positive, got {}",
                acq.c
            )));
        }
        if !acq.fc.is_finite() || acq.fc <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "center frequency must be positive, got {}",
                acq.fc
            )));
        }
        let fs = acq.sampling_frequency();
        if !fs.is_finite() || fs <= 0.0 {
            return Err(SlscError::InvalidParameter(format!(
                "sampling frequency must be positive, got {}",
                fs
            )));
        }
        if acq.nang == 0 || acq.nsamp == 0 || acq.nrot == 0 {
            return Err(SlscError::InvalidParameter(
                "acquisition axes must all be non-empty".to_string(),
            ));
        }
        if self.field.nx == 0 || self.field.z_max <= self.field.z_min {
            return Err(SlscError::InvalidParameter(
                "reconstruction field is empty".to_string(),
            ));
        }
        if let Some(dz) = self.field.dz {
            if !dz.is_finite() || dz <= 0.0 {
                return Err(SlscError::InvalidParameter(format!(
                    "dz must be positive, got {}",
                    dz
                )));
            }
        }
        if self.slsc.max_lag() >= self.probe.no_elements {
            return Err(SlscError::InvalidParameter(format!(
                "lag {} needs more than {} elements",
                self.slsc.max_lag(),
                self.probe.no_elements
            )));
        }
        self.slsc.validate()
    }

    /// Dataset layout implied by probe and acquisition
    pub fn dataset_params(&self) -> InterRfParams {
        let acq = &self.acquisition;
        InterRfParams {
            nrot: acq.nrot,
            nang: acq.nang,
            nele: self.probe.no_elements,
            nsamp: acq.nsamp,
            dphi: acq.dphi,
            dalpha: acq.dalpha,
            ts: acq.ts(),
            tstart: acq.tstart,
            alpha0: acq.alpha0,
            phi0: None,
        }
    }

    /// Steering angle of every transmission (rad)
    pub fn steering_angles(&self) -> Vec<f64> {
        let acq = &self.acquisition;
        let alpha0 = acq
            .alpha0
            .unwrap_or(-acq.dalpha * (acq.nang as f64 - 1.0) / 2.0);
        (0..acq.nang).map(|i| alpha0 + i as f64 * acq.dalpha).collect()
    }

    /// Reconstruction points, x outermost and z innermost
    pub fn field_points(&self) -> Vec<Point3> {
        let f = &self.field;
        let dz = f
            .dz
            .unwrap_or(self.acquisition.c / (2.0 * self.acquisition.fc));
        let xs = linspace(f.x_min, f.x_max, f.nx);
        let zs = arange(f.z_min, f.z_max, dz);
        field_grid(&xs, &[f.y], &zs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "probe": { "noElements": 8, "pitch": 0.0003, "Rfocus": 0.02, "height": 0.005 },
        "acquisition": {
            "nang": 3, "nsamp": 256, "fc": 5208333.333, "tstart": 9.6e-7,
            "dalpha": 0.026
        },
        "field": { "x_min": -0.001, "x_max": 0.001, "nx": 3, "z_min": 0.005, "z_max": 0.006, "dz": 0.0005 },
        "slsc": { "lags": [1, 2], "window_samples": 5 }
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = RunConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.probe.no_elements, 8);
        assert_eq!(config.probe.rfocus, Some(0.02));
        assert_eq!(config.acquisition.nrot, 1);
        assert_eq!(config.acquisition.c, DEFAULT_SPEED_OF_SOUND);
        assert!((config.acquisition.sampling_frequency() - 4.0 * 5208333.333).abs() < 1e-3);
        assert_eq!(config.slsc.interpolation, InterpolationKind::Cubic);
        assert_eq!(config.slsc.degenerate, DegeneratePolicy::Fail);
        assert_eq!(config.slsc.max_lag(), 2);
        assert_eq!(config.acquisition.expected_samples(8), 3 * 8 * 256);
    }

    #[test]
    fn test_field_points_and_angles() {
        let config = RunConfig::from_json(CONFIG).unwrap();
        let points = config.field_points();
        assert_eq!(points.len(), 3 * 2);
        assert!((points[0].x + 0.001).abs() < 1e-12);
        assert!((points[1].z - 0.0055).abs() < 1e-12);
        let angles = config.steering_angles();
        assert_eq!(angles.len(), 3);
        assert!((angles[0] + 0.026).abs() < 1e-12);
        assert!(angles[1].abs() < 1e-12);
    }

    #[test]
    fn test_rejects_even_window() {
        let bad = CONFIG.replace("\"window_samples\": 5", "\"window_samples\": 4");
        let err = RunConfig::from_json(&bad).unwrap_err();
        assert!(matches!(err, SlscError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_empty_lags() {
        let bad = CONFIG.replace("\"lags\": [1, 2]", "\"lags\": []");
        assert!(RunConfig::from_json(&bad).is_err());
    }

    #[test]
    fn test_rejects_non_positive_dz() {
        for dz in ["0.0", "-0.0005"] {
            let bad = CONFIG.replace("\"dz\": 0.0005", &format!("\"dz\": {}", dz));
            let err = RunConfig::from_json(&bad).unwrap_err();
            assert!(matches!(err, SlscError::InvalidParameter(_)), "dz {}", dz);
        }
    }

    #[test]
    fn test_aperture_rules() {
        let with_rules = CONFIG.replace(
            "\"window_samples\": 5",
            "\"window_samples\": 5, \"fnum\": 2.0, \"apertures\": [
                { \"fnum\": 1.5, \"axis\": [0.0, 1.0, 0.0] },
                { \"fnum\": 3.0, \"focus\": [0.0, 0.0, 0.02] }
            ]",
        );
        let config = RunConfig::from_json(&with_rules).unwrap();
        assert_eq!(config.slsc.apertures[1].axis, [1.0, 0.0, 0.0]);
        let rules = config.slsc.aperture_rules().unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].fnum(), 2.0);

        let bad = CONFIG.replace(
            "\"window_samples\": 5",
            "\"window_samples\": 5, \"apertures\": [{ \"fnum\": 1.0, \"axis\": [0.0, 0.0, 0.0] }]",
        );
        assert!(matches!(
            RunConfig::from_json(&bad),
            Err(SlscError::InvalidGeometry(_))
        ));
        assert!(RunConfig::from_json(CONFIG).unwrap().slsc.aperture_rules().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = RunConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SlscError::ConfigError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RunConfig::from_file("/nonexistent/slsc.json").unwrap_err();
        assert!(matches!(err, SlscError::FileNotFound(_)));
    }
}
