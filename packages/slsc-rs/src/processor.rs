//! SLSC orchestration
//!
//! [`SlscProcessor`] binds a transmit model, a receive model and a field point
//! set. Both delay tables are generated once at construction; `process` then
//! beamforms each point's channel window, computes the lag curve per
//! transmission, averages over transmissions and reduces the curve to the
//! SLSC value.

use crate::aperture::Aperture;
use crate::buffer::ExchangeBuffer;
use crate::coherence::{slsc_value, ChannelStats};
use crate::config::{DegeneratePolicy, RunConfig, SlscConfig};
use crate::dataset::ChannelTensor;
use crate::delay::{DelayModel, DelayTable, FullRx, PlaneWaveTx};
use crate::error::{Result, SlscError};
use crate::geometry::Point3;
use crate::interp::{PreparedChannel, Resampler};
use crate::profile_scope;
use crate::types::{CoherenceResult, DelayTablesOutput, SlscImage};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Delays and channels shared by every point of one `process` call
struct PointContext<'a> {
    tx: &'a DelayTable,
    rx: &'a DelayTable,
    channels: Vec<Box<dyn PreparedChannel + 'a>>,
    nrx: usize,
    offsets: Vec<f64>,
}

pub struct SlscProcessor {
    tx: Box<dyn DelayModel>,
    rx: FullRx,
    points: Vec<Point3>,
    options: SlscConfig,
    apertures: Vec<Aperture>,
}

impl SlscProcessor {
    /// Create a processor for a flat row-major `Np × 3` point array
    ///
    /// # Arguments
    /// * `tx` - transmit model, one delay row per transmission
    /// * `rx` - receive model, one delay row per element
    /// * `points` - reconstruction points, row-major
    /// * `shape` - declared shape of `points`, must be `[Np, 3]`
    /// * `options` - lags, window and aperture settings
    ///
    /// # Returns
    /// The processor with both delay tables generated, or the first
    /// validation error
    pub fn new(
        mut tx: Box<dyn DelayModel>,
        mut rx: FullRx,
        points: &[f64],
        shape: &[usize],
        options: SlscConfig,
    ) -> Result<Self> {
        options.validate()?;
        let apertures = options.aperture_rules()?;

        profile_scope!("SlscProcessor::new");
        let mut buffer = ExchangeBuffer::from_flat(points, shape)?;
        let handle = buffer.handle();
        tx.c_gentabs(&buffer)?;
        rx.c_gentabs(&buffer)?;
        let points = buffer.to_points()?;
        buffer.release(handle.rows)?;

        log::info!(
            "SLSC processor ready: {} transmissions, {} elements, {} points",
            tx.channel_count(),
            rx.channel_count(),
            points.len()
        );

        Ok(Self {
            tx,
            rx,
            points,
            options,
            apertures,
        })
    }

    /// Create a processor for typed points
    pub fn from_points(
        tx: Box<dyn DelayModel>,
        rx: FullRx,
        points: &[Point3],
        options: SlscConfig,
    ) -> Result<Self> {
        let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        Self::new(tx, rx, &flat, &[points.len(), 3], options)
    }

    /// Plane-wave transmit and full receive models for a run configuration
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let c = config.acquisition.c;
        let elements = config.probe.element_positions();
        let tx = PlaneWaveTx::from_linear_array(&config.steering_angles(), &elements, c)?;
        let rx = FullRx::new(elements, c)?;
        Self::from_points(Box::new(tx), rx, &config.field_points(), config.slsc.clone())
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn options(&self) -> &SlscConfig {
        &self.options
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.rx.speed_of_sound()
    }

    pub fn tx_tables(&self) -> Result<&DelayTable> {
        self.tx.tables()
    }

    pub fn rx_tables(&self) -> Result<&DelayTable> {
        self.rx.tables()
    }

    /// Both delay tables, for export
    pub fn delay_tables(&self) -> Result<DelayTablesOutput> {
        Ok(DelayTablesOutput::new(
            self.speed_of_sound(),
            self.tx.tables()?,
            self.rx.tables()?,
        ))
    }

    /// Receive elements taking part at `point`, in element order.
    ///
    /// An element is active when every aperture rule admits it.
    pub fn active_elements(&self, point: usize) -> Result<Vec<usize>> {
        let target = self.points.get(point).ok_or_else(|| SlscError::OutOfRange {
            axis: "points".to_string(),
            index: point,
            len: self.points.len(),
        })?;
        Ok(self
            .rx
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, e)| self.apertures.iter().all(|a| a.contains(e, target)))
            .map(|(i, _)| i)
            .collect())
    }

    /// Window offsets (s) centered on zero
    fn window_offsets(&self, dt: f64) -> Vec<f64> {
        let spacing = self.options.window_spacing.unwrap_or(dt);
        let half = (self.options.window_samples / 2) as isize;
        (-half..=half).map(|k| k as f64 * spacing).collect()
    }

    /// Compute the SLSC image of one channel tensor
    ///
    /// # Arguments
    /// * `tensor` - `Ntx × Nrx × Nt` channel data
    /// * `resampler` - interpolation used to sample channels at delayed times
    /// * `cancel` - checked between point batches
    ///
    /// # Returns
    /// One value per field point in point order. Masked points are `None`
    /// when the degenerate policy is `Mask`.
    pub fn process(
        &self,
        tensor: &ChannelTensor,
        resampler: &dyn Resampler,
        cancel: Option<&AtomicBool>,
    ) -> Result<SlscImage> {
        let (ntx, nrx, _nt) = tensor.shape();
        if ntx != self.tx.channel_count() {
            return Err(SlscError::shape(
                "channel tensor transmissions",
                self.tx.channel_count(),
                ntx,
            ));
        }
        if nrx != self.rx.channel_count() {
            return Err(SlscError::shape(
                "channel tensor elements",
                self.rx.channel_count(),
                nrx,
            ));
        }

        profile_scope!("SlscProcessor::process", self.points.len());
        let channels = (0..ntx * nrx)
            .into_par_iter()
            .map(|i| resampler.prepare(tensor.channel(i / nrx, i % nrx), tensor.t0(), tensor.dt()))
            .collect::<Result<Vec<_>>>()?;

        let ctx = PointContext {
            tx: self.tx.tables()?,
            rx: self.rx.tables()?,
            channels,
            nrx,
            offsets: self.window_offsets(tensor.dt()),
        };

        let total = self.points.len();
        let batch_size = self.options.batch_size;
        let mut image = SlscImage::with_capacity(total);

        for start in (0..total).step_by(batch_size) {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::info!("SLSC processing cancelled after {} of {} points", start, total);
                return Err(SlscError::Cancelled {
                    completed: start,
                    total,
                });
            }

            let end = (start + batch_size).min(total);
            let outcomes: Vec<Result<CoherenceResult>> = (start..end)
                .into_par_iter()
                .map(|p| self.process_point(&ctx, p))
                .collect();

            for (p, outcome) in (start..end).zip(outcomes) {
                match outcome {
                    Ok(result) => image.push(result),
                    Err(e @ (SlscError::DegenerateChannel { .. } | SlscError::ShapeMismatch { .. }))
                        if self.options.degenerate == DegeneratePolicy::Mask =>
                    {
                        log::warn!("Masking point {}: {}", p, e);
                        image.push_masked(p, e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
            log::debug!("Processed points {}..{} of {}", start, end, total);
        }

        log::info!(
            "SLSC image complete: {} points, {} masked",
            total,
            image.masked.len()
        );
        Ok(image)
    }

    fn process_point(&self, ctx: &PointContext<'_>, p: usize) -> Result<CoherenceResult> {
        let max_lag = self.options.max_lag();
        let active = self.active_elements(p)?;
        if active.len() <= max_lag {
            return Err(SlscError::shape(
                "active aperture",
                format!("at least {} elements", max_lag + 1),
                active.len(),
            )
            .at_point(p));
        }

        let ntx = ctx.tx.channels();
        let nw = ctx.offsets.len();
        let mut window = vec![vec![0.0; nw]; active.len()];
        let mut times = vec![0.0; nw];
        let mut curve = vec![0.0; max_lag + 1];

        for tx in 0..ntx {
            let tau_tx = ctx.tx.get(tx, p);
            for (row, &e) in window.iter_mut().zip(&active) {
                let tau = tau_tx + ctx.rx.get(e, p);
                for (t, offset) in times.iter_mut().zip(&ctx.offsets) {
                    *t = tau + offset;
                }
                ctx.channels[tx * ctx.nrx + e].eval_into(&times, row)?;
            }

            let r = ChannelStats::compute(&window)
                .and_then(|stats| stats.r_of_lag(max_lag))
                .map_err(|e| match e {
                    SlscError::DegenerateChannel { channel, .. } => SlscError::DegenerateChannel {
                        channel: active[channel],
                        point: Some(p),
                    },
                    other => other.at_point(p),
                })?;
            for (acc, value) in curve.iter_mut().zip(r) {
                *acc += value;
            }
        }

        for acc in curve.iter_mut() {
            *acc /= ntx as f64;
        }
        let value = slsc_value(&curve, &self.options.lags)?;
        Ok(CoherenceResult { value, curve })
    }
}
