//! Delay engine
//!
//! Time-of-flight from transmit events and receive elements to reconstruction
//! points. Each model keeps at most one delay table, bound to the point set it
//! was generated for.

use crate::buffer::{ExchangeBuffer, POINT_COLUMNS};
use crate::error::{Result, SlscError};
use crate::geometry::{check_speed_of_sound, check_unit_normal, steering_normal, Point3, TransmitEvent};
use nalgebra::Vector3;
use rayon::prelude::*;

#[inline]
fn travel_time(element: &Point3, point: &Point3, c: f64) -> f64 {
    (point.coords - element.coords).norm() / c
}

/// Receive delay: distance from `element` to `point` divided by `c`
pub fn rx_delay(element: &Point3, point: &Point3, c: f64) -> Result<f64> {
    check_speed_of_sound(c)?;
    Ok(travel_time(element, point, c))
}

/// Plane-wave transmit delay.
///
/// Projects `point - reference` onto `normal`, divides by `c` and adds `tref`.
/// The normal must already be unit length; it is never normalized here.
pub fn tx_delay(
    reference: &Point3,
    tref: f64,
    normal: &Vector3<f64>,
    point: &Point3,
    c: f64,
) -> Result<f64> {
    check_unit_normal(normal)?;
    check_speed_of_sound(c)?;
    Ok((point.coords - reference.coords).dot(normal) / c + tref)
}

#[inline]
fn flat_point(row: &[f64]) -> Point3 {
    Point3::new(row[0], row[1], row[2])
}

/// Receive delays from one element to every point of a flat `Np × 3` buffer
pub fn rx_delays(element: &Point3, points: &[f64], c: f64) -> Result<Vec<f64>> {
    check_speed_of_sound(c)?;
    Ok(points
        .chunks_exact(POINT_COLUMNS)
        .map(|row| travel_time(element, &flat_point(row), c))
        .collect())
}

/// Transmit delays from one event to every point of a flat `Np × 3` buffer
pub fn tx_delays(event: &TransmitEvent, points: &[f64]) -> Vec<f64> {
    points
        .chunks_exact(POINT_COLUMNS)
        .map(|row| event.delay_to(&flat_point(row)))
        .collect()
}

/// Dense `channels × points` matrix of travel times in seconds, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DelayTable {
    channels: usize,
    points: usize,
    data: Vec<f64>,
}

impl DelayTable {
    fn from_rows(rows: Vec<Vec<f64>>, points: usize) -> Self {
        let channels = rows.len();
        let mut data = Vec::with_capacity(channels * points);
        for row in rows {
            debug_assert_eq!(row.len(), points);
            data.extend(row);
        }
        Self {
            channels,
            points,
            data,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn points(&self) -> usize {
        self.points
    }

    /// Delays from `channel` to every point
    pub fn row(&self, channel: usize) -> &[f64] {
        &self.data[channel * self.points..(channel + 1) * self.points]
    }

    #[inline]
    pub fn get(&self, channel: usize, point: usize) -> f64 {
        self.data[channel * self.points + point]
    }

    /// Delays from every channel to `point`, in channel order
    pub fn column(&self, point: usize) -> Vec<f64> {
        (0..self.channels).map(|ch| self.get(ch, point)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Table as nested rows, for serialization
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.channels).map(|ch| self.row(ch).to_vec()).collect()
    }
}

/// Table lifecycle of a delay model
#[derive(Debug, Clone, Default)]
enum TableState {
    #[default]
    Uninitialized,
    Ready(DelayTable),
}

impl TableState {
    fn tables(&self, model: &str) -> Result<&DelayTable> {
        match self {
            TableState::Ready(table) => Ok(table),
            TableState::Uninitialized => Err(SlscError::StateError(format!(
                "{} has no delay table; call gentabs first",
                model
            ))),
        }
    }
}

/// Capability shared by transmit and receive geometry models
pub trait DelayModel: Send + Sync {
    /// Build the delay table for an already-exchanged point buffer,
    /// discarding any previous table.
    fn c_gentabs(&mut self, points: &ExchangeBuffer) -> Result<()>;

    /// Release the current delay table. No-op when there is none.
    fn cleartabs(&mut self);

    /// Number of channels (rows of the delay table)
    fn channel_count(&self) -> usize;

    /// Active delay table, or `StateError` if none has been generated
    fn tables(&self) -> Result<&DelayTable>;

    /// Build the delay table for a flat row-major `Np × 3` point array.
    ///
    /// Shape is validated before anything is computed. The exchange buffer is
    /// released before returning.
    fn gentabs(&mut self, points: &[f64], shape: &[usize]) -> Result<()> {
        let mut buffer = ExchangeBuffer::from_flat(points, shape)?;
        let handle = buffer.handle();
        self.c_gentabs(&buffer)?;
        buffer.release(handle.rows)
    }

    /// Build the delay table for typed points
    fn gentabs_points(&mut self, points: &[Point3]) -> Result<()> {
        let mut buffer = ExchangeBuffer::from_points(points);
        let handle = buffer.handle();
        self.c_gentabs(&buffer)?;
        buffer.release(handle.rows)
    }

    fn is_ready(&self) -> bool {
        self.tables().is_ok()
    }
}

/// Plane-wave transmit model: one row per steered transmission
#[derive(Debug, Clone)]
pub struct PlaneWaveTx {
    events: Vec<TransmitEvent>,
    state: TableState,
}

impl PlaneWaveTx {
    pub fn new(events: Vec<TransmitEvent>) -> Self {
        Self {
            events,
            state: TableState::Uninitialized,
        }
    }

    /// Build transmissions from steering angles.
    ///
    /// # Arguments
    /// * `alphas` - in-plane steering angles (radians)
    /// * `xrefs` - spatial reference per transmission
    /// * `trefs` - temporal reference per transmission (s)
    /// * `betas` - out-of-plane angles; zeros when `None`
    /// * `c` - speed of sound (m/s)
    pub fn steered(
        alphas: &[f64],
        xrefs: &[Point3],
        trefs: &[f64],
        betas: Option<&[f64]>,
        c: f64,
    ) -> Result<Self> {
        let ntx = xrefs.len();
        if alphas.len() != ntx {
            return Err(SlscError::shape("steering angles", ntx, alphas.len()));
        }
        if trefs.len() != ntx {
            return Err(SlscError::shape("reference times", ntx, trefs.len()));
        }
        if let Some(betas) = betas {
            if betas.len() != ntx {
                return Err(SlscError::shape("elevation angles", ntx, betas.len()));
            }
        }

        let events = (0..ntx)
            .map(|i| {
                let beta = betas.map(|b| b[i]).unwrap_or(0.0);
                TransmitEvent::new(xrefs[i], trefs[i], steering_normal(alphas[i], beta), c)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(events))
    }

    /// Steered plane waves from a linear array: each wavefront is referenced to
    /// the first element for non-negative angles and to the last one otherwise,
    /// with zero reference time.
    pub fn from_linear_array(alphas: &[f64], elements: &[Point3], c: f64) -> Result<Self> {
        let (first, last) = match (elements.first(), elements.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(SlscError::shape("element array", "at least 1 element", 0));
            }
        };
        let xrefs: Vec<Point3> = alphas
            .iter()
            .map(|&alpha| if alpha >= 0.0 { first } else { last })
            .collect();
        let trefs = vec![0.0; alphas.len()];
        Self::steered(alphas, &xrefs, &trefs, None, c)
    }

    pub fn events(&self) -> &[TransmitEvent] {
        &self.events
    }
}

impl DelayModel for PlaneWaveTx {
    fn c_gentabs(&mut self, points: &ExchangeBuffer) -> Result<()> {
        self.cleartabs();
        let flat = points.as_slice()?;
        let np = points.rows();

        let rows: Vec<Vec<f64>> = self
            .events
            .par_iter()
            .map(|event| tx_delays(event, flat))
            .collect();

        log::debug!("Generated TX delay table: {} transmissions × {} points", rows.len(), np);
        self.state = TableState::Ready(DelayTable::from_rows(rows, np));
        Ok(())
    }

    fn cleartabs(&mut self) {
        self.state = TableState::Uninitialized;
    }

    fn channel_count(&self) -> usize {
        self.events.len()
    }

    fn tables(&self) -> Result<&DelayTable> {
        self.state.tables("plane-wave transmit model")
    }
}

/// Receive model with every element acting as an independent point receiver
#[derive(Debug, Clone)]
pub struct FullRx {
    elements: Vec<Point3>,
    speed_of_sound: f64,
    state: TableState,
}

impl FullRx {
    pub fn new(elements: Vec<Point3>, speed_of_sound: f64) -> Result<Self> {
        check_speed_of_sound(speed_of_sound)?;
        Ok(Self {
            elements,
            speed_of_sound,
            state: TableState::Uninitialized,
        })
    }

    /// Receive model from a flat row-major `Nrx × 3` element array
    pub fn from_flat(xrefs: &[f64], shape: &[usize], speed_of_sound: f64) -> Result<Self> {
        let buffer = ExchangeBuffer::from_flat(xrefs, shape)?;
        Self::new(buffer.to_points()?, speed_of_sound)
    }

    pub fn elements(&self) -> &[Point3] {
        &self.elements
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }
}

impl DelayModel for FullRx {
    fn c_gentabs(&mut self, points: &ExchangeBuffer) -> Result<()> {
        self.cleartabs();
        let flat = points.as_slice()?;
        let np = points.rows();
        let c = self.speed_of_sound;

        let rows = self
            .elements
            .par_iter()
            .map(|element| rx_delays(element, flat, c))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Generated RX delay table: {} elements × {} points", rows.len(), np);
        self.state = TableState::Ready(DelayTable::from_rows(rows, np));
        Ok(())
    }

    fn cleartabs(&mut self) {
        self.state = TableState::Uninitialized;
    }

    fn channel_count(&self) -> usize {
        self.elements.len()
    }

    fn tables(&self) -> Result<&DelayTable> {
        self.state.tables("receive model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::linear_array;

    const C: f64 = 1540.0;

    #[test]
    fn test_tx_delay_zero_at_reference() {
        let reference = Point3::new(-1.2e-3, 0.0, 0.5e-3);
        for &alpha in &[-0.2, 0.0, 0.15] {
            let n = steering_normal(alpha, 0.0);
            let tau = tx_delay(&reference, 0.0, &n, &reference, C).unwrap();
            assert_eq!(tau, 0.0);
        }
    }

    #[test]
    fn test_tx_delay_positive_ahead_of_wavefront() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let tau = tx_delay(&Point3::origin(), 1e-6, &n, &Point3::new(0.0, 0.0, C * 1e-6), C).unwrap();
        assert!((tau - 2e-6).abs() < 1e-15);
        let behind = tx_delay(&Point3::origin(), 0.0, &n, &Point3::new(0.0, 0.0, -0.01), C).unwrap();
        assert!(behind < 0.0);
    }

    #[test]
    fn test_tx_delay_rejects_non_unit_normal() {
        let n = Vector3::new(0.0, 0.5, 0.5);
        let result = tx_delay(&Point3::origin(), 0.0, &n, &Point3::new(0.0, 0.0, 1.0), C);
        assert!(matches!(result, Err(SlscError::InvalidGeometry(_))));
    }

    #[test]
    fn test_rx_delay_properties() {
        let e = Point3::new(0.3e-3, 0.0, 0.0);
        let p = Point3::new(1e-3, 0.0, 20e-3);
        assert!(rx_delay(&e, &p, C).unwrap() >= 0.0);
        assert_eq!(rx_delay(&e, &e, C).unwrap(), 0.0);
        let expected = ((0.7e-3f64).powi(2) + (20e-3f64).powi(2)).sqrt() / C;
        assert!((rx_delay(&e, &p, C).unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_rx_delay_rejects_non_positive_speed() {
        let p = Point3::new(0.0, 0.0, 0.01);
        for c in [0.0, -C, f64::NAN] {
            assert!(matches!(
                rx_delay(&Point3::origin(), &p, c),
                Err(SlscError::InvalidGeometry(_))
            ));
            assert!(rx_delays(&Point3::origin(), &[0.0, 0.0, 0.01], c).is_err());
        }
    }

    #[test]
    fn test_tables_before_gentabs_is_state_error() {
        let rx = FullRx::new(linear_array(4, 1e-3), C).unwrap();
        assert!(matches!(rx.tables(), Err(SlscError::StateError(_))));
        assert!(!rx.is_ready());
    }

    #[test]
    fn test_gentabs_clear_regen_resizes() {
        let mut rx = FullRx::new(linear_array(4, 1e-3), C).unwrap();
        let points: Vec<f64> = (0..5).flat_map(|i| vec![0.0, 0.0, 1e-3 * (i + 1) as f64]).collect();
        rx.gentabs(&points, &[5, 3]).unwrap();
        assert_eq!(rx.tables().unwrap().points(), 5);
        assert_eq!(rx.tables().unwrap().channels(), 4);

        rx.cleartabs();
        assert!(!rx.is_ready());
        rx.cleartabs();

        let points: Vec<f64> = (0..2).flat_map(|i| vec![0.0, 0.0, 1e-3 * (i + 1) as f64]).collect();
        rx.gentabs(&points, &[2, 3]).unwrap();
        assert_eq!(rx.tables().unwrap().points(), 2);
        assert_eq!(rx.tables().unwrap().as_slice().len(), 8);
    }

    #[test]
    fn test_gentabs_replaces_previous_table() {
        let mut tx = PlaneWaveTx::from_linear_array(&[0.0], &linear_array(4, 1e-3), C).unwrap();
        tx.gentabs_points(&[Point3::new(0.0, 0.0, 0.01)]).unwrap();
        tx.gentabs_points(&[Point3::new(0.0, 0.0, 0.01), Point3::new(0.0, 0.0, 0.02)])
            .unwrap();
        assert_eq!(tx.tables().unwrap().points(), 2);
    }

    #[test]
    fn test_gentabs_shape_error_leaves_model_untouched() {
        let mut rx = FullRx::new(linear_array(2, 1e-3), C).unwrap();
        rx.gentabs_points(&[Point3::new(0.0, 0.0, 0.01)]).unwrap();
        let err = rx.gentabs(&[0.0; 4], &[2, 2]).unwrap_err();
        assert!(matches!(err, SlscError::ShapeMismatch { .. }));
        assert_eq!(rx.tables().unwrap().points(), 1);
    }

    #[test]
    fn test_steered_rejects_mismatched_lengths() {
        let xrefs = vec![Point3::origin(); 3];
        let result = PlaneWaveTx::steered(&[0.0, 0.1], &xrefs, &[0.0, 0.0, 0.0], None, C);
        assert!(matches!(result, Err(SlscError::ShapeMismatch { .. })));
        let result = PlaneWaveTx::steered(&[0.0; 3], &xrefs, &[0.0; 3], Some(&[0.0]), C);
        assert!(matches!(result, Err(SlscError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_row_order_follows_declaration_order() {
        let eles = linear_array(3, 1e-3);
        let mut rx = FullRx::new(eles.clone(), C).unwrap();
        let p = Point3::new(1e-3, 0.0, 0.0);
        rx.gentabs_points(&[p]).unwrap();
        let table = rx.tables().unwrap();
        for (i, e) in eles.iter().enumerate() {
            assert_eq!(table.get(i, 0), rx_delay(e, &p, C).unwrap());
        }
        assert_eq!(table.column(0).len(), 3);
    }

    #[test]
    fn test_from_linear_array_reference_selection() {
        let eles = linear_array(4, 1e-3);
        let tx = PlaneWaveTx::from_linear_array(&[-0.1, 0.0, 0.1], &eles, C).unwrap();
        assert_eq!(tx.events()[0].spatial_reference(), &eles[3]);
        assert_eq!(tx.events()[1].spatial_reference(), &eles[0]);
        assert_eq!(tx.events()[2].spatial_reference(), &eles[0]);
        assert_eq!(tx.channel_count(), 3);
    }
}
