use crate::delay::DelayTable;
use crate::geometry::Point3;
use serde::{Deserialize, Serialize};

/// Coherence at one reconstruction point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceResult {
    /// SLSC value: sum of the lag curve over the selected lags
    pub value: f64,
    /// Transmission-averaged coherence for lags `0..=max_lag`
    pub curve: Vec<f64>,
}

/// A point excluded from the image, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedPoint {
    pub index: usize,
    pub reason: String,
}

/// Per-point SLSC output in field point order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlscImage {
    /// `None` for masked points
    pub values: Vec<Option<f64>>,
    pub curves: Vec<Option<Vec<f64>>>,
    pub masked: Vec<MaskedPoint>,
}

impl SlscImage {
    pub fn with_capacity(points: usize) -> Self {
        Self {
            values: Vec::with_capacity(points),
            curves: Vec::with_capacity(points),
            masked: Vec::new(),
        }
    }

    pub fn push(&mut self, result: CoherenceResult) {
        self.values.push(Some(result.value));
        self.curves.push(Some(result.curve));
    }

    pub fn push_masked(&mut self, index: usize, reason: String) {
        self.values.push(None);
        self.curves.push(None);
        self.masked.push(MaskedPoint { index, reason });
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Result for one point, `None` when masked or out of range
    pub fn get(&self, point: usize) -> Option<CoherenceResult> {
        let value = (*self.values.get(point)?)?;
        let curve = self.curves.get(point)?.clone()?;
        Some(CoherenceResult { value, curve })
    }
}

/// SLSC run result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlscResult {
    pub id: String,
    pub data_path: Option<String>,
    pub rotation: usize,
    pub lags: Vec<usize>,
    pub point_count: usize,
    /// Reconstruction points as `[x, y, z]`, meters
    pub points: Vec<[f64; 3]>,
    pub image: SlscImage,
    pub created_at: String,
}

impl SlscResult {
    pub fn new(rotation: usize, lags: Vec<usize>, points: &[Point3], image: SlscImage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data_path: None,
            rotation,
            lags,
            point_count: points.len(),
            points: points.iter().map(|p| [p.x, p.y, p.z]).collect(),
            image,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_data_path(mut self, data_path: String) -> Self {
        self.data_path = Some(data_path);
        self
    }
}

/// Delay tables of one configuration, for export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayTablesOutput {
    pub speed_of_sound: f64,
    pub point_count: usize,
    /// `transmissions × points`, seconds
    pub tx: Vec<Vec<f64>>,
    /// `elements × points`, seconds
    pub rx: Vec<Vec<f64>>,
    pub created_at: String,
}

impl DelayTablesOutput {
    pub fn new(speed_of_sound: f64, tx: &DelayTable, rx: &DelayTable) -> Self {
        Self {
            speed_of_sound,
            point_count: tx.points(),
            tx: tx.to_rows(),
            rx: rx.to_rows(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
