pub mod aperture;
pub mod axis;
pub mod buffer;
pub mod coherence;
pub mod config;
pub mod dataset;
pub mod delay;
pub mod error;
pub mod geometry;
pub mod interp;
pub mod io;
pub mod processor;
pub mod profiling;
pub mod types;

pub use aperture::{Aperture, Focus};
pub use axis::{AxisDescriptor, AxisSet};
pub use buffer::{BufferHandle, ExchangeBuffer};
pub use coherence::{direct_r_of_lag, lag_coherence, r_of_lag, slsc_value, ChannelStats};
pub use config::{ApertureRule, DegeneratePolicy, RunConfig, SlscConfig};
pub use dataset::{ChannelTensor, InterRfDataset, InterRfParams, RawDataset};
pub use delay::{rx_delay, tx_delay, DelayModel, DelayTable, FullRx, PlaneWaveTx};
pub use error::{Result, SlscError};
pub use geometry::{Point3, TransmitEvent};
pub use interp::{CubicResampler, InterpolationKind, LinearResampler, Resampler};
pub use processor::SlscProcessor;
pub use types::*;
