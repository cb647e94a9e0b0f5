//! Scope timing for the processing pipeline
//!
//! Each [`ProfileScope`] logs its wall-clock time on drop and, unless the
//! profile log is disabled, appends one record to it. Scopes that know how
//! many items they handle (points, channels) also report a throughput.
//!
//! The log destination comes from `SLSC_PROFILE_LOG`: unset means
//! `<data_local_dir>/slsc/performance_profile.log`, `off` (or `0`, or empty)
//! disables file output, anything else is used as the file path.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const PROFILE_LOG_ENV: &str = "SLSC_PROFILE_LOG";

/// Where profile records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLog {
    Disabled,
    File(PathBuf),
}

impl ProfileLog {
    /// Resolve the destination from the raw value of `SLSC_PROFILE_LOG`
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => ProfileLog::File(default_log_path()),
            Some("" | "0" | "off" | "OFF" | "false") => ProfileLog::Disabled,
            Some(path) => ProfileLog::File(PathBuf::from(path)),
        }
    }

    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(PROFILE_LOG_ENV).ok().as_deref())
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ProfileLog::Disabled => None,
            ProfileLog::File(path) => Some(path),
        }
    }
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slsc")
        .join("performance_profile.log")
}

/// Wall-clock timing of a scope
pub struct ProfileScope {
    label: String,
    items: Option<usize>,
    start: Instant,
}

impl ProfileScope {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            items: None,
            start: Instant::now(),
        }
    }

    /// Scope over `items` units of work, reported as a rate on drop
    pub fn with_items(label: impl Into<String>, items: usize) -> Self {
        Self {
            label: label.into(),
            items: Some(items),
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// One log line: label, duration and, when known, items per second
    pub fn summary(&self, elapsed_ms: f64) -> String {
        match self.items {
            Some(items) if elapsed_ms > 0.0 => format!(
                "{} | {:.3}ms | {} items | {:.1} items/s",
                self.label,
                elapsed_ms,
                items,
                items as f64 * 1000.0 / elapsed_ms
            ),
            Some(items) => format!("{} | {:.3}ms | {} items", self.label, elapsed_ms, items),
            None => format!("{} | {:.3}ms", self.label, elapsed_ms),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let summary = self.summary(self.elapsed_ms());
        log::info!("[PROFILE] {}", summary);

        if let Some(path) = ProfileLog::from_env().path() {
            if let Err(e) = append_record(path, &summary) {
                log::warn!("Failed to write profile log {}: {}", path.display(), e);
            }
        }
    }
}

/// Append a timestamped record, creating the parent directory as needed
pub fn append_record(path: &Path, record: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let timestamp = chrono::Utc::now().to_rfc3339();
    writeln!(file, "{} | {}", timestamp, record)
}

/// Time the enclosing scope, optionally over a number of items
#[macro_export]
macro_rules! profile_scope {
    ($label:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::new($label);
    };
    ($label:expr, $items:expr) => {
        let _profile_scope = $crate::profiling::ProfileScope::with_items($label, $items);
    };
}

/// Profile log location, for display
pub fn get_profile_log_location() -> String {
    match ProfileLog::from_env() {
        ProfileLog::Disabled => "disabled".to_string(),
        ProfileLog::File(path) => path.display().to_string(),
    }
}
