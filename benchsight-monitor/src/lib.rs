//! BenchSight resource monitoring.
//!
//! Runs an external resource sampling script next to a benchmark and turns
//! its output into typed time series:
//!
//! - [`field`] - Field specs describing the sample line layout
//! - [`decode`] - Typed sample values
//! - [`supervisor`] - Monitor script lifecycle and output queue
//! - [`config`] - Monitor settings
//! - [`error`] - Error types

pub mod config;
pub mod decode;
pub mod error;
pub mod field;
pub mod supervisor;

pub use config::{DEFAULT_FIELDS, MonitorSettings};
pub use decode::{Measurements, MetricEntry, MetricSeries, MetricValue, ValueType, decode};
pub use error::{MonitorError, Result};
pub use field::{Field, FieldSpec, Repeat};
pub use supervisor::{EXIT_SENTINEL, MonitorState, PID_FILE_NAME, ResourceMonitor};
