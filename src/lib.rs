//! AC Infinity Prometheus Exporter Library
//!
//! Polls the AC Infinity cloud API for controller telemetry (temperature,
//! humidity, VPD, CO2, light, soil, port state) and republishes it as
//! labeled Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! client (fetch) → classify (scale, convert, label) → metrics (set)
//!                                                        ↓
//!                                     tracker (diff vs. last poll, evict)
//! ```
//!
//! The [`collector`] drives one cycle per poll interval on a dedicated task;
//! the HTTP server only reads the registry.
//!
//! # Design Principles
//!
//! - **No ghost series**: a label set that stops being reported is removed
//!   from every gauge of its family on the next successful poll
//! - **Failures keep state**: an empty or failed poll never evicts anything
//! - **Per-record tolerance**: a malformed port or sensor is skipped alone
//! - **Nothing dropped silently**: unknown sensor types are exported under
//!   a synthetic `type_<code>` category
//!
//! # Example
//!
//! ```no_run
//! use acinfinity_exporter::{
//!     client::{AcInfinityClient, Credentials, DeviceSource, DEFAULT_API_BASE},
//!     collector::Collector,
//!     metrics::MetricsRegistry,
//! };
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials {
//!     email: "grower@example.com".into(),
//!     password: "secret".into(),
//! };
//! let client = Arc::new(AcInfinityClient::new(
//!     DEFAULT_API_BASE,
//!     credentials,
//!     Duration::from_secs(30),
//! )?);
//! client.authenticate().await?;
//!
//! let metrics = Arc::new(MetricsRegistry::new()?);
//! let mut collector = Collector::new(client, Arc::clone(&metrics));
//! collector.collect_once().await;
//!
//! println!("{}", metrics.encode()?);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod classify;
pub mod client;
pub mod collector;
pub mod config;
pub mod metrics;

// Re-export commonly used types at crate root
pub use classify::{classify, Reading, SensorKind};
pub use client::{AcInfinityClient, ClientError, Credentials, DeviceSource, MockSource, RawDevice};
pub use collector::{Collector, CollectorHandle, CycleOutcome};
pub use config::{ConfigError, ExporterConfig, FileConfig};
pub use metrics::{LabelTracker, LabelTuple, MetricFamily, MetricsRegistry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
