//! Prometheus metrics exporter for AC Infinity controllers.
//!
//! This module owns the exported gauges, the bookkeeping that keeps their
//! label sets in step with the hardware actually reporting, and the HTTP
//! endpoint scrapers read from.
//!
//! # Metrics Exposed
//!
//! ## Controller (`controller_id`, `controller_name`)
//! - `acinfinity_controller_info` - Always 1 while the controller reports
//! - `acinfinity_controller_temperature_celsius` - Aggregate temperature
//! - `acinfinity_controller_humidity_percent` - Aggregate humidity
//! - `acinfinity_controller_vpd_kpa` - Aggregate VPD
//! - `acinfinity_controller_temperature_trend` / `_humidity_trend` - Trend codes
//! - `acinfinity_controller_mode` - Current mode code
//! - `acinfinity_controller_last_seen_timestamp` - Last poll that reported it
//! - `acinfinity_controller_version_info` - Firmware/hardware/wifi as labels
//!
//! ## Device (`controller_id`, `port`, `device_name`)
//! - `acinfinity_device_info`, `_speed`, `_online`, `_state`, `_mode`,
//!   `_connected`, `_overcurrent`, `_abnormal`
//!
//! ## Sensor
//! - `acinfinity_sensor_temperature_celsius`, `_humidity_percent`, `_vpd_kpa`,
//!   `_value` (`controller_id`, `port`, `sensor_type`)
//! - `acinfinity_sensor_co2_ppm`, `_light_percent`, `_soil_percent`
//!   (`controller_id`, `port`)
//!
//! ## Scrape status
//! - `acinfinity_last_scrape_success` - 1 if the last poll returned devices
//! - `acinfinity_last_scrape_timestamp` - Unix time of the last poll
//! - `acinfinity_last_scrape_duration_seconds` - Wall time of the last poll
//! - `acinfinity_series_evicted_total{family}` - Stale label sets removed

mod labels;
mod registry;
#[cfg(feature = "server")]
mod server;
mod tracker;

pub use labels::{LabelTuple, MetricFamily};
#[cfg(test)]
pub(crate) use registry::read_series;
pub use registry::{MetricsError, MetricsRegistry};
#[cfg(feature = "server")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
pub use tracker::{Evictions, LabelTracker, ObservedSeries, SeriesSink};
