//! One poll cycle: fetch, classify, populate, reconcile, publish.

use crate::classify::{centi, classify, SensorKind};
use crate::client::{ClientError, DeviceSource, RawDevice, RawPort};
use crate::metrics::{
    LabelTracker, LabelTuple, MetricFamily, MetricsError, MetricsRegistry, ObservedSeries,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Re-authentication attempts allowed within one fetch.
pub const MAX_REAUTH_RETRIES: usize = 1;

/// Label value used when the API omits a display name or version.
const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_VERSION: &str = "unknown";

/// Where the collector is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Processing,
    Publishing,
    Stopping,
}

/// Counts from a successfully published poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub controllers: usize,
    pub devices: usize,
    pub sensors: usize,
    /// Sub-records skipped for missing identity or data.
    pub skipped: usize,
    pub evicted: usize,
}

/// Result of a single [`Collector::collect_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Gauges populated and stale series evicted.
    Published(CycleSummary),
    /// Upstream returned nothing; tracked labels left untouched.
    NoDevices,
    /// Processing failed partway; tracked labels left untouched.
    Aborted,
}

/// Polls a [`DeviceSource`] and keeps the registry in step with it.
///
/// Owns the label tracker, so only one cycle can run at a time.
pub struct Collector<S: ?Sized> {
    pub(super) source: Arc<S>,
    pub(super) metrics: Arc<MetricsRegistry>,
    tracker: LabelTracker,
    phase: CyclePhase,
}

impl<S: DeviceSource + ?Sized> Collector<S> {
    pub fn new(source: Arc<S>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            source,
            metrics,
            tracker: LabelTracker::new(),
            phase: CyclePhase::Idle,
        }
    }

    pub fn tracker(&self) -> &LabelTracker {
        &self.tracker
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub(super) fn enter(&mut self, phase: CyclePhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "Collector phase change");
        self.phase = phase;
    }

    /// Runs one complete poll cycle.
    pub async fn collect_once(&mut self) -> CycleOutcome {
        tracing::debug!("Starting metrics collection");
        let started = Instant::now();
        let timestamp = unix_now();

        self.enter(CyclePhase::Fetching);
        let devices = self.fetch().await;

        if devices.is_empty() {
            self.metrics
                .record_scrape(false, timestamp, started.elapsed().as_secs_f64());
            self.enter(CyclePhase::Idle);
            tracing::warn!("No devices returned from API");
            return CycleOutcome::NoDevices;
        }

        self.enter(CyclePhase::Processing);
        let (observed, mut summary) = match self.populate(&devices, timestamp) {
            Ok(result) => result,
            Err(e) => {
                self.metrics
                    .record_scrape(false, timestamp, started.elapsed().as_secs_f64());
                self.enter(CyclePhase::Idle);
                tracing::error!(error = %e, "Collection aborted; keeping previous label state");
                return CycleOutcome::Aborted;
            }
        };

        self.enter(CyclePhase::Publishing);
        let evictions = self.tracker.reconcile_all(observed, self.metrics.as_ref());
        for family in MetricFamily::ALL {
            self.metrics
                .record_evictions(family, evictions.get(family).len());
        }
        summary.evicted = evictions.total();

        self.metrics
            .record_scrape(true, timestamp, started.elapsed().as_secs_f64());
        self.enter(CyclePhase::Idle);

        tracing::info!(
            controllers = summary.controllers,
            devices = summary.devices,
            sensors = summary.sensors,
            skipped = summary.skipped,
            evicted = summary.evicted,
            "Collection complete"
        );
        CycleOutcome::Published(summary)
    }

    /// Fetches devices, renewing the session at most [`MAX_REAUTH_RETRIES`]
    /// times. Any failure degrades to an empty list.
    async fn fetch(&self) -> Vec<RawDevice> {
        let mut reauths = 0;
        loop {
            match self.source.fetch_devices().await {
                Ok(devices) => return devices,
                Err(ClientError::AuthExpired) if reauths < MAX_REAUTH_RETRIES => {
                    reauths += 1;
                    tracing::warn!("Token expired, re-authenticating");
                    if let Err(e) = self.source.authenticate().await {
                        tracing::warn!(error = %e, "Re-authentication failed");
                        return Vec::new();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to fetch devices");
                    return Vec::new();
                }
            }
        }
    }

    /// Writes every reported value and collects the live label tuples.
    fn populate(
        &self,
        devices: &[RawDevice],
        now: f64,
    ) -> Result<(ObservedSeries, CycleSummary), MetricsError> {
        let m = self.metrics.as_ref();
        let mut observed = ObservedSeries::new();
        let mut summary = CycleSummary::default();

        for device in devices {
            let Some(controller_id) = device.dev_id.as_deref() else {
                tracing::debug!("Skipping device without devId");
                summary.skipped += 1;
                continue;
            };
            let controller_name = device.dev_name.as_deref().unwrap_or(UNKNOWN_NAME);
            let labels = LabelTuple::from([controller_id, controller_name]);
            let info = device.device_info.as_ref();

            m.set(&m.controller_info, &labels, 1.0)?;
            m.set_or_clear(
                &m.controller_temperature,
                &labels,
                info.and_then(|i| i.temperature).map(centi),
            )?;
            m.set_or_clear(
                &m.controller_humidity,
                &labels,
                info.and_then(|i| i.humidity).map(centi),
            )?;
            m.set_or_clear(&m.controller_vpd, &labels, info.and_then(|i| i.vpd).map(centi))?;
            m.set_or_clear(
                &m.controller_temperature_trend,
                &labels,
                info.and_then(|i| i.temperature_trend),
            )?;
            m.set_or_clear(
                &m.controller_humidity_trend,
                &labels,
                info.and_then(|i| i.humidity_trend),
            )?;
            m.set_or_clear(&m.controller_mode, &labels, info.and_then(|i| i.cur_mode))?;
            m.set(&m.controller_last_seen, &labels, now)?;
            observed.insert(MetricFamily::Controller, labels);

            let version = LabelTuple::from([
                controller_id,
                controller_name,
                device.firmware_version.as_deref().unwrap_or(UNKNOWN_VERSION),
                device.hardware_version.as_deref().unwrap_or(UNKNOWN_VERSION),
                device.wifi_name.as_deref().unwrap_or(UNKNOWN_VERSION),
            ]);
            m.set(&m.controller_version_info, &version, 1.0)?;
            observed.insert(MetricFamily::ControllerVersion, version);
            summary.controllers += 1;

            let Some(info) = info else {
                continue;
            };

            for port in &info.ports {
                match self.populate_port(controller_id, port)? {
                    Some(port_labels) => {
                        observed.insert(MetricFamily::Device, port_labels);
                        summary.devices += 1;
                    }
                    None => summary.skipped += 1,
                }
            }

            for sensor in &info.sensors {
                let Some(reading) = classify(controller_id, sensor) else {
                    tracing::debug!(controller_id, "Skipping sensor without type or value");
                    summary.skipped += 1;
                    continue;
                };
                if let SensorKind::Unrecognized(code) = reading.kind {
                    tracing::debug!(controller_id, code, "Unrecognised sensor type");
                }
                let Some(gauge) = m.sensor_gauge(reading.family) else {
                    continue;
                };
                m.set(gauge, &reading.labels, reading.value)?;
                observed.insert(reading.family, reading.labels);
                summary.sensors += 1;
            }
        }

        Ok((observed, summary))
    }

    fn populate_port(
        &self,
        controller_id: &str,
        port: &RawPort,
    ) -> Result<Option<LabelTuple>, MetricsError> {
        let m = self.metrics.as_ref();
        let Some(port_num) = port.port.as_deref() else {
            tracing::debug!(controller_id, "Skipping port without port number");
            return Ok(None);
        };
        let device_name = port.port_name.as_deref().unwrap_or(UNKNOWN_NAME);
        let labels = LabelTuple::from([controller_id, port_num, device_name]);

        m.set(&m.device_info, &labels, 1.0)?;
        m.set_or_clear(&m.device_speed, &labels, port.speed)?;
        m.set_or_clear(
            &m.device_online,
            &labels,
            port.online.map(|online| if online { 1.0 } else { 0.0 }),
        )?;
        m.set_or_clear(&m.device_state, &labels, port.state)?;
        m.set_or_clear(&m.device_mode, &labels, port.cur_mode)?;
        m.set_or_clear(&m.device_connected, &labels, port.load_state)?;
        m.set_or_clear(&m.device_overcurrent, &labels, port.overcurrent_status)?;
        m.set_or_clear(&m.device_abnormal, &labels, port.abnormal_state)?;

        Ok(Some(labels))
    }
}

fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
