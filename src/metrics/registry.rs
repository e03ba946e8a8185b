//! Gauge registry for controller, device and sensor metrics.

use super::labels::{LabelTuple, MetricFamily};
use super::tracker::SeriesSink;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry holding every exported gauge.
///
/// Gauges are grouped into [`MetricFamily`] lifecycles; see
/// [`MetricsRegistry::family_gauges`].
pub struct MetricsRegistry {
    registry: Registry,

    // Controller metrics
    pub(crate) controller_info: GaugeVec,
    pub(crate) controller_temperature: GaugeVec,
    pub(crate) controller_humidity: GaugeVec,
    pub(crate) controller_vpd: GaugeVec,
    pub(crate) controller_temperature_trend: GaugeVec,
    pub(crate) controller_humidity_trend: GaugeVec,
    pub(crate) controller_mode: GaugeVec,
    pub(crate) controller_last_seen: GaugeVec,
    pub(crate) controller_version_info: GaugeVec,

    // Device/port metrics
    pub(crate) device_info: GaugeVec,
    pub(crate) device_speed: GaugeVec,
    pub(crate) device_online: GaugeVec,
    pub(crate) device_state: GaugeVec,
    pub(crate) device_mode: GaugeVec,
    pub(crate) device_connected: GaugeVec,
    pub(crate) device_overcurrent: GaugeVec,
    pub(crate) device_abnormal: GaugeVec,

    // Sensor metrics
    pub(crate) sensor_temperature: GaugeVec,
    pub(crate) sensor_humidity: GaugeVec,
    pub(crate) sensor_vpd: GaugeVec,
    pub(crate) sensor_co2: GaugeVec,
    pub(crate) sensor_light: GaugeVec,
    pub(crate) sensor_soil: GaugeVec,
    pub(crate) sensor_value: GaugeVec,

    // Scrape status
    pub(crate) last_scrape_success: Gauge,
    pub(crate) last_scrape_timestamp: Gauge,
    pub(crate) last_scrape_duration: Gauge,
    pub(crate) series_evicted_total: IntCounterVec,
}

fn family_gauge(name: &str, help: &str, family: MetricFamily) -> Result<GaugeVec, MetricsError> {
    Ok(GaugeVec::new(Opts::new(name, help), family.label_names())?)
}

impl MetricsRegistry {
    /// Creates a new registry with all exporter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        use MetricFamily::*;

        let registry = Registry::new();

        // Controller metrics
        let controller_info = family_gauge(
            "acinfinity_controller_info",
            "AC Infinity controller information",
            Controller,
        )?;
        let controller_temperature = family_gauge(
            "acinfinity_controller_temperature_celsius",
            "Controller temperature in Celsius",
            Controller,
        )?;
        let controller_humidity = family_gauge(
            "acinfinity_controller_humidity_percent",
            "Controller humidity percentage",
            Controller,
        )?;
        let controller_vpd = family_gauge(
            "acinfinity_controller_vpd_kpa",
            "Controller VPD in kPa",
            Controller,
        )?;
        let controller_temperature_trend = family_gauge(
            "acinfinity_controller_temperature_trend",
            "Temperature trend (0=stable, 1=rising, 2=falling)",
            Controller,
        )?;
        let controller_humidity_trend = family_gauge(
            "acinfinity_controller_humidity_trend",
            "Humidity trend (0=stable, 1=rising, 2=falling)",
            Controller,
        )?;
        let controller_mode = family_gauge(
            "acinfinity_controller_mode",
            "Controller current mode (1=off, 2=on, 3=auto, 4=timer, 6=cycle, 7=schedule, 8=vpdTemp, 9=vpdHumi)",
            Controller,
        )?;
        let controller_last_seen = family_gauge(
            "acinfinity_controller_last_seen_timestamp",
            "Unix timestamp when controller was last seen",
            Controller,
        )?;
        let controller_version_info = family_gauge(
            "acinfinity_controller_version_info",
            "Controller version information (always 1, use labels for info)",
            ControllerVersion,
        )?;

        // Device/port metrics
        let device_info = family_gauge(
            "acinfinity_device_info",
            "AC Infinity device information",
            Device,
        )?;
        let device_speed = family_gauge("acinfinity_device_speed", "Device speed (0-10)", Device)?;
        let device_online = family_gauge(
            "acinfinity_device_online",
            "Device online status (1=online, 0=offline)",
            Device,
        )?;
        let device_state = family_gauge("acinfinity_device_state", "Device state", Device)?;
        let device_mode = family_gauge(
            "acinfinity_device_mode",
            "Device current mode (1=off, 2=on, 3=auto, 4=timer, 6=cycle, 7=schedule, 8=vpdTemp, 9=vpdHumi)",
            Device,
        )?;
        let device_connected = family_gauge(
            "acinfinity_device_connected",
            "Whether device is physically connected (1=connected, 0=not connected)",
            Device,
        )?;
        let device_overcurrent = family_gauge(
            "acinfinity_device_overcurrent",
            "Overcurrent status (0=normal, 1=overcurrent detected)",
            Device,
        )?;
        let device_abnormal = family_gauge(
            "acinfinity_device_abnormal",
            "Abnormal state (0=normal, non-zero=fault)",
            Device,
        )?;

        // Sensor metrics
        let sensor_temperature = family_gauge(
            "acinfinity_sensor_temperature_celsius",
            "Sensor temperature in Celsius",
            SensorTemperature,
        )?;
        let sensor_humidity = family_gauge(
            "acinfinity_sensor_humidity_percent",
            "Sensor humidity percentage",
            SensorHumidity,
        )?;
        let sensor_vpd = family_gauge("acinfinity_sensor_vpd_kpa", "Sensor VPD in kPa", SensorVpd)?;
        let sensor_co2 = family_gauge("acinfinity_sensor_co2_ppm", "CO2 level in ppm", SensorCo2)?;
        let sensor_light = family_gauge(
            "acinfinity_sensor_light_percent",
            "Light level percentage",
            SensorLight,
        )?;
        let sensor_soil = family_gauge(
            "acinfinity_sensor_soil_percent",
            "Soil moisture percentage",
            SensorSoil,
        )?;
        let sensor_value = family_gauge(
            "acinfinity_sensor_value",
            "Scaled reading from a sensor type the exporter does not recognise",
            SensorOther,
        )?;

        // Scrape status
        let last_scrape_success = Gauge::new(
            "acinfinity_last_scrape_success",
            "Whether the last scrape was successful (1=success, 0=failure)",
        )?;
        let last_scrape_timestamp = Gauge::new(
            "acinfinity_last_scrape_timestamp",
            "Unix timestamp of the last scrape",
        )?;
        let last_scrape_duration = Gauge::new(
            "acinfinity_last_scrape_duration_seconds",
            "Duration of the last scrape in seconds",
        )?;
        let series_evicted_total = IntCounterVec::new(
            Opts::new(
                "acinfinity_series_evicted_total",
                "Label sets removed because upstream stopped reporting them",
            ),
            &["family"],
        )?;

        let this = Self {
            registry,
            controller_info,
            controller_temperature,
            controller_humidity,
            controller_vpd,
            controller_temperature_trend,
            controller_humidity_trend,
            controller_mode,
            controller_last_seen,
            controller_version_info,
            device_info,
            device_speed,
            device_online,
            device_state,
            device_mode,
            device_connected,
            device_overcurrent,
            device_abnormal,
            sensor_temperature,
            sensor_humidity,
            sensor_vpd,
            sensor_co2,
            sensor_light,
            sensor_soil,
            sensor_value,
            last_scrape_success,
            last_scrape_timestamp,
            last_scrape_duration,
            series_evicted_total,
        };

        // Register all metrics
        for family in MetricFamily::ALL {
            for gauge in this.family_gauges(family) {
                this.registry.register(Box::new(gauge.clone()))?;
            }
        }
        this.registry
            .register(Box::new(this.last_scrape_success.clone()))?;
        this.registry
            .register(Box::new(this.last_scrape_timestamp.clone()))?;
        this.registry
            .register(Box::new(this.last_scrape_duration.clone()))?;
        this.registry
            .register(Box::new(this.series_evicted_total.clone()))?;

        Ok(this)
    }

    /// Every gauge whose series share the lifecycle of `family`.
    pub fn family_gauges(&self, family: MetricFamily) -> Vec<&GaugeVec> {
        match family {
            MetricFamily::Controller => vec![
                &self.controller_info,
                &self.controller_temperature,
                &self.controller_humidity,
                &self.controller_vpd,
                &self.controller_temperature_trend,
                &self.controller_humidity_trend,
                &self.controller_mode,
                &self.controller_last_seen,
            ],
            MetricFamily::ControllerVersion => vec![&self.controller_version_info],
            MetricFamily::Device => vec![
                &self.device_info,
                &self.device_speed,
                &self.device_online,
                &self.device_state,
                &self.device_mode,
                &self.device_connected,
                &self.device_overcurrent,
                &self.device_abnormal,
            ],
            MetricFamily::SensorTemperature => vec![&self.sensor_temperature],
            MetricFamily::SensorHumidity => vec![&self.sensor_humidity],
            MetricFamily::SensorVpd => vec![&self.sensor_vpd],
            MetricFamily::SensorCo2 => vec![&self.sensor_co2],
            MetricFamily::SensorLight => vec![&self.sensor_light],
            MetricFamily::SensorSoil => vec![&self.sensor_soil],
            MetricFamily::SensorOther => vec![&self.sensor_value],
        }
    }

    /// The single gauge a classified sensor reading is written to.
    pub fn sensor_gauge(&self, family: MetricFamily) -> Option<&GaugeVec> {
        match family {
            MetricFamily::Controller | MetricFamily::ControllerVersion | MetricFamily::Device => {
                None
            }
            sensor => self.family_gauges(sensor).into_iter().next(),
        }
    }

    /// Sets one series, creating it if needed.
    pub fn set(
        &self,
        gauge: &GaugeVec,
        labels: &LabelTuple,
        value: f64,
    ) -> Result<(), MetricsError> {
        gauge
            .get_metric_with_label_values(&labels.values())?
            .set(value);
        Ok(())
    }

    /// Sets the series when a value is present, otherwise removes it so a
    /// live label set never carries a value from an earlier poll.
    pub fn set_or_clear(
        &self,
        gauge: &GaugeVec,
        labels: &LabelTuple,
        value: Option<f64>,
    ) -> Result<(), MetricsError> {
        match value {
            Some(v) => self.set(gauge, labels, v),
            None => {
                // Absent series is fine.
                let _ = gauge.remove_label_values(&labels.values());
                Ok(())
            }
        }
    }

    /// Records the outcome of one poll.
    pub fn record_scrape(&self, success: bool, timestamp: f64, duration_secs: f64) {
        self.last_scrape_success.set(if success { 1.0 } else { 0.0 });
        self.last_scrape_timestamp.set(timestamp);
        self.last_scrape_duration.set(duration_secs);
    }

    pub fn record_evictions(&self, family: MetricFamily, count: usize) {
        if count > 0 {
            self.series_evicted_total
                .with_label_values(&[family.name()])
                .inc_by(count as u64);
        }
    }

    /// Value of the last scrape-success gauge.
    pub fn last_scrape_success(&self) -> f64 {
        self.last_scrape_success.get()
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl SeriesSink for MetricsRegistry {
    fn remove_series(&self, family: MetricFamily, labels: &LabelTuple) {
        let values = labels.values();
        for gauge in self.family_gauges(family) {
            if let Err(e) = gauge.remove_label_values(&values) {
                tracing::trace!(
                    family = %family,
                    labels = %labels,
                    error = %e,
                    "Series already absent"
                );
            }
        }
    }
}

/// Reads a series without creating it. Returns `None` when absent.
#[cfg(test)]
pub(crate) fn read_series(
    gauge: &GaugeVec,
    family: MetricFamily,
    labels: &LabelTuple,
) -> Option<f64> {
    use prometheus::core::Collector;

    let wanted: Vec<(&str, &str)> = family
        .label_names()
        .iter()
        .copied()
        .zip(labels.values())
        .collect();

    let families = gauge.collect();
    families
        .iter()
        .flat_map(|mf| mf.get_metric().iter())
        .find(|metric| {
            let pairs = metric.get_label();
            pairs.len() == wanted.len()
                && wanted.iter().all(|(name, value)| {
                    pairs
                        .iter()
                        .any(|p| p.get_name() == *name && p.get_value() == *value)
                })
        })
        .map(|metric| metric.get_gauge().get_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_family_gauges_use_family_labels() {
        let registry = MetricsRegistry::new().unwrap();
        for family in MetricFamily::ALL {
            let labels = LabelTuple::new(family.label_names().iter().map(|n| format!("v_{n}")));
            for gauge in registry.family_gauges(family) {
                registry.set(gauge, &labels, 1.0).unwrap();
            }
        }
    }

    #[test]
    fn test_remove_series_clears_whole_family() {
        let registry = MetricsRegistry::new().unwrap();
        let labels = LabelTuple::from(["C1", "1", "Fan"]);

        registry.set(&registry.device_info, &labels, 1.0).unwrap();
        registry.set(&registry.device_speed, &labels, 5.0).unwrap();
        registry.remove_series(MetricFamily::Device, &labels);

        assert_eq!(read_series(&registry.device_info, MetricFamily::Device, &labels), None);
        assert_eq!(read_series(&registry.device_speed, MetricFamily::Device, &labels), None);

        // Removing again is a no-op.
        registry.remove_series(MetricFamily::Device, &labels);
    }

    #[test]
    fn test_set_or_clear() {
        let registry = MetricsRegistry::new().unwrap();
        let labels = LabelTuple::from(["C1", "Tent"]);
        let gauge = &registry.controller_temperature;

        registry.set_or_clear(gauge, &labels, Some(24.5)).unwrap();
        assert_eq!(read_series(gauge, MetricFamily::Controller, &labels), Some(24.5));

        registry.set_or_clear(gauge, &labels, None).unwrap();
        assert_eq!(read_series(gauge, MetricFamily::Controller, &labels), None);
    }

    #[test]
    fn test_wrong_label_arity_is_an_error() {
        let registry = MetricsRegistry::new().unwrap();
        let result = registry.set(&registry.sensor_co2, &LabelTuple::from(["C1"]), 1.0);
        assert!(matches!(result, Err(MetricsError::Prometheus(_))));
    }

    #[test]
    fn test_record_scrape_and_evictions() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_scrape(true, 1_700_000_000.0, 0.25);
        registry.record_evictions(MetricFamily::Device, 2);
        registry.record_evictions(MetricFamily::SensorCo2, 0);

        let output = registry.encode().unwrap();
        assert!(output.contains("acinfinity_last_scrape_success 1"));
        assert!(output.contains("acinfinity_last_scrape_duration_seconds 0.25"));
        assert!(output.contains(r#"acinfinity_series_evicted_total{family="device"} 2"#));
        assert!(!output.contains(r#"family="sensor_co2""#));
    }

    #[test]
    fn test_sensor_gauge_lookup() {
        let registry = MetricsRegistry::new().unwrap();
        assert!(registry.sensor_gauge(MetricFamily::Device).is_none());
        assert!(registry.sensor_gauge(MetricFamily::SensorOther).is_some());
    }
}
