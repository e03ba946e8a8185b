//! Metric families and the label tuples that identify their series.

use std::fmt;

/// A group of gauges that share one label schema and one lifecycle.
///
/// Every gauge in a family is keyed by the same label tuple, so a tuple
/// that disappears from upstream is evicted from all of them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricFamily {
    Controller,
    ControllerVersion,
    Device,
    SensorTemperature,
    SensorHumidity,
    SensorVpd,
    SensorCo2,
    SensorLight,
    SensorSoil,
    /// Sensors with a type code the exporter does not recognise.
    SensorOther,
}

impl MetricFamily {
    /// Number of tracked families.
    pub const COUNT: usize = 10;

    /// Every family, in declaration order.
    pub const ALL: [MetricFamily; Self::COUNT] = [
        MetricFamily::Controller,
        MetricFamily::ControllerVersion,
        MetricFamily::Device,
        MetricFamily::SensorTemperature,
        MetricFamily::SensorHumidity,
        MetricFamily::SensorVpd,
        MetricFamily::SensorCo2,
        MetricFamily::SensorLight,
        MetricFamily::SensorSoil,
        MetricFamily::SensorOther,
    ];

    /// Dense index, usable for per-family arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short name used in logs and the eviction counter.
    pub fn name(self) -> &'static str {
        match self {
            MetricFamily::Controller => "controller",
            MetricFamily::ControllerVersion => "controller_version",
            MetricFamily::Device => "device",
            MetricFamily::SensorTemperature => "sensor_temp",
            MetricFamily::SensorHumidity => "sensor_humidity",
            MetricFamily::SensorVpd => "sensor_vpd",
            MetricFamily::SensorCo2 => "sensor_co2",
            MetricFamily::SensorLight => "sensor_light",
            MetricFamily::SensorSoil => "sensor_soil",
            MetricFamily::SensorOther => "sensor_other",
        }
    }

    /// Label dimensions, in the order tuple values are supplied.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            MetricFamily::Controller => &["controller_id", "controller_name"],
            MetricFamily::ControllerVersion => &[
                "controller_id",
                "controller_name",
                "firmware_version",
                "hardware_version",
                "wifi_name",
            ],
            MetricFamily::Device => &["controller_id", "port", "device_name"],
            MetricFamily::SensorTemperature
            | MetricFamily::SensorHumidity
            | MetricFamily::SensorVpd
            | MetricFamily::SensorOther => &["controller_id", "port", "sensor_type"],
            MetricFamily::SensorCo2 | MetricFamily::SensorLight | MetricFamily::SensorSoil => {
                &["controller_id", "port"]
            }
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered label values identifying one series within a family.
///
/// Equality is exact sequence equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelTuple(Vec<String>);

impl LabelTuple {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// Borrowed values in the shape prometheus label lookups expect.
    pub fn values(&self) -> Vec<&str> {
        self.0.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[&str; N]> for LabelTuple {
    fn from(values: [&str; N]) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for LabelTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}
