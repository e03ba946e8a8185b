//! Sensor classification.
//!
//! Turns one raw sensor record into a typed, scaled reading addressed to
//! the metric family and label tuple it belongs to. Classification is a
//! pure function of the record and its controller ID: the same input always
//! yields the same reading.
//!
//! # Pipeline
//!
//! ```text
//! raw value ── scale (10^-precision) ── classify by type code ── °F → °C ── label shape
//! ```
//!
//! Temperature, humidity and VPD families carry the sensor category as a
//! third label because several categories (probe vs. controller) share the
//! family. CO2, light and soil have exactly one category each and use a
//! two-element tuple.

mod units;

pub use units::{centi, fahrenheit_to_celsius, scale_value};

use crate::client::RawSensor;
use crate::metrics::{LabelTuple, MetricFamily};
use std::borrow::Cow;

/// Unit flag value meaning the reading is in Fahrenheit.
const UNIT_FAHRENHEIT: i64 = 0;

/// Unit flag assumed when the record omits it.
const UNIT_DEFAULT: i64 = 1;

/// Sensor kinds keyed by the vendor's type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    ProbeTemperatureF,
    ProbeTemperatureC,
    ProbeHumidity,
    ProbeVpd,
    ControllerTemperatureF,
    ControllerTemperatureC,
    ControllerHumidity,
    ControllerVpd,
    Co2,
    Light,
    Soil,
    Unrecognized(i64),
}

impl SensorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => SensorKind::ProbeTemperatureF,
            2 => SensorKind::ProbeTemperatureC,
            3 => SensorKind::ProbeHumidity,
            4 => SensorKind::ProbeVpd,
            5 => SensorKind::ControllerTemperatureF,
            6 => SensorKind::ControllerTemperatureC,
            7 => SensorKind::ControllerHumidity,
            8 => SensorKind::ControllerVpd,
            9 => SensorKind::Co2,
            10 => SensorKind::Light,
            12 => SensorKind::Soil,
            other => SensorKind::Unrecognized(other),
        }
    }

    /// Category label value. Both temperature units share one category.
    pub fn category(self) -> Cow<'static, str> {
        match self {
            SensorKind::ProbeTemperatureF | SensorKind::ProbeTemperatureC => "probe_temp".into(),
            SensorKind::ProbeHumidity => "probe_humidity".into(),
            SensorKind::ProbeVpd => "probe_vpd".into(),
            SensorKind::ControllerTemperatureF | SensorKind::ControllerTemperatureC => {
                "ctrl_temp".into()
            }
            SensorKind::ControllerHumidity => "ctrl_humidity".into(),
            SensorKind::ControllerVpd => "ctrl_vpd".into(),
            SensorKind::Co2 => "co2".into(),
            SensorKind::Light => "light".into(),
            SensorKind::Soil => "soil".into(),
            SensorKind::Unrecognized(code) => format!("type_{code}").into(),
        }
    }

    pub fn family(self) -> MetricFamily {
        match self {
            SensorKind::ProbeTemperatureF
            | SensorKind::ProbeTemperatureC
            | SensorKind::ControllerTemperatureF
            | SensorKind::ControllerTemperatureC => MetricFamily::SensorTemperature,
            SensorKind::ProbeHumidity | SensorKind::ControllerHumidity => {
                MetricFamily::SensorHumidity
            }
            SensorKind::ProbeVpd | SensorKind::ControllerVpd => MetricFamily::SensorVpd,
            SensorKind::Co2 => MetricFamily::SensorCo2,
            SensorKind::Light => MetricFamily::SensorLight,
            SensorKind::Soil => MetricFamily::SensorSoil,
            SensorKind::Unrecognized(_) => MetricFamily::SensorOther,
        }
    }

    /// Sensors that always report Fahrenheit, whatever the unit flag says.
    pub fn is_fahrenheit(self) -> bool {
        matches!(
            self,
            SensorKind::ProbeTemperatureF | SensorKind::ControllerTemperatureF
        )
    }

    pub fn is_temperature(self) -> bool {
        self.family() == MetricFamily::SensorTemperature
    }

    /// Whether the family carries the category as a label.
    fn labels_category(self) -> bool {
        !matches!(
            self.family(),
            MetricFamily::SensorCo2 | MetricFamily::SensorLight | MetricFamily::SensorSoil
        )
    }
}

/// A classified reading ready to be written to a gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub kind: SensorKind,
    pub family: MetricFamily,
    pub labels: LabelTuple,
    /// Scaled value; temperatures are in Celsius.
    pub value: f64,
}

/// Classifies one sensor record belonging to `controller_id`.
///
/// Returns `None` when the record has no type code or no value.
pub fn classify(controller_id: &str, sensor: &RawSensor) -> Option<Reading> {
    let code = sensor.sensor_type?;
    let raw = sensor.sensor_data?;

    let kind = SensorKind::from_code(code);
    let mut value = scale_value(raw, sensor.sensor_precis.unwrap_or(0));

    // Fahrenheit-only sensor types convert unconditionally; for the rest the
    // unit flag decides.
    if kind.is_temperature()
        && (kind.is_fahrenheit() || sensor.sensor_unit.unwrap_or(UNIT_DEFAULT) == UNIT_FAHRENHEIT)
    {
        value = fahrenheit_to_celsius(value);
    }

    let port = sensor.port_label();
    let category = kind.category();
    let labels = if kind.labels_category() {
        LabelTuple::new([controller_id, port, category.as_ref()])
    } else {
        LabelTuple::new([controller_id, port])
    };

    Some(Reading {
        kind,
        family: kind.family(),
        labels,
        value,
    })
}
