//! Typed view of the controller payload returned by the cloud API.
//!
//! Every field is optional. The vendor payload is loosely typed (IDs arrive
//! as strings or numbers, readings sometimes as numeric strings) and fields
//! come and go between firmware versions, so absence is modelled explicitly
//! and resolved by the collector rather than defaulted here.
//!
//! Arrays of sub-records are decoded element by element: one malformed
//! port or sensor is dropped without taking its siblings or the owning
//! device down with it. Scalars of the wrong shape decode as absent.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// One controller (hub) as reported by `devInfoListAll`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDevice {
    /// Opaque controller ID, stable across polls.
    #[serde(default, deserialize_with = "opt_string")]
    pub dev_id: Option<String>,
    /// Display name.
    #[serde(default, deserialize_with = "opt_string")]
    pub dev_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub firmware_version: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub hardware_version: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub wifi_name: Option<String>,
    /// Nested live state. Missing means the controller reported no data.
    #[serde(default, deserialize_with = "lenient_record")]
    pub device_info: Option<RawDeviceInfo>,
}

/// Aggregate readings plus attached ports and sensors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceInfo {
    /// Temperature in Celsius, scaled by 100.
    #[serde(default, deserialize_with = "opt_f64")]
    pub temperature: Option<f64>,
    /// Relative humidity in percent, scaled by 100.
    #[serde(default, deserialize_with = "opt_f64")]
    pub humidity: Option<f64>,
    /// VPD in kPa, scaled by 100.
    #[serde(default, alias = "vpdnums", deserialize_with = "opt_f64")]
    pub vpd: Option<f64>,
    #[serde(default, rename = "tTrend", deserialize_with = "opt_f64")]
    pub temperature_trend: Option<f64>,
    #[serde(default, rename = "hTrend", deserialize_with = "opt_f64")]
    pub humidity_trend: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub cur_mode: Option<f64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub ports: Vec<RawPort>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub sensors: Vec<RawSensor>,
}

/// A controllable output port (fan, light, humidifier...).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPort {
    #[serde(default, deserialize_with = "opt_string")]
    pub port: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub port_name: Option<String>,
    /// Speed level 0-10. The vendor field really is called `speak`.
    #[serde(default, rename = "speak", deserialize_with = "opt_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub online: Option<bool>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub state: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub cur_mode: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub load_state: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub overcurrent_status: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64")]
    pub abnormal_state: Option<f64>,
}

/// A single sensor reading in fixed-point form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensor {
    #[serde(default, deserialize_with = "opt_i64")]
    pub sensor_type: Option<i64>,
    /// Raw integer value; divide by `10^sensor_precis` for real units.
    #[serde(default, deserialize_with = "opt_f64")]
    pub sensor_data: Option<f64>,
    #[serde(default, deserialize_with = "opt_i64")]
    pub sensor_precis: Option<i64>,
    /// 0 = Fahrenheit, 1 = Celsius.
    #[serde(default, deserialize_with = "opt_i64")]
    pub sensor_unit: Option<i64>,
    #[serde(default, deserialize_with = "opt_string")]
    pub sensor_port: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub port: Option<String>,
}

impl RawSensor {
    /// Port the sensor is attached to, falling back to `port` then `"0"`.
    pub fn port_label(&self) -> &str {
        self.sensor_port
            .as_deref()
            .or(self.port.as_deref())
            .unwrap_or("0")
    }
}

/// Response envelope shared by every API endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// Payload of a successful login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginData {
    #[serde(default, deserialize_with = "opt_string")]
    pub app_id: Option<String>,
}

/// Device list wrapper so the envelope can reuse [`lenient_vec`].
#[derive(Debug, Default)]
pub(crate) struct DeviceList(pub Vec<RawDevice>);

impl<'de> Deserialize<'de> for DeviceList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_vec(deserializer).map(DeviceList)
    }
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(other) => {
            tracing::debug!(value = %other, "Expected an array; treating as empty");
            return Ok(Vec::new());
        }
    };
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed record");
                None
            }
        })
        .collect())
}

/// Decodes a nested record, treating anything that is not one as absent.
fn lenient_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed record");
                Ok(None)
            }
        },
    }
}

fn malformed<T>(expected: &str, value: &Value) -> Option<T> {
    tracing::debug!(expected, value = %value, "Ignoring malformed field");
    None
}

// The scalar helpers below never fail: a value of the wrong shape decodes as
// `None` so one bad field cannot drop the record that carries it.

fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => malformed("string or number", &other),
    })
}

fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => malformed("number", &Value::String(s)),
        },
        Some(other) => malformed("number", &other),
    })
}

fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Some(v),
            None => malformed("integer", &Value::Number(n)),
        },
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => malformed("integer", &Value::String(s)),
        },
        Some(other) => malformed("integer", &other),
    })
}

fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        Some(other) => malformed("boolean", &other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_ids_become_strings() {
        let device: RawDevice = serde_json::from_value(json!({
            "devId": 123456,
            "devName": "Tent",
            "deviceInfo": { "ports": [{ "port": 2, "portName": "Fan" }] }
        }))
        .unwrap();

        assert_eq!(device.dev_id.as_deref(), Some("123456"));
        let info = device.device_info.unwrap();
        assert_eq!(info.ports[0].port.as_deref(), Some("2"));
    }

    #[test]
    fn test_malformed_sensor_is_dropped_alone() {
        let info: RawDeviceInfo = serde_json::from_value(json!({
            "sensors": [
                "garbage",
                { "sensorType": 9, "sensorData": "850" }
            ]
        }))
        .unwrap();

        assert_eq!(info.sensors.len(), 1);
        assert_eq!(info.sensors[0].sensor_type, Some(9));
        assert_eq!(info.sensors[0].sensor_data, Some(850.0));
    }

    #[test]
    fn test_bad_scalar_only_blanks_that_field() {
        let sensor: RawSensor = serde_json::from_value(json!({
            "sensorType": "not-a-number",
            "sensorData": 1,
            "sensorPort": { "nested": true }
        }))
        .unwrap();

        assert_eq!(sensor.sensor_type, None);
        assert_eq!(sensor.sensor_data, Some(1.0));
        assert_eq!(sensor.sensor_port, None);
    }

    #[test]
    fn test_bad_aggregate_field_keeps_device() {
        let device: RawDevice = serde_json::from_value(json!({
            "devId": "C1",
            "firmwareVersion": { "major": 1 },
            "deviceInfo": {
                "temperature": "warm",
                "tTrend": "n/a",
                "hTrend": 1,
                "ports": [{ "port": 1, "speak": 4 }],
                "sensors": {}
            }
        }))
        .unwrap();

        assert_eq!(device.dev_id.as_deref(), Some("C1"));
        assert_eq!(device.firmware_version, None);
        let info = device.device_info.unwrap();
        assert_eq!(info.temperature, None);
        assert_eq!(info.temperature_trend, None);
        assert_eq!(info.humidity_trend, Some(1.0));
        assert_eq!(info.ports.len(), 1);
        assert!(info.sensors.is_empty());
    }

    #[test]
    fn test_non_object_device_info_is_absent() {
        let device: RawDevice =
            serde_json::from_value(json!({ "devId": "C1", "deviceInfo": "offline" })).unwrap();
        assert_eq!(device.dev_id.as_deref(), Some("C1"));
        assert!(device.device_info.is_none());
    }

    #[test]
    fn test_null_arrays_are_empty() {
        let info: RawDeviceInfo =
            serde_json::from_value(json!({ "ports": null, "temperature": 2512 })).unwrap();

        assert!(info.ports.is_empty());
        assert!(info.sensors.is_empty());
        assert_eq!(info.temperature, Some(2512.0));
    }

    #[test]
    fn test_vpd_alias() {
        let info: RawDeviceInfo = serde_json::from_value(json!({ "vpdnums": 105 })).unwrap();
        assert_eq!(info.vpd, Some(105.0));
    }

    #[test]
    fn test_sensor_port_fallback() {
        let sensor: RawSensor = serde_json::from_value(json!({ "port": 3 })).unwrap();
        assert_eq!(sensor.port_label(), "3");

        let sensor: RawSensor =
            serde_json::from_value(json!({ "sensorPort": 1, "port": 3 })).unwrap();
        assert_eq!(sensor.port_label(), "1");

        assert_eq!(RawSensor::default().port_label(), "0");
    }

    #[test]
    fn test_online_accepts_numbers() {
        let port: RawPort = serde_json::from_value(json!({ "port": 1, "online": 1 })).unwrap();
        assert_eq!(port.online, Some(true));
    }

    #[test]
    fn test_device_list_skips_bad_entries() {
        let list: DeviceList =
            serde_json::from_value(json!([{ "devId": "a" }, "garbage", { "devId": "b" }])).unwrap();
        let ids: Vec<_> = list.0.iter().filter_map(|d| d.dev_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
