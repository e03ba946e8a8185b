//! Upstream cloud API access.
//!
//! This module owns everything between the network and the collector:
//! the raw payload types, the HTTP client and the [`DeviceSource`] seam
//! that lets the collector run against a scripted source in tests.

mod api;
mod mock;
mod source;
mod types;

pub use api::{AcInfinityClient, Credentials, DEFAULT_API_BASE};
pub use mock::MockSource;
pub use source::{ClientError, DeviceSource};
pub use types::{RawDevice, RawDeviceInfo, RawPort, RawSensor};
