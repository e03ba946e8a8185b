//! Scripted device source for tests and local runs.

use super::source::{ClientError, DeviceSource};
use super::RawDevice;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Device source that replays a queue of canned fetch results.
///
/// Once the script runs out every fetch returns an empty list, which the
/// collector treats the same as an upstream failure.
#[derive(Debug, Default)]
pub struct MockSource {
    script: Mutex<VecDeque<Result<Vec<RawDevice>, ClientError>>>,
    fail_auth: bool,
    auth_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source whose `authenticate` always fails.
    pub fn with_failing_auth() -> Self {
        Self {
            fail_auth: true,
            ..Self::default()
        }
    }

    /// Queues a successful poll.
    pub fn push_devices(&self, devices: Vec<RawDevice>) {
        self.push(Ok(devices));
    }

    /// Queues a failed poll.
    pub fn push_error(&self, error: ClientError) {
        self.push(Err(error));
    }

    fn push(&self, result: Result<Vec<RawDevice>, ClientError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceSource for MockSource {
    async fn authenticate(&self) -> Result<(), ClientError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err(ClientError::AuthRejected("mock rejects login".to_string()));
        }
        Ok(())
    }

    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let source = MockSource::new();
        source.push_devices(vec![RawDevice::default()]);
        source.push_error(ClientError::AuthExpired);

        assert_eq!(source.fetch_devices().await.unwrap().len(), 1);
        assert!(matches!(
            source.fetch_devices().await,
            Err(ClientError::AuthExpired)
        ));
        assert!(source.fetch_devices().await.unwrap().is_empty());
        assert_eq!(source.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_auth() {
        let source = MockSource::with_failing_auth();
        assert!(source.authenticate().await.is_err());
        assert_eq!(source.auth_calls(), 1);
    }
}
