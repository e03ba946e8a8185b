//! HTTP client for the AC Infinity cloud API.

use super::source::{ClientError, DeviceSource};
use super::types::{DeviceList, Envelope, LoginData};
use super::RawDevice;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;

/// Default API root.
pub const DEFAULT_API_BASE: &str = "http://www.acinfinityserver.com/api";

const LOGIN_PATH: &str = "/user/appUserLogin";
const DEVICES_PATH: &str = "/user/devInfoListAll";

/// Envelope code the API uses for success.
const CODE_OK: i64 = 200;

/// Account credentials for the cloud API.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client holding the session token between polls.
pub struct AcInfinityClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    token: RwLock<Option<String>>,
}

impl AcInfinityClient {
    /// Creates a client against `base_url` with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns true once a session token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}

#[async_trait]
impl DeviceSource for AcInfinityClient {
    async fn authenticate(&self) -> Result<(), ClientError> {
        // The password field name is misspelled on the server side.
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .form(&[
                ("appEmail", self.credentials.email.as_str()),
                ("appPasswordl", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let token = parse_login(&body)?;
        *self.token.write().await = Some(token);

        tracing::info!("Authenticated with AC Infinity API");
        Ok(())
    }

    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, ClientError> {
        if !self.is_authenticated().await {
            self.authenticate().await?;
        }
        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or(ClientError::AuthExpired)?;

        let response = self
            .http
            .post(self.url(DEVICES_PATH))
            .header("token", token.as_str())
            .form(&[("userId", token.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                *self.token.write().await = None;
                return Err(ClientError::AuthExpired);
            }
            status if !status.is_success() => {
                return Err(ClientError::Status(status.as_u16()));
            }
            _ => {}
        }

        let body = response.text().await?;
        let devices = parse_devices(&body)?;
        tracing::debug!(count = devices.len(), "Retrieved devices");
        Ok(devices)
    }
}

fn check_code<T>(envelope: &Envelope<T>) -> Result<(), (i64, String)> {
    match envelope.code {
        Some(CODE_OK) => Ok(()),
        code => Err((
            code.unwrap_or_default(),
            envelope
                .msg
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
        )),
    }
}

/// Extracts the session token from a login response body.
pub(crate) fn parse_login(body: &str) -> Result<String, ClientError> {
    let envelope: Envelope<LoginData> = serde_json::from_str(body)?;
    if let Err((code, msg)) = check_code(&envelope) {
        return Err(ClientError::AuthRejected(format!("code {code}: {msg}")));
    }
    envelope
        .data
        .and_then(|d| d.app_id)
        .ok_or_else(|| ClientError::AuthRejected("no appId in response".to_string()))
}

/// Extracts the device list from a `devInfoListAll` response body.
pub(crate) fn parse_devices(body: &str) -> Result<Vec<RawDevice>, ClientError> {
    let envelope: Envelope<DeviceList> = serde_json::from_str(body)?;
    check_code(&envelope).map_err(|(code, msg)| ClientError::Api { code, msg })?;
    Ok(envelope.data.unwrap_or_default().0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_success() {
        let token = parse_login(r#"{"code":200,"msg":"ok","data":{"appId":"abc123"}}"#).unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_parse_login_rejected() {
        let result = parse_login(r#"{"code":10001,"msg":"Password error"}"#);
        assert!(matches!(
            result,
            Err(ClientError::AuthRejected(m)) if m.contains("Password error")
        ));
    }

    #[test]
    fn test_parse_login_missing_app_id() {
        let result = parse_login(r#"{"code":200,"data":{}}"#);
        assert!(matches!(result, Err(ClientError::AuthRejected(_))));
    }

    #[test]
    fn test_parse_devices() {
        let body = r#"{"code":200,"data":[
            {"devId":"C1","devName":"Tent","deviceInfo":{"temperature":2400}}
        ]}"#;
        let devices = parse_devices(body).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].dev_id.as_deref(), Some("C1"));
    }

    #[test]
    fn test_parse_devices_keeps_controller_with_bad_field() {
        let body = r#"{"code":200,"data":[
            {"devId":"C1","deviceInfo":{"tTrend":"n/a","ports":[{"port":1,"speak":5}]}},
            {"devId":"C2","deviceInfo":{"tTrend":0}}
        ]}"#;
        let devices = parse_devices(body).unwrap();
        let ids: Vec<_> = devices.iter().filter_map(|d| d.dev_id.as_deref()).collect();
        assert_eq!(ids, vec!["C1", "C2"]);

        let info = devices[0].device_info.as_ref().unwrap();
        assert_eq!(info.temperature_trend, None);
        assert_eq!(info.ports[0].speed, Some(5.0));
    }

    #[test]
    fn test_parse_devices_api_error() {
        let result = parse_devices(r#"{"code":500,"msg":"busy"}"#);
        assert!(matches!(result, Err(ClientError::Api { code: 500, .. })));
    }

    #[test]
    fn test_parse_devices_not_json() {
        assert!(matches!(parse_devices("<html>"), Err(ClientError::Malformed(_))));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            email: "grower@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("grower@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[cfg(feature = "server")]
    mod http {
        use super::super::*;
        use axum::{http::HeaderMap, routing::post, Router};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        async fn spawn_stub(device_status: StatusCode, device_calls: Arc<AtomicUsize>) -> String {
            let app = Router::new()
                .route(
                    "/api/user/appUserLogin",
                    post(|| async { r#"{"code":200,"data":{"appId":"tok-1"}}"# }),
                )
                .route(
                    "/api/user/devInfoListAll",
                    post(move |headers: HeaderMap| {
                        let calls = Arc::clone(&device_calls);
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            assert_eq!(headers.get("token").unwrap(), "tok-1");
                            (
                                device_status,
                                r#"{"code":200,"data":[{"devId":"C1","devName":"Tent"}]}"#,
                            )
                        }
                    }),
                );

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}/api", addr)
        }

        fn client(base: String) -> AcInfinityClient {
            AcInfinityClient::new(
                base,
                Credentials {
                    email: "grower@example.com".to_string(),
                    password: "secret".to_string(),
                },
                Duration::from_secs(5),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_fetch_authenticates_on_demand() {
            let calls = Arc::new(AtomicUsize::new(0));
            let client = client(spawn_stub(StatusCode::OK, Arc::clone(&calls)).await);

            assert!(!client.is_authenticated().await);
            let devices = client.fetch_devices().await.unwrap();

            assert!(client.is_authenticated().await);
            assert_eq!(devices.len(), 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_unauthorized_maps_to_auth_expired() {
            let calls = Arc::new(AtomicUsize::new(0));
            let client = client(spawn_stub(StatusCode::UNAUTHORIZED, Arc::clone(&calls)).await);

            let result = client.fetch_devices().await;

            assert!(matches!(result, Err(ClientError::AuthExpired)));
            assert!(!client.is_authenticated().await);
            // No retry inside the client.
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
