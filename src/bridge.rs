use crate::config::Config;
use crate::errors::BridgeError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Script the host runs to open its new-case-note dialog.
pub const NEW_CASE_NOTE_SCRIPT: &str = "Manage: Staff Mtg";
pub const NEW_CASE_NOTE_MODE: &str = "cnNew";
pub const HOST_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound channel to the hosting application.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// `parameter` is already-serialized JSON.
    async fn perform_script(&self, script: &str, parameter: &str) -> Result<(), BridgeError>;
}

#[derive(Debug, Serialize)]
struct ScriptCall<'a> {
    script: &'a str,
    parameter: &'a str,
}

/// Delivers script calls to a host listening on an HTTP callback URL.
#[derive(Debug, Clone)]
pub struct HttpHostSink {
    client: reqwest::Client,
    url: String,
}

impl HttpHostSink {
    pub fn new(url: impl Into<String>) -> Result<Self, BridgeError> {
        Self::with_timeout(url, HOST_CALL_TIMEOUT)
    }

    /// A host that does not answer within `timeout` fails the call.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CommandSink for HttpHostSink {
    async fn perform_script(&self, script: &str, parameter: &str) -> Result<(), BridgeError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ScriptCall { script, parameter })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Stand-in used when no host is attached, e.g. when the page is opened in a
/// plain browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticSink;

#[async_trait]
impl CommandSink for DiagnosticSink {
    async fn perform_script(&self, _script: &str, _parameter: &str) -> Result<(), BridgeError> {
        Err(BridgeError::HostUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum Dispatch {
    Delivered,
    Failed,
    /// No host attached; the text describes the call that would have been made.
    Diagnostic(String),
}

impl Dispatch {
    pub fn notice(&self) -> Option<String> {
        match self {
            Dispatch::Diagnostic(text) => Some(text.clone()),
            Dispatch::Delivered | Dispatch::Failed => None,
        }
    }
}

#[derive(Clone)]
pub struct HostBridge {
    sink: Arc<dyn CommandSink>,
}

impl HostBridge {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self { sink }
    }

    pub fn from_config(config: &Config) -> Self {
        match &config.host_callback_url {
            Some(url) => match HttpHostSink::new(url.clone()) {
                Ok(sink) => {
                    info!(%url, "host callback configured");
                    Self::new(Arc::new(sink))
                }
                Err(err) => {
                    error!(%err, %url, "failed to build host callback client; script calls are diagnostic only");
                    Self::new(Arc::new(DiagnosticSink))
                }
            },
            None => {
                info!("no host callback configured; script calls are diagnostic only");
                Self::new(Arc::new(DiagnosticSink))
            }
        }
    }

    /// Sends `script` with JSON-serialized `params`. Failures are logged and
    /// folded into the returned [`Dispatch`].
    pub async fn perform_script<P>(&self, script: &str, params: &P) -> Dispatch
    where
        P: Serialize + ?Sized,
    {
        let parameter = match serde_json::to_string(params) {
            Ok(parameter) => parameter,
            Err(err) => {
                error!(err = %BridgeError::from(err), script, "error calling host script");
                return Dispatch::Failed;
            }
        };

        match self.sink.perform_script(script, &parameter).await {
            Ok(()) => {
                debug!(script, "host script called");
                Dispatch::Delivered
            }
            Err(BridgeError::HostUnavailable) => {
                let pretty = serde_json::to_string_pretty(params).unwrap_or(parameter);
                info!(script, parameters = %pretty, "would call host script");
                Dispatch::Diagnostic(format!("Host Script Call: {script}\nParameters: {pretty}"))
            }
            Err(err) => {
                error!(%err, script, "error calling host script");
                Dispatch::Failed
            }
        }
    }

    pub async fn request_new_case_note(&self) -> Dispatch {
        self.perform_script(NEW_CASE_NOTE_SCRIPT, &json!({ "mode": NEW_CASE_NOTE_MODE }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CommandSink for RecordingSink {
        async fn perform_script(&self, script: &str, parameter: &str) -> Result<(), BridgeError> {
            self.calls
                .lock()
                .unwrap()
                .push((script.to_string(), parameter.to_string()));
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl CommandSink for FailingSink {
        async fn perform_script(&self, _script: &str, _parameter: &str) -> Result<(), BridgeError> {
            Err(BridgeError::Rejected(500))
        }
    }

    #[tokio::test]
    async fn new_case_note_sends_mode_tag() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = HostBridge::new(sink.clone());
        assert_eq!(bridge.request_new_case_note().await, Dispatch::Delivered);

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, NEW_CASE_NOTE_SCRIPT);
        let parameter: Value = serde_json::from_str(&calls[0].1).unwrap();
        assert_eq!(parameter, json!({ "mode": "cnNew" }));
    }

    #[tokio::test]
    async fn missing_host_yields_diagnostic() {
        let bridge = HostBridge::from_config(&Config::default());
        match bridge.request_new_case_note().await {
            Dispatch::Diagnostic(text) => {
                assert!(text.starts_with("Host Script Call: Manage: Staff Mtg"));
                assert!(text.contains("\"mode\": \"cnNew\""));
            }
            other => panic!("unexpected dispatch {other:?}"),
        }
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let bridge = HostBridge::new(Arc::new(FailingSink));
        let dispatch = bridge.perform_script("Anything", &json!({})).await;
        assert_eq!(dispatch, Dispatch::Failed);
        assert!(dispatch.notice().is_none());
    }

    async fn spawn_host(status: StatusCode) -> (String, mpsc::Receiver<Value>) {
        spawn_slow_host(status, Duration::ZERO).await
    }

    async fn spawn_slow_host(status: StatusCode, delay: Duration) -> (String, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(4);
        let app = Router::new()
            .route(
                "/script",
                post(
                    move |State(tx): State<mpsc::Sender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body).await;
                        tokio::time::sleep(delay).await;
                        status
                    },
                ),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/script"), rx)
    }

    #[tokio::test]
    async fn http_sink_posts_script_call() {
        let (url, mut rx) = spawn_host(StatusCode::OK).await;
        let config = Config {
            host_callback_url: Some(url),
            ..Config::default()
        };
        let bridge = HostBridge::from_config(&config);
        assert_eq!(bridge.request_new_case_note().await, Dispatch::Delivered);

        let body = rx.recv().await.unwrap();
        assert_eq!(body["script"], NEW_CASE_NOTE_SCRIPT);
        assert_eq!(body["parameter"], r#"{"mode":"cnNew"}"#);
    }

    #[tokio::test]
    async fn http_sink_reports_rejection_as_failed() {
        let (url, _rx) = spawn_host(StatusCode::INTERNAL_SERVER_ERROR).await;
        let bridge = HostBridge::new(Arc::new(HttpHostSink::new(url).unwrap()));
        assert_eq!(bridge.request_new_case_note().await, Dispatch::Failed);
    }

    #[tokio::test]
    async fn stalled_host_times_out_as_failed() {
        let (url, _rx) = spawn_slow_host(StatusCode::OK, Duration::from_secs(30)).await;
        let sink = HttpHostSink::with_timeout(url, Duration::from_millis(200)).unwrap();
        let bridge = HostBridge::new(Arc::new(sink));
        let dispatch = tokio::time::timeout(Duration::from_secs(5), bridge.request_new_case_note())
            .await
            .expect("bridge call should not hang");
        assert_eq!(dispatch, Dispatch::Failed);
    }
}
