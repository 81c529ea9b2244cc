//! Event notifiers.
//!
//! Notifiers run after a commit and outside any store lock. Delivery is
//! fire-and-forget: a failure is logged and never changes the outcome of
//! the operation that produced the event.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use guild_types::{GroupEvent, Notifier};
use tokio::task::JoinHandle;

/// Default timeout for one webhook delivery.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes each event as a structured log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &GroupEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event.group() {
            Some(group) => tracing::info!(event = event.kind(), group = %group, %payload, "group event"),
            None => tracing::info!(event = event.kind(), %payload, "group event"),
        }
    }
}

/// Hands every event to each inner notifier in turn.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }

    pub fn push(&mut self, target: Arc<dyn Notifier>) {
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, event: &GroupEvent) {
        for target in &self.targets {
            target.notify(event);
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("endpoint answered HTTP {0}")]
    Rejected(reqwest::StatusCode),
    #[error("request failed: {0}")]
    Failed(String),
}

/// POSTs each event as JSON to one endpoint.
///
/// Deliveries are spawned on the ambient tokio runtime. Outside a runtime
/// events are dropped with a warning. Call [`WebhookNotifier::drain`]
/// before shutdown so in-flight deliveries are not cut short.
pub struct WebhookNotifier {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    url: String,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Fails when the HTTP client cannot be built, e.g. when the TLS
    /// backend does not initialise.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()?;
        Ok(Self {
            http_client,
            url: url.into(),
            in_flight: Mutex::new(Vec::new()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of deliveries spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every delivery spawned so far.
    pub async fn drain(&self) {
        let handles = std::mem::take(&mut *self.handles());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "webhook delivery task failed");
            }
        }
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: &GroupEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(event = event.kind(), "no async runtime, webhook delivery skipped");
            return;
        };
        let body = match serde_json::to_value(event) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(event = event.kind(), error = %e, "event not serializable");
                return;
            }
        };

        let client = self.http_client.clone();
        let url = self.url.clone();
        let kind = event.kind();
        let handle = runtime.spawn(async move {
            match deliver(&client, &url, &body).await {
                Ok(()) => tracing::debug!(event = kind, %url, "webhook delivered"),
                Err(e) => tracing::warn!(event = kind, %url, error = %e, "webhook delivery failed"),
            }
        });

        let mut handles = self.handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

async fn deliver(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<(), DeliveryError> {
    let response = client.post(url).json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            DeliveryError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            DeliveryError::Unreachable(format!("connection failed: {e}"))
        } else {
            DeliveryError::Failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(DeliveryError::Rejected(response.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_nullables::RecordingNotifier;
    use guild_types::{GroupId, UserId};

    fn created() -> GroupEvent {
        GroupEvent::GroupCreated {
            group: GroupId::new(3),
            by: UserId::new(1),
        }
    }

    #[test]
    fn tracing_notifier_accepts_every_event() {
        TracingNotifier.notify(&created());
        TracingNotifier.notify(&GroupEvent::UserRegistered { user: UserId::new(2) });
    }

    #[test]
    fn fanout_reaches_every_target() {
        let a = Arc::new(RecordingNotifier::new());
        let b = Arc::new(RecordingNotifier::new());
        let fanout = FanoutNotifier::new(vec![a.clone(), b.clone()]);
        fanout.notify(&created());
        assert_eq!(a.kinds(), vec!["group_created"]);
        assert_eq!(b.events(), vec![created()]);
        assert_eq!(fanout.len(), 2);
    }

    #[test]
    fn webhook_outside_runtime_skips_delivery() {
        let hook = WebhookNotifier::new("http://127.0.0.1:9/events").unwrap();
        hook.notify(&created());
        assert_eq!(hook.pending(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_failed_delivery() {
        let hook =
            WebhookNotifier::with_timeout("http://127.0.0.1:9/events", Duration::from_secs(2))
                .unwrap();
        hook.notify(&created());
        hook.drain().await;
        assert_eq!(hook.pending(), 0);
    }

    #[test]
    fn webhook_client_builds_with_a_short_timeout() {
        let hook = WebhookNotifier::with_timeout("http://127.0.0.1:9/events", Duration::from_millis(50))
            .unwrap();
        assert_eq!(hook.url(), "http://127.0.0.1:9/events");
        assert_eq!(hook.pending(), 0);
    }
}
