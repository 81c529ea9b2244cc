//! The node: storage, engine and notifiers wired from one configuration.

use std::sync::Arc;
use std::time::Duration;

use guild_groups::{FanoutNotifier, GroupEngine, TracingNotifier, WebhookNotifier};
use guild_store_lmdb::{check_data_dir, check_integrity, LmdbStore};

use crate::config::NodeConfig;
use crate::tracing_spans::open_span;
use crate::NodeError;

/// An engine over the LMDB store at `config.data_dir`.
pub struct GuildNode {
    config: NodeConfig,
    engine: GroupEngine<LmdbStore>,
    /// Kept to drain in-flight deliveries on shutdown.
    webhook: Option<Arc<WebhookNotifier>>,
}

impl GuildNode {
    /// Open (or create) the data directory, migrate and integrity-check
    /// it, and build the engine with the configured notifiers.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        let data_dir = config.data_dir.display().to_string();
        let _span = open_span(&data_dir).entered();

        check_data_dir(&config.data_dir).map_err(NodeError::DataDir)?;
        let store = LmdbStore::open(&config.data_dir, config.map_size_bytes())?;

        let report = check_integrity(store.environment())?;
        if !report.is_healthy() {
            for error in &report.errors {
                tracing::error!(%error, "integrity violation");
            }
            return Err(NodeError::Integrity(format!(
                "{} problems in {}",
                report.errors.len(),
                data_dir
            )));
        }
        tracing::debug!(
            databases = report.databases_checked,
            entries = report.total_entries,
            "integrity check passed"
        );

        let mut notifier = FanoutNotifier::new(vec![Arc::new(TracingNotifier)]);
        let webhook = config
            .notifications
            .webhook_url
            .as_ref()
            .map(|url| {
                WebhookNotifier::with_timeout(
                    url.clone(),
                    Duration::from_secs(config.notifications.timeout_secs),
                )
                .map(Arc::new)
                .map_err(|e| NodeError::Notifier(e.to_string()))
            })
            .transpose()?;
        if let Some(hook) = &webhook {
            tracing::info!(url = hook.url(), "webhook notifications enabled");
            notifier.push(hook.clone());
        }

        let engine =
            GroupEngine::new(store, config.engine.clone()).with_notifier(Arc::new(notifier));
        tracing::info!(
            data_dir = %data_dir,
            map_size_mb = config.map_size_mb,
            "guild node opened"
        );
        Ok(Self {
            config,
            engine,
            webhook,
        })
    }

    pub fn engine(&self) -> &GroupEngine<LmdbStore> {
        &self.engine
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Wait for outstanding webhook deliveries.
    pub async fn shutdown(&self) {
        if let Some(hook) = &self.webhook {
            let pending = hook.pending();
            if pending > 0 {
                tracing::info!(pending, "waiting for webhook deliveries");
            }
            hook.drain().await;
        }
    }
}
