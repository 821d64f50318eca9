use async_trait::async_trait;
use tracing::warn;

use pulsegate_channels::AdapterRebuilder;

/// Standalone default [`AdapterRebuilder`] (spec §4.8 "Credential
/// hot-reload"). A full in-place rebuild requires tearing down and
/// reconstructing a live `Channel` trait object behind the
/// `ChannelManager`'s registry, which in this standalone runner is keyed
/// by config loaded once at start; this default logs the event at warn
/// so an operator restarts the affected adapter, matching the degraded
/// path spec §9's capability-set design calls for when a collaborator
/// can only partially satisfy a contract.
pub struct LoggingAdapterRebuilder;

#[async_trait]
impl AdapterRebuilder for LoggingAdapterRebuilder {
    async fn stop(&self, agent_id: &str, channel: &str) {
        warn!(%agent_id, %channel, "credentials changed: adapter stop requested (manual restart required in standalone mode)");
    }

    async fn rebuild_and_restart(&self, agent_id: &str, channel: &str) {
        warn!(%agent_id, %channel, "credentials changed: restart the process to pick up new credentials");
    }
}
