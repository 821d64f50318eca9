use pulsegate_protocol::frames::StreamEvent;

/// Sink for a consumer's reconciled event stream (spec §4.7). Implemented
/// by channel bridges (rendering transcripts) and by the dashboard
/// (reconciling with locally-rendered state).
pub trait ClientStreamObserver: Send + Sync {
    fn on_event(&self, event: &StreamEvent);

    /// The subscribed cursor was older than the bus's retained history;
    /// the consumer must re-sync from durable storage (spec §4.7).
    fn on_replay_truncated(&self) {}
}
