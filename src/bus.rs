use crate::metrics::Snapshot;
use crate::storage::SharedHistory;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct SnapshotEvent(pub Snapshot);

/// Append every published snapshot to `history`, then forward it to live
/// consumers. Forwarding after the append means anyone woken by the stream
/// already finds the tick in the history.
pub fn register_history_subscriber(
    history: Arc<SharedHistory>,
    stream_tx: broadcast::Sender<Snapshot>,
) -> nuts::ActivityId<Arc<SharedHistory>> {
    let activity = nuts::new_activity(history);
    activity.subscribe(move |history: &mut Arc<SharedHistory>, evt: &SnapshotEvent| {
        let snapshot = evt.0.clone();
        history.append(snapshot.clone());

        if let Err(e) = stream_tx.send(snapshot) {
            // No live consumers right now; the history stays the source of truth.
            warn!("Failed to broadcast snapshot to stream: {}", e);
        }
    });
    activity
}

pub fn publish_snapshot(snapshot: Snapshot) {
    nuts::publish(SnapshotEvent(snapshot));
}
