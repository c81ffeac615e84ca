//! Synthetic progress for the server-side parse phase.
//!
//! The backend exposes no granular progress while it parses and embeds
//! an upload, so a capped random ramp keeps the bar moving; the final
//! jump to 100 only ever comes from the poller or an event stream.

use tracing::debug;

use super::store::DocumentStore;
use super::task::TaskId;

/// Spawns the tick loop for one task and registers its abort handle on
/// the task record, replacing (and aborting) any previous simulator for
/// the same id.
pub(crate) fn start(store: &DocumentStore, id: &TaskId) {
    let handle = tokio::spawn(run(store.clone(), id.clone())).abort_handle();
    store.register_simulator(id, handle);
}

async fn run(store: DocumentStore, id: TaskId) {
    let tick = store.options().simulate_tick;
    loop {
        tokio::time::sleep(tick).await;
        if !store.simulate_tick(&id) {
            break;
        }
    }
    debug!(%id, "progress simulation finished");
}
