//! Periodic reconciliation against the server's document list.
//!
//! Each pass re-fetches the list, promotes parsing uploads whose
//! documents reached a terminal server status, and then decides whether
//! to keep ticking. The store guarantees a single live loop.

use tokio::task::AbortHandle;
use tracing::debug;

use super::store::DocumentStore;

pub(crate) fn spawn(store: DocumentStore) -> AbortHandle {
    tokio::spawn(run(store)).abort_handle()
}

async fn run(store: DocumentStore) {
    let interval = store.options().poll_interval;
    loop {
        tokio::time::sleep(interval).await;
        // the refresh re-evaluates the keep-polling condition and clears
        // the poller slot when nothing is left to watch
        store.refresh_documents().await;
        if !store.is_polling() {
            break;
        }
    }
    debug!("document polling loop exited");
}
