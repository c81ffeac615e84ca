//! Event-stream watcher for approval-request tasks.
//!
//! One connection per request id. The watcher forwards progress pushes
//! into the queue, applies the terminal transition itself and exits; it
//! never reconnects. A dead stream surfaces as a failed task for the
//! user to dismiss and re-trigger.

use tokio::task::AbortHandle;
use tracing::{debug, warn};

use docport_models::RequestEventStatus;

use super::store::{CONNECTION_LOST_MESSAGE, DocumentStore, SERVER_FAILURE_MESSAGE};
use super::task::{TaskId, TaskStatus};

pub(crate) fn spawn(
    store: DocumentStore,
    id: TaskId,
    request_id: i64,
    token: String,
) -> AbortHandle {
    tokio::spawn(run(store, id, request_id, token)).abort_handle()
}

async fn run(store: DocumentStore, id: TaskId, request_id: i64, token: String) {
    let events = store.events_factory();
    let mut stream = match events.connect(request_id, &token).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%id, %err, "event stream connection failed");
            store.detach_watcher(&id);
            store.update_status(&id, TaskStatus::Error, Some(CONNECTION_LOST_MESSAGE.to_string()));
            return;
        }
    };
    debug!(%id, request_id, "watching request events");

    loop {
        match stream.next_event().await {
            Some(Ok(event)) => {
                if let Some(progress) = event.progress {
                    store.update_progress(&id, progress);
                }
                match event.status {
                    Some(RequestEventStatus::Done | RequestEventStatus::Approved) => {
                        debug!(%id, "request approved");
                        store.detach_watcher(&id);
                        store.update_status(&id, TaskStatus::Completed, None);
                        drop(stream);
                        // surface the newly approved document right away
                        store.refresh_documents().await;
                        return;
                    }
                    Some(RequestEventStatus::Failed) => {
                        warn!(%id, "request failed");
                        store.detach_watcher(&id);
                        let message = event
                            .error
                            .unwrap_or_else(|| SERVER_FAILURE_MESSAGE.to_string());
                        store.update_status(&id, TaskStatus::Error, Some(message));
                        return;
                    }
                    None => {}
                }
            }
            Some(Err(err)) => {
                warn!(%id, %err, "event stream transport error");
                store.detach_watcher(&id);
                store.update_status(&id, TaskStatus::Error, Some(CONNECTION_LOST_MESSAGE.to_string()));
                return;
            }
            None => {
                // closed by the server without a terminal status
                debug!(%id, "event stream closed");
                store.detach_watcher(&id);
                store.update_status(&id, TaskStatus::Error, Some(CONNECTION_LOST_MESSAGE.to_string()));
                return;
            }
        }
    }
}
