use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use docport_client::{DocumentApi, EventStreamFactory, ProgressFn, TokenSource};
use docport_config::Settings;
use docport_models::{DocumentRecord, DocumentStatus, UploadFile, UploadMetadata};

use super::task::{
    BackgroundTask, RequestStatus, RequestTask, TaskId, TaskSnapshot, TaskStatus, UploadStatus,
    UploadTask,
};
use super::{poller, simulator, watcher};

pub(crate) const SERVER_FAILURE_MESSAGE: &str = "Server processing failed";
pub(crate) const CONNECTION_LOST_MESSAGE: &str = "Connection lost";

/// Tunables for the queue, usually derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub poll_interval: Duration,
    pub simulate_tick: Duration,
    pub simulate_ceiling: f64,
    pub dept_id: i64,
    pub project_id: i64,
}

impl StoreOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.tasks.poll_interval_ms),
            simulate_tick: Duration::from_millis(settings.tasks.simulate_tick_ms),
            simulate_ceiling: settings.tasks.simulate_ceiling,
            dept_id: settings.context.dept_id,
            project_id: settings.context.project_id,
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            simulate_tick: Duration::from_millis(500),
            simulate_ceiling: 90.0,
            dept_id: 1,
            project_id: 1,
        }
    }
}

/// Single source of truth for background tasks and the document list.
///
/// Cheap to clone; every clone shares one queue. Spawned timers and
/// event-stream watchers hold a clone and are torn down through the
/// abort handles owned by the task records, so nothing outlives a
/// removed task.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    api: Arc<dyn DocumentApi>,
    events: Arc<dyn EventStreamFactory>,
    tokens: Arc<dyn TokenSource>,
    options: StoreOptions,
    tasks: DashMap<TaskId, BackgroundTask>,
    documents: RwLock<DocumentsState>,
    /// At most one live reconciliation timer per store.
    poller: Mutex<Option<AbortHandle>>,
}

#[derive(Debug, Default)]
struct DocumentsState {
    dept_id: i64,
    project_id: i64,
    documents: Vec<DocumentRecord>,
    selected: Option<DocumentRecord>,
    is_loading: bool,
}

impl DocumentStore {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        events: Arc<dyn EventStreamFactory>,
        tokens: Arc<dyn TokenSource>,
        options: StoreOptions,
    ) -> Self {
        let documents = DocumentsState {
            dept_id: options.dept_id,
            project_id: options.project_id,
            ..Default::default()
        };
        Self {
            inner: Arc::new(StoreInner {
                api,
                events,
                tokens,
                options,
                tasks: DashMap::new(),
                documents: RwLock::new(documents),
                poller: Mutex::new(None),
            }),
        }
    }

    // ---- queue operations ------------------------------------------------

    /// Tracks and drives one document upload. The task appears in the
    /// queue immediately; network transfer fills the first half of the
    /// bar, the simulator covers the server-side parse, and the poller
    /// delivers the authoritative finish. Failures land in the task as
    /// an error status, never as a return value.
    pub async fn upload_file(&self, file: UploadFile, metadata: UploadMetadata) {
        let id = TaskId::upload(&file.name);
        self.enqueue(
            id.clone(),
            BackgroundTask::Upload(UploadTask {
                file: file.clone(),
                metadata: metadata.clone(),
                progress: 0.0,
                status: UploadStatus::Uploading,
                error_message: None,
                simulator: None,
            }),
        );
        info!(%id, size = file.len(), "upload started");

        let progress_store = self.clone();
        let progress_id = id.clone();
        // transfer percent maps onto the 0-50 half of the bar
        let on_progress: ProgressFn = Arc::new(move |raw| {
            progress_store.update_progress(&progress_id, raw * 0.5);
        });

        match self
            .inner
            .api
            .upload_document(&file, &metadata, Some(on_progress))
            .await
        {
            Ok(record) => {
                debug!(%id, document_id = record.id, "transfer finished, server parse pending");
                self.update_status(&id, TaskStatus::Parsing, None);
                simulator::start(self, &id);
                self.refresh_documents().await;
            }
            Err(err) => {
                warn!(%id, %err, "upload failed");
                self.update_status(&id, TaskStatus::Error, Some(err.to_string()));
            }
        }
    }

    /// Tracks one approval request through its event stream. Without a
    /// session token the task is born failed and no connection is
    /// attempted.
    pub async fn watch_request(&self, request_id: i64, display_name: impl Into<String>) {
        let id = TaskId::request(request_id);
        self.enqueue(
            id.clone(),
            BackgroundTask::Request(RequestTask {
                request_id,
                display_name: display_name.into(),
                progress: 0.0,
                status: RequestStatus::Processing,
                error_message: None,
                watcher: None,
                simulator: None,
            }),
        );
        info!(%id, "watching approval request");

        let Some(token) = self.inner.tokens.bearer_token() else {
            warn!(%id, "no session token, cannot open event stream");
            self.update_status(
                &id,
                TaskStatus::Error,
                Some(docport_client::ApiError::MissingToken.to_string()),
            );
            return;
        };

        let handle = watcher::spawn(self.clone(), id.clone(), request_id, token);
        if let Some(mut task) = self.inner.tasks.get_mut(&id) {
            if let BackgroundTask::Request(request) = &mut *task {
                request.watcher = Some(handle);
            }
        }
    }

    /// Re-runs a failed upload with its retained file and form fields.
    /// Anything other than an errored upload is ignored.
    pub async fn retry_upload(&self, id: &TaskId) {
        let retained = self.inner.tasks.get(id).and_then(|task| match task.value() {
            BackgroundTask::Upload(upload) if upload.status == UploadStatus::Error => {
                Some((upload.file.clone(), upload.metadata.clone()))
            }
            _ => None,
        });
        let Some((file, metadata)) = retained else {
            debug!(%id, "retry ignored, task is not a failed upload");
            return;
        };
        info!(%id, "retrying upload");
        self.upload_file(file, metadata).await;
    }

    /// Drops a task and tears down its timer and connection handles.
    /// Unknown ids are a no-op, so double-dismissal is harmless.
    pub fn remove(&self, id: &TaskId) {
        if let Some((_, mut task)) = self.inner.tasks.remove(id) {
            task.teardown();
            debug!(%id, "task removed from queue");
        }
    }

    pub fn update_progress(&self, id: &TaskId, value: f64) {
        if let Some(mut task) = self.inner.tasks.get_mut(id) {
            task.bump_progress(value);
        }
    }

    pub fn update_status(&self, id: &TaskId, status: TaskStatus, error_message: Option<String>) {
        let Some(mut task) = self.inner.tasks.get_mut(id) else {
            return;
        };
        if !task.apply_status(status, error_message) {
            debug!(%id, ?status, "status does not apply to this task variant");
        }
    }

    /// Tears down every timer and live connection and empties the store.
    pub fn dispose(&self) {
        self.stop_polling();
        let ids: Vec<TaskId> = self.inner.tasks.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.remove(&id);
        }
        let mut docs = self.inner.documents.write();
        docs.documents.clear();
        docs.selected = None;
        docs.is_loading = false;
    }

    // ---- document list / reconciliation ----------------------------------

    /// Fetches the document list for the current context, reconciles
    /// parsing uploads against it and re-decides whether polling should
    /// run. One fetch failure stops polling; the next upload or context
    /// change starts it again.
    pub async fn refresh_documents(&self) {
        let polling = self.is_polling();
        let (dept_id, project_id) = {
            let mut docs = self.inner.documents.write();
            // polling refreshes stay silent so the list doesn't flicker
            if !polling {
                docs.is_loading = true;
            }
            (docs.dept_id, docs.project_id)
        };

        match self.inner.api.fetch_documents(dept_id, project_id).await {
            Ok(fresh) => {
                self.apply_document_list(fresh);
                self.reconcile_parsing_uploads();
                if self.should_keep_polling() {
                    self.start_polling();
                } else {
                    self.stop_polling();
                }
            }
            Err(err) => {
                warn!(%err, "document list fetch failed, stopping polling");
                self.stop_polling();
            }
        }

        self.inner.documents.write().is_loading = false;
    }

    /// Switches the department/project context and reloads the list.
    pub async fn set_context(&self, dept_id: i64, project_id: i64) {
        {
            let mut docs = self.inner.documents.write();
            docs.dept_id = dept_id;
            docs.project_id = project_id;
        }
        self.refresh_documents().await;
    }

    fn apply_document_list(&self, fresh: Vec<DocumentRecord>) {
        let mut docs = self.inner.documents.write();
        if let Some(selected) = &docs.selected {
            // keep the selection pointed at the updated record; a
            // document that vanished keeps its stale snapshot selected
            if let Some(updated) = fresh.iter().find(|d| d.id == selected.id) {
                docs.selected = Some(updated.clone());
            }
        }
        docs.documents = fresh;
    }

    fn reconcile_parsing_uploads(&self) {
        let mut completed: Vec<TaskId> = Vec::new();
        let mut failed: Vec<TaskId> = Vec::new();
        {
            let docs = self.inner.documents.read();
            for entry in self.inner.tasks.iter() {
                let BackgroundTask::Upload(upload) = entry.value() else {
                    continue;
                };
                if upload.status != UploadStatus::Parsing {
                    continue;
                }
                let Some(record) = docs
                    .documents
                    .iter()
                    .find(|d| d.original_filename == upload.file.name)
                else {
                    continue;
                };
                if record.status.is_parsed() {
                    completed.push(entry.key().clone());
                } else if record.status == DocumentStatus::Failed {
                    failed.push(entry.key().clone());
                }
            }
        }
        for id in completed {
            info!(%id, "server finished parsing");
            self.update_status(&id, TaskStatus::Completed, None);
        }
        for id in failed {
            warn!(%id, "server reported processing failure");
            self.update_status(&id, TaskStatus::Error, Some(SERVER_FAILURE_MESSAGE.to_string()));
        }
    }

    fn should_keep_polling(&self) -> bool {
        let has_processing_docs = self
            .inner
            .documents
            .read()
            .documents
            .iter()
            .any(|d| d.status.is_processing());
        has_processing_docs || self.has_active_tasks()
    }

    // ---- polling lifecycle -----------------------------------------------

    /// Starts the reconciliation timer. A second call while one is
    /// running is a no-op; there is never more than one timer.
    pub fn start_polling(&self) {
        let mut slot = self.inner.poller.lock();
        if slot.is_some() {
            return;
        }
        debug!(interval = ?self.inner.options.poll_interval, "starting document polling");
        *slot = Some(poller::spawn(self.clone()));
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.inner.poller.lock().take() {
            debug!("stopping document polling");
            handle.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.lock().is_some()
    }

    // ---- read accessors --------------------------------------------------

    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.inner.documents.read().documents.clone()
    }

    pub fn selected_document(&self) -> Option<DocumentRecord> {
        self.inner.documents.read().selected.clone()
    }

    pub fn select_document(&self, document: Option<DocumentRecord>) {
        self.inner.documents.write().selected = document;
    }

    pub fn is_loading(&self) -> bool {
        self.inner.documents.read().is_loading
    }

    pub fn context(&self) -> (i64, i64) {
        let docs = self.inner.documents.read();
        (docs.dept_id, docs.project_id)
    }

    pub fn task(&self, id: &TaskId) -> Option<TaskSnapshot> {
        self.inner.tasks.get(id).map(|task| task.snapshot(id))
    }

    /// Snapshots of every queued task, id-ordered for a stable widget.
    pub fn tasks(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> = self
            .inner
            .tasks
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        snapshots.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        snapshots
    }

    pub fn has_active_tasks(&self) -> bool {
        self.inner.tasks.iter().any(|entry| !entry.value().is_terminal())
    }

    // ---- crate-internal plumbing -----------------------------------------

    fn enqueue(&self, id: TaskId, task: BackgroundTask) {
        if let Some(mut previous) = self.inner.tasks.insert(id.clone(), task) {
            debug!(%id, "replacing queued task");
            previous.teardown();
        }
    }

    /// One simulator tick; false tells the tick loop to exit.
    pub(crate) fn simulate_tick(&self, id: &TaskId) -> bool {
        let Some(mut task) = self.inner.tasks.get_mut(id) else {
            return false;
        };
        task.simulate_step(self.inner.options.simulate_ceiling)
    }

    /// Installs a freshly spawned simulator handle, aborting any
    /// previous one for the same id.
    pub(crate) fn register_simulator(&self, id: &TaskId, handle: AbortHandle) {
        match self.inner.tasks.get_mut(id) {
            Some(mut task) => {
                if let Some(old) = task.set_simulator(handle) {
                    old.abort();
                }
            }
            // task vanished between spawn and registration
            None => handle.abort(),
        }
    }

    /// Clears a request task's watcher handle without aborting it; the
    /// watcher calls this on itself before writing a terminal status.
    pub(crate) fn detach_watcher(&self, id: &TaskId) {
        if let Some(mut task) = self.inner.tasks.get_mut(id) {
            if let BackgroundTask::Request(request) = &mut *task {
                request.watcher = None;
            }
        }
    }

    pub(crate) fn events_factory(&self) -> Arc<dyn EventStreamFactory> {
        self.inner.events.clone()
    }

    pub(crate) fn options(&self) -> &StoreOptions {
        &self.inner.options
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // leak guard for stores dropped without an explicit dispose()
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
        for mut entry in self.tasks.iter_mut() {
            entry.value_mut().teardown();
        }
    }
}
