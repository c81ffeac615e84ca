use std::fmt;

use rand::Rng;
use serde::Serialize;
use tokio::task::AbortHandle;

use docport_models::{UploadFile, UploadMetadata};

/// Queue key for a background task. Uploads are keyed by their file
/// name; request watches by `req-<requestId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn upload(file_name: &str) -> Self {
        Self(file_name.to_string())
    }

    pub fn request(request_id: i64) -> Self {
        Self(format!("req-{request_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unified status vocabulary across both task variants; statuses that
/// don't apply to a variant are rejected by [`BackgroundTask::apply_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Uploading,
    Parsing,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Uploading,
    Parsing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Upload,
    Request,
}

/// One tracked asynchronous operation and its displayed progress.
///
/// The timer/connection abort handles live on the record itself so
/// replacement, removal and terminal transitions all tear them down
/// through the same place.
#[derive(Debug)]
pub enum BackgroundTask {
    Upload(UploadTask),
    Request(RequestTask),
}

#[derive(Debug)]
pub struct UploadTask {
    /// Retained so an errored upload can be retried with the same
    /// file and form fields.
    pub file: UploadFile,
    pub metadata: UploadMetadata,
    pub progress: f64,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    pub(crate) simulator: Option<AbortHandle>,
}

#[derive(Debug)]
pub struct RequestTask {
    pub request_id: i64,
    pub display_name: String,
    pub progress: f64,
    pub status: RequestStatus,
    pub error_message: Option<String>,
    pub(crate) watcher: Option<AbortHandle>,
    pub(crate) simulator: Option<AbortHandle>,
}

/// Handle-free copy of a task for the UI queue widget.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub kind: TaskKind,
    pub file_name: String,
    pub progress: f64,
    pub status: TaskStatus,
    pub error_message: Option<String>,
}

impl BackgroundTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Upload(_) => TaskKind::Upload,
            Self::Request(_) => TaskKind::Request,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Upload(upload) => &upload.file.name,
            Self::Request(request) => &request.display_name,
        }
    }

    pub fn progress(&self) -> f64 {
        match self {
            Self::Upload(upload) => upload.progress,
            Self::Request(request) => request.progress,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Upload(upload) => match upload.status {
                UploadStatus::Uploading => TaskStatus::Uploading,
                UploadStatus::Parsing => TaskStatus::Parsing,
                UploadStatus::Completed => TaskStatus::Completed,
                UploadStatus::Error => TaskStatus::Error,
            },
            Self::Request(request) => match request.status {
                RequestStatus::Processing => TaskStatus::Processing,
                RequestStatus::Completed => TaskStatus::Completed,
                RequestStatus::Error => TaskStatus::Error,
            },
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Upload(upload) => upload.error_message.as_deref(),
            Self::Request(request) => request.error_message.as_deref(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn snapshot(&self, id: &TaskId) -> TaskSnapshot {
        TaskSnapshot {
            id: id.clone(),
            kind: self.kind(),
            file_name: self.file_name().to_string(),
            progress: self.progress(),
            status: self.status(),
            error_message: self.error_message().map(str::to_string),
        }
    }

    /// Monotonic progress write: a value below what is already shown is
    /// dropped, and terminal tasks are left alone.
    pub(crate) fn bump_progress(&mut self, value: f64) {
        if self.is_terminal() {
            return;
        }
        match self {
            Self::Upload(upload) => upload.progress = upload.progress.max(value),
            Self::Request(request) => request.progress = request.progress.max(value),
        }
    }

    /// Applies a status transition, returning false when the status
    /// doesn't belong to this task's variant. `Completed` forces the
    /// bar to 100; any terminal status tears down the owned handles.
    pub(crate) fn apply_status(&mut self, status: TaskStatus, error_message: Option<String>) -> bool {
        match self {
            Self::Upload(upload) => {
                upload.status = match status {
                    TaskStatus::Uploading => UploadStatus::Uploading,
                    TaskStatus::Parsing => UploadStatus::Parsing,
                    TaskStatus::Completed => UploadStatus::Completed,
                    TaskStatus::Error => UploadStatus::Error,
                    TaskStatus::Processing => return false,
                };
                upload.error_message = error_message;
                if status == TaskStatus::Completed {
                    upload.progress = 100.0;
                }
                if status.is_terminal() {
                    if let Some(simulator) = upload.simulator.take() {
                        simulator.abort();
                    }
                }
            }
            Self::Request(request) => {
                request.status = match status {
                    TaskStatus::Processing => RequestStatus::Processing,
                    TaskStatus::Completed => RequestStatus::Completed,
                    TaskStatus::Error => RequestStatus::Error,
                    TaskStatus::Uploading | TaskStatus::Parsing => return false,
                };
                request.error_message = error_message;
                if status == TaskStatus::Completed {
                    request.progress = 100.0;
                }
                if status.is_terminal() {
                    if let Some(simulator) = request.simulator.take() {
                        simulator.abort();
                    }
                    if let Some(watcher) = request.watcher.take() {
                        watcher.abort();
                    }
                }
            }
        }
        true
    }

    /// One synthetic tick: bumps a parsing upload by 0.5 to 1.5 points,
    /// staying strictly below the ceiling. Returns false once
    /// simulation no longer applies to this task.
    pub(crate) fn simulate_step(&mut self, ceiling: f64) -> bool {
        let Self::Upload(upload) = self else {
            return false;
        };
        if upload.status != UploadStatus::Parsing {
            return false;
        }
        let increment = rand::rng().random_range(0.5..1.5);
        let next = upload.progress + increment;
        if next < ceiling {
            upload.progress = next;
        }
        true
    }

    /// Installs a new simulator handle, handing back the previous one so
    /// the caller can abort it.
    pub(crate) fn set_simulator(&mut self, handle: AbortHandle) -> Option<AbortHandle> {
        match self {
            Self::Upload(upload) => upload.simulator.replace(handle),
            Self::Request(request) => request.simulator.replace(handle),
        }
    }

    /// Aborts and clears every handle owned by this task. Used on
    /// removal, on replacement by a newer task with the same id, and on
    /// store disposal.
    pub(crate) fn teardown(&mut self) {
        match self {
            Self::Upload(upload) => {
                if let Some(simulator) = upload.simulator.take() {
                    simulator.abort();
                }
            }
            Self::Request(request) => {
                if let Some(simulator) = request.simulator.take() {
                    simulator.abort();
                }
                if let Some(watcher) = request.watcher.take() {
                    watcher.abort();
                }
            }
        }
    }
}
