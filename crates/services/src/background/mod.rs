mod poller;
mod simulator;
mod store;
mod task;
mod watcher;

pub use store::{DocumentStore, StoreOptions};
pub use task::{
    BackgroundTask, RequestStatus, RequestTask, TaskId, TaskKind, TaskSnapshot, TaskStatus,
    UploadStatus, UploadTask,
};
