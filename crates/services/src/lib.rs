pub mod background;

pub use background::{
    BackgroundTask, DocumentStore, RequestStatus, StoreOptions, TaskId, TaskKind, TaskSnapshot,
    TaskStatus, UploadStatus,
};
