pub mod document;
pub mod request;
pub mod upload;

pub use document::{DocumentCategory, DocumentRecord, DocumentStatus};
pub use request::{RequestEvent, RequestEventStatus};
pub use upload::{UploadFile, UploadMetadata};
