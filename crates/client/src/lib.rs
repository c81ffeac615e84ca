pub mod auth;
pub mod documents;
pub mod error;
pub mod events;

pub use auth::{SessionTokens, TokenSource};
pub use documents::{DocumentApi, HttpDocumentApi, ProgressFn};
pub use error::{ApiError, ApiResult};
pub use events::{EventStream, EventStreamFactory, SseClient};
