use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use reqwest::multipart;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use docport_config::Settings;
use docport_models::{DocumentRecord, UploadFile, UploadMetadata};

use crate::error::{ApiError, ApiResult};

/// Transfer-progress callback, invoked with 0..=100 percent of the
/// request body handed to the transport.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// The portal's document endpoints, as consumed by the task queue.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Multipart upload. `on_progress` observes transfer percent only;
    /// server-side parsing happens after this resolves.
    async fn upload_document(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
        on_progress: Option<ProgressFn>,
    ) -> ApiResult<DocumentRecord>;

    /// Current document list for a department/project context.
    async fn fetch_documents(
        &self,
        dept_id: i64,
        project_id: i64,
    ) -> ApiResult<Vec<DocumentRecord>>;
}

#[derive(Debug, Clone)]
pub struct HttpDocumentApi {
    client: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

/// Error body shape the backend uses for upload rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

impl HttpDocumentApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_settings(settings: &Settings) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.api.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api.base_url.clone(),
            chunk_size: settings.api.upload_chunk_size.max(1),
        })
    }

    /// Streams the file in chunks so the callback can track how much of
    /// the body has been handed off.
    fn file_part(&self, file: &UploadFile, on_progress: Option<ProgressFn>) -> ApiResult<multipart::Part> {
        let total = file.bytes.len();
        let chunks: Vec<Vec<u8>> = file
            .bytes
            .chunks(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0usize;
        let body = reqwest::Body::wrap_stream(stream::iter(chunks.into_iter().map(
            move |chunk| {
                sent += chunk.len();
                if let Some(cb) = &on_progress {
                    if total > 0 {
                        cb(sent as f64 * 100.0 / total as f64);
                    }
                }
                Ok::<_, std::io::Error>(chunk)
            },
        )));

        let part = multipart::Part::stream_with_length(body, total as u64)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        Ok(part)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp
                .json::<ErrorBody>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| format!("HTTP error {status}"));
            return Err(ApiError::Status { status, message });
        }
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn upload_document(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
        on_progress: Option<ProgressFn>,
    ) -> ApiResult<DocumentRecord> {
        let url = format!("{}/api/v1/parsing/upload-and-parse/", self.base_url);

        let mut form = multipart::Form::new().part("file", self.file_part(file, on_progress)?);
        if let Some(dept_id) = metadata.dept_id {
            form = form.text("dept_id", dept_id.to_string());
        }
        if let Some(project_id) = metadata.project_id {
            form = form.text("project_id", project_id.to_string());
        }
        if let Some(user_id) = metadata.user_id {
            form = form.text("user_id", user_id.to_string());
        }
        if let Some(category) = metadata.category {
            form = form.text("category", category.as_str());
        }

        debug!(file = %file.name, size = file.len(), "uploading document");
        let resp = self.client.post(&url).multipart(form).send().await?;
        Self::decode(resp).await
    }

    async fn fetch_documents(
        &self,
        dept_id: i64,
        project_id: i64,
    ) -> ApiResult<Vec<DocumentRecord>> {
        let url = format!("{}/api/v1/documents", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("dept_id", dept_id), ("project_id", project_id)])
            .send()
            .await?;
        Self::decode(resp).await
    }
}
