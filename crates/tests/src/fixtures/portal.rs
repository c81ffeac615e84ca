use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use docport_models::{DocumentRecord, DocumentStatus};

/// A running mock portal backend with scriptable responses.
///
/// Serves the three endpoints the clients consume: multipart upload,
/// document list, and the per-request SSE stream.
pub struct TestPortal {
    pub addr: SocketAddr,
    pub base_url: String,
    pub state: Arc<PortalState>,
}

#[derive(Default)]
pub struct PortalState {
    pub documents: Mutex<Vec<DocumentRecord>>,
    pub uploads: Mutex<Vec<ReceivedUpload>>,
    /// Scripted (status, detail) rejection for the next upload.
    pub upload_response: Mutex<Option<(u16, String)>>,
    /// Scripted SSE payloads per request id, sent then closed.
    pub events: Mutex<HashMap<i64, Vec<String>>>,
    pub seen_bearer: Mutex<Option<String>>,
    next_document_id: Mutex<i64>,
}

/// What the upload route actually received.
#[derive(Debug, Default, Clone)]
pub struct ReceivedUpload {
    pub filename: String,
    pub dept_id: Option<i64>,
    pub project_id: Option<i64>,
    pub user_id: Option<i64>,
    pub category: Option<String>,
    pub size: usize,
}

impl TestPortal {
    /// Spawns the mock backend on an ephemeral port.
    pub async fn spawn() -> Self {
        super::init_tracing();
        let state = Arc::new(PortalState::default());
        let app = Router::new()
            .route("/api/v1/parsing/upload-and-parse/", post(upload_and_parse))
            .route("/api/v1/documents", get(list_documents))
            .route("/api/v1/events/request/{request_id}", get(request_events))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn script_events(&self, request_id: i64, payloads: &[&str]) {
        self.state
            .events
            .lock()
            .insert(request_id, payloads.iter().map(|p| p.to_string()).collect());
    }

    /// Flips the server-side status of a stored document.
    pub fn mark_document(&self, filename: &str, status: DocumentStatus) {
        for doc in self.state.documents.lock().iter_mut() {
            if doc.original_filename == filename {
                doc.status = status;
            }
        }
    }
}

async fn upload_and_parse(
    State(state): State<Arc<PortalState>>,
    mut multipart: Multipart,
) -> Response {
    if let Some((status, detail)) = state.upload_response.lock().take() {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(serde_json::json!({ "detail": detail }))).into_response();
    }

    let mut received = ReceivedUpload::default();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                received.filename = field.file_name().unwrap_or_default().to_string();
                received.size = field.bytes().await.expect("file bytes").len();
            }
            "dept_id" => received.dept_id = field.text().await.ok().and_then(|t| t.parse().ok()),
            "project_id" => {
                received.project_id = field.text().await.ok().and_then(|t| t.parse().ok());
            }
            "user_id" => received.user_id = field.text().await.ok().and_then(|t| t.parse().ok()),
            "category" => received.category = field.text().await.ok(),
            _ => {}
        }
    }

    let id = {
        let mut next = state.next_document_id.lock();
        *next += 1;
        *next
    };
    let record = DocumentRecord {
        id,
        original_filename: received.filename.clone(),
        status: DocumentStatus::Parsing,
        dept_id: received.dept_id.unwrap_or(1),
        project_id: received.project_id.unwrap_or(1),
        category: None,
        created_at: None,
        completed_at: None,
    };
    state.uploads.lock().push(received);
    state.documents.lock().push(record.clone());
    Json(record).into_response()
}

async fn list_documents(State(state): State<Arc<PortalState>>) -> Json<Vec<DocumentRecord>> {
    Json(state.documents.lock().clone())
}

async fn request_events(
    State(state): State<Arc<PortalState>>,
    Path(request_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let Some(bearer) = bearer else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    *state.seen_bearer.lock() = Some(bearer);

    let payloads = state
        .events
        .lock()
        .get(&request_id)
        .cloned()
        .unwrap_or_default();
    let stream = futures::stream::iter(
        payloads
            .into_iter()
            .map(|data| Ok::<Event, Infallible>(Event::default().data(data))),
    );
    Sse::new(stream).into_response()
}
