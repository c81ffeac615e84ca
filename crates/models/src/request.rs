use serde::{Deserialize, Serialize};

/// One message on an approval-request event stream.
///
/// Every field is optional: progress updates carry only `progress`,
/// terminal messages carry `status` (and `error` on failure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestEvent {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub status: Option<RequestEventStatus>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestEventStatus {
    Done,
    Approved,
    Failed,
}
