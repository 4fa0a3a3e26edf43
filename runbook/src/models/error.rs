//! Backend error payload.

use serde::{Deserialize, Serialize};

/// Structured body the backend sends with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub error: String,
    pub success: bool,
    pub runbook: Option<String>,
}
