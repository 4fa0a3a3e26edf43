//! Runbook listing and content models.

use serde::{Deserialize, Serialize};

/// Identifies a runbook known to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookInfo {
    /// File name, used as the key in every per-runbook endpoint.
    pub filename: String,
    /// Human-readable name.
    pub name: String,
    /// Path of the runbook on the backend host.
    pub path: String,
}

/// Body of `GET /runbooks`.
///
/// The backend answers either with a bare array or with the
/// `{success, runbooks}` envelope; both decode to the same list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RunbookListBody")]
pub struct RunbookList {
    pub success: bool,
    pub runbooks: Vec<RunbookInfo>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RunbookListBody {
    Bare(Vec<RunbookInfo>),
    Envelope {
        #[serde(default = "default_success")]
        success: bool,
        #[serde(default)]
        runbooks: Vec<RunbookInfo>,
    },
}

const fn default_success() -> bool {
    true
}

impl From<RunbookListBody> for RunbookList {
    fn from(body: RunbookListBody) -> Self {
        match body {
            RunbookListBody::Bare(runbooks) => Self {
                success: true,
                runbooks,
            },
            RunbookListBody::Envelope { success, runbooks } => Self { success, runbooks },
        }
    }
}

/// Body of `GET /runbooks/{filename}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunbookContent {
    pub success: bool,
    pub filename: String,
    pub name: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_accepts_bare_array() {
        let list: RunbookList = serde_json::from_str(
            r#"[{"filename":"a.md","name":"A","path":"/runbooks/a.md"}]"#,
        )
        .unwrap();
        assert!(list.success);
        assert_eq!(list.runbooks.len(), 1);
        assert_eq!(list.runbooks[0].filename, "a.md");
    }

    #[test]
    fn test_list_accepts_envelope() {
        let list: RunbookList = serde_json::from_str(
            r#"{"success":true,"runbooks":[{"filename":"b.md","name":"B","path":"/b.md"}]}"#,
        )
        .unwrap();
        assert_eq!(list.runbooks[0].name, "B");
    }
}
