//! Execute, validate and required-environment models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request body shared by execute and validate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarsRequest {
    /// Environment-variable overrides, name to value.
    pub env_vars: BTreeMap<String, String>,
}

impl EnvVarsRequest {
    pub const fn new(env_vars: BTreeMap<String, String>) -> Self {
        Self { env_vars }
    }
}

/// Outcome of `POST /runbooks/{filename}/execute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteResponse {
    pub success: bool,
    pub runbook: String,
    pub return_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Link to the execution record in the viewer, when the backend has one.
    pub viewer_link: Option<String>,
}

/// Outcome of `PATCH /runbooks/{filename}/validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateResponse {
    pub success: bool,
    pub runbook: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// A single environment variable a runbook declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVarInfo {
    pub name: String,
    pub description: String,
}

/// Body of `GET /runbooks/{filename}/required-env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredEnv {
    /// Every variable the runbook declares.
    pub required: Vec<EnvVarInfo>,
    /// Declared variables the backend already has values for.
    pub available: Vec<EnvVarInfo>,
    /// Declared variables with no value yet.
    pub missing: Vec<EnvVarInfo>,
}
