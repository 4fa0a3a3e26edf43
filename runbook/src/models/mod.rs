//! Data models exchanged with the runbook backend.

mod auth;
mod error;
mod execution;
mod runbook;

pub use auth::{DevLoginRequest, LoginResponse};
pub use error::ErrorBody;
pub use execution::{EnvVarInfo, EnvVarsRequest, ExecuteResponse, RequiredEnv, ValidateResponse};
pub use runbook::{RunbookContent, RunbookInfo, RunbookList};
