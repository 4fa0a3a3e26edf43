//! Typed client for the runbook backend API.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
