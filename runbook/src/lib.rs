//! Runbook console - a client for the runbook backend.
//!
//! Lists, views, validates and executes runbooks over the backend HTTP API.
//! Access to protected views is gated by a token-based session.
//!
//! Architecture:
//! - `session` owns the authentication state and persists it to disk
//! - `api` is the typed HTTP client; it attaches the token and clears the
//!   session when the backend answers 401
//! - `router` guards navigation to protected views
//! - `cli` wires the pieces together, one command per view or action

pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod router;
pub mod session;
