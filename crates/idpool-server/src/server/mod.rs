//! HTTP front end for the ID pool.
//!
//! - [`config`] - CLI/environment configuration.
//! - [`error`] - errors returned to clients.
//! - [`service`] - routes and handlers.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;
