//! Video Job Gateway
//!
//! Accepts video creation requests over HTTP, claim-checks their attachments
//! into S3-compatible object storage, publishes jobs to a Redis stream for the
//! worker pool, and correlates worker results back to the polling caller.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
