//! # ReviewRota API Server Library
//!
//! HTTP layer over the reviewer assignment services in `reviewrota-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers
//! - `shutdown`: Graceful shutdown and request draining

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod shutdown;
