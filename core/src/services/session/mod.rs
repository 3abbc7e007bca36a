//! Session refresh module
//!
//! Refresh-token exchange with single-use enforcement and reuse
//! detection, logout, and the administrative key rotation entry point.

mod config;
mod controller;


pub use config::RefreshControllerConfig;
pub use controller::SessionRefreshController;
