//! Safe installation of repository-local commit-documentation git hooks.
//!
//! The library API is not stable; it exists to let `main.rs` stay a thin
//! wiring layer and to let integration tests drive the installer directly.

pub mod auth;
pub mod branch;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod installer;
pub mod manifest;
pub mod path;
pub mod plan;
pub mod pr;
pub mod styling;
pub mod tracker;
pub mod utils;
pub mod validator;
pub mod vcs;

pub use error::{exit_code, render, InstallError};
pub use installer::{render_outcome, InstallOutcome, Installer};
