//! Hearth Engine Library
//!
//! This library provides the core functionality of the Hearth service.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Completion client abstraction layer
pub mod llm;

/// Prompt assembly module
pub mod prompt;

/// Journal entries and single-call journal actions
pub mod journal;

/// Research team orchestration module
pub mod team;

/// Checkpoint scheduling module
pub mod checkpoint;

/// Inbound HTTP API module
pub mod api;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
