//! Pooch Palace — a small dog-adoption service.
//!
//! The service lists dogs, records adoptions, serves cat facts from an
//! unreliable upstream, and books pickup appointments for assistants over MCP.
//!
//! # Architecture
//!
//! - **Gate**: bounded concurrency with a bounded backlog, plus bounded
//!   retries of transient failures, around any async operation
//! - **Storage**: SQLite behind the [`dogs::repository::DogRepository`] trait
//! - **Transport**: REST over axum; the scheduler over MCP (stdio or `/mcp`)
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`gate`] — Admission and retry policy for guarded upstream calls
//! - [`error`] — Retryable/fatal classification and gate errors
//! - [`cats`] — Cat fact providers, the flaky adapter, and the guarded service
//! - [`dogs`] — Dog records, versioned listings, and the adoption workflow
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`scheduler`] — Pickup appointments
//! - [`server`] — Component assembly and the HTTP/MCP servers

pub mod cats;
pub mod config;
pub mod db;
pub mod dogs;
pub mod error;
pub mod gate;
pub mod scheduler;
pub mod server;
pub mod tools;
