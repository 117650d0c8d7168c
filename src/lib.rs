//! Teller is a terminal-first chat client for a multi-specialist banking
//! assistant backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the chat session lifecycle: the message model, durable
//!   history persistence, the single-flight send/receive state machine,
//!   routing enrichment, and in-session search.
//! - [`api`] defines the backend wire payloads and the HTTP client.
//! - [`ui`] renders the full-screen transcript and runs the interactive
//!   event loop that drives input, search, and display updates.
//! - [`cli`] parses arguments and dispatches into the chat loop or the
//!   utility subcommands (agent directory, health, export, clear).
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
