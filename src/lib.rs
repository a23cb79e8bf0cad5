//! tasksync - Task Synchronization Library
//!
//! This library keeps a client-side copy of a user's tasks in step with a
//! task REST API, applying some changes optimistically and rolling them back
//! when the server refuses.
//!
//! # Core Concepts
//!
//! - **Task store**: ordered local collection with optimistic toggle/reorder
//! - **Gateway**: the async API contract the store talks through
//! - **Ordering**: ascending `order`, then oldest first
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `tasksync.toml`
//! - `error`: Error types and result aliases
//! - `gateway`: Gateway trait and API envelope types
//! - `http`: reqwest-backed gateway
//! - `output`: Human and JSON output formatting
//! - `store`: Task synchronization store
//! - `task`: Task records, request bodies and ordering

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod output;
pub mod store;
pub mod task;

pub use error::{Error, Result};
pub use store::TaskStore;
