//! chatops is a terminal console for chatting with an AI model through a
//! routing backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session state: namespaced preferences, the persisted
//!   conversation, provider resolution, the message dispatcher and the
//!   local model / health probes.
//! - [`api`] defines the backend payloads and the [`api::client::ChatBackend`]
//!   seam with its reqwest implementation.
//! - [`cli`] parses arguments and runs the interactive console and one-shot
//!   commands.
//! - [`utils`] holds URL helpers, transcript logging and tracing setup.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
