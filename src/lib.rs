//! mailsweep — scheduled LLM triage for a noisy inbox.

pub mod classify;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod pipeline;
pub mod server;
