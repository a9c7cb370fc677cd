//! Clients for external services.

pub mod completion;

pub use completion::{CompletionClient, CompletionError, Summarizer, FALLBACK_SUMMARY};
