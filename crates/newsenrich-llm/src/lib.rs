//! newsenrich-llm - enrichment client
//!
//! Wraps the external inference service behind the [`Enricher`] trait: one
//! call in, one validated [`Payload`] or one typed [`EnrichmentError`] out.

pub mod client;
pub mod error;
pub mod payload;
pub mod prompt;

pub use client::{ChatConfig, ChatEnricher, Enricher, parse_completion};
pub use error::EnrichmentError;
pub use payload::{ContentType, Payload};
