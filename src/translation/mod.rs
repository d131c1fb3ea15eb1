//! # Translation Pipeline
//!
//! Everything between "text or audio in one language" and "text and audio in another":
//! - `languages`: the supported-language table and code normalization
//! - `cache`: bounded memoization of text translations
//! - `providers`: upstream adapter traits and their implementations
//! - `orchestrator`: the operations that chain the adapters together
//! - `types`: result types shared with the HTTP and WebSocket layers

pub mod cache;
pub mod languages;
pub mod orchestrator;
pub mod providers;
pub mod types;

pub use cache::TranslationCache;
pub use orchestrator::{Adapters, TranslationOrchestrator};
