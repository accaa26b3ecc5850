//! Oracle provider implementations

pub mod groq_provider;

pub use groq_provider::{GroqConfig, GroqProvider};
