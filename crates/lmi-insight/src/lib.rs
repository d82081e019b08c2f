//! Gemini `generateContent` client used for optional market commentary.

pub mod client;
pub mod error;
pub mod types;

pub use client::GeminiClient;
pub use error::InsightError;
