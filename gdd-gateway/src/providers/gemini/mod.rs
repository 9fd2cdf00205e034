//! Google Gemini API integration.

pub mod client;

pub use client::GeminiClient;
