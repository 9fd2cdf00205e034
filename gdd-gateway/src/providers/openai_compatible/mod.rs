//! OpenAI Chat Completions dialect (OpenAI, xAI, Groq and custom endpoints).

pub mod client;

pub use client::OpenAiCompatibleClient;
