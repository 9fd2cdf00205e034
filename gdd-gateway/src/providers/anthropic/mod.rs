//! Anthropic Messages API integration.

pub mod client;

pub use client::AnthropicClient;
