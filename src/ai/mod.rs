//! Optional AI assistance through an OpenAI-compatible chat endpoint.

mod client;
pub mod prompt;

pub use client::{ChatClient, Message};
