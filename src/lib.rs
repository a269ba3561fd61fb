//! Infrastructure layer for the Manus agent backend.
//!
//! - [`config`]: environment-driven settings, cached per process
//! - [`llm`]: chat adapters (Gemini, OpenAI-compatible) and the provider factory
//! - [`storage`]: lazily-connected Redis client

pub mod config;
pub mod llm;
pub mod storage;
