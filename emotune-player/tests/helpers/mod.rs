//! Test helper modules for emotune-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingBackend: audio backend that logs every resource call
//! - RecordingSink: UI sink that keeps every update

#![allow(dead_code)]

pub mod recording_backend;
pub mod recording_sink;

// Re-export commonly used types
pub use recording_backend::{Call, RecordingBackend};
pub use recording_sink::RecordingSink;
