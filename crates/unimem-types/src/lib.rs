//! Core types for the unified memory client.
//!
//! This crate defines the canonical memory model, both backends' native wire
//! schemas, per-call options, configuration and the error taxonomy. It
//! contains no I/O.

pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod options;
pub mod platform;

pub use error::{MemoryError, MemoryResult};
pub use memory::{MemorySource, MemoryState, Message, SourcedResult, UnifiedMemory};
