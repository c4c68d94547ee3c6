//! Shared test utilities for virex integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated job execution with temp directories
//! - `ScriptedTransport` for injecting per-attempt network outcomes
//! - `RecordingObserver` for asserting on job transitions

pub mod harness;
pub mod transport;

pub use harness::{RecordingObserver, TestHarness};
pub use transport::{ScriptedTransport, Step};
