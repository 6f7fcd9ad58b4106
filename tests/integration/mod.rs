//! Integration test suite for tplforge
//!
//! End-to-end tests that resolve and render templates through the public
//! engine API, against both in-memory libraries and libraries on disk.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: fallback chain, validation, inheritance, caching
//! - **rendering**: the shipped template library rendered end to end
//! - **properties**: language-level guarantees (arithmetic, truthiness, loops)
//! - **config**: engine configuration from files and the environment

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod config;
mod properties;
mod rendering;
mod resolution;
