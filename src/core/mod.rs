//! Core types shared across the engine.
//!
//! - [`error`] - the [`TemplateError`] taxonomy used by the loader, resolver and
//!   expression parser

pub mod error;

pub use error::{TemplateError, TemplateResult};
