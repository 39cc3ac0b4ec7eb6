//! # Siege Development Tools
//!
//! Command-line tools for development:
//! - Data validators
//! - Overlay dumps for inspecting searches on a saved board

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod overlay;
pub mod validate;

pub use error::{Result, ToolError};
