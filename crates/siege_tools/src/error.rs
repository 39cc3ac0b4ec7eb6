//! Error types for the development tools.

use std::path::PathBuf;

use siege_core::error::GameError;
use siege_core::grid::Cell;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors reported by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The engine rejected the data.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Data parsed but failed the cross checks.
    #[error("{} problem(s) found: {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),

    /// Nothing stands on the requested cell.
    #[error("No unit at {0}")]
    NoUnit(Cell),
}

/// Read a whole file, naming it in the error.
pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}
