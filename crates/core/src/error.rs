//! Error types for presentation generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning rows into a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No rows were supplied to a generation call.
    #[error("No spreadsheet rows found")]
    EmptyDatasetError,

    /// The background override image could not be retrieved or decoded.
    #[error("Background image error: {0}")]
    ImageFetchError(String),

    /// The gradient rasterization backend failed.
    ///
    /// Recovered inside the rasterizer; generation falls back to a solid fill.
    #[error("Rasterization error: {0}")]
    RasterizationError(String),

    /// The output document could not be assembled or written.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The input spreadsheet could not be read.
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    /// Generation was cancelled between two rows.
    #[error("Generation cancelled after {completed} slides")]
    CancelledError {
        /// Number of slides laid out before the cancel flag was observed.
        completed: usize,
    },
}
