//! Typed error enum for the `openapi-polymorph` library API.
//!
//! The engine itself never fails: malformed schemas become
//! [`Warning`](crate::Warning)s on the report. Errors only come from the
//! text boundary (reading, parsing, serializing documents and config files).
//! The CLI (`main.rs`) converts these to `anyhow::Error` at the binary
//! boundary for richer context messages.

/// Errors produced by `openapi-polymorph` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failure (reading config or document files).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON serialization failure.
    ///
    /// Happens when the document contains mapping keys that JSON cannot
    /// represent (e.g. sequences used as keys).
    #[error("failed to serialize document as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;
