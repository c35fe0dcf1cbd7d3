//! Typed error enum for the `openapi-transform` library API.
//!
//! Library consumers can match on specific variants. The CLI (`main.rs`)
//! converts these to `anyhow::Error` at the binary boundary for richer
//! context messages.

/// Errors produced by `openapi-transform` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failure (reading config or spec files, writing outputs).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing or serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An external program could not be started.
    ///
    /// Usually means the tool is not installed or not on `PATH`.
    #[error("failed to run `{program}`: {source}; is it installed and on PATH?")]
    CommandSpawn {
        /// Program name (e.g. `gh`).
        program: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        /// Full command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// HTTP transport failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A download returned a non-success status.
    #[error("failed to download {url}: HTTP {status}")]
    Download {
        /// Requested URL.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
    },

    /// Release metadata returned by an external tool could not be decoded.
    #[error("malformed release metadata for {repo}: {message}")]
    ReleaseMetadata {
        /// Repository identifier (`owner/name`).
        repo: String,
        /// Decoder message.
        message: String,
    },
}

impl Error {
    /// Whether this is a failed command whose stderr contains `needle`.
    ///
    /// Used to tell "not found" results apart from real tool failures.
    #[must_use]
    pub fn command_stderr_contains(&self, needle: &str) -> bool {
        matches!(self, Self::Command { stderr, .. } if stderr.contains(needle))
    }
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;
