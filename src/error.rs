//! Unified error type for locating and correcting merge commits.

use thiserror::Error;

/// All errors that can occur while reading commit data.
///
/// None of these are fatal to a log reader: the fixer turns them into
/// "apply no correction".
#[derive(Error, Debug)]
pub enum FixerError {
    /// I/O error (pipe read, index file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The `git` executable could not be started
    #[error("Failed to execute '{command}': {source}. Is git installed and in PATH?")]
    GitSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// git ran but exited unsuccessfully
    #[error("git command failed: {command}\nstderr: {stderr}")]
    GitFailed { command: String, stderr: String },

    /// Not a 40-char hex SHA-1
    #[error("Invalid commit hash {0}")]
    InvalidHash(String),

    /// A git log record could not be parsed
    #[error("Malformed git log record: {0}")]
    MalformedRecord(String),

    /// Failed to load a commit index from disk
    #[error("Failed to load index from {path}: {message}")]
    IndexLoad { path: String, message: String },

    /// The commit index cannot hold more data
    #[error("Commit index capacity exceeded: {0}")]
    IndexCapacity(String),

    /// Failed to read or parse the settings file
    #[error("Invalid settings file {path}: {message}")]
    Settings { path: String, message: String },
}
