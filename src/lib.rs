//! # parentfix — merge-parent order correction for commit logs
//!
//! The Bek commit ordering records the parents of some two-parent merge commits
//! in reversed order: merges of a remote-tracking branch back into the branch of
//! the same short name come out with the second parent first. This crate finds
//! those merges and hands them to readers with the parent list flipped back to
//! first-parent order. Nothing in the repository is ever rewritten.
//!
//! ## Library usage
//!
//! ```no_run
//! use parentfix::{FixConfig, GitCli, ParentFixer, RepoRoot};
//!
//! let root = RepoRoot::new(".");
//! let fixer = ParentFixer::prepare(&FixConfig::default(), None, &GitCli::default(), &root);
//! println!("{} merges need their parents reversed", fixer.len());
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod fixer;
pub mod git;
pub mod locator;
pub mod pattern;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::FixConfig;
pub use error::FixerError;
pub use fixer::{fix_commits, ParentFixer};
pub use git::index::{CommitId, CommitIndex, IndexDataGetter};
pub use git::{GitCli, LogReader};
pub use locator::{locate_incorrect_commits, IncorrectCommitSource, IndexLocator, ScanLocator};
pub use pattern::{MergeRemoteFilter, TextFilter};
pub use session::LogSession;

// ─── Stable hashing ─────────────────────────────────────────────────

/// Stable FNV-1a hash (deterministic across Rust versions, unlike `DefaultHasher`).
///
/// Accepts multiple byte slices that are fed into the hash sequentially.
#[must_use]
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &byte in *part {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

// ─── Commit identifiers ──────────────────────────────────────────────

/// SHA-1 commit hash stored as raw bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitHash([u8; 20]);

impl CommitHash {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a 40-char hex SHA-1 string.
    pub fn from_hex(hex: &str) -> Result<Self, FixerError> {
        if hex.len() != 40 {
            return Err(FixerError::InvalidHash(format!(
                "'{}': length {} (expected 40)",
                hex,
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = hex
                .get(i * 2..i * 2 + 2)
                .ok_or_else(|| FixerError::InvalidHash(format!("'{}': not ASCII hex", hex)))?;
            *byte = u8::from_str_radix(pair, 16).map_err(|e| {
                FixerError::InvalidHash(format!("'{}': bad hex at position {}: {}", hex, i * 2, e))
            })?;
        }
        Ok(Self(bytes))
    }

    /// 40-char lowercase hex string.
    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(40);
        for b in &self.0 {
            hex.push_str(&format!("{:02x}", b));
        }
        hex
    }

    /// First 8 hex chars, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(8);
        hex
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitHash({})", self.short())
    }
}

impl FromStr for CommitHash {
    type Err = FixerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

// ─── Repository roots ────────────────────────────────────────────────

/// One repository root. Flagged-commit sets are always scoped to a single root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRoot(PathBuf);

impl RepoRoot {
    /// Canonicalizes the path when it exists; otherwise keeps it as given.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self(canonical)
    }

    /// Wrap a path without touching the filesystem.
    pub fn from_path_unchecked(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used in log messages and index file names.
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.to_string_lossy().into_owned())
    }
}

impl fmt::Display for RepoRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ─── Commit records ──────────────────────────────────────────────────

/// Accessors shared by every commit record a log reader can produce.
///
/// Parent order is the only field the fixer ever changes, so it is the only
/// mutable access exposed.
pub trait VcsCommit {
    fn id(&self) -> &CommitHash;
    fn parents(&self) -> &[CommitHash];
    fn parents_mut(&mut self) -> &mut Vec<CommitHash>;

    fn is_merge(&self) -> bool {
        self.parents().len() > 1
    }
}

/// Commit id, parents and commit timestamp: what graph layout needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedCommit {
    pub id: CommitHash,
    pub parents: Vec<CommitHash>,
    /// Commit time, seconds since epoch.
    pub timestamp: i64,
}

/// Full read-only view of a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    pub id: CommitHash,
    pub parents: Vec<CommitHash>,
    pub author_time: i64,
    pub commit_time: i64,
    pub author_name: String,
    pub author_email: String,
    /// Full message (subject and body).
    pub message: String,
}

impl CommitMetadata {
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

impl From<CommitMetadata> for TimedCommit {
    fn from(commit: CommitMetadata) -> Self {
        TimedCommit {
            id: commit.id,
            parents: commit.parents,
            timestamp: commit.commit_time,
        }
    }
}

impl VcsCommit for TimedCommit {
    fn id(&self) -> &CommitHash {
        &self.id
    }

    fn parents(&self) -> &[CommitHash] {
        &self.parents
    }

    fn parents_mut(&mut self) -> &mut Vec<CommitHash> {
        &mut self.parents
    }
}

impl VcsCommit for CommitMetadata {
    fn id(&self) -> &CommitHash {
        &self.id
    }

    fn parents(&self) -> &[CommitHash] {
        &self.parents
    }

    fn parents_mut(&mut self) -> &mut Vec<CommitHash> {
        &mut self.parents
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
