//! Commit index — compact in-memory commit metadata for several repository roots.
//!
//! Replaces a `git log --merges --grep` scan with an in-memory pass over the
//! indexed messages. A root counts as indexed only once its whole log has been
//! streamed in; a root whose build failed stays registered but reports
//! `is_indexed == false`, so callers fall back to scanning it.
//!
//! ## Module isolation
//!
//! Depends on `serde` and the storage helpers only. Git access goes through the
//! [`LogReader`] trait.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{LogReader, LOG_ALL};
use crate::error::FixerError;
use crate::pattern::TextFilter;
use crate::storage::{index_path_for, load_compressed, save_compressed};
use crate::{CommitHash, CommitMetadata, RepoRoot};

// ─── Constants ──────────────────────────────────────────────────────

/// Index format version. Bump when struct layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

// ─── Core types ─────────────────────────────────────────────────────

/// One indexed commit. The position in [`CommitIndex::commits`] is its key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedCommit {
    pub hash: CommitHash,
    pub parents: Vec<CommitHash>,
    /// Commit time, seconds since epoch.
    pub timestamp: i64,
    /// Offset into [`CommitIndex::messages`].
    pub message_offset: u32,
    pub message_len: u32,
    /// Index into [`CommitIndex::roots`].
    pub root_idx: u16,
}

/// A registered repository root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedRoot {
    pub root: RepoRoot,
    /// True once the full log of this root was streamed in.
    pub complete: bool,
    /// Seconds since epoch when indexing finished.
    pub indexed_at: u64,
}

/// Multi-root commit index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitIndex {
    /// Mismatch on load → rebuild.
    pub format_version: u32,
    pub roots: Vec<IndexedRoot>,
    pub commits: Vec<IndexedCommit>,
    /// Message pool — all full commit messages concatenated.
    pub messages: String,
}

/// A commit key resolved to its root and hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitId<'a> {
    pub root: &'a RepoRoot,
    pub hash: CommitHash,
}

/// Read access a locator needs from a commit index.
pub trait IndexDataGetter {
    /// Keys of commits whose message passes every filter.
    fn filter(&self, filters: &[&dyn TextFilter]) -> Vec<u32>;

    /// Root and hash for a key, `None` for unknown keys.
    fn commit_id(&self, key: u32) -> Option<CommitId<'_>>;

    /// Parents of the commit behind `key`, in stored order.
    fn parents(&self, key: u32) -> Option<&[CommitHash]>;

    /// True when `root` was indexed completely.
    fn is_indexed(&self, root: &RepoRoot) -> bool;
}

impl Default for CommitIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(std::time::Duration::ZERO)
        .as_secs()
}

impl CommitIndex {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            roots: Vec::new(),
            commits: Vec::new(),
            messages: String::new(),
        }
    }

    /// Index every root in `roots` through `reader`.
    ///
    /// A root that fails to index is logged and left incomplete.
    pub fn build(roots: &[RepoRoot], reader: &dyn LogReader) -> Self {
        let mut index = Self::new();
        for root in roots {
            if let Err(e) = index.index_root(root, reader) {
                warn!(root = %root.name(), error = %e, "Could not index root");
            }
        }
        index
    }

    /// Stream the full log of `root` into the index.
    ///
    /// Re-indexing a root that is already complete is a no-op. On error the
    /// partially added commits are dropped and the root stays incomplete.
    pub fn index_root(&mut self, root: &RepoRoot, reader: &dyn LogReader) -> Result<usize, FixerError> {
        let root_idx = self.register_root(root)?;
        if self.roots[root_idx as usize].complete {
            return Ok(0);
        }

        let start = Instant::now();
        let commits_mark = self.commits.len();
        let messages_mark = self.messages.len();

        let params: Vec<String> = LOG_ALL.iter().map(|s| s.to_string()).collect();
        let mut added = 0usize;
        let mut overflow = None;
        let result = reader.read_commits(root, &params, &mut |commit| {
            if overflow.is_some() {
                return;
            }
            match self.push_commit(root_idx, commit) {
                Ok(()) => added += 1,
                Err(e) => overflow = Some(e),
            }
        });

        let result = match overflow {
            Some(e) => Err(e),
            None => result,
        };
        if let Err(e) = result {
            self.commits.truncate(commits_mark);
            self.messages.truncate(messages_mark);
            return Err(e);
        }

        let entry = &mut self.roots[root_idx as usize];
        entry.complete = true;
        entry.indexed_at = now_secs();

        info!(
            root = %root.name(),
            commits = added,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Indexed commits"
        );
        Ok(added)
    }

    /// Add one commit for `root`, registering the root if needed.
    ///
    /// For callers that feed commits from their own walk; they finish with
    /// [`CommitIndex::mark_complete`].
    pub fn add_commit(&mut self, root: &RepoRoot, commit: CommitMetadata) -> Result<(), FixerError> {
        let root_idx = self.register_root(root)?;
        self.push_commit(root_idx, commit)
    }

    /// Mark `root` as fully indexed.
    pub fn mark_complete(&mut self, root: &RepoRoot) -> Result<(), FixerError> {
        let root_idx = self.register_root(root)?;
        let entry = &mut self.roots[root_idx as usize];
        entry.complete = true;
        entry.indexed_at = now_secs();
        Ok(())
    }

    fn register_root(&mut self, root: &RepoRoot) -> Result<u16, FixerError> {
        if let Some(pos) = self.roots.iter().position(|r| &r.root == root) {
            return Ok(pos as u16);
        }
        if self.roots.len() >= u16::MAX as usize {
            return Err(FixerError::IndexCapacity(format!(
                "too many roots, cannot add {}",
                root
            )));
        }
        self.roots.push(IndexedRoot {
            root: root.clone(),
            complete: false,
            indexed_at: 0,
        });
        Ok((self.roots.len() - 1) as u16)
    }

    fn push_commit(&mut self, root_idx: u16, commit: CommitMetadata) -> Result<(), FixerError> {
        if self.commits.len() >= u32::MAX as usize || self.messages.len() + commit.message.len() > u32::MAX as usize {
            return Err(FixerError::IndexCapacity(format!(
                "more commits than u32 keys while indexing {}",
                self.roots[root_idx as usize].root
            )));
        }
        let message_offset = self.messages.len() as u32;
        self.messages.push_str(&commit.message);
        self.commits.push(IndexedCommit {
            hash: commit.id,
            parents: commit.parents,
            timestamp: commit.commit_time,
            message_offset,
            message_len: commit.message.len() as u32,
            root_idx,
        });
        Ok(())
    }

    /// Message of the commit behind `key`.
    pub fn message(&self, key: u32) -> Option<&str> {
        let commit = self.commits.get(key as usize)?;
        let start = commit.message_offset as usize;
        self.messages.get(start..start + commit.message_len as usize)
    }

    /// Number of commits indexed for `root`.
    pub fn commit_count(&self, root: &RepoRoot) -> usize {
        match self.roots.iter().position(|r| &r.root == root) {
            Some(pos) => self.commits.iter().filter(|c| c.root_idx as usize == pos).count(),
            None => 0,
        }
    }
}

impl IndexDataGetter for CommitIndex {
    fn filter(&self, filters: &[&dyn TextFilter]) -> Vec<u32> {
        (0..self.commits.len() as u32)
            .filter(|&key| {
                let Some(message) = self.message(key) else {
                    return false;
                };
                filters
                    .iter()
                    .all(|f| f.may_match(message) && f.matches(message))
            })
            .collect()
    }

    fn commit_id(&self, key: u32) -> Option<CommitId<'_>> {
        let commit = self.commits.get(key as usize)?;
        let root = &self.roots.get(commit.root_idx as usize)?.root;
        Some(CommitId { root, hash: commit.hash })
    }

    fn parents(&self, key: u32) -> Option<&[CommitHash]> {
        self.commits.get(key as usize).map(|c| c.parents.as_slice())
    }

    fn is_indexed(&self, root: &RepoRoot) -> bool {
        self.roots.iter().any(|r| &r.root == root && r.complete)
    }
}

// ─── Persistence ────────────────────────────────────────────────────

impl CommitIndex {
    /// Save with bincode + LZ4. Atomic: write to a temp file, then rename.
    pub fn save_to_disk(&self, path: &Path) -> Result<(), FixerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        save_compressed(&tmp_path, self, "commit-index")?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load an index saved by [`CommitIndex::save_to_disk`].
    /// Any error (missing, corrupt, wrong version) means "no index".
    pub fn load_from_disk(path: &Path) -> Result<Self, FixerError> {
        let index: Self = load_compressed(path, "commit-index")?;

        if index.format_version != FORMAT_VERSION {
            return Err(FixerError::IndexLoad {
                path: path.display().to_string(),
                message: format!(
                    "format version mismatch: file has {}, expected {}",
                    index.format_version, FORMAT_VERSION
                ),
            });
        }

        Ok(index)
    }

    /// Load the saved index for `root` from `index_base`, if there is a usable one.
    pub fn load_for_root(root: &RepoRoot, index_base: &Path) -> Option<Self> {
        let path = index_path_for(root, index_base);
        if !path.exists() {
            return None;
        }
        match Self::load_from_disk(&path) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(root = %root.name(), error = %e, "Ignoring unusable commit index");
                None
            }
        }
    }
}
