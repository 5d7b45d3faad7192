//! Finds the merge commits whose parents were recorded in reversed order.
//!
//! Two interchangeable strategies produce the same identifier set:
//! - [`IndexLocator`] — filters a complete commit index in memory.
//! - [`ScanLocator`] — runs `git log --merges --fixed-strings --grep` and
//!   re-checks each hit.
//!
//! [`locate_incorrect_commits`] picks the index when it covers the root and
//! falls back to scanning otherwise.

use std::collections::HashSet;
use std::time::Instant;

use tracing::info;

use crate::config::FixConfig;
use crate::error::FixerError;
use crate::git::index::IndexDataGetter;
use crate::git::{append_text_filter_params, LogReader, LOG_ALL};
use crate::pattern::{self, MergeRemoteFilter, TextFilter, MERGE_REMOTE_TEXT};
use crate::{CommitHash, RepoRoot};

/// A source of flagged merge commits for one repository root.
pub trait IncorrectCommitSource {
    fn locate(&self, root: &RepoRoot) -> Result<HashSet<CommitHash>, FixerError>;
}

// ─── Index strategy ─────────────────────────────────────────────────

/// Locates flagged merges with a commit index that covers the root.
pub struct IndexLocator<'a> {
    index: &'a dyn IndexDataGetter,
}

impl<'a> IndexLocator<'a> {
    pub fn new(index: &'a dyn IndexDataGetter) -> Self {
        Self { index }
    }
}

impl IncorrectCommitSource for IndexLocator<'_> {
    fn locate(&self, root: &RepoRoot) -> Result<HashSet<CommitHash>, FixerError> {
        let start = Instant::now();
        let filter = MergeRemoteFilter;

        let result: HashSet<CommitHash> = self
            .index
            .filter(&[&filter as &dyn TextFilter])
            .into_iter()
            .filter(|&key| self.index.parents(key).is_some_and(|p| p.len() > 1))
            .filter_map(|key| self.index.commit_id(key))
            .filter(|id| id.root == root)
            .map(|id| id.hash)
            .collect();

        info!(
            root = %root.name(),
            count = result.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Located incorrect merges from index"
        );
        Ok(result)
    }
}

// ─── Scan strategy ──────────────────────────────────────────────────

/// Locates flagged merges by scanning the log.
pub struct ScanLocator<'a> {
    reader: &'a dyn LogReader,
}

impl<'a> ScanLocator<'a> {
    pub fn new(reader: &'a dyn LogReader) -> Self {
        Self { reader }
    }
}

/// `git log` parameters for the scan: all refs, merges only, and a literal
/// `Merge remote` grep.
///
/// git's grep ends lines only at `\n` while [`pattern::matches`] also splits at
/// `\r` and the Unicode line separators, so the structural pattern cannot be
/// handed to git without losing matches. Every accepted message contains the
/// literal text on one `\n`-line, so this narrows the stream without dropping
/// any candidate.
pub fn scan_params() -> Vec<String> {
    let mut params: Vec<String> = LOG_ALL.iter().map(|s| s.to_string()).collect();
    params.push("--merges".to_string());
    append_text_filter_params(MERGE_REMOTE_TEXT, false, true, &mut params);
    params
}

impl IncorrectCommitSource for ScanLocator<'_> {
    fn locate(&self, root: &RepoRoot) -> Result<HashSet<CommitHash>, FixerError> {
        let start = Instant::now();
        let mut result = HashSet::new();

        // The literal grep only narrows the stream; the in-process matcher decides.
        self.reader.read_commits(root, &scan_params(), &mut |commit| {
            if commit.parents.len() > 1 && pattern::matches(&commit.message) {
                result.insert(commit.id);
            }
        })?;

        info!(
            root = %root.name(),
            count = result.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Located incorrect merges from git"
        );
        Ok(result)
    }
}

// ─── Strategy selection ─────────────────────────────────────────────

/// Flagged merges for `root`, or an empty set when the fix is switched off.
///
/// Uses `index` when it reports `root` as fully indexed; scans with `reader`
/// otherwise. With the fix disabled neither source is touched.
pub fn locate_incorrect_commits(
    config: &FixConfig,
    index: Option<&dyn IndexDataGetter>,
    reader: &dyn LogReader,
    root: &RepoRoot,
) -> Result<HashSet<CommitHash>, FixerError> {
    if !config.is_enabled() {
        return Ok(HashSet::new());
    }
    match index {
        Some(index) if index.is_indexed(root) => IndexLocator::new(index).locate(root),
        _ => ScanLocator::new(reader).locate(root),
    }
}
