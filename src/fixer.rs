//! Read-time parent-order correction.
//!
//! [`ParentFixer`] is prepared once per repository root and then applied to
//! every commit read from that root. [`fix_commits`] is the stateless variant
//! for a batch that is already in memory.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::FixConfig;
use crate::git::index::IndexDataGetter;
use crate::git::LogReader;
use crate::locator::locate_incorrect_commits;
use crate::pattern;
use crate::{CommitHash, CommitMetadata, RepoRoot, VcsCommit};

/// Flagged merges of one root, ready to correct commits as they are read.
///
/// The set is built before the fixer is returned and never changes after, so a
/// shared reference can be used from any number of threads.
#[derive(Clone, Debug, Default)]
pub struct ParentFixer {
    incorrect: HashSet<CommitHash>,
}

impl ParentFixer {
    /// Locate the flagged merges of `root`.
    ///
    /// Never fails: a disabled config yields an empty fixer without touching
    /// any source, and a locator error is logged and also yields an empty
    /// fixer, so history stays readable with the original parent order.
    pub fn prepare(
        config: &FixConfig,
        index: Option<&dyn IndexDataGetter>,
        reader: &dyn LogReader,
        root: &RepoRoot,
    ) -> Self {
        if !config.is_enabled() {
            debug!(root = %root.name(), "Merge parent fix disabled");
            return Self::empty();
        }
        match locate_incorrect_commits(config, index, reader, root) {
            Ok(incorrect) => Self { incorrect },
            Err(e) => {
                warn!(root = %root, error = %e, "Could not find incorrect merges, leaving parents as recorded");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_commits(incorrect: impl IntoIterator<Item = CommitHash>) -> Self {
        Self {
            incorrect: incorrect.into_iter().collect(),
        }
    }

    /// Returns `commit` unchanged unless it is flagged, in which case its
    /// parent list comes back reversed.
    ///
    /// Applying this twice to the same commit restores the original order.
    pub fn fix_commit<C: VcsCommit>(&self, mut commit: C) -> C {
        if self.incorrect.contains(commit.id()) {
            commit.parents_mut().reverse();
        }
        commit
    }

    pub fn contains(&self, hash: &CommitHash) -> bool {
        self.incorrect.contains(hash)
    }

    pub fn incorrect_commits(&self) -> &HashSet<CommitHash> {
        &self.incorrect
    }

    pub fn len(&self) -> usize {
        self.incorrect.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incorrect.is_empty()
    }
}

/// Correct a batch in one pass, deciding per commit from its message.
///
/// Order and length are preserved. Commits with fewer than two parents are
/// passed through before any message matching.
pub fn fix_commits(config: &FixConfig, commits: Vec<CommitMetadata>) -> Vec<CommitMetadata> {
    if !config.is_enabled() {
        return commits;
    }
    commits
        .into_iter()
        .map(|mut commit| {
            if commit.is_merge() && pattern::matches(&commit.message) {
                commit.parents.reverse();
            }
            commit
        })
        .collect()
}
