//! A log-reading session: one prepared [`ParentFixer`] per repository root,
//! applied to everything read through the session.

use std::collections::HashMap;

use tracing::debug;

use crate::config::FixConfig;
use crate::error::FixerError;
use crate::fixer::ParentFixer;
use crate::git::index::{CommitIndex, IndexDataGetter};
use crate::git::LogReader;
use crate::{CommitMetadata, RepoRoot, TimedCommit};

pub struct LogSession<R: LogReader> {
    config: FixConfig,
    index: Option<CommitIndex>,
    reader: R,
    fixers: HashMap<RepoRoot, ParentFixer>,
}

impl<R: LogReader> LogSession<R> {
    pub fn new(config: FixConfig, reader: R) -> Self {
        Self {
            config,
            index: None,
            reader,
            fixers: HashMap::new(),
        }
    }

    pub fn with_index(mut self, index: CommitIndex) -> Self {
        self.set_index(Some(index));
        self
    }

    /// Replace the index. Cached fixers were computed from the old data
    /// source, so all of them are dropped.
    pub fn set_index(&mut self, index: Option<CommitIndex>) {
        self.index = index;
        self.fixers.clear();
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// The fixer for `root`, prepared on first use.
    pub fn fixer_for(&mut self, root: &RepoRoot) -> &ParentFixer {
        if !self.fixers.contains_key(root) {
            let index = self.index.as_ref().map(|i| i as &dyn IndexDataGetter);
            let fixer = ParentFixer::prepare(&self.config, index, &self.reader, root);
            debug!(root = %root.name(), flagged = fixer.len(), "Prepared merge parent fixer");
            self.fixers.insert(root.clone(), fixer);
        }
        &self.fixers[root]
    }

    /// Read [`TimedCommit`]s for `root` with merge parents corrected.
    pub fn read_commits(&mut self, root: &RepoRoot, params: &[String]) -> Result<Vec<TimedCommit>, FixerError> {
        self.fixer_for(root);
        let fixer = &self.fixers[root];
        let mut commits = Vec::new();
        self.reader
            .read_timed_commits(root, params, &mut |commit| commits.push(fixer.fix_commit(commit)))?;
        Ok(commits)
    }

    /// Read full [`CommitMetadata`] for `root` with merge parents corrected.
    pub fn read_metadata(&mut self, root: &RepoRoot, params: &[String]) -> Result<Vec<CommitMetadata>, FixerError> {
        self.fixer_for(root);
        let fixer = &self.fixers[root];
        let mut commits = Vec::new();
        self.reader
            .read_commits(root, params, &mut |commit| commits.push(fixer.fix_commit(commit)))?;
        Ok(commits)
    }

    /// Forget the cached fixer for `root`; the next read prepares a new one.
    pub fn invalidate(&mut self, root: &RepoRoot) {
        self.fixers.remove(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{commit, hash, root, MemoryRepo};

    fn repo(r: &RepoRoot) -> MemoryRepo {
        MemoryRepo::new().with_commits(
            r,
            vec![
                commit(3, &[2, 9], "Merge remote-tracking branch 'origin/main'"),
                commit(2, &[1], "work"),
                commit(1, &[], "root"),
            ],
        )
    }

    #[test]
    fn test_read_commits_applies_fix() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::default(), repo(&r));
        let commits = session.read_commits(&r, &[]).unwrap();

        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].parents, vec![hash(9), hash(2)]);
        assert_eq!(commits[1].parents, vec![hash(1)]);
        assert_eq!(commits[0].timestamp, 1_700_000_103);
    }

    #[test]
    fn test_read_metadata_applies_fix() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::default(), repo(&r));
        let commits = session.read_metadata(&r, &[]).unwrap();
        assert_eq!(commits[0].parents, vec![hash(9), hash(2)]);
        assert_eq!(commits[0].message, "Merge remote-tracking branch 'origin/main'");
    }

    #[test]
    fn test_fixer_prepared_once_per_root() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::default(), repo(&r));
        session.read_commits(&r, &[]).unwrap();
        session.read_commits(&r, &[]).unwrap();
        // one locate scan, two reads
        assert_eq!(session.reader().calls(), 3);
    }

    #[test]
    fn test_invalidate_reprepares() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::default(), repo(&r));
        assert_eq!(session.fixer_for(&r).len(), 1);
        session.invalidate(&r);
        assert_eq!(session.fixer_for(&r).len(), 1);
        assert_eq!(session.reader().calls(), 2);
    }

    #[test]
    fn test_index_used_and_replacing_it_clears_cache() {
        let r = root("app");
        let source = repo(&r);
        let index = CommitIndex::build(&[r.clone()], &source);

        let mut session = LogSession::new(FixConfig::default(), repo(&r)).with_index(index);
        assert!(session.fixer_for(&r).contains(&hash(3)));
        assert_eq!(session.reader().calls(), 0);

        session.set_index(None);
        assert!(session.fixer_for(&r).contains(&hash(3)));
        assert_eq!(session.reader().calls(), 1);
    }

    #[test]
    fn test_disabled_session_passes_through() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::disabled(), repo(&r));
        let commits = session.read_commits(&r, &[]).unwrap();
        assert_eq!(commits[0].parents, vec![hash(2), hash(9)]);
        assert_eq!(session.reader().calls(), 1);
    }

    #[test]
    fn test_read_error_propagates_but_prepare_does_not() {
        let r = root("app");
        let mut session = LogSession::new(FixConfig::default(), MemoryRepo::failing());
        assert!(session.fixer_for(&r).is_empty());
        assert!(session.read_commits(&r, &[]).is_err());
    }
}
