//! Shared test utilities: an in-memory log reader and generators for
//! property-based testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use regex::{Regex, RegexBuilder};

use crate::error::FixerError;
use crate::git::LogReader;
use crate::{CommitHash, CommitMetadata, RepoRoot};

/// Deterministic hash for small test ids.
pub fn hash(n: u32) -> CommitHash {
    let mut bytes = [0xabu8; 20];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    CommitHash::from_bytes(bytes)
}

pub fn commit(id: u32, parents: &[u32], message: &str) -> CommitMetadata {
    CommitMetadata {
        id: hash(id),
        parents: parents.iter().map(|&p| hash(p)).collect(),
        author_time: 1_700_000_000 + id as i64,
        commit_time: 1_700_000_100 + id as i64,
        author_name: "Alice".to_string(),
        author_email: "alice@example.com".to_string(),
        message: message.to_string(),
    }
}

pub fn root(name: &str) -> RepoRoot {
    RepoRoot::from_path_unchecked(format!("/repos/{}", name))
}

// ─── In-memory repository ───────────────────────────────────────────

/// [`LogReader`] over fixed commit lists, understanding the subset of
/// `git log` parameters the locator and index use.
///
/// `--grep` follows git: the text is tried against each `\n`-separated line
/// of the message, literally with `--fixed-strings` or as a multi-line regex
/// with `--extended-regexp`. Patterns the `regex` crate cannot compile (such
/// as backreferences) fail the read.
#[derive(Default)]
pub struct MemoryRepo {
    logs: HashMap<RepoRoot, Vec<CommitMetadata>>,
    calls: AtomicUsize,
    failing: bool,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commits(mut self, root: &RepoRoot, commits: Vec<CommitMetadata>) -> Self {
        self.logs.insert(root.clone(), commits);
        self
    }

    /// Every read fails like a git process error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of `read_commits` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LogReader for MemoryRepo {
    fn read_commits(
        &self,
        root: &RepoRoot,
        params: &[String],
        consumer: &mut dyn FnMut(CommitMetadata),
    ) -> Result<(), FixerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(FixerError::GitFailed {
                command: "git log".to_string(),
                stderr: "fatal: simulated failure".to_string(),
            });
        }
        let Some(commits) = self.logs.get(root) else {
            return Err(FixerError::GitFailed {
                command: "git log".to_string(),
                stderr: format!("fatal: not a git repository: {}", root),
            });
        };

        let merges_only = params.iter().any(|p| p == "--merges");
        let grep = match GrepEmulation::from_params(params) {
            Ok(grep) => grep,
            Err(message) => {
                return Err(FixerError::GitFailed {
                    command: "git log".to_string(),
                    stderr: message,
                });
            }
        };

        for commit in commits {
            if merges_only && commit.parents.len() < 2 {
                continue;
            }
            if let Some(grep) = &grep {
                if !grep.matches(&commit.message) {
                    continue;
                }
            }
            consumer(commit.clone());
        }
        Ok(())
    }
}

/// git's `--grep` line semantics.
enum GrepEmulation {
    Fixed { text: String, ignore_case: bool },
    Extended(Regex),
}

impl GrepEmulation {
    fn from_params(params: &[String]) -> Result<Option<Self>, String> {
        let Some(text) = params.iter().find_map(|p| p.strip_prefix("--grep=")) else {
            return Ok(None);
        };
        let ignore_case = params.iter().any(|p| p == "--regexp-ignore-case");
        if params.iter().any(|p| p == "--fixed-strings") {
            return Ok(Some(Self::Fixed {
                text: text.to_string(),
                ignore_case,
            }));
        }
        RegexBuilder::new(text)
            .multi_line(true)
            .case_insensitive(ignore_case)
            .build()
            .map(|re| Some(Self::Extended(re)))
            .map_err(|e| format!("fatal: command line, '{}': {}", text, e))
    }

    fn matches(&self, message: &str) -> bool {
        match self {
            Self::Fixed { text, ignore_case: false } => message.split('\n').any(|line| line.contains(text.as_str())),
            Self::Fixed { text, ignore_case: true } => {
                let text = text.to_lowercase();
                message.split('\n').any(|line| line.to_lowercase().contains(&text))
            }
            Self::Extended(re) => re.is_match(message),
        }
    }
}

// ─── Generators ─────────────────────────────────────────────────────

/// Separators between subject and body, including the ones git does not
/// treat as line ends.
fn line_break() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("\n\n"),
        Just("\r\n"),
        Just("\r\n\r\n"),
        Just("\r"),
        Just("\u{2028}"),
        Just("\u{85}"),
    ]
}

/// Messages mixing affected merges, near misses and ordinary text.
pub fn arb_message() -> impl Strategy<Value = String> {
    prop_oneof![
        ("[a-z]{1,6}", "[a-z]{1,8}", any::<bool>(), any::<bool>()).prop_map(|(remote, name, tracking, into)| {
            let kind = if tracking { "remote-tracking" } else { "remote" };
            let mut msg = format!("Merge {} branch '{}/{}'", kind, remote, name);
            if into {
                msg.push_str(&format!(" into {}", name));
            }
            msg
        }),
        ("[a-z]{1,6}", "[a-z]{1,8}", "[a-z]{1,8}").prop_map(|(remote, name, target)| {
            format!("Merge remote-tracking branch '{}/{}' into {}", remote, name, target)
        }),
        "[a-z]{1,8}".prop_map(|name| format!("Merge remote-tracking branch '{}'", name)),
        "[a-z]{1,8}".prop_map(|name| format!("Merge branch '{}'", name)),
        "[a-zA-Z ]{0,30}",
    ]
    .prop_flat_map(|subject| {
        prop_oneof![
            Just(subject.clone()),
            (line_break(), "[a-z ]{0,20}")
                .prop_map(move |(sep, body)| format!("{}{}{}", subject, sep, body)),
        ]
    })
}

/// Commit list with ids `1..=n`, 0–3 parents each, and [`arb_message`] messages.
pub fn arb_commits(max: usize) -> impl Strategy<Value = Vec<CommitMetadata>> {
    prop::collection::vec((0usize..4, arb_message()), 0..max).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (parent_count, message))| {
                let id = i as u32 + 1;
                let parents: Vec<u32> = (0..parent_count as u32).map(|p| 100_000 + id * 4 + p).collect();
                commit(id, &parents, &message)
            })
            .collect()
    })
}
