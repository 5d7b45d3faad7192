//! Recognizes the merge messages whose parents the Bek ordering reverses.
//!
//! The affected shape is a merge of a remote-tracking branch back into the
//! branch of the same short name:
//!
//! ```text
//! Merge remote-tracking branch 'origin/feature'
//! Merge remote-tracking branch 'origin/feature' into feature
//! Merge remote branch 'upstream/topic' into topic
//! ```
//!
//! As a regular expression this is [`MERGE_REMOTE_REGEX`], whose `\2` is a
//! backreference. The `regex` crate has no backreferences, so the line prefix is
//! matched with a regex and the `<path>/<name>` / `into <name>` split is decided
//! in code, exploring every split the backtracking engine would.

use std::sync::LazyLock;

use regex::Regex;

/// POSIX extended form of the pattern. [`matches`] implements it with lines
/// ending at any Unicode line terminator, which git's grep does not, so it is
/// never passed to `git log`.
pub const MERGE_REMOTE_REGEX: &str = r"^Merge remote(-tracking)? branch '.*/(.*)'( into \2)?$";

/// Literal text every matching message contains on a single `\n`-line; the
/// scan locator's git pre-filter.
pub const MERGE_REMOTE_TEXT: &str = "Merge remote";

static MERGE_REMOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge remote(?:-tracking)? branch '(.*)$").expect("merge-remote line regex is valid")
});

/// Line terminators recognized when splitting a message into lines.
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// True when any line of `message` is a merge of `<path>/<name>` with either no
/// `into` clause or `into <name>`. Case-sensitive.
#[must_use]
pub fn matches(message: &str) -> bool {
    message.split(is_line_break).any(matches_line)
}

fn matches_line(line: &str) -> bool {
    let Some(rest) = MERGE_REMOTE_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return false;
    };

    // '<path>/<name>'
    if let Some(quoted) = rest.strip_suffix('\'') {
        if quoted.contains('/') {
            return true;
        }
    }

    // '<path>/<name>' into <name>
    const INTO: &str = "' into ";
    rest.match_indices(INTO).any(|(at, _)| {
        let name = &rest[at + INTO.len()..];
        rest[..at]
            .strip_suffix(name)
            .is_some_and(|path| path.ends_with('/'))
    })
}

// ─── Text filters ───────────────────────────────────────────────────

/// A message filter a commit index can evaluate.
///
/// `text` is a hint the index may use to narrow candidates before calling
/// [`TextFilter::matches`]; `matches` alone decides membership.
pub trait TextFilter {
    fn text(&self) -> &str;
    fn is_regex(&self) -> bool;
    fn matches_case(&self) -> bool;
    fn matches(&self, message: &str) -> bool;

    /// Cheap literal check against [`TextFilter::text`]. Always passes for
    /// regex filters.
    fn may_match(&self, message: &str) -> bool {
        if self.is_regex() {
            return true;
        }
        if self.matches_case() {
            message.contains(self.text())
        } else {
            message.to_lowercase().contains(&self.text().to_lowercase())
        }
    }
}

/// The merge-remote pattern as an index filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeRemoteFilter;

impl TextFilter for MergeRemoteFilter {
    fn text(&self) -> &str {
        MERGE_REMOTE_TEXT
    }

    fn is_regex(&self) -> bool {
        false
    }

    fn matches_case(&self) -> bool {
        true
    }

    fn matches(&self, message: &str) -> bool {
        matches(message)
    }
}
