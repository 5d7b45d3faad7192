//! Git log access — calls the `git` CLI and streams its output.
//!
//! This is the scan data source: [`LogReader`] delivers commits one at a time
//! through a callback, so a caller that only needs ids never holds the whole
//! log in memory. See `index.rs` for the pre-built commit index.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::FixerError;
use crate::{CommitHash, CommitMetadata, RepoRoot, TimedCommit};

pub mod index;

// ─── Log format ─────────────────────────────────────────────────────

/// Field separator in git log format — U+241E (SYMBOL FOR RECORD SEPARATOR).
/// Never appears in commit data.
const FIELD_SEP: &str = "␞";

/// Commit record prefix in git log output.
const COMMIT_PREFIX: &str = "COMMIT:";

/// Ref selection for "every commit reachable from anything".
pub const LOG_ALL: [&str; 4] = ["HEAD", "--branches", "--remotes", "--tags"];

/// `--format` value: hash, parents, author time, commit time, author, body.
/// Used with `-z`, so records are NUL-terminated and bodies may span lines.
fn log_format() -> String {
    format!(
        "{COMMIT_PREFIX}%H{FIELD_SEP}%P{FIELD_SEP}%at{FIELD_SEP}%ct{FIELD_SEP}%aN{FIELD_SEP}%aE{FIELD_SEP}%B"
    )
}

/// Append `git log` text filter flags.
///
/// `is_regex` selects POSIX extended syntax (needed for backreferences);
/// otherwise the text is matched literally.
pub fn append_text_filter_params(text: &str, is_regex: bool, match_case: bool, params: &mut Vec<String>) {
    if is_regex {
        params.push("--extended-regexp".to_string());
    } else {
        params.push("--fixed-strings".to_string());
    }
    if !match_case {
        params.push("--regexp-ignore-case".to_string());
    }
    params.push(format!("--grep={}", text));
}

// ─── Log readers ────────────────────────────────────────────────────

/// Streaming access to a repository's commit log.
pub trait LogReader {
    /// Run a log query for `root` with extra `params` (ref selectors, filters)
    /// and hand every resulting commit to `consumer`, in log order.
    fn read_commits(
        &self,
        root: &RepoRoot,
        params: &[String],
        consumer: &mut dyn FnMut(CommitMetadata),
    ) -> Result<(), FixerError>;

    /// Same query, delivering the lighter [`TimedCommit`] records.
    fn read_timed_commits(
        &self,
        root: &RepoRoot,
        params: &[String],
        consumer: &mut dyn FnMut(TimedCommit),
    ) -> Result<(), FixerError> {
        self.read_commits(root, params, &mut |commit| consumer(commit.into()))
    }
}

/// [`LogReader`] backed by the `git` executable.
#[derive(Clone, Debug)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self { program: "git".to_string() }
    }
}

impl GitCli {
    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn log_command(&self, root: &RepoRoot, params: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(root.as_path())
            .args(["-c", "core.quotePath=false", "log", "-z"])
            .arg(format!("--format={}", log_format()))
            .args(params)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

fn describe(program: &str, params: &[String]) -> String {
    let mut command = format!("{} log", program);
    for p in params {
        command.push(' ');
        command.push_str(p);
    }
    command
}

impl LogReader for GitCli {
    fn read_commits(
        &self,
        root: &RepoRoot,
        params: &[String],
        consumer: &mut dyn FnMut(CommitMetadata),
    ) -> Result<(), FixerError> {
        let start = Instant::now();
        let command = describe(&self.program, params);

        let mut child = self
            .log_command(root, params)
            .spawn()
            .map_err(|source| FixerError::GitSpawn { command: command.clone(), source })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(FixerError::GitFailed {
                command,
                stderr: "failed to capture git log stdout".to_string(),
            });
        };

        // Drained concurrently so a chatty git never blocks on a full stderr pipe
        let stderr_reader = child.stderr.take().map(|stderr| thread::spawn(move || drain_stderr(stderr)));

        let parsed = parse_log_stream(BufReader::new(stdout), consumer);
        if parsed.is_err() {
            let _ = child.kill();
        }

        let status = child.wait()?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let count = parsed?;

        if !status.success() {
            return Err(FixerError::GitFailed {
                command,
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(
            root = %root.name(),
            commits = count,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "git log finished"
        );
        Ok(())
    }
}

/// Most stderr kept for an error message; the rest is read and discarded.
const STDERR_LIMIT: usize = 64 * 1024;

/// Read `stderr` to EOF, keeping at most [`STDERR_LIMIT`] bytes.
fn drain_stderr(mut stderr: impl Read) -> String {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match stderr.read(&mut buf) {
            Ok(0) => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
            Ok(n) => {
                let room = STDERR_LIMIT.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&kept).into_owned()
}

// ─── Streaming parser ───────────────────────────────────────────────

/// Parse NUL-terminated git log records as they arrive.
///
/// Malformed records are skipped with a warning; I/O errors abort the stream.
/// Returns the number of commits delivered.
pub fn parse_log_stream(
    reader: impl BufRead,
    consumer: &mut dyn FnMut(CommitMetadata),
) -> Result<usize, FixerError> {
    let mut count = 0usize;

    for record in reader.split(b'\0') {
        let record = record?;
        let text = String::from_utf8_lossy(&record);
        // git puts a newline between -z records when a format is given
        let text = text.trim_start_matches('\n');
        if text.is_empty() {
            continue;
        }

        match parse_commit_record(text) {
            Ok(commit) => {
                consumer(commit);
                count += 1;
                if count % 10_000 == 0 {
                    debug!(commits = count, "git log progress");
                }
            }
            Err(e) => warn!(error = %e, "Skipping git log record"),
        }
    }

    Ok(count)
}

/// Parse one `COMMIT:<hash>␞<parents>␞<at>␞<ct>␞<name>␞<email>␞<body>` record.
pub fn parse_commit_record(record: &str) -> Result<CommitMetadata, FixerError> {
    let preview = || record.chars().take(100).collect::<String>();

    let header = record
        .strip_prefix(COMMIT_PREFIX)
        .ok_or_else(|| FixerError::MalformedRecord(format!("missing {} prefix: {}", COMMIT_PREFIX, preview())))?;

    // Body is the last field — splitn keeps any separator inside it
    let fields: Vec<&str> = header.splitn(7, FIELD_SEP).collect();
    if fields.len() < 7 {
        return Err(FixerError::MalformedRecord(format!(
            "{} fields, expected 7: {}",
            fields.len(),
            preview()
        )));
    }

    let id = CommitHash::from_hex(fields[0].trim())?;
    let parents = fields[1]
        .split_whitespace()
        .map(CommitHash::from_hex)
        .collect::<Result<Vec<_>, _>>()?;
    let author_time = parse_timestamp(fields[2])?;
    let commit_time = parse_timestamp(fields[3])?;

    Ok(CommitMetadata {
        id,
        parents,
        author_time,
        commit_time,
        author_name: fields[4].to_string(),
        author_email: fields[5].to_string(),
        message: fields[6].trim_end_matches('\n').to_string(),
    })
}

fn parse_timestamp(field: &str) -> Result<i64, FixerError> {
    field
        .trim()
        .parse()
        .map_err(|e| FixerError::MalformedRecord(format!("bad timestamp '{}': {}", field.trim(), e)))
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "git_tests.rs"]
pub(crate) mod tests;
