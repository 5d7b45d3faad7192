//! CLI argument structs for all subcommands.

use std::path::PathBuf;

use clap::Parser;

/// Options shared by every command.
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// JSON settings file holding the fix switches
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Treat the Bek ordering as not in use (disables the fix)
    #[arg(long, global = true)]
    pub no_bek: bool,

    /// Disable merge parent correction
    #[arg(long, global = true)]
    pub no_fix: bool,

    /// Log level for stderr output (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Repository roots to index
    #[arg(short, long = "dir", default_value = ".", num_args = 1..)]
    pub dirs: Vec<String>,

    /// Rebuild even when a complete index is already saved
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Repository root
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Ignore any saved index and scan the log
    #[arg(long)]
    pub no_index: bool,

    /// Show only the count of flagged merges
    #[arg(short = 'c', long)]
    pub count: bool,
}

#[derive(Parser, Debug)]
pub struct LogArgs {
    /// Repository root
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Maximum number of commits to show (0 = all)
    #[arg(short = 'n', long, default_value = "20")]
    pub max_count: usize,

    /// Ignore any saved index and scan the log
    #[arg(long)]
    pub no_index: bool,

    /// Show only merge commits
    #[arg(long)]
    pub merges: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Commit message to test
    pub message: String,
}
