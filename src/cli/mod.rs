//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use std::fs;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use parentfix::git::LOG_ALL;
use parentfix::storage::{index_dir, index_path_for};
use parentfix::{
    pattern, CommitIndex, FixConfig, FixerError, GitCli, IndexDataGetter, LogSession, RepoRoot,
};

// ─── CLI ─────────────────────────────────────────────────────────────

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PARENTFIX_BUILD_COMMIT"), ")");

/// Finds merge commits recorded with reversed parents and shows them corrected
#[derive(Parser, Debug)]
#[command(name = "parentfix", version, long_version = LONG_VERSION, about, after_help = "\
Run 'parentfix <COMMAND> --help' for detailed options.\n\
Common options: -d <DIR> (repository root), --no-fix (show parents as recorded)")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Build and save the commit index for one or more repository roots
    Index(IndexArgs),

    /// Print the merge commits whose parents are recorded in reversed order
    Locate(LocateArgs),

    /// Show the commit log with merge parents corrected
    Log(LogArgs),

    /// Test whether a commit message has the affected merge shape
    Check(CheckArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level);

    let result = load_config(&cli.global).and_then(|config| match cli.command {
        Commands::Index(args) => cmd_index(args),
        Commands::Locate(args) => cmd_locate(&config, args),
        Commands::Log(args) => cmd_log(config, args),
        Commands::Check(args) => {
            cmd_check(args);
            Ok(())
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let log_level = match level {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    // RUST_LOG directives, when set, refine the chosen level per module
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings file first, then command-line switches on top.
fn load_config(global: &GlobalArgs) -> Result<FixConfig, FixerError> {
    let mut config = match &global.settings {
        Some(path) => FixConfig::load(path)?,
        None => FixConfig::default(),
    };
    if global.no_bek {
        config.bek_enabled = false;
    }
    if global.no_fix {
        config.fix_merge_parents_order = false;
    }
    Ok(config)
}

/// The saved index for `root`, unless disabled or unusable.
fn saved_index(root: &RepoRoot, no_index: bool) -> Option<CommitIndex> {
    if no_index {
        return None;
    }
    CommitIndex::load_for_root(root, &index_dir()).filter(|index| index.is_indexed(root))
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_index(args: IndexArgs) -> Result<(), FixerError> {
    let idx_base = index_dir();
    let git = GitCli::default();

    for dir in &args.dirs {
        let root = RepoRoot::new(dir);
        let path = index_path_for(&root, &idx_base);

        if !args.force && saved_index(&root, false).is_some() {
            eprintln!("Index for {} is up to date ({}), use --force to rebuild", root, path.display());
            continue;
        }

        let start = Instant::now();
        let mut index = CommitIndex::new();
        let count = index.index_root(&root, &git)?;
        index.save_to_disk(&path)?;

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        info!(
            root = %root.name(),
            commits = count,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Index saved"
        );
        eprintln!(
            "Indexed {} commits of {} into {} ({:.1} KB)",
            count,
            root,
            path.display(),
            size as f64 / 1024.0
        );
    }
    Ok(())
}

fn cmd_locate(config: &FixConfig, args: LocateArgs) -> Result<(), FixerError> {
    let root = RepoRoot::new(&args.dir);
    let index = saved_index(&root, args.no_index);
    let git = GitCli::default();

    // Unlike `prepare`, a failing scan is reported here rather than swallowed
    let found = parentfix::locate_incorrect_commits(
        config,
        index.as_ref().map(|i| i as &dyn IndexDataGetter),
        &git,
        &root,
    )?;

    if args.count {
        println!("{}", found.len());
        return Ok(());
    }
    let mut hashes: Vec<_> = found.into_iter().collect();
    hashes.sort();
    for hash in hashes {
        println!("{}", hash);
    }
    Ok(())
}

fn cmd_log(config: FixConfig, args: LogArgs) -> Result<(), FixerError> {
    let root = RepoRoot::new(&args.dir);
    let mut session = LogSession::new(config, GitCli::default());
    if let Some(index) = saved_index(&root, args.no_index) {
        session.set_index(Some(index));
    }

    let mut params = vec![LOG_ALL[0].to_string()];
    if args.merges {
        params.push("--merges".to_string());
    }
    if args.max_count > 0 {
        params.push(format!("--max-count={}", args.max_count));
    }

    let commits = session.read_metadata(&root, &params)?;
    let fixer = session.fixer_for(&root);

    for commit in &commits {
        let parents: Vec<String> = commit.parents.iter().map(|p| p.short()).collect();
        let marker = if fixer.contains(&commit.id) { "*" } else { " " };
        println!(
            "{} {} [{}] {}",
            marker,
            commit.id.short(),
            parents.join(" "),
            commit.subject()
        );
    }
    if !fixer.is_empty() {
        eprintln!("* parents reversed ({} flagged in {})", fixer.len(), root.name());
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) {
    if pattern::matches(&args.message) {
        println!("match: a two-parent merge with this message has its parents reversed");
    } else {
        println!("no match for {}", pattern::MERGE_REMOTE_REGEX);
    }
}
