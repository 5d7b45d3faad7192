//! Merge-parent order fixer for git commit logs.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

fn main() {
    cli::run();
}
