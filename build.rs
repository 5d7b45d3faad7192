//! Build script — sets PARENTFIX_BUILD_COMMIT to the short hash of the checkout being built.

use std::process::Command;

fn main() {
    let commit = Command::new("git")
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        // Source tarballs have no git metadata
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=PARENTFIX_BUILD_COMMIT={}", commit);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
