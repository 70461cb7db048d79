//! Stamps the binary with where and how it was built
//!
//! Sets `RISKREG_BUILD_COMMIT`, `RISKREG_BUILD_TIME` (UTC) and
//! `RISKREG_BUILD_PROFILE` for `env!` in the crate. Builds outside a git
//! checkout get `"unknown"` as the commit.

use std::path::Path;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn git_commit() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_string())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn main() {
    // Re-stamp when the checked-out commit moves
    let head = Path::new("../.git/HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }
    println!("cargo:rerun-if-changed=build.rs");

    emit("RISKREG_BUILD_COMMIT", &git_commit().unwrap_or_else(|| UNKNOWN.to_string()));
    emit(
        "RISKREG_BUILD_TIME",
        &chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    emit(
        "RISKREG_BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()),
    );
}
