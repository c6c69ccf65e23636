//! Stamps the agent binary with build provenance for `--version`.
//!
//! - `AGENT_BUILD_TIMESTAMP`: UTC build time, taken from `SOURCE_DATE_EPOCH`
//!   when set so packaged builds are reproducible
//! - `AGENT_GIT_COMMIT`: short commit hash, suffixed `-dirty` for a modified
//!   tree, or "unknown" outside a checkout

use std::env;
use std::process::Command;

use chrono::{DateTime, Utc};

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    println!("cargo:rustc-env=AGENT_BUILD_TIMESTAMP={}", build_time().format("%Y-%m-%dT%H:%M:%SZ"));
    println!(
        "cargo:rustc-env=AGENT_GIT_COMMIT={}",
        commit().unwrap_or_else(|| "unknown".to_string())
    );
}

fn build_time() -> DateTime<Utc> {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

fn commit() -> Option<String> {
    let hash = git(&["rev-parse", "--short", "HEAD"])?;
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|status| !status.is_empty());
    Some(if dirty { format!("{}-dirty", hash) } else { hash })
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|out| out.trim().to_string())
}
