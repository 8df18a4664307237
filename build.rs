// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packagers can pin the reported version
    let version = std::env::var("EYECAM_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=EYECAM_BUILD_VERSION={}", version);
}

/// "0.1.0" for the crate version, with "-<hash>" appended inside a git checkout
fn describe_version() -> String {
    let base = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    match hash {
        Some(hash) if !hash.is_empty() => format!("{}-{}", base, hash),
        _ => base,
    }
}
