// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

// Stamps TUBEHARVEST_VERSION into the binary. Scheduled harvest jobs set
// TUBEHARVEST_PATCH_VERSION to their run number so logs tell runs apart.

use std::env;

const PATCH_OVERRIDE: &str = "TUBEHARVEST_PATCH_VERSION";

fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");

    // major.minor.patch, nothing else
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        panic!("Invalid version format in Cargo.toml: {}", version);
    }
    let (major, minor, patch) = (parts[0], parts[1], parts[2]);

    let final_patch = match env::var(PATCH_OVERRIDE) {
        Ok(run) if !run.is_empty() && run.chars().all(|c| c.is_ascii_digit()) => run,
        Ok(run) => {
            // A malformed run number would end up in every log line
            println!(
                "cargo:warning={} is not a number ({:?}), keeping patch {}",
                PATCH_OVERRIDE, run, patch
            );
            patch.to_string()
        }
        Err(_) => patch.to_string(),
    };

    println!(
        "cargo:rustc-env=TUBEHARVEST_VERSION={}.{}.{}",
        major, minor, final_patch
    );

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed={}", PATCH_OVERRIDE);
}
