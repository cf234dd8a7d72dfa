// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Keyword-driven YouTube search harvester.
//!
//! Reads keywords from a spreadsheet, searches each one through a pool of API
//! keys with failover and a persistent response cache, and appends the results
//! to a CSV file and a results sheet in batches. A durable cursor lets an
//! interrupted run resume where it stopped.

pub mod models;
pub mod services;

/// Version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `TUBEHARVEST_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("TUBEHARVEST_VERSION");
