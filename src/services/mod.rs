// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod cache;
pub mod credential_pool;
pub mod csv_sink;
pub mod db;
pub mod executor;
pub mod language;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod sheets;
pub mod sink;
pub mod transform;
pub mod youtube;
