// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Log output for hosts embedding the engine.
//!
//! The library itself only emits `tracing` events; installing a subscriber is the host's call.

use tracing::metadata::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive string, e.g. `hearth=debug`.
pub const LOG_ENV_VAR: &str = "HEARTH_LOG";

/// Installs a stderr fmt subscriber. `verbosity` picks the default level (0 error, 1 info,
/// 2+ debug); `HEARTH_LOG` directives take precedence.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(verbosity: u8) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .finish()
        .try_init()
        .is_ok()
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}
