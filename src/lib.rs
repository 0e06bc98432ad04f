// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Hearth: offline-first sync and caching engine for the home-building budget simulator.
//!
//! Anonymous visitors work against a durable local store; once signed in, the same record
//! lives in a per-user remote document. [`sync::DataManager`] routes every read and write,
//! [`state::SimulatorState`] is the reactive holder the wizard steps talk to.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use error::SyncError;
