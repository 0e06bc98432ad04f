// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Durable local persistence for the anonymous record.
//!
//! [`LocalCacheStore`] owns the key layout (consolidated record plus legacy per-field mirrors);
//! [`KeyValueStorage`] backends decide where the bytes go.

pub mod folder;
pub mod local;
pub mod mirror;
pub mod storage;

pub use folder::{FolderStorage, WriteDurability};
pub use local::{LocalCacheStore, LocalLayout, DEFAULT_RECORD_KEY, DEFAULT_STALE_PREFIX};
pub use mirror::{collapse, expand, FlatEntries, KNOWN_FIELDS};
pub use storage::{KeyValueStorage, MemoryStorage, StorageError};
