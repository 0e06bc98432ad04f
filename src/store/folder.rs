// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::storage::{entry_size, KeyValueStorage, StorageError};

const ENTRY_EXTENSION: &str = "kv";
const TEMP_FILE_PREFIX: &str = ".hearth.tmp.";

/// Durable [`KeyValueStorage`]: one file per key inside a directory.
///
/// Writes go to a temp file that is renamed into place, so a crash never leaves a torn value
/// behind. The directory is created lazily on first write; reading from a directory that does
/// not exist yet yields empty storage.
#[derive(Debug, Clone)]
pub struct FolderStorage {
    root: PathBuf,
    durability: WriteDurability,
    quota_bytes: Option<usize>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

impl FolderStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default(), quota_bytes: None }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{ENTRY_EXTENSION}", encode_key(key)))
    }

    fn used_bytes_excluding(&self, skip_key: &str) -> Result<usize, StorageError> {
        let mut used = 0;
        for key in self.keys()? {
            if key == skip_key {
                continue;
            }
            if let Some(value) = self.get(&key)? {
                used += entry_size(&key, &value);
            }
        }
        Ok(used)
    }
}

impl KeyValueStorage for FolderStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey { key: key.to_owned() });
        }

        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(key)? + entry_size(key, value);
            if needed > quota {
                return Err(StorageError::QuotaExceeded { key: key.to_owned(), needed, quota });
            }
        }

        fs::create_dir_all(&self.root)
            .map_err(|source| StorageError::Io { path: self.root.clone(), source })?;
        write_atomic(&self.entry_path(key), value.as_bytes(), self.durability)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path: self.root.clone(), source }),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|source| StorageError::Io { path: self.root.clone(), source })?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with(TEMP_FILE_PREFIX) {
                continue;
            }
            let Some(stem) = file_name.strip_suffix(&format!(".{ENTRY_EXTENSION}")) else {
                continue;
            };
            if let Some(key) = decode_key(stem) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Keys are used verbatim as file stems when they are plain ASCII identifiers; anything else
/// (including the `:` in stale-key prefixes) is hex-encoded behind a `~` marker.
fn encode_key(key: &str) -> String {
    let plain = !key.starts_with('~')
        && !key.starts_with('.')
        && key.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if plain {
        return key.to_owned();
    }

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(1 + key.len().saturating_mul(2));
    out.push('~');
    for &b in key.as_bytes() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let Some(hex) = stem.strip_prefix('~') else {
        return Some(stem.to_owned());
    };
    if !hex.is_ascii() || hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

fn write_atomic(
    path: &Path,
    contents: &[u8],
    durability: WriteDurability,
) -> Result<(), StorageError> {
    let Some(parent) = path.parent() else {
        return Err(StorageError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    let Some(file_name) = path.file_name() else {
        return Err(StorageError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path =
        parent.join(format!("{TEMP_FILE_PREFIX}{}.{nanos}", file_name.to_string_lossy()));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StorageError::Io { path: tmp_path.clone(), source })?;

    file.write_all(contents)
        .map_err(|source| StorageError::Io { path: tmp_path.clone(), source })?;

    if durability == WriteDurability::Durable {
        file.sync_all().map_err(|source| StorageError::Io { path: tmp_path.clone(), source })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent)
                .map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
            dir.sync_all()
                .map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
        }
    }

    Ok(())
}
