// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Codec between a [`SimulatorRecord`] and the flat per-key entries older code paths read.
//!
//! Every allow-listed top-level field is stored under its own key next to the consolidated
//! record. String values are stored raw (older readers do `getItem("selectedCity")` and use
//! the result as-is); everything else is JSON-encoded.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::model::{SimulatorRecord, LEGACY_MIRROR_KEYS};

/// Flat key → stored string entries.
pub type FlatEntries = BTreeMap<String, String>;

/// Top-level fields mirrored under their own key, besides the legacy scalars.
pub const KNOWN_FIELDS: &[&str] = &[
    "totalBudget",
    "annualIncome",
    "monthlyLoanRepayment",
    "downPayment",
    "spouseIncome",
    "spouseLoanRepayment",
    "miscCosts",
    "buildingBudget",
    "requiredBuildingBudget",
    "requiredUnitPrice",
    "houseSizeData",
    "detailedRoomData",
    "buildingLocation",
    "ownershipStatus",
    "landBudget",
    "parkingCount",
    "calculatedArea",
    "ultimateAverage",
    "areaDescription",
    "landPriceSource",
    "landPriceYear",
    "houseTypeDiagnosis",
];

/// Every key [`expand`] may produce.
pub fn mirror_keys() -> impl Iterator<Item = &'static str> {
    KNOWN_FIELDS.iter().chain(LEGACY_MIRROR_KEYS).copied()
}

/// Splits a record into its per-key mirror entries.
///
/// Legacy scalars are re-derived from the nested forms first, so the output always carries
/// both representations of a mirrored field.
pub fn expand(record: &SimulatorRecord) -> Result<FlatEntries, serde_json::Error> {
    let mut record = record.clone();
    record.reconcile_legacy_mirrors();

    let Value::Object(fields) = serde_json::to_value(&record)? else {
        return Ok(FlatEntries::new());
    };

    let mut entries = FlatEntries::new();
    for key in mirror_keys() {
        let Some(value) = fields.get(key) else {
            continue;
        };
        let stored = match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        entries.insert(key.to_owned(), stored);
    }
    Ok(entries)
}

/// Rebuilds a record from per-key mirror entries.
///
/// Unknown keys are ignored and malformed values are skipped, so a half-written legacy layout
/// still yields everything that can be recovered. Nested forms missing from the entries are
/// rebuilt from their legacy scalars.
pub fn collapse(entries: &FlatEntries) -> SimulatorRecord {
    let mut record = SimulatorRecord::default();

    for key in mirror_keys() {
        let Some(stored) = entries.get(key) else {
            continue;
        };
        match decode_field(key, stored) {
            Some(field) => record.merge_from(&field),
            None => tracing::debug!(key, "skipping malformed legacy entry"),
        }
    }

    record.reconcile_legacy_mirrors();
    record
}

fn decode_field(key: &str, stored: &str) -> Option<SimulatorRecord> {
    let single = |value: Value| {
        let mut object = Map::new();
        object.insert(key.to_owned(), value);
        serde_json::from_value::<SimulatorRecord>(Value::Object(object)).ok()
    };

    match serde_json::from_str::<Value>(stored) {
        Ok(value @ Value::String(_)) => single(value),
        Ok(value) => single(value).or_else(|| single(Value::String(stored.to_owned()))),
        Err(_) => single(Value::String(stored.to_owned())),
    }
}
