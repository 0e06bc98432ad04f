// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use hearth::model::{
    BuildingLocation, HouseSizeData, HouseTypeDiagnosis, OwnershipStatus, RoomDescriptor,
    SimulatorRecord, Timestamp,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("hearth_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub mod record {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    pub enum Case {
        /// Budget step only.
        Sparse,
        /// Every wizard step filled, several rooms per category.
        Full,
    }

    pub fn fixture(case: Case) -> SimulatorRecord {
        let mut record = SimulatorRecord {
            total_budget: Some(4000),
            annual_income: Some(650),
            monthly_loan_repayment: Some(12),
            down_payment: Some(300),
            misc_costs: Some(400),
            building_budget: Some(2600),
            updated_at: Some(Timestamp::from_millis(1_700_000_000_000)),
            ..SimulatorRecord::default()
        };
        if matches!(case, Case::Sparse) {
            return record;
        }

        let mut extra = BTreeMap::new();
        extra.insert("roofStyle".to_owned(), serde_json::json!("gable"));
        record.house_size_data = Some(HouseSizeData {
            total_floor_area: Some(32.5),
            floors: Some(2),
            ldk_size: Some(20.0),
            extra,
        });

        let mut rooms = BTreeMap::new();
        for category in ["bedrooms", "wetAreas", "storage"] {
            let descriptors = (0..6)
                .map(|index| RoomDescriptor {
                    id: format!("{category}-{index}"),
                    size: 4.5 + index as f64,
                    size_preset: if index % 2 == 0 { "standard" } else { "large" }.to_owned(),
                })
                .collect();
            rooms.insert(category.to_owned(), descriptors);
        }
        record.detailed_room_data = Some(rooms);

        record.building_location = Some(BuildingLocation::new("Osaka", "Sakai"));
        record.ownership_status = Some(OwnershipStatus::Searching);
        record.land_budget = Some(1000);
        record.parking_count = Some(2);
        record.calculated_area = Some(45.2);
        record.ultimate_average = Some(38.7);
        record.area_description = Some("near station, south-facing".to_owned());
        record.land_price_source = Some("public land price survey".to_owned());
        record.land_price_year = Some(2024);
        record.house_type_diagnosis =
            Some(HouseTypeDiagnosis::from([("q1".to_owned(), 2), ("q2".to_owned(), 1)]));
        record.reconcile_legacy_mirrors();
        record
    }
}
