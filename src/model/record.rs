// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::Timestamp;

/// Answers of the house-type questionnaire, keyed by question id (`q1`, `q2`, ...).
pub type HouseTypeDiagnosis = BTreeMap<String, i64>;

/// Room descriptors grouped by room category (`bedrooms`, `wetAreas`, ...).
pub type DetailedRoomData = BTreeMap<String, Vec<RoomDescriptor>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseSizeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_floor_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldk_size: Option<f64>,
    /// Keys written by wizard steps this crate does not interpret; kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDescriptor {
    pub id: String,
    pub size: f64,
    pub size_preset: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLocation {
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub city: String,
}

impl BuildingLocation {
    pub fn new(prefecture: impl Into<String>, city: impl Into<String>) -> Self {
        Self { prefecture: prefecture.into(), city: city.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipStatus {
    Owned,
    Searching,
    Undecided,
}

macro_rules! simulator_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[doc = $doc:literal])* $field:ident : $ty:ty => $key:literal, )*
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[doc = $doc])*
                #[serde(rename = $key, default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            /// Every top-level key of the persisted layout, in declaration order.
            pub const FIELD_KEYS: &'static [&'static str] = &[$($key),*];

            /// Field-level merge: every field present in `partial` replaces ours, every absent
            /// field is left untouched. Nested objects are replaced as a whole.
            pub fn merge_from(&mut self, partial: &Self) {
                $(
                    if let Some(value) = &partial.$field {
                        self.$field = Some(value.clone());
                    }
                )*
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }

            /// Keys of the fields this record carries.
            pub fn present_keys(&self) -> Vec<&'static str> {
                let mut keys = Vec::new();
                $(
                    if self.$field.is_some() {
                        keys.push($key);
                    }
                )*
                keys
            }
        }
    };
}

simulator_record! {
    /// The single logical entity of the simulator: one per anonymous browser profile locally,
    /// one per user id remotely.
    ///
    /// Every field is optional; a missing field means "not answered yet", which is not the same
    /// as zero. The same type doubles as a *partial*: a record carrying only the fields a write
    /// wants to change.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct SimulatorRecord {
        total_budget: i64 => "totalBudget",
        annual_income: i64 => "annualIncome",
        monthly_loan_repayment: i64 => "monthlyLoanRepayment",
        down_payment: i64 => "downPayment",
        spouse_income: i64 => "spouseIncome",
        spouse_loan_repayment: i64 => "spouseLoanRepayment",
        misc_costs: i64 => "miscCosts",
        building_budget: i64 => "buildingBudget",
        required_building_budget: i64 => "requiredBuildingBudget",
        required_unit_price: i64 => "requiredUnitPrice",
        house_size_data: HouseSizeData => "houseSizeData",
        detailed_room_data: DetailedRoomData => "detailedRoomData",
        building_location: BuildingLocation => "buildingLocation",
        ownership_status: OwnershipStatus => "ownershipStatus",
        land_budget: i64 => "landBudget",
        parking_count: u32 => "parkingCount",
        calculated_area: f64 => "calculatedArea",
        ultimate_average: f64 => "ultimateAverage",
        area_description: String => "areaDescription",
        land_price_source: String => "landPriceSource",
        land_price_year: i32 => "landPriceYear",
        house_type_diagnosis: HouseTypeDiagnosis => "houseTypeDiagnosis",
        /// Legacy mirror of `buildingLocation.prefecture`.
        selected_prefecture: String => "selectedPrefecture",
        /// Legacy mirror of `buildingLocation.city`.
        selected_city: String => "selectedCity",
        /// Legacy mirror of `houseTypeDiagnosis.q1`.
        q1: i64 => "q1",
        /// Legacy mirror of `houseTypeDiagnosis.q2`.
        q2: i64 => "q2",
        /// Legacy mirror of `ultimateAverage`.
        price_per_tsubo: f64 => "pricePerTsubo",
        created_at: Timestamp => "createdAt",
        updated_at: Timestamp => "updatedAt",
        migrated_at: Timestamp => "migratedAt",
        last_synced_at: Timestamp => "lastSyncedAt",
        last_partial_synced_at: Timestamp => "lastPartialSyncedAt",
    }
}

/// Top-level keys that are legacy scalar mirrors rather than primary fields.
pub const LEGACY_MIRROR_KEYS: &[&str] =
    &["selectedPrefecture", "selectedCity", "q1", "q2", "pricePerTsubo"];

/// Top-level keys holding bookkeeping timestamps.
pub const METADATA_KEYS: &[&str] =
    &["createdAt", "updatedAt", "migratedAt", "lastSyncedAt", "lastPartialSyncedAt"];

impl SimulatorRecord {
    pub fn merged(&self, partial: &SimulatorRecord) -> SimulatorRecord {
        let mut merged = self.clone();
        merged.merge_from(partial);
        merged
    }

    /// Brings the nested forms and their legacy scalar mirrors back in agreement.
    ///
    /// The nested form is primary: when it is present the mirrors are re-derived from it. When
    /// only mirrors are present (records written by older clients) the nested form is rebuilt
    /// from them.
    pub fn reconcile_legacy_mirrors(&mut self) {
        match &self.building_location {
            Some(location) => {
                self.selected_prefecture = Some(location.prefecture.clone());
                self.selected_city = Some(location.city.clone());
            }
            None if self.selected_prefecture.is_some() || self.selected_city.is_some() => {
                self.building_location = Some(BuildingLocation {
                    prefecture: self.selected_prefecture.clone().unwrap_or_default(),
                    city: self.selected_city.clone().unwrap_or_default(),
                });
            }
            None => {}
        }

        match &self.house_type_diagnosis {
            Some(diagnosis) => {
                self.q1 = diagnosis.get("q1").copied();
                self.q2 = diagnosis.get("q2").copied();
            }
            None if self.q1.is_some() || self.q2.is_some() => {
                let mut diagnosis = HouseTypeDiagnosis::new();
                if let Some(q1) = self.q1 {
                    diagnosis.insert("q1".to_owned(), q1);
                }
                if let Some(q2) = self.q2 {
                    diagnosis.insert("q2".to_owned(), q2);
                }
                self.house_type_diagnosis = Some(diagnosis);
            }
            None => {}
        }

        match (self.ultimate_average, self.price_per_tsubo) {
            (Some(average), _) => self.price_per_tsubo = Some(average),
            (None, Some(price)) => self.ultimate_average = Some(price),
            (None, None) => {}
        }
    }

    /// `updatedAt`, with a missing stamp ordered before every real one.
    pub fn updated_at_or_epoch(&self) -> Timestamp {
        self.updated_at.unwrap_or(Timestamp::EPOCH)
    }

    pub fn floor_area(&self) -> Option<f64> {
        self.house_size_data.as_ref().and_then(|size| size.total_floor_area)
    }

    pub fn prefecture(&self) -> Option<&str> {
        self.building_location
            .as_ref()
            .map(|location| location.prefecture.as_str())
            .filter(|prefecture| !prefecture.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BuildingLocation, HouseSizeData, HouseTypeDiagnosis, OwnershipStatus, SimulatorRecord,
        LEGACY_MIRROR_KEYS, METADATA_KEYS,
    };
    use crate::model::Timestamp;

    #[test]
    fn merge_only_touches_fields_present_in_partial() {
        let mut record = SimulatorRecord {
            total_budget: Some(4000),
            land_budget: Some(800),
            ..SimulatorRecord::default()
        };
        let partial = SimulatorRecord { land_budget: Some(500), ..SimulatorRecord::default() };

        record.merge_from(&partial);

        assert_eq!(record.total_budget, Some(4000));
        assert_eq!(record.land_budget, Some(500));
    }

    #[test]
    fn serializes_with_camel_case_keys_and_skips_absent_fields() {
        let record = SimulatorRecord {
            total_budget: Some(4000),
            ownership_status: Some(OwnershipStatus::Searching),
            updated_at: Some(Timestamp::from_millis(7)),
            ..SimulatorRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalBudget": 4000,
                "ownershipStatus": "searching",
                "updatedAt": 7
            })
        );
    }

    #[test]
    fn absence_is_distinct_from_zero() {
        let zero: SimulatorRecord = serde_json::from_str(r#"{"totalBudget":0}"#).unwrap();
        let absent: SimulatorRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(zero.total_budget, Some(0));
        assert_eq!(absent.total_budget, None);
        assert!(absent.is_empty());
        assert!(!zero.is_empty());
    }

    #[test]
    fn house_size_keeps_unknown_keys() {
        let json = r#"{"houseSizeData":{"totalFloorArea":120.5,"floors":2,"storage":"walk-in"}}"#;
        let record: SimulatorRecord = serde_json::from_str(json).unwrap();
        let size: &HouseSizeData = record.house_size_data.as_ref().unwrap();
        assert_eq!(size.total_floor_area, Some(120.5));
        assert_eq!(size.floors, Some(2));
        assert_eq!(size.extra["storage"], serde_json::json!("walk-in"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["houseSizeData"]["storage"], serde_json::json!("walk-in"));
    }

    #[test]
    fn reconcile_derives_mirrors_from_nested_forms() {
        let mut diagnosis = HouseTypeDiagnosis::new();
        diagnosis.insert("q1".to_owned(), 2);
        diagnosis.insert("q2".to_owned(), 1);
        let mut record = SimulatorRecord {
            building_location: Some(BuildingLocation::new("A", "B")),
            house_type_diagnosis: Some(diagnosis),
            ultimate_average: Some(45.5),
            selected_prefecture: Some("stale".to_owned()),
            ..SimulatorRecord::default()
        };

        record.reconcile_legacy_mirrors();

        assert_eq!(record.selected_prefecture.as_deref(), Some("A"));
        assert_eq!(record.selected_city.as_deref(), Some("B"));
        assert_eq!(record.q1, Some(2));
        assert_eq!(record.q2, Some(1));
        assert_eq!(record.price_per_tsubo, Some(45.5));
    }

    #[test]
    fn reconcile_rebuilds_nested_forms_from_mirrors() {
        let mut record = SimulatorRecord {
            selected_prefecture: Some("A".to_owned()),
            selected_city: Some("B".to_owned()),
            q1: Some(3),
            price_per_tsubo: Some(30.0),
            ..SimulatorRecord::default()
        };

        record.reconcile_legacy_mirrors();

        assert_eq!(record.building_location, Some(BuildingLocation::new("A", "B")));
        let diagnosis = record.house_type_diagnosis.as_ref().unwrap();
        assert_eq!(diagnosis.get("q1"), Some(&3));
        assert_eq!(diagnosis.get("q2"), None);
        assert_eq!(record.ultimate_average, Some(30.0));
    }

    #[test]
    fn key_lists_are_subsets_of_field_keys() {
        for key in LEGACY_MIRROR_KEYS.iter().chain(METADATA_KEYS) {
            assert!(SimulatorRecord::FIELD_KEYS.contains(key), "missing {key}");
        }
    }

    #[test]
    fn missing_updated_at_orders_before_any_stamp() {
        let unstamped = SimulatorRecord::default();
        let stamped =
            SimulatorRecord { updated_at: Some(Timestamp::from_millis(1)), ..Default::default() };
        assert!(unstamped.updated_at_or_epoch() < stamped.updated_at_or_epoch());
    }
}
