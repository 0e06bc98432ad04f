// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use crate::model::HouseTypeDiagnosis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingCost {
    /// Price per tsubo of floor area.
    pub unit_price: i64,
    pub building_budget: i64,
}

/// Budget arithmetic used to fill the derived fields of a record. Must be pure.
pub trait BudgetCalculator: Send + Sync {
    fn misc_costs(&self, total_budget: i64) -> i64;

    fn required_building_cost(
        &self,
        diagnosis: &HouseTypeDiagnosis,
        prefecture: &str,
        floor_area: f64,
    ) -> BuildingCost;
}

/// Percentage-based calculator: a fixed misc-cost share, a base unit price raised per
/// questionnaire grade and scaled by an optional regional factor.
#[derive(Debug, Clone, PartialEq)]
pub struct RateCalculator {
    pub misc_cost_rate: f64,
    pub base_unit_price: i64,
    pub grade_step: i64,
    pub regional_factors: BTreeMap<String, f64>,
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self {
            misc_cost_rate: 0.1,
            base_unit_price: 70,
            grade_step: 5,
            regional_factors: BTreeMap::new(),
        }
    }
}

impl BudgetCalculator for RateCalculator {
    fn misc_costs(&self, total_budget: i64) -> i64 {
        (total_budget as f64 * self.misc_cost_rate).round() as i64
    }

    fn required_building_cost(
        &self,
        diagnosis: &HouseTypeDiagnosis,
        prefecture: &str,
        floor_area: f64,
    ) -> BuildingCost {
        let grade = diagnosis.values().fold(0i64, |sum, answer| sum.saturating_add(*answer));
        let factor = self.regional_factors.get(prefecture).copied().unwrap_or(1.0);
        let base = self.base_unit_price.saturating_add(grade.saturating_mul(self.grade_step));
        let unit_price = (base as f64 * factor).round() as i64;
        let building_budget = (unit_price as f64 * floor_area).round() as i64;
        BuildingCost { unit_price, building_budget }
    }
}
