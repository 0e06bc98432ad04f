// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! One [`SimulatorRecord`] per visitor, the [`Session`] that decides which store owns it, and
//! the time primitives used to stamp and age it.

pub mod ids;
pub mod record;
pub mod session;
pub mod time;

pub use ids::{IdError, UserId};
pub use record::{
    BuildingLocation, DetailedRoomData, HouseSizeData, HouseTypeDiagnosis, OwnershipStatus,
    RoomDescriptor, SimulatorRecord, LEGACY_MIRROR_KEYS, METADATA_KEYS,
};
pub use session::{AuthSignal, AuthWatch, Session};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
