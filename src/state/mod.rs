// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hearth-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hearth and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Reactive holder of the working record for the wizard and the dashboard.
//!
//! [`SimulatorState`] loads through the [`DataManager`], keeps one live subscription while the
//! visitor is signed in and publishes every change as a [`StateSnapshot`] on a watch channel.
//! Each user-facing operation ends with exactly one [`Notification`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SyncError;
use crate::model::{
    AuthWatch, BuildingLocation, DetailedRoomData, HouseSizeData, HouseTypeDiagnosis,
    OwnershipStatus, Session, SimulatorRecord,
};
use crate::sync::{DataManager, MigrationOutcome, MigrationWinner, Unsubscribe};

mod budget;
mod notify;

pub use budget::{BudgetCalculator, BuildingCost, RateCalculator};
pub use notify::{NoopNotifier, Notification, NotificationLevel, Notifier, RecordingNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateSnapshot {
    pub phase: Phase,
    /// A write is in flight.
    pub saving: bool,
    /// Dashboard editing: writes go out as field-level partial updates.
    pub edit_mode: bool,
    /// A signed-in visitor has anonymous data that could be saved to the account.
    pub offer_local_save: bool,
    pub session: Session,
    pub record: SimulatorRecord,
}

/// Household finances entered on the budget step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetInput {
    pub total_budget: Option<i64>,
    pub annual_income: Option<i64>,
    pub monthly_loan_repayment: Option<i64>,
    pub down_payment: Option<i64>,
    pub spouse_income: Option<i64>,
    pub spouse_loan_repayment: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandInput {
    pub land_budget: Option<i64>,
    pub parking_count: Option<u32>,
    pub calculated_area: Option<f64>,
    pub ultimate_average: Option<f64>,
    pub area_description: Option<String>,
    pub land_price_source: Option<String>,
    pub land_price_year: Option<i32>,
}

pub struct SimulatorState {
    manager: Arc<DataManager>,
    calculator: Arc<dyn BudgetCalculator>,
    notifier: Arc<dyn Notifier>,
    tx: Arc<watch::Sender<StateSnapshot>>,
    subscription: Mutex<Option<Unsubscribe>>,
}

impl SimulatorState {
    pub fn new(
        manager: Arc<DataManager>,
        calculator: Arc<dyn BudgetCalculator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (tx, _rx) = watch::channel(StateSnapshot::default());
        Self { manager, calculator, notifier, tx: Arc::new(tx), subscription: Mutex::default() }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<StateSnapshot> {
        self.tx.subscribe()
    }

    pub fn set_edit_mode(&self, edit_mode: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.edit_mode != edit_mode;
            state.edit_mode = edit_mode;
            changed
        });
    }

    /// Loads the record for `session`: the remote one when signed in (falling back to local
    /// data, which raises the save offer), the local one otherwise.
    pub async fn mount(&self, session: Session) -> Result<(), SyncError> {
        let result = self.load(session).await;
        match &result {
            Ok(()) if self.snapshot().offer_local_save => self.notify(
                NotificationLevel::Info,
                "Data from this device can be saved to your account",
            ),
            Ok(()) => self.notify(NotificationLevel::Success, "Simulator data loaded"),
            Err(err) => self.notify_error("Could not load simulator data", err),
        }
        result
    }

    /// Releases the live subscription. The last record stays visible.
    pub fn unmount(&self) {
        self.release_subscription();
        self.tx.send_modify(|state| {
            state.phase = Phase::Uninitialized;
            state.saving = false;
        });
    }

    /// Reloads for a new session. Signing out tears down every remote subscription first.
    pub async fn handle_auth_change(&self, session: Session) -> Result<(), SyncError> {
        tracing::info!(%session, "authentication changed");
        self.release_subscription();
        if !session.is_authenticated() {
            self.manager.unsubscribe_all();
        }
        self.mount(session).await
    }

    /// Follows the authentication signal until its owner goes away.
    pub fn follow_auth(self: &Arc<Self>, mut auth: AuthWatch) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(session) = auth.changed().await {
                if let Err(err) = state.handle_auth_change(session).await {
                    tracing::warn!(error = %err, "reload after authentication change failed");
                }
            }
            state.release_subscription();
        })
    }

    pub async fn update_budget(&self, input: BudgetInput) -> Result<(), SyncError> {
        let partial = SimulatorRecord {
            total_budget: input.total_budget,
            annual_income: input.annual_income,
            monthly_loan_repayment: input.monthly_loan_repayment,
            down_payment: input.down_payment,
            spouse_income: input.spouse_income,
            spouse_loan_repayment: input.spouse_loan_repayment,
            ..SimulatorRecord::default()
        };
        self.apply("budget", partial).await
    }

    pub async fn update_house_size(&self, house_size: HouseSizeData) -> Result<(), SyncError> {
        let partial =
            SimulatorRecord { house_size_data: Some(house_size), ..SimulatorRecord::default() };
        self.apply("house size", partial).await
    }

    pub async fn update_location(&self, location: BuildingLocation) -> Result<(), SyncError> {
        let partial =
            SimulatorRecord { building_location: Some(location), ..SimulatorRecord::default() };
        self.apply("location", partial).await
    }

    pub async fn update_diagnosis(&self, diagnosis: HouseTypeDiagnosis) -> Result<(), SyncError> {
        let partial =
            SimulatorRecord { house_type_diagnosis: Some(diagnosis), ..SimulatorRecord::default() };
        self.apply("house type", partial).await
    }

    pub async fn update_land(&self, input: LandInput) -> Result<(), SyncError> {
        let partial = SimulatorRecord {
            land_budget: input.land_budget,
            parking_count: input.parking_count,
            calculated_area: input.calculated_area,
            ultimate_average: input.ultimate_average,
            area_description: input.area_description,
            land_price_source: input.land_price_source,
            land_price_year: input.land_price_year,
            ..SimulatorRecord::default()
        };
        self.apply("land", partial).await
    }

    pub async fn update_detailed_rooms(&self, rooms: DetailedRoomData) -> Result<(), SyncError> {
        let partial =
            SimulatorRecord { detailed_room_data: Some(rooms), ..SimulatorRecord::default() };
        self.apply("room layout", partial).await
    }

    pub async fn set_ownership_status(&self, status: OwnershipStatus) -> Result<(), SyncError> {
        let partial =
            SimulatorRecord { ownership_status: Some(status), ..SimulatorRecord::default() };
        self.apply("land ownership", partial).await
    }

    /// Moves the anonymous record into the signed-in account and reloads.
    pub async fn save_local_to_account(&self) -> Result<MigrationOutcome, SyncError> {
        let session = self.snapshot().session;
        self.set_saving(true);
        let result = self.manager.migrate_local_to_remote(&session).await;
        self.set_saving(false);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notify_error("Could not save this device's data to your account", &err);
                return Err(err);
            }
        };
        self.tx.send_modify(|state| state.offer_local_save = false);

        if outcome != MigrationOutcome::NothingToMigrate {
            match self.manager.get_from_remote(&session).await {
                Ok(Some(record)) => self.tx.send_modify(|state| state.record = record),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "reload after migration failed"),
            }
        }

        match outcome {
            MigrationOutcome::NothingToMigrate => {
                self.notify(NotificationLevel::Info, "Nothing to save from this device")
            }
            MigrationOutcome::Migrated => {
                self.notify(NotificationLevel::Success, "Saved this device's data to your account")
            }
            MigrationOutcome::Conflict { winner: MigrationWinner::Local } => self.notify(
                NotificationLevel::Success,
                "This device had newer data; your account was updated",
            ),
            MigrationOutcome::Conflict { winner: MigrationWinner::Remote } => self.notify(
                NotificationLevel::Warning,
                "Your account already had newer data; kept the account version",
            ),
        }
        Ok(outcome)
    }

    /// Hides the save offer without touching either store.
    pub fn dismiss_local_save_offer(&self) {
        self.tx.send_modify(|state| state.offer_local_save = false);
        self.notify(NotificationLevel::Info, "This device's data stays on this device");
    }

    /// Deletes all simulator data everywhere and resets the working record.
    pub async fn clear(&self) -> Result<(), SyncError> {
        let session = self.snapshot().session;
        self.release_subscription();
        let result = self.manager.clear_all_data(&session).await;
        self.tx.send_modify(|state| {
            state.record = SimulatorRecord::default();
            state.offer_local_save = false;
        });
        match &result {
            Ok(()) => self.notify(NotificationLevel::Success, "All simulator data was deleted"),
            Err(err) => self.notify_error("Could not delete all simulator data", err),
        }
        result
    }

    async fn load(&self, session: Session) -> Result<(), SyncError> {
        self.tx.send_modify(|state| {
            state.phase = Phase::Loading;
            state.session = session.clone();
            state.offer_local_save = false;
        });

        let loaded = self.read_record(&session).await;
        let (record, offer_local_save) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                self.tx.send_modify(|state| state.phase = Phase::Ready);
                return Err(err);
            }
        };

        if session.is_authenticated() {
            if let Err(err) = self.subscribe(&session).await {
                tracing::warn!(error = %err, "live updates unavailable");
            }
        }

        self.tx.send_modify(|state| {
            state.record = record.unwrap_or_default();
            state.offer_local_save = offer_local_save;
            state.phase = Phase::Ready;
        });
        Ok(())
    }

    async fn read_record(
        &self,
        session: &Session,
    ) -> Result<(Option<SimulatorRecord>, bool), SyncError> {
        if !session.is_authenticated() {
            return Ok((self.manager.get_from_local_storage()?, false));
        }
        if let Some(record) = self.manager.get_from_remote(session).await? {
            return Ok((Some(record), false));
        }
        let local = self.manager.get_from_local_storage()?;
        let offer = local.is_some();
        Ok((local, offer))
    }

    async fn subscribe(&self, session: &Session) -> Result<(), SyncError> {
        let tx = Arc::clone(&self.tx);
        let notifier = Arc::clone(&self.notifier);
        let handle = self
            .manager
            .subscribe_to_remote(
                session,
                move |snapshot| {
                    if let Some(record) = snapshot {
                        tx.send_modify(|state| state.record = record);
                    }
                },
                move |err| {
                    notifier.notify(Notification::new(
                        NotificationLevel::Warning,
                        format!("Live updates interrupted: {err}"),
                    ))
                },
            )
            .await?;

        let previous = self.lock_subscription().replace(handle);
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
        Ok(())
    }

    async fn apply(&self, what: &str, mut partial: SimulatorRecord) -> Result<(), SyncError> {
        partial.reconcile_legacy_mirrors();
        let current = self.snapshot();
        self.derive(&current.record, &mut partial);

        let optimistic = current.record.merged(&partial);
        self.tx.send_modify(|state| {
            state.record = optimistic.clone();
            state.saving = true;
        });

        let result = if current.edit_mode {
            self.manager.update_partial_data(&current.session, &partial).await
        } else {
            self.manager.save_data(&current.session, &partial).await
        };

        // Edit-mode writes have no local fallback; drop values the remote never accepted unless
        // a snapshot has replaced the record meanwhile.
        let rejected = current.edit_mode && result.is_err();
        self.tx.send_modify(|state| {
            if rejected && state.record == optimistic {
                state.record = current.record.clone();
            }
            state.saving = false;
        });

        match &result {
            Ok(()) => self.notify(NotificationLevel::Success, format!("Saved {what}")),
            Err(err) => self.notify_error(&format!("Could not save {what}"), err),
        }
        result
    }

    /// Fills the derived budget fields of `partial` from the record it will produce.
    fn derive(&self, current: &SimulatorRecord, partial: &mut SimulatorRecord) {
        let merged = current.merged(partial);

        if let Some(total_budget) = merged.total_budget {
            let misc_costs = self.calculator.misc_costs(total_budget);
            partial.misc_costs = Some(misc_costs);
            partial.building_budget = Some(
                total_budget
                    .saturating_sub(misc_costs)
                    .saturating_sub(merged.land_budget.unwrap_or(0)),
            );
        }

        if let (Some(diagnosis), Some(prefecture), Some(floor_area)) =
            (merged.house_type_diagnosis.as_ref(), merged.prefecture(), merged.floor_area())
        {
            let cost = self.calculator.required_building_cost(diagnosis, prefecture, floor_area);
            partial.required_unit_price = Some(cost.unit_price);
            partial.required_building_budget = Some(cost.building_budget);
        }
    }

    fn set_saving(&self, saving: bool) {
        self.tx.send_modify(|state| state.saving = saving);
    }

    fn release_subscription(&self) {
        let handle = self.lock_subscription().take();
        if let Some(handle) = handle {
            handle.unsubscribe();
        }
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<Unsubscribe>> {
        self.subscription.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.notifier.notify(Notification::new(level, message));
    }

    fn notify_error(&self, context: &str, err: &SyncError) {
        let level = match err {
            SyncError::SessionChanged => NotificationLevel::Info,
            _ => NotificationLevel::Error,
        };
        self.notify(level, format!("{context}: {err}"));
    }
}

impl Drop for SimulatorState {
    fn drop(&mut self) {
        self.release_subscription();
    }
}
