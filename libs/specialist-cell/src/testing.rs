//! In-memory directory and availability store for service tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use shared_models::auth::Role;
use shared_models::clock::parse_clock;
use shared_models::error::AppError;

use crate::models::{
    Account, AvailabilityPatch, AvailabilityWindow, ContactCard, DayOfWeek, NewAvailabilityWindow,
    SpecialistError, SpecialistProfile,
};
use crate::services::{AvailabilityStore, Directory, SpecialistRegistry};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: Mutex<HashMap<Uuid, Account>>,
    specialists: Mutex<HashMap<Uuid, SpecialistProfile>>,
}

impl InMemoryDirectory {
    pub fn add_account(&self, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let simple = id.simple().to_string();
        let short = &simple[..8];
        guard(&self.accounts).insert(
            id,
            Account {
                id,
                name: format!("{} {}", role, short),
                email: format!("{}-{}@example.com", role, short),
                phone: None,
                role,
            },
        );
        id
    }

    pub fn add_client(&self) -> Uuid {
        self.add_account(Role::Client)
    }

    pub fn add_admin(&self) -> Uuid {
        self.add_account(Role::Admin)
    }

    pub fn add_specialist(&self, verified: bool, hourly_rate: Option<f64>) -> Uuid {
        let user_id = self.add_account(Role::Specialist);
        guard(&self.specialists).insert(
            user_id,
            SpecialistProfile {
                id: Uuid::new_v4(),
                user_id,
                verified,
                hourly_rate,
                credentials: None,
                bio: None,
            },
        );
        user_id
    }

    pub fn account(&self, user_id: Uuid) -> Option<Account> {
        guard(&self.accounts).get(&user_id).cloned()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.account(user_id))
    }

    async fn get_specialist(&self, user_id: Uuid) -> Result<Option<SpecialistProfile>, AppError> {
        Ok(guard(&self.specialists).get(&user_id).cloned())
    }
}

#[async_trait]
impl SpecialistRegistry for InMemoryDirectory {
    async fn list_verified(&self) -> Result<Vec<(SpecialistProfile, ContactCard)>, AppError> {
        let accounts = guard(&self.accounts);
        Ok(guard(&self.specialists)
            .values()
            .filter(|profile| profile.verified)
            .filter_map(|profile| {
                let account = accounts.get(&profile.user_id)?;
                Some((
                    profile.clone(),
                    ContactCard {
                        name: account.name.clone(),
                        email: account.email.clone(),
                    },
                ))
            })
            .collect())
    }

    async fn set_verified(&self, user_id: Uuid, verified: bool) -> Result<SpecialistProfile, AppError> {
        let mut specialists = guard(&self.specialists);
        let profile = specialists
            .get_mut(&user_id)
            .ok_or(SpecialistError::ProfileNotFound)?;
        profile.verified = verified;
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    windows: Mutex<Vec<AvailabilityWindow>>,
}

impl InMemoryAvailabilityStore {
    /// Adds an active window; times are `HH:MM`.
    pub fn add_window(&self, specialist_id: Uuid, day: DayOfWeek, start: &str, end: &str) -> AvailabilityWindow {
        let window = AvailabilityWindow {
            id: Uuid::new_v4(),
            specialist_id,
            day,
            start_time: parse_clock(start).unwrap_or_default(),
            end_time: parse_clock(end).unwrap_or_default(),
            is_active: true,
            created_at: None,
        };
        guard(&self.windows).push(window.clone());
        window
    }

    pub fn windows(&self) -> Vec<AvailabilityWindow> {
        guard(&self.windows).clone()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn get_active_window(
        &self,
        specialist_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>, AppError> {
        Ok(guard(&self.windows)
            .iter()
            .filter(|w| w.specialist_id == specialist_id && w.day == day && w.is_active)
            .min_by_key(|w| w.start_time)
            .cloned())
    }

    async fn list_windows(&self, specialist_id: Uuid) -> Result<Vec<AvailabilityWindow>, AppError> {
        Ok(guard(&self.windows)
            .iter()
            .filter(|w| w.specialist_id == specialist_id)
            .cloned()
            .collect())
    }

    async fn list_active_on(&self, day: DayOfWeek) -> Result<Vec<AvailabilityWindow>, AppError> {
        Ok(guard(&self.windows)
            .iter()
            .filter(|w| w.day == day && w.is_active)
            .cloned()
            .collect())
    }

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, AppError> {
        Ok(guard(&self.windows).iter().find(|w| w.id == window_id).cloned())
    }

    async fn insert_window(&self, window: NewAvailabilityWindow) -> Result<AvailabilityWindow, AppError> {
        let stored = AvailabilityWindow {
            id: Uuid::new_v4(),
            specialist_id: window.specialist_id,
            day: window.day,
            start_time: window.start_time,
            end_time: window.end_time,
            is_active: window.is_active,
            created_at: None,
        };
        guard(&self.windows).push(stored.clone());
        Ok(stored)
    }

    async fn update_window(
        &self,
        window_id: Uuid,
        patch: AvailabilityPatch,
    ) -> Result<AvailabilityWindow, AppError> {
        let mut windows = guard(&self.windows);
        let window = windows
            .iter_mut()
            .find(|w| w.id == window_id)
            .ok_or(SpecialistError::AvailabilityNotFound)?;

        if let Some(day) = patch.day {
            window.day = day;
        }
        if let Some(start) = patch.start_time {
            window.start_time = start;
        }
        if let Some(end) = patch.end_time {
            window.end_time = end;
        }
        if let Some(active) = patch.is_active {
            window.is_active = active;
        }
        Ok(window.clone())
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<(), AppError> {
        guard(&self.windows).retain(|w| w.id != window_id);
        Ok(())
    }
}
