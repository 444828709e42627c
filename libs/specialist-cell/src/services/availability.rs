use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use reqwest::Method;
use serde_json::to_value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::authorization::{self, Capability};
use shared_models::clock::parse_request_clock;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityPatch, AvailabilityWindow, CreateAvailabilityRequest, DayOfWeek,
    NewAvailabilityWindow, SpecialistError, UpdateAvailabilityRequest,
};
use crate::services::directory::{Directory, SupabaseDirectory};

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Earliest active window for the weekday, if any.
    async fn get_active_window(
        &self,
        specialist_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>, AppError>;

    async fn list_windows(&self, specialist_id: Uuid) -> Result<Vec<AvailabilityWindow>, AppError>;

    async fn list_active_on(&self, day: DayOfWeek) -> Result<Vec<AvailabilityWindow>, AppError>;

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, AppError>;

    async fn insert_window(&self, window: NewAvailabilityWindow) -> Result<AvailabilityWindow, AppError>;

    async fn update_window(
        &self,
        window_id: Uuid,
        patch: AvailabilityPatch,
    ) -> Result<AvailabilityWindow, AppError>;

    async fn delete_window(&self, window_id: Uuid) -> Result<(), AppError>;
}

pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth_token)
    }
}

fn encode(value: impl serde::Serialize) -> Result<serde_json::Value, AppError> {
    to_value(value).map_err(|e| AppError::Internal(format!("Failed to encode availability: {}", e)))
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn get_active_window(
        &self,
        specialist_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Option<AvailabilityWindow>, AppError> {
        let path = format!(
            "/rest/v1/availability?specialist_id=eq.{}&day=eq.{}&is_active=eq.true&order=start_time.asc&limit=1",
            specialist_id, day
        );
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn list_windows(&self, specialist_id: Uuid) -> Result<Vec<AvailabilityWindow>, AppError> {
        let path = format!(
            "/rest/v1/availability?specialist_id=eq.{}&order=day.asc,start_time.asc",
            specialist_id
        );
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }

    async fn list_active_on(&self, day: DayOfWeek) -> Result<Vec<AvailabilityWindow>, AppError> {
        let path = format!("/rest/v1/availability?day=eq.{}&is_active=eq.true", day);
        Ok(self.supabase.request(Method::GET, &path, self.token(), None).await?)
    }

    async fn get_window(&self, window_id: Uuid) -> Result<Option<AvailabilityWindow>, AppError> {
        let path = format!("/rest/v1/availability?id=eq.{}", window_id);
        Ok(self.supabase.fetch_optional(&path, self.token()).await?)
    }

    async fn insert_window(&self, window: NewAvailabilityWindow) -> Result<AvailabilityWindow, AppError> {
        let rows: Vec<AvailabilityWindow> = self
            .supabase
            .returning(Method::POST, "/rest/v1/availability", self.token(), encode(&window)?)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Availability insert returned no row".to_string()))
    }

    async fn update_window(
        &self,
        window_id: Uuid,
        patch: AvailabilityPatch,
    ) -> Result<AvailabilityWindow, AppError> {
        let path = format!("/rest/v1/availability?id=eq.{}", window_id);
        let rows: Vec<AvailabilityWindow> = self
            .supabase
            .returning(Method::PATCH, &path, self.token(), encode(&patch)?)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SpecialistError::AvailabilityNotFound.into())
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<(), AppError> {
        let path = format!("/rest/v1/availability?id=eq.{}", window_id);
        Ok(self.supabase.execute(Method::DELETE, &path, self.token(), None).await?)
    }
}

fn parse_field(field: &str, value: Option<&str>) -> Result<Option<NaiveTime>, SpecialistError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_request_clock(raw)
            .map(Some)
            .ok_or_else(|| SpecialistError::InvalidTime(format!("{} '{}'", field, raw))),
    }
}

/// Availability management for specialists.
pub struct AvailabilityService {
    directory: Arc<dyn Directory>,
    store: Arc<dyn AvailabilityStore>,
}

impl AvailabilityService {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn AvailabilityStore>) -> Self {
        Self { directory, store }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseDirectory::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseAvailabilityStore::new(supabase, auth_token)),
        )
    }

    pub async fn list_availability(
        &self,
        caller_id: Uuid,
        specialist_id: Option<Uuid>,
    ) -> Result<Vec<AvailabilityWindow>, AppError> {
        let target = specialist_id.unwrap_or(caller_id);
        if target != caller_id {
            let role = self.directory.get_role(caller_id).await?;
            authorization::require(role, Capability::ViewAnyAvailability)?;
        }

        self.store.list_windows(target).await
    }

    pub async fn create_availability(
        &self,
        caller_id: Uuid,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AppError> {
        let (day, start_time, end_time) = match (request.day, request.start_time, request.end_time) {
            (Some(day), Some(start), Some(end)) => (day, start, end),
            _ => return Err(SpecialistError::MissingFields("day, start_time, end_time".to_string()).into()),
        };

        let start_time = parse_request_clock(&start_time)
            .ok_or_else(|| SpecialistError::InvalidTime(format!("start_time '{}'", start_time)))?;
        let end_time = parse_request_clock(&end_time)
            .ok_or_else(|| SpecialistError::InvalidTime(format!("end_time '{}'", end_time)))?;
        if start_time >= end_time {
            return Err(SpecialistError::InvertedWindow.into());
        }

        let role = self.directory.get_role(caller_id).await?;
        authorization::require(role, Capability::ManageAvailability)?;
        if self.directory.get_specialist(caller_id).await?.is_none() {
            return Err(SpecialistError::ProfileNotFound.into());
        }

        let window = self
            .store
            .insert_window(NewAvailabilityWindow {
                specialist_id: caller_id,
                day,
                start_time,
                end_time,
                is_active: request.is_active.unwrap_or(true),
            })
            .await?;

        info!("Availability {} created for specialist {} on {}", window.id, caller_id, day);
        Ok(window)
    }

    pub async fn update_availability(
        &self,
        caller_id: Uuid,
        window_id: Uuid,
        request: UpdateAvailabilityRequest,
    ) -> Result<AvailabilityWindow, AppError> {
        let existing = self.owned_window(caller_id, window_id).await?;

        let patch = AvailabilityPatch {
            day: request.day,
            start_time: parse_field("start_time", request.start_time.as_deref())?,
            end_time: parse_field("end_time", request.end_time.as_deref())?,
            is_active: request.is_active,
        };

        let start = patch.start_time.unwrap_or(existing.start_time);
        let end = patch.end_time.unwrap_or(existing.end_time);
        if start >= end {
            return Err(SpecialistError::InvertedWindow.into());
        }

        debug!("Updating availability {} for specialist {}", window_id, caller_id);
        self.store.update_window(window_id, patch).await
    }

    pub async fn delete_availability(&self, caller_id: Uuid, window_id: Uuid) -> Result<(), AppError> {
        self.owned_window(caller_id, window_id).await?;
        self.store.delete_window(window_id).await?;
        info!("Availability {} deleted by specialist {}", window_id, caller_id);
        Ok(())
    }

    async fn owned_window(&self, caller_id: Uuid, window_id: Uuid) -> Result<AvailabilityWindow, AppError> {
        let window = self
            .store
            .get_window(window_id)
            .await?
            .ok_or(SpecialistError::AvailabilityNotFound)?;

        if window.specialist_id != caller_id {
            return Err(SpecialistError::NotOwner.into());
        }
        Ok(window)
    }
}
