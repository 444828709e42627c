use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Role;
use shared_models::authorization::{self, Capability};
use shared_models::error::AppError;

use crate::models::{Account, ContactCard, DayOfWeek, SpecialistError, SpecialistProfile, SpecialistSummary};
use crate::services::availability::{AvailabilityStore, SupabaseAvailabilityStore};

/// Read-only lookups over accounts and specialist profiles.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<Account>, AppError>;

    /// Profile keyed by the specialist's user id.
    async fn get_specialist(&self, user_id: Uuid) -> Result<Option<SpecialistProfile>, AppError>;

    async fn get_role(&self, user_id: Uuid) -> Result<Role, AppError> {
        self.get_user(user_id)
            .await?
            .map(|account| account.role)
            .ok_or_else(|| SpecialistError::UserNotFound.into())
    }
}

/// Listing and the admin-only verification flag.
#[async_trait]
pub trait SpecialistRegistry: Send + Sync {
    async fn list_verified(&self) -> Result<Vec<(SpecialistProfile, ContactCard)>, AppError>;

    async fn set_verified(&self, user_id: Uuid, verified: bool) -> Result<SpecialistProfile, AppError>;
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(flatten)]
    profile: SpecialistProfile,
    #[serde(default)]
    users: Option<ContactCard>,
}

pub struct SupabaseDirectory {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl Directory for SupabaseDirectory {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<Account>, AppError> {
        let path = format!("/rest/v1/users?id=eq.{}&select=id,name,email,phone,role", user_id);
        Ok(self.supabase.fetch_optional(&path, Some(&self.auth_token)).await?)
    }

    async fn get_specialist(&self, user_id: Uuid) -> Result<Option<SpecialistProfile>, AppError> {
        let path = format!("/rest/v1/specialists?user_id=eq.{}", user_id);
        Ok(self.supabase.fetch_optional(&path, Some(&self.auth_token)).await?)
    }
}

#[async_trait]
impl SpecialistRegistry for SupabaseDirectory {
    async fn list_verified(&self) -> Result<Vec<(SpecialistProfile, ContactCard)>, AppError> {
        let path = "/rest/v1/specialists?verified=eq.true&select=*,users(name,email)";
        let rows: Vec<ListingRow> = self
            .supabase
            .request(Method::GET, path, Some(&self.auth_token), None)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.users.map(|contact| (row.profile, contact)))
            .collect())
    }

    async fn set_verified(&self, user_id: Uuid, verified: bool) -> Result<SpecialistProfile, AppError> {
        let path = format!("/rest/v1/specialists?user_id=eq.{}", user_id);
        let rows: Vec<SpecialistProfile> = self
            .supabase
            .returning(Method::PATCH, &path, Some(&self.auth_token), json!({ "verified": verified }))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SpecialistError::ProfileNotFound.into())
    }
}

pub struct SpecialistService {
    directory: Arc<dyn Directory>,
    registry: Arc<dyn SpecialistRegistry>,
    availability: Arc<dyn AvailabilityStore>,
}

impl SpecialistService {
    pub fn new(
        directory: Arc<dyn Directory>,
        registry: Arc<dyn SpecialistRegistry>,
        availability: Arc<dyn AvailabilityStore>,
    ) -> Self {
        Self {
            directory,
            registry,
            availability,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let directory = Arc::new(SupabaseDirectory::new(supabase.clone(), auth_token));
        Self::new(
            directory.clone(),
            directory,
            Arc::new(SupabaseAvailabilityStore::new(supabase, auth_token)),
        )
    }

    /// Verified specialists; with a date, only those working that weekday.
    pub async fn list_specialists(&self, date: Option<NaiveDate>) -> Result<Vec<SpecialistSummary>, AppError> {
        let verified = self.registry.list_verified().await?;
        debug!("Found {} verified specialists", verified.len());

        let summaries = verified
            .into_iter()
            .map(|(profile, contact)| SpecialistSummary {
                user_id: profile.user_id,
                name: contact.name,
                email: contact.email,
                hourly_rate: profile.effective_hourly_rate(),
                credentials: profile.credentials,
                bio: profile.bio,
                availability: None,
            });

        let Some(date) = date else {
            return Ok(summaries.collect());
        };

        let day = DayOfWeek::from_date(date);
        let mut windows = self.availability.list_active_on(day).await?;
        windows.sort_by_key(|window| window.start_time);

        Ok(summaries
            .filter_map(|mut summary| {
                let window = windows.iter().find(|w| w.specialist_id == summary.user_id)?;
                summary.availability = Some(window.clone());
                Some(summary)
            })
            .collect())
    }

    pub async fn set_verification(
        &self,
        caller_id: Uuid,
        specialist_user_id: Uuid,
        verified: bool,
    ) -> Result<SpecialistProfile, AppError> {
        let role = self.directory.get_role(caller_id).await?;
        authorization::require(role, Capability::VerifySpecialists)?;

        let profile = self.registry.set_verified(specialist_user_id, verified).await?;
        info!(
            "Specialist {} verification set to {} by {}",
            specialist_user_id, verified, caller_id
        );
        Ok(profile)
    }
}
