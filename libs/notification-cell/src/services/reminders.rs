use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde_json::json;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::audit::{AuditEntry, AuditLog, SupabaseAuditLog};
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{NotificationEvent, ReminderRunReport};
use crate::services::notifier::{
    NotificationDirectory, NotificationService, Notifier, SupabaseNotificationDirectory,
};

/// Daily job reminding both parties of tomorrow's confirmed appointments.
pub struct ReminderService {
    directory: Arc<dyn NotificationDirectory>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
}

impl ReminderService {
    pub fn new(
        directory: Arc<dyn NotificationDirectory>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            directory,
            notifier,
            audit,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseNotificationDirectory::new(supabase.clone(), auth_token)),
            Arc::new(NotificationService::from_config(config, auth_token)),
            Arc::new(SupabaseAuditLog::new(supabase, auth_token)),
        )
    }

    pub async fn run(&self, today: NaiveDate) -> Result<ReminderRunReport, AppError> {
        let date = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Internal(format!("No day after {}", today)))?;

        let appointments = self.directory.confirmed_appointments_on(date).await?;
        info!("Sending reminders for {} appointments on {}", appointments.len(), date);

        let mut processed = 0;
        let mut errors = Vec::new();
        for appointment_id in &appointments {
            match self
                .notifier
                .notify(*appointment_id, NotificationEvent::Reminder, None)
                .await
            {
                Ok(_) => processed += 1,
                Err(e) => {
                    warn!("Reminder for appointment {} failed: {}", appointment_id, e);
                    errors.push(format!("Appointment {}: {}", appointment_id, e));
                }
            }
        }

        let report = ReminderRunReport {
            date,
            appointments_found: appointments.len(),
            appointments_processed: processed,
            errors,
        };

        self.audit
            .record(AuditEntry::new("cron_reminders_executed", None, json!(report)))
            .await;

        Ok(report)
    }
}
