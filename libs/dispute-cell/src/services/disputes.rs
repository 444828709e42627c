use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{ActionResponse, AppointmentError};
use appointment_cell::services::{AppointmentStore, SupabaseAppointmentStore};
use notification_cell::models::NotificationEvent;
use notification_cell::services::{NotificationService, Notifier};
use shared_config::AppConfig;
use shared_database::audit::{AuditEntry, AuditLog, SupabaseAuditLog};
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;
use shared_models::authorization::{self, Capability, Party};
use shared_models::error::AppError;
use specialist_cell::services::{Directory, SupabaseDirectory};

use crate::models::{
    CreateDisputeRequest, Dispute, DisputeCreated, DisputeError, DisputeResolution, DisputeScope, DisputeStatus,
    NewDispute, ResolveDisputeRequest,
};
use crate::services::store::{DisputeStore, SupabaseDisputeStore};

fn required(value: Option<String>, field: &'static str) -> Result<String, DisputeError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DisputeError::MissingFields(field))
}

pub struct DisputeService {
    directory: Arc<dyn Directory>,
    appointments: Arc<dyn AppointmentStore>,
    disputes: Arc<dyn DisputeStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
}

impl DisputeService {
    pub fn new(
        directory: Arc<dyn Directory>,
        appointments: Arc<dyn AppointmentStore>,
        disputes: Arc<dyn DisputeStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            directory,
            appointments,
            disputes,
            notifier,
            audit,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseDirectory::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseAppointmentStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseDisputeStore::new(supabase.clone(), auth_token)),
            Arc::new(NotificationService::from_config(config, auth_token)),
            Arc::new(SupabaseAuditLog::new(supabase, auth_token)),
        )
    }

    /// Raised by the appointment's client or specialist once it is confirmed
    /// or completed; one open dispute per caller per appointment.
    pub async fn create_dispute(
        &self,
        caller_id: Uuid,
        request: CreateDisputeRequest,
    ) -> Result<DisputeCreated, AppError> {
        let appointment_id = request
            .appointment_id
            .ok_or(DisputeError::MissingFields("appointment_id and reason"))?;
        let reason = required(request.reason, "appointment_id and reason")?;

        let appointment = self
            .appointments
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let party = Party::participant(caller_id, appointment.client_id, appointment.specialist_id);
        if !party.is_involved() {
            warn!("User {} tried to dispute appointment {} they are not part of", caller_id, appointment_id);
            return Err(DisputeError::NotAParticipant.into());
        }

        if !matches!(
            appointment.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Completed
        ) {
            return Err(DisputeError::NotDisputable(appointment.status).into());
        }

        if self.disputes.find_open(appointment_id, caller_id).await?.is_some() {
            debug!("User {} already has an open dispute on {}", caller_id, appointment_id);
            return Err(DisputeError::DuplicateOpenDispute.into());
        }

        let dispute = self
            .disputes
            .insert_dispute(NewDispute {
                appointment_id,
                raised_by: caller_id,
                reason: reason.clone(),
                status: DisputeStatus::Open,
            })
            .await?;

        info!(
            "Dispute {} raised on appointment {} by {}",
            dispute.id,
            appointment_id,
            party.label()
        );

        self.audit
            .record(AuditEntry::new(
                "dispute_created",
                Some(caller_id),
                json!({
                    "dispute_id": dispute.id,
                    "appointment_id": appointment_id,
                    "specialist_id": appointment.specialist_id,
                    "client_id": appointment.client_id,
                    "reason": reason,
                }),
            ))
            .await;

        Ok(DisputeCreated {
            dispute_id: dispute.id,
            status: dispute.status,
        })
    }

    pub async fn list_disputes(&self, caller_id: Uuid) -> Result<Vec<Dispute>, AppError> {
        let role = self.directory.get_role(caller_id).await?;
        let scope = if authorization::has_capability(role, Capability::ViewAllRecords) {
            DisputeScope::All
        } else {
            DisputeScope::RaisedBy(caller_id)
        };
        self.disputes.list_disputes(scope).await
    }

    pub async fn resolve_dispute(
        &self,
        caller_id: Uuid,
        dispute_id: Uuid,
        request: ResolveDisputeRequest,
    ) -> Result<ActionResponse, AppError> {
        let role = self.directory.get_role(caller_id).await?;
        authorization::require(role, Capability::ResolveDisputes)?;

        let notes = required(request.resolution_notes, "resolution_notes")?;

        let dispute = self
            .disputes
            .get_dispute(dispute_id)
            .await?
            .ok_or(DisputeError::NotFound)?;
        if dispute.status == DisputeStatus::Resolved {
            return Err(DisputeError::AlreadyResolved.into());
        }

        let resolved = self
            .disputes
            .resolve_dispute(
                dispute_id,
                DisputeResolution {
                    resolution_notes: notes.clone(),
                    resolved_by: caller_id,
                    resolved_at: Utc::now(),
                },
            )
            .await?;
        info!("Dispute {} resolved by admin {}", dispute_id, caller_id);

        self.audit
            .record(AuditEntry::new(
                "dispute_resolved",
                Some(caller_id),
                json!({
                    "dispute_id": dispute_id,
                    "appointment_id": resolved.appointment_id,
                    "raised_by": resolved.raised_by,
                    "resolution_notes": notes,
                }),
            ))
            .await;

        let message = format!("Your dispute has been resolved. Resolution: {}", notes);
        match self
            .notifier
            .notify(resolved.appointment_id, NotificationEvent::DisputeResolved, Some(&message))
            .await
        {
            Ok(report) if !report.is_clean() => {
                warn!("Dispute {} notice partially failed: {:?}", dispute_id, report.errors)
            }
            Ok(_) => {}
            Err(e) => warn!("Dispute {} notice failed: {}", dispute_id, e),
        }

        Ok(ActionResponse::ok("Dispute resolved successfully"))
    }
}
