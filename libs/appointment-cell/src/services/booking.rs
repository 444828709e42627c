use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use notification_cell::models::NotificationEvent;
use notification_cell::services::{NotificationService, Notifier};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;
use shared_models::auth::Role;
use shared_models::authorization::{self, Capability, Party};
use shared_models::clock::parse_request_clock;
use shared_models::error::AppError;
use specialist_cell::models::{AvailabilityWindow, DayOfWeek, SpecialistError};
use specialist_cell::services::{AvailabilityStore, Directory, SupabaseAvailabilityStore, SupabaseDirectory};

use crate::models::{
    ActionResponse, Appointment, AppointmentError, AppointmentScope, BookAppointmentRequest,
    BookingResponse, CheckoutRequest, NewAppointment, NewPayment, PaymentStatus, RescheduleRequest,
    SlotListing, SlotQuery, StatusUpdateResponse,
};
use crate::services::conflict::find_conflicts;
use crate::services::gateway::{PaymentGateway, StripeGateway};
use crate::services::pricing;
use crate::services::slots::generate_slots;
use crate::services::store::{
    AppointmentStore, PaymentStore, SupabaseAppointmentStore, SupabasePaymentStore,
};

const PAYMENT_METHOD: &str = "stripe";

fn time_field(field: &str, raw: &str) -> Result<NaiveTime, AppointmentError> {
    parse_request_clock(raw).ok_or_else(|| AppointmentError::InvalidTime(format!("{} '{}'", field, raw)))
}

/// Booking core: validation pipeline, checkout hand-off and the role-gated
/// status machine.
pub struct BookingService {
    directory: Arc<dyn Directory>,
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl BookingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        availability: Arc<dyn AvailabilityStore>,
        appointments: Arc<dyn AppointmentStore>,
        payments: Arc<dyn PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            directory,
            availability,
            appointments,
            payments,
            gateway,
            notifier,
        }
    }

    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseDirectory::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseAvailabilityStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabaseAppointmentStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabasePaymentStore::new(supabase, auth_token)),
            Arc::new(StripeGateway::new(config)),
            Arc::new(NotificationService::from_config(config, auth_token)),
        )
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    pub async fn book_appointment(
        &self,
        caller_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<BookingResponse, AppError> {
        // 1. Required fields
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let (specialist_id, date, start_raw, end_raw, description) = match (
            request.specialist_id,
            request.date,
            request.start_time.as_deref(),
            request.end_time.as_deref(),
            description,
        ) {
            (Some(s), Some(d), Some(start), Some(end), Some(desc)) => (s, d, start, end, desc.to_string()),
            _ => {
                return Err(AppointmentError::MissingFields(
                    "specialist_id, date, start_time, end_time, description".to_string(),
                )
                .into())
            }
        };
        let start_time = time_field("start_time", start_raw)?;
        let end_time = time_field("end_time", end_raw)?;

        // 2. Caller must be a client
        let caller = self
            .directory
            .get_user(caller_id)
            .await?
            .ok_or(SpecialistError::UserNotFound)?;
        authorization::require(caller.role, Capability::BookAppointment)?;

        // 3. Specialist exists and is verified
        let profile = self
            .directory
            .get_specialist(specialist_id)
            .await?
            .ok_or(AppointmentError::SpecialistNotFound)?;
        if !profile.verified {
            warn!("Booking attempt for unverified specialist {}", specialist_id);
            return Err(AppointmentError::SpecialistNotVerified.into());
        }

        // 4-5. Availability window for the weekday, request fully inside it
        let window = self.active_window(specialist_id, date).await?;
        Self::check_within(&window, start_time, end_time)?;

        // 6. No overlap with pending or confirmed bookings
        let existing = self.appointments.list_blocking(specialist_id, date).await?;
        if !find_conflicts(start_time, end_time, &existing, None).is_empty() {
            warn!(
                "Slot {}-{} on {} already booked for specialist {}",
                start_time, end_time, date, specialist_id
            );
            return Err(AppointmentError::SlotAlreadyBooked.into());
        }

        // 7. Cost, fixed at creation
        let total_cost = pricing::total_cost(start_time, end_time, profile.effective_hourly_rate());

        // 8. Pending appointment
        let appointment = self
            .appointments
            .insert_appointment(NewAppointment {
                client_id: caller_id,
                specialist_id,
                date,
                start_time,
                end_time,
                status: AppointmentStatus::Pending,
                total_cost,
                description: description.clone(),
                client_phone: request.client_phone.filter(|p| !p.trim().is_empty()),
            })
            .await?;
        debug!("Created pending appointment {} ({:.2})", appointment.id, total_cost);

        // 9. Pending payment, or undo the appointment
        let payment = match self
            .payments
            .insert_payment(NewPayment {
                appointment_id: appointment.id,
                amount: total_cost,
                status: PaymentStatus::Pending,
                method: PAYMENT_METHOD.to_string(),
            })
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                error!("Payment record for appointment {} failed: {}", appointment.id, e);
                if let Err(cleanup) = self.appointments.delete_appointment(appointment.id).await {
                    error!("Failed to remove appointment {} after payment failure: {}", appointment.id, cleanup);
                }
                return Err(e);
            }
        };

        // 10. Checkout session
        let specialist_name = match self.directory.get_user(specialist_id).await {
            Ok(Some(account)) => account.name,
            _ => "Specialist".to_string(),
        };
        let session = self
            .gateway
            .create_checkout(&CheckoutRequest {
                appointment_id: appointment.id,
                payment_id: payment.id,
                client_id: caller_id,
                specialist_id,
                customer_email: caller.email,
                specialist_name,
                description,
                date,
                start_time,
                end_time,
                amount: total_cost,
            })
            .await
            .map_err(|e| {
                warn!("Checkout for appointment {} failed; left pending: {}", appointment.id, e);
                e
            })?;

        if let Err(e) = self.payments.attach_session(payment.id, &session.id).await {
            warn!("Could not store session {} on payment {}: {}", session.id, payment.id, e);
        }

        // 11. Redirect target
        info!(
            "Appointment {} booked by client {} with specialist {}; awaiting payment",
            appointment.id, caller_id, specialist_id
        );
        Ok(BookingResponse {
            appointment_id: appointment.id,
            payment_id: payment.id,
            session_id: session.id,
            checkout_url: session.url,
        })
    }

    pub async fn available_slots(&self, query: SlotQuery) -> Result<SlotListing, AppError> {
        let duration_hours = query.duration_hours.unwrap_or(1);
        if duration_hours == 0 {
            return Err(AppointmentError::InvalidDuration.into());
        }

        let profile = self
            .directory
            .get_specialist(query.specialist_id)
            .await?
            .ok_or(AppointmentError::SpecialistNotFound)?;
        if !profile.verified {
            return Err(AppointmentError::SpecialistNotVerified.into());
        }

        let window = self.active_window(query.specialist_id, query.date).await?;
        let existing = self.appointments.list_blocking(query.specialist_id, query.date).await?;
        let slots = generate_slots(&window, duration_hours, &existing);

        debug!(
            "{} slots of {}h for specialist {} on {}",
            slots.len(),
            duration_hours,
            query.specialist_id,
            query.date
        );
        Ok(SlotListing {
            specialist_id: query.specialist_id,
            date: query.date,
            duration_hours,
            window,
            slots,
        })
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_appointment(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppError> {
        let (appointment, _) = self.load_for(caller_id, appointment_id).await?;
        Ok(appointment)
    }

    pub async fn list_appointments(&self, caller_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let role = self.directory.get_role(caller_id).await?;
        let scope = match role {
            _ if authorization::has_capability(role, Capability::ViewAllRecords) => AppointmentScope::All,
            Role::Specialist => AppointmentScope::Specialist(caller_id),
            _ => AppointmentScope::Client(caller_id),
        };
        self.appointments.list_appointments(scope).await
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    /// Plain status change. Does not notify anyone.
    pub async fn update_status(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        requested: AppointmentStatus,
    ) -> Result<StatusUpdateResponse, AppError> {
        let (appointment, party) = self.load_for(caller_id, appointment_id).await?;
        authorization::authorize_transition(party, appointment.status, requested)?;

        let updated = self.appointments.update_status(appointment_id, requested).await?;
        info!(
            "Appointment {} moved {} -> {} by {}",
            appointment_id,
            appointment.status,
            updated.status,
            party.label()
        );

        Ok(StatusUpdateResponse {
            appointment_id,
            status: updated.status,
        })
    }

    /// Cancellation that tells both parties why.
    pub async fn cancel_with_reason(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<ActionResponse, AppError> {
        let (appointment, party) = self.load_for(caller_id, appointment_id).await?;
        authorization::authorize_transition(party, appointment.status, AppointmentStatus::Cancelled)?;

        self.appointments
            .update_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;
        info!("Appointment {} cancelled by {}", appointment_id, party.label());

        let message = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("Cancelled by {}", party.label()));
        self.notify_quietly(appointment_id, NotificationEvent::Cancellation, Some(&message))
            .await;

        Ok(ActionResponse::ok("Appointment cancelled successfully"))
    }

    /// Moves an appointment in place, keeping its cost.
    pub async fn reschedule(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleRequest,
    ) -> Result<ActionResponse, AppError> {
        let (date, start_raw, end_raw) = match (
            request.new_date,
            request.new_start_time.as_deref(),
            request.new_end_time.as_deref(),
        ) {
            (Some(date), Some(start), Some(end)) => (date, start, end),
            _ => {
                return Err(AppointmentError::MissingFields(
                    "new_date, new_start_time, new_end_time".to_string(),
                )
                .into())
            }
        };
        let start_time = time_field("new_start_time", start_raw)?;
        let end_time = time_field("new_end_time", end_raw)?;

        let (appointment, party) = self.load_for(caller_id, appointment_id).await?;
        if !appointment.status.blocks_schedule() {
            return Err(AppointmentError::NotReschedulable(appointment.status).into());
        }

        let window = self.active_window(appointment.specialist_id, date).await?;
        Self::check_within(&window, start_time, end_time)?;

        let existing = self
            .appointments
            .list_blocking(appointment.specialist_id, date)
            .await?;
        if !find_conflicts(start_time, end_time, &existing, Some(appointment_id)).is_empty() {
            return Err(AppointmentError::SlotAlreadyBooked.into());
        }

        self.appointments
            .update_schedule(appointment_id, date, start_time, end_time)
            .await?;
        info!(
            "Appointment {} rescheduled to {} {}-{} by {}",
            appointment_id,
            date,
            start_time,
            end_time,
            party.label()
        );

        let message = request
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("Rescheduled by {}", party.label()));
        self.notify_quietly(appointment_id, NotificationEvent::Reschedule, Some(&message))
            .await;

        Ok(ActionResponse::ok("Appointment rescheduled successfully"))
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn active_window(&self, specialist_id: Uuid, date: NaiveDate) -> Result<AvailabilityWindow, AppError> {
        let day = DayOfWeek::from_date(date);
        self.availability
            .get_active_window(specialist_id, day)
            .await?
            .ok_or_else(|| {
                debug!("Specialist {} has no active window on {}", specialist_id, day);
                AppointmentError::NotAvailableOnDay.into()
            })
    }

    fn check_within(window: &AvailabilityWindow, start: NaiveTime, end: NaiveTime) -> Result<(), AppointmentError> {
        if start >= end {
            return Err(AppointmentError::InvertedTimes);
        }
        if !window.contains(start, end) {
            return Err(AppointmentError::OutsideAvailability);
        }
        Ok(())
    }

    /// The appointment and the caller's relationship to it; outsiders are refused.
    async fn load_for(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<(Appointment, Party), AppError> {
        let appointment = self
            .appointments
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let party = match Party::participant(caller_id, appointment.client_id, appointment.specialist_id) {
            Party::Outsider => {
                let role = self.directory.get_role(caller_id).await?;
                Party::resolve(caller_id, role, appointment.client_id, appointment.specialist_id)
            }
            party => party,
        };
        authorization::require_involved(party)?;

        Ok((appointment, party))
    }

    async fn notify_quietly(&self, appointment_id: Uuid, event: NotificationEvent, message: Option<&str>) {
        match self.notifier.notify(appointment_id, event, message).await {
            Ok(report) if !report.is_clean() => {
                warn!("{} notification for {} partially failed: {:?}", event, appointment_id, report.errors)
            }
            Ok(_) => {}
            Err(e) => warn!("{} notification for {} failed: {}", event, appointment_id, e),
        }
    }
}
