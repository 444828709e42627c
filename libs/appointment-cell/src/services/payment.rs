use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::NotificationEvent;
use notification_cell::services::{NotificationService, Notifier};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::AppError;

use crate::models::{AppointmentError, GatewayEvent, GatewayEventKind, PaymentStatus, WebhookOutcome};
use crate::services::gateway::{PaymentGateway, StripeGateway};
use crate::services::store::{AppointmentStore, PaymentStore, SupabaseAppointmentStore, SupabasePaymentStore};

/// Applies verified gateway events to payments and appointments.
///
/// Redelivery is safe: state is only advanced from where it still needs to
/// go, and the confirmation notice goes out on the pending -> confirmed step
/// alone.
pub struct PaymentService {
    appointments: Arc<dyn AppointmentStore>,
    payments: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        payments: Arc<dyn PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            appointments,
            payments,
            gateway,
            notifier,
        }
    }

    /// Webhooks carry no user session; `auth_token` is the service key.
    pub fn from_config(config: &AppConfig, auth_token: &str) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::new(
            Arc::new(SupabaseAppointmentStore::new(supabase.clone(), auth_token)),
            Arc::new(SupabasePaymentStore::new(supabase, auth_token)),
            Arc::new(StripeGateway::new(config)),
            Arc::new(NotificationService::from_config(config, auth_token)),
        )
    }

    pub async fn handle_webhook(&self, payload: &[u8], signature_header: &str) -> Result<WebhookOutcome, AppError> {
        let event = self.gateway.construct_event(payload, signature_header)?;
        debug!("Verified gateway event {} ({:?})", event.id, event.kind);

        match &event.kind {
            GatewayEventKind::CheckoutCompleted => self.checkout_completed(&event).await,
            GatewayEventKind::CheckoutExpired => self.checkout_expired(&event).await,
            GatewayEventKind::Other(kind) => {
                debug!("Ignoring gateway event type {}", kind);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn checkout_completed(&self, event: &GatewayEvent) -> Result<WebhookOutcome, AppError> {
        let (appointment_id, payment_id) = match (event.metadata.appointment_id, event.metadata.payment_id) {
            (Some(appointment_id), Some(payment_id)) => (appointment_id, payment_id),
            _ => {
                warn!("Checkout session {} completed without booking metadata", event.session_id);
                return Err(AppointmentError::MissingMetadata.into());
            }
        };

        let payment = self
            .payments
            .get_payment(payment_id)
            .await?
            .ok_or(AppointmentError::PaymentNotFound)?;
        if payment.appointment_id != appointment_id {
            warn!(
                "Event {} names appointment {} but payment {} belongs to {}",
                event.id, appointment_id, payment_id, payment.appointment_id
            );
            return Err(AppointmentError::MetadataMismatch(payment_id).into());
        }

        if payment.status == PaymentStatus::Paid {
            debug!("Payment {} already paid", payment_id);
        } else {
            self.payments
                .mark_paid(payment_id, event.transaction_reference())
                .await?;
            info!("Payment {} marked paid ({})", payment_id, event.transaction_reference());
        }

        let appointment = self
            .appointments
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        match appointment.status {
            AppointmentStatus::Pending => {
                self.appointments
                    .update_status(appointment_id, AppointmentStatus::Confirmed)
                    .await?;
                info!("Appointment {} confirmed by payment {}", appointment_id, payment_id);
                self.send_confirmation(appointment_id).await;
                Ok(WebhookOutcome::Confirmed)
            }
            AppointmentStatus::Confirmed => {
                debug!("Appointment {} already confirmed; redelivery ignored", appointment_id);
                Ok(WebhookOutcome::AlreadyConfirmed)
            }
            closed => {
                warn!(
                    "Payment {} settled for appointment {} which is already {}",
                    payment_id, appointment_id, closed
                );
                Ok(WebhookOutcome::PaidForClosedAppointment)
            }
        }
    }

    async fn checkout_expired(&self, event: &GatewayEvent) -> Result<WebhookOutcome, AppError> {
        let Some(payment_id) = event.metadata.payment_id else {
            debug!("Expired session {} carries no payment id", event.session_id);
            return Ok(WebhookOutcome::Ignored);
        };

        match self.payments.get_payment(payment_id).await? {
            Some(payment) if payment.status == PaymentStatus::Paid => {
                warn!("Expiry for session {} arrived after payment {} was paid", event.session_id, payment_id);
                Ok(WebhookOutcome::Ignored)
            }
            Some(_) => {
                self.payments.reset_pending(payment_id).await?;
                info!("Payment {} released back to pending after session expiry", payment_id);
                Ok(WebhookOutcome::PaymentReleased)
            }
            None => Err(AppointmentError::PaymentNotFound.into()),
        }
    }

    async fn send_confirmation(&self, appointment_id: Uuid) {
        match self
            .notifier
            .notify(appointment_id, NotificationEvent::Confirmation, None)
            .await
        {
            Ok(report) if !report.is_clean() => {
                warn!("Confirmation for {} partially failed: {:?}", appointment_id, report.errors)
            }
            Ok(_) => {}
            Err(e) => warn!("Confirmation for {} failed: {}", appointment_id, e),
        }
    }
}
