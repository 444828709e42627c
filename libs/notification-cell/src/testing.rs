//! Recording fakes for the notifier and its providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use shared_database::audit::{AuditEntry, AuditLog};
use shared_models::error::AppError;

use crate::models::{
    EmailMessage, NotificationContext, NotificationError, NotificationEvent, NotificationReport,
    SmsMessage,
};
use crate::services::{EmailSender, NotificationDirectory, Notifier, SmsSender};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rejected(provider: &'static str) -> NotificationError {
    NotificationError::Provider {
        provider,
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotification {
    pub appointment_id: Uuid,
    pub event: NotificationEvent,
    pub custom_message: Option<String>,
}

/// Notifier that records calls; `failing()` makes every call return an upstream error.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<RecordedNotification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn calls(&self) -> Vec<RecordedNotification> {
        guard(&self.calls).clone()
    }

    pub fn count(&self, event: NotificationEvent) -> usize {
        guard(&self.calls).iter().filter(|call| call.event == event).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        appointment_id: Uuid,
        event: NotificationEvent,
        custom_message: Option<&str>,
    ) -> Result<NotificationReport, AppError> {
        guard(&self.calls).push(RecordedNotification {
            appointment_id,
            event,
            custom_message: custom_message.map(str::to_string),
        });

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::upstream("Notification provider unavailable", true));
        }
        Ok(NotificationReport {
            emails_sent: 2,
            sms_sent: 0,
            errors: Vec::new(),
        })
    }
}

/// Email sender that records messages and rejects any recipient in `fail_for`.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail_for: Mutex<Vec<String>>,
}

impl RecordingEmailSender {
    pub fn fail_for(&self, address: &str) {
        guard(&self.fail_for).push(address.to_string());
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        guard(&self.sent).clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if guard(&self.fail_for).contains(&message.to) {
            return Err(rejected("sendgrid"));
        }
        guard(&self.sent).push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSmsSender {
    sent: Mutex<Vec<SmsMessage>>,
    fail: AtomicBool,
}

impl RecordingSmsSender {
    pub fn failing() -> Self {
        let sender = Self::default();
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }

    pub fn sent(&self) -> Vec<SmsMessage> {
        guard(&self.sent).clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(rejected("twilio"));
        }
        guard(&self.sent).push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationDirectory {
    contexts: Mutex<HashMap<Uuid, (NotificationContext, bool)>>,
}

impl InMemoryNotificationDirectory {
    /// Registers an appointment; `confirmed` controls whether the reminder query sees it.
    pub fn insert(&self, ctx: NotificationContext, confirmed: bool) {
        guard(&self.contexts).insert(ctx.appointment.id, (ctx, confirmed));
    }
}

#[async_trait]
impl NotificationDirectory for InMemoryNotificationDirectory {
    async fn load_context(&self, appointment_id: Uuid) -> Result<Option<NotificationContext>, AppError> {
        Ok(guard(&self.contexts).get(&appointment_id).map(|(ctx, _)| ctx.clone()))
    }

    async fn confirmed_appointments_on(&self, date: NaiveDate) -> Result<Vec<Uuid>, AppError> {
        Ok(guard(&self.contexts)
            .values()
            .filter(|(ctx, confirmed)| *confirmed && ctx.appointment.date == date)
            .map(|(ctx, _)| ctx.appointment.id)
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditLog {
    pub fn actions(&self) -> Vec<String> {
        guard(&self.entries).iter().map(|entry| entry.action.clone()).collect()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        guard(&self.entries).clone()
    }
}

#[async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, entry: AuditEntry) {
        guard(&self.entries).push(entry);
    }
}
