#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::{BookingService, PaymentService};
use appointment_cell::testing::{FakeGateway, InMemoryAppointmentStore, InMemoryPaymentStore};
use notification_cell::testing::RecordingNotifier;
use specialist_cell::models::DayOfWeek;
use specialist_cell::testing::{InMemoryAvailabilityStore, InMemoryDirectory};

pub struct Harness {
    pub directory: Arc<InMemoryDirectory>,
    pub availability: Arc<InMemoryAvailabilityStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeGateway::default(), RecordingNotifier::default())
    }

    pub fn with(gateway: FakeGateway, notifier: RecordingNotifier) -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::default()),
            availability: Arc::new(InMemoryAvailabilityStore::default()),
            appointments: Arc::new(InMemoryAppointmentStore::default()),
            payments: Arc::new(InMemoryPaymentStore::default()),
            gateway: Arc::new(gateway),
            notifier: Arc::new(notifier),
        }
    }

    pub fn booking(&self) -> BookingService {
        BookingService::new(
            self.directory.clone(),
            self.availability.clone(),
            self.appointments.clone(),
            self.payments.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
        )
    }

    pub fn payment_service(&self) -> PaymentService {
        PaymentService::new(
            self.appointments.clone(),
            self.payments.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
        )
    }

    /// Verified specialist working Mondays 09:00-17:00 at `rate`.
    pub fn monday_specialist(&self, rate: Option<f64>) -> Uuid {
        let specialist = self.directory.add_specialist(true, rate);
        self.availability.add_window(specialist, DayOfWeek::Monday, "09:00", "17:00");
        specialist
    }
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn request(specialist_id: Uuid, date: NaiveDate, start: &str, end: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        specialist_id: Some(specialist_id),
        date: Some(date),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        description: Some("Office network setup".to_string()),
        client_phone: None,
    }
}
