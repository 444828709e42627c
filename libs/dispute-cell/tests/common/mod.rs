#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use appointment_cell::models::Appointment;
use appointment_cell::testing::InMemoryAppointmentStore;
use dispute_cell::services::{DisputeService, ReviewService};
use dispute_cell::testing::{InMemoryDisputeStore, InMemoryReviewStore};
use notification_cell::testing::{RecordingAuditLog, RecordingNotifier};
use shared_models::appointment::AppointmentStatus;
use specialist_cell::testing::InMemoryDirectory;

pub struct Harness {
    pub directory: Arc<InMemoryDirectory>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub disputes: Arc<InMemoryDisputeStore>,
    pub reviews: Arc<InMemoryReviewStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<RecordingAuditLog>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::default()),
            appointments: Arc::new(InMemoryAppointmentStore::default()),
            disputes: Arc::new(InMemoryDisputeStore::default()),
            reviews: Arc::new(InMemoryReviewStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            audit: Arc::new(RecordingAuditLog::default()),
        }
    }

    pub fn dispute_service(&self) -> DisputeService {
        DisputeService::new(
            self.directory.clone(),
            self.appointments.clone(),
            self.disputes.clone(),
            self.notifier.clone(),
            self.audit.clone(),
        )
    }

    pub fn review_service(&self) -> ReviewService {
        ReviewService::new(self.appointments.clone(), self.reviews.clone(), self.audit.clone())
    }

    /// A fresh client/specialist pair with one appointment in `status`.
    pub fn appointment(&self, status: AppointmentStatus) -> Appointment {
        let client = self.directory.add_client();
        let specialist = self.directory.add_specialist(true, None);
        let appointment = self.appointments.seed(
            client,
            specialist,
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            status,
        );
        self.reviews.link(appointment.id, client, specialist);
        appointment
    }
}
