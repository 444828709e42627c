pub mod booking;
pub mod conflict;
pub mod gateway;
pub mod payment;
pub mod pricing;
pub mod slots;
pub mod store;

pub use booking::BookingService;
pub use conflict::{find_conflicts, overlaps};
pub use gateway::{PaymentGateway, StripeGateway};
pub use payment::PaymentService;
pub use slots::generate_slots;
pub use store::{AppointmentStore, PaymentStore, SupabaseAppointmentStore, SupabasePaymentStore};
