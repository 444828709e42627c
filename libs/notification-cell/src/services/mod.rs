pub mod email;
pub mod notifier;
pub mod reminders;
pub mod sms;
pub mod templates;

pub use email::{EmailSender, SendGridClient};
pub use notifier::{NotificationDirectory, NotificationService, Notifier, SupabaseNotificationDirectory};
pub use reminders::ReminderService;
pub use sms::{SmsSender, TwilioClient};
