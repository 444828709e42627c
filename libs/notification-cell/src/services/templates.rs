use crate::models::{EmailMessage, NotificationContext, NotificationEvent, SmsMessage};

/// The three messages of one notification event.
#[derive(Debug, Clone)]
pub struct RenderedNotification {
    pub client_email: EmailMessage,
    pub specialist_email: EmailMessage,
    pub client_sms: Option<SmsMessage>,
}

struct Wording {
    subject: &'static str,
    heading: &'static str,
    client_line: String,
    specialist_line: String,
    sms: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn wording_for(event: NotificationEvent, ctx: &NotificationContext, custom_message: Option<&str>) -> Wording {
    let specialist = &ctx.specialist.name;
    let client = &ctx.client.name;
    let date = ctx.appointment.date.format("%A, %B %-d, %Y").to_string();
    let start = ctx.appointment.start_time.format("%H:%M");

    match event {
        NotificationEvent::Confirmation => Wording {
            subject: "Appointment Confirmed - H.I.T.S.",
            heading: "Appointment Confirmed!",
            client_line: format!("Your appointment with {} has been confirmed.", specialist),
            specialist_line: format!(
                "You have a new confirmed appointment with {}. Payment has been processed.",
                client
            ),
            sms: format!(
                "H.I.T.S. Appointment Confirmed! {} on {} at {}. Total: ${:.2}",
                specialist, date, start, ctx.appointment.total_cost
            ),
        },
        NotificationEvent::Reminder => Wording {
            subject: "Appointment Reminder - Tomorrow - H.I.T.S.",
            heading: "Appointment Reminder",
            client_line: format!("This is a reminder about your appointment with {} tomorrow.", specialist),
            specialist_line: format!("This is a reminder about your appointment with {} tomorrow.", client),
            sms: format!("H.I.T.S. Reminder: appointment with {} tomorrow at {}.", specialist, start),
        },
        NotificationEvent::Cancellation => {
            let reason = custom_message.unwrap_or("The appointment has been cancelled.");
            Wording {
                subject: "Appointment Cancelled - H.I.T.S.",
                heading: "Appointment Cancelled",
                client_line: reason.to_string(),
                specialist_line: reason.to_string(),
                sms: format!("H.I.T.S.: Your appointment on {} was cancelled. {}", date, reason),
            }
        }
        NotificationEvent::Reschedule => {
            let reason = custom_message.unwrap_or("The appointment has been rescheduled.");
            Wording {
                subject: "Appointment Rescheduled - H.I.T.S.",
                heading: "Appointment Rescheduled",
                client_line: reason.to_string(),
                specialist_line: reason.to_string(),
                sms: format!("H.I.T.S.: Your appointment is now {} at {}. {}", date, start, reason),
            }
        }
        NotificationEvent::DisputeResolved => {
            let outcome = custom_message.unwrap_or("The dispute on this appointment has been resolved.");
            Wording {
                subject: "Dispute Resolved - H.I.T.S.",
                heading: "Dispute Resolved",
                client_line: outcome.to_string(),
                specialist_line: outcome.to_string(),
                sms: format!("H.I.T.S.: {}", outcome),
            }
        }
    }
}

fn email_body(heading: &str, recipient: &str, line: &str, ctx: &NotificationContext) -> String {
    let appointment = &ctx.appointment;
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #333;">{heading}</h1>
  <p>Hello {recipient},</p>
  <p>{line}</p>
  <div style="background: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Date:</strong> {date}</p>
    <p><strong>Time:</strong> {start} - {end}</p>
    <p><strong>Service:</strong> {service}</p>
    <p><strong>Total Cost:</strong> ${cost:.2}</p>
  </div>
  <p>Best regards,<br>The H.I.T.S. Team</p>
</div>"#,
        heading = heading,
        recipient = escape_html(recipient),
        line = escape_html(line),
        date = appointment.date.format("%A, %B %-d, %Y"),
        start = appointment.start_time.format("%H:%M"),
        end = appointment.end_time.format("%H:%M"),
        service = escape_html(&appointment.description),
        cost = appointment.total_cost,
    )
}

pub fn render(
    event: NotificationEvent,
    ctx: &NotificationContext,
    custom_message: Option<&str>,
) -> RenderedNotification {
    let wording = wording_for(event, ctx, custom_message);

    RenderedNotification {
        client_email: EmailMessage {
            to: ctx.client.email.clone(),
            subject: wording.subject.to_string(),
            html: email_body(wording.heading, &ctx.client.name, &wording.client_line, ctx),
        },
        specialist_email: EmailMessage {
            to: ctx.specialist.email.clone(),
            subject: wording.subject.to_string(),
            html: email_body(wording.heading, &ctx.specialist.name, &wording.specialist_line, ctx),
        },
        client_sms: ctx.sms_recipient().map(|phone| SmsMessage {
            to: phone.to_string(),
            body: wording.sms,
        }),
    }
}
