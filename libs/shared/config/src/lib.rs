use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base_url: String,
    pub payment_currency: String,
    pub sendgrid_api_key: String,
    pub sendgrid_from_email: String,
    pub sendgrid_api_base_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub twilio_api_base_url: String,
    pub app_base_url: String,
    pub cron_secret: Option<String>,
    pub http_timeout_secs: u64,
    pub webhook_tolerance_secs: i64,
    pub server_port: u16,
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

fn with_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using default", key);
        default.to_string()
    })
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} is not a valid value ({}), using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_api_base_url: "https://api.stripe.com".to_string(),
            payment_currency: "usd".to_string(),
            sendgrid_api_key: String::new(),
            sendgrid_from_email: "noreply@hits-app.com".to_string(),
            sendgrid_api_base_url: "https://api.sendgrid.com".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_from_number: String::new(),
            twilio_api_base_url: "https://api.twilio.com".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
            cron_secret: None,
            http_timeout_secs: 10,
            webhook_tolerance_secs: 300,
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_anon_key: required("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET"),
            stripe_secret_key: required("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base_url: with_default("STRIPE_API_BASE_URL", &defaults.stripe_api_base_url),
            payment_currency: with_default("PAYMENT_CURRENCY", &defaults.payment_currency),
            sendgrid_api_key: required("SENDGRID_API_KEY"),
            sendgrid_from_email: with_default("SENDGRID_FROM_EMAIL", &defaults.sendgrid_from_email),
            sendgrid_api_base_url: with_default("SENDGRID_API_BASE_URL", &defaults.sendgrid_api_base_url),
            twilio_account_sid: required("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: required("TWILIO_AUTH_TOKEN"),
            twilio_from_number: required("TWILIO_PHONE_NUMBER"),
            twilio_api_base_url: with_default("TWILIO_API_BASE_URL", &defaults.twilio_api_base_url),
            app_base_url: with_default("APP_BASE_URL", &defaults.app_base_url),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            http_timeout_secs: parsed_or("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            webhook_tolerance_secs: parsed_or("WEBHOOK_TOLERANCE_SECS", defaults.webhook_tolerance_secs),
            server_port: parsed_or("PORT", defaults.server_port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if !config.is_payments_configured() {
            warn!("Stripe not configured - bookings cannot open checkout sessions");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payments_configured(&self) -> bool {
        !self.stripe_secret_key.is_empty() && !self.stripe_webhook_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.sendgrid_api_key.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
    }

    /// Upper bound applied to every outbound HTTP call.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Key used for system paths (webhooks, scheduled jobs) that act without a user token.
    pub fn service_token(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_providers() {
        let config = AppConfig::default();
        assert_eq!(config.stripe_api_base_url, "https://api.stripe.com");
        assert_eq!(config.sendgrid_from_email, "noreply@hits-app.com");
        assert_eq!(config.payment_currency, "usd");
        assert!(!config.is_configured());
        assert!(!config.is_payments_configured());
    }

    #[test]
    fn service_token_falls_back_to_anon_key() {
        let mut config = AppConfig {
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.service_token(), "anon");

        config.supabase_service_role_key = "service".to_string();
        assert_eq!(config.service_token(), "service");
    }

    #[test]
    fn timeout_is_never_zero() {
        let config = AppConfig {
            http_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.http_timeout(), Duration::from_secs(1));
    }
}
