use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::supabase::SupabaseClient;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub metadata: Value,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, user_id: Option<Uuid>, metadata: Value) -> Self {
        Self {
            user_id,
            action: action.into(),
            metadata,
        }
    }
}

/// Append-only activity trail. Recording never fails the caller.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}

pub struct SupabaseAuditLog {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAuditLog {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl AuditLog for SupabaseAuditLog {
    async fn record(&self, entry: AuditEntry) {
        let body = json!({
            "user_id": entry.user_id,
            "action": entry.action,
            "metadata": entry.metadata,
        });

        match self
            .supabase
            .execute(Method::POST, "/rest/v1/logs", Some(&self.auth_token), Some(body))
            .await
        {
            Ok(()) => debug!("Audit entry recorded: {}", entry.action),
            Err(e) => warn!("Failed to record audit entry {}: {}", entry.action, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_config::AppConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn audit_for(server: &MockServer) -> SupabaseAuditLog {
        let config = AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        SupabaseAuditLog::new(Arc::new(SupabaseClient::new(&config)), "service")
    }

    #[tokio::test]
    async fn writes_to_logs_table() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/logs"))
            .and(body_partial_json(json!({ "action": "review_created" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        audit_for(&server)
            .record(AuditEntry::new("review_created", Some(Uuid::new_v4()), json!({})))
            .await;
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        audit_for(&server)
            .record(AuditEntry::new("dispute_created", None, json!({ "reason": "x" })))
            .await;
    }
}
