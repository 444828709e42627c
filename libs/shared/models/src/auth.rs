use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Identity established by the auth middleware from a verified access token.
///
/// `role` is the raw token claim. Marketplace roles come from the directory,
/// never from the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.id)
            .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Specialist,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Specialist => "specialist",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "specialist" => Ok(Role::Specialist),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Input(format!("Unknown role: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Client, Role::Specialist, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().ok(), Some(role));
        }
        assert_eq!("Admin".parse::<Role>().ok(), Some(Role::Admin));
        assert_matches!("doctor".parse::<Role>(), Err(AppError::Input(_)));
    }

    #[test]
    fn user_id_requires_uuid_subject() {
        let mut user = User {
            id: Uuid::new_v4().to_string(),
            email: None,
            role: Some("authenticated".to_string()),
            metadata: None,
            created_at: None,
        };
        assert!(user.user_id().is_ok());

        user.id = "not-a-uuid".to_string();
        assert_matches!(user.user_id(), Err(AppError::Auth(_)));
    }
}
