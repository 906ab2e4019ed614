use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered user as held in the in-memory user store
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub preferences: Map<String, Value>,
}

/// Public identity of a user, embedded in tokens and login responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Profile returned by `GET /me`
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub preferences: Map<String, Value>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            preferences: user.preferences.clone(),
        }
    }
}
