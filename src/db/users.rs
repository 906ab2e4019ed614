use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::UserRecord,
};

/// In-memory user store keyed by email
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new user, rejecting a duplicate email or username
    pub async fn insert(&self, user: UserRecord) -> AppResult<()> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.email) {
            return Err(AppError::InvalidInput("Email already registered".to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::InvalidInput("Username already taken".to_string()));
        }

        users.insert(user.email.clone(), user);
        Ok(())
    }

    pub async fn get(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(email).cloned()
    }

    /// Overwrites a user's preferences
    pub async fn set_preferences(
        &self,
        email: &str,
        preferences: Map<String, Value>,
    ) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(email)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.preferences = preferences;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn user(username: &str, email: &str) -> UserRecord {
        UserRecord {
            user_id: format!("id-{}", username),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            preferences: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = UserStore::new();
        store.insert(user("runner", "runner@example.com")).await.unwrap();
        let found = store.get("runner@example.com").await.unwrap();
        assert_eq!(found.username, "runner");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = UserStore::new();
        store.insert(user("runner", "runner@example.com")).await.unwrap();
        let err = store
            .insert(user("other", "runner@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Email already registered");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = UserStore::new();
        store.insert(user("runner", "runner@example.com")).await.unwrap();
        let err = store
            .insert(user("runner", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Username already taken");
    }

    #[tokio::test]
    async fn test_set_preferences() {
        let store = UserStore::new();
        store.insert(user("runner", "runner@example.com")).await.unwrap();

        let prefs = json!({"interests": ["trail"]}).as_object().unwrap().clone();
        store.set_preferences("runner@example.com", prefs.clone()).await.unwrap();
        assert_eq!(store.get("runner@example.com").await.unwrap().preferences, prefs);

        assert!(store.set_preferences("ghost@example.com", prefs).await.is_err());
    }
}
