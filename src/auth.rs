//! Session source for the marketplace UI.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub user_metadata: UserMetadata,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_metadata.role.as_deref() == Some("admin")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    /// Id to stamp into `created_by` / `user_id` on writes.
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, phone: &str, password: &str) -> Result<AuthData, Error>;
    async fn sign_in_with_password(&self, phone: &str, password: &str)
    -> Result<AuthData, Error>;
    async fn verify_otp(&self, phone: &str, token: &str) -> Result<AuthData, Error>;
    async fn sign_out(&self) -> Result<(), Error>;
    async fn current_session(&self) -> Result<Option<Session>, Error>;

    async fn current_user(&self) -> Result<Option<User>, Error> {
        Ok(self.current_session().await?.map(|s| s.user))
    }
}

/// Fixture users with OTP sign-in. Password flows resolve without starting
/// a session; any non-empty OTP is accepted for a known phone.
pub struct MemoryAuth {
    users: Vec<User>,
    session: Mutex<Option<Session>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new(fixture_users())
    }
}

impl MemoryAuth {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            session: Mutex::new(None),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    fn find_by_phone(&self, phone: &str) -> Option<&User> {
        let phone = phone.trim();
        self.users
            .iter()
            .find(|u| u.phone.as_deref() == Some(phone))
    }
}

pub fn fixture_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            email: None,
            phone: Some("+250788123456".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("John Doe".to_string()),
                role: Some("buyer".to_string()),
            },
        },
        User {
            id: "2".to_string(),
            email: None,
            phone: Some("+250788654321".to_string()),
            user_metadata: UserMetadata {
                full_name: Some("Admin User".to_string()),
                role: Some("admin".to_string()),
            },
        },
    ]
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(&self, phone: &str, _password: &str) -> Result<AuthData, Error> {
        debug!(phone, "sign_up");
        Ok(AuthData::default())
    }

    async fn sign_in_with_password(
        &self,
        phone: &str,
        _password: &str,
    ) -> Result<AuthData, Error> {
        debug!(phone, "sign_in_with_password");
        Ok(AuthData::default())
    }

    async fn verify_otp(&self, phone: &str, token: &str) -> Result<AuthData, Error> {
        if token.trim().is_empty() {
            return Err(Error::Validation("otp token is empty".to_string()));
        }
        let user = self.find_by_phone(phone).cloned().ok_or(Error::Unauthorized)?;

        let session = Session {
            user: user.clone(),
            access_token: Uuid::now_v7().simple().to_string(),
            refresh_token: Uuid::now_v7().simple().to_string(),
        };
        *self.session.lock().map_err(|_| Error::Poisoned)? = Some(session.clone());
        debug!(user_id = %user.id, "otp verified");

        Ok(AuthData {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), Error> {
        self.session.lock().map_err(|_| Error::Poisoned)?.take();
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, Error> {
        Ok(self.session.lock().map_err(|_| Error::Poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_session_until_otp() {
        let auth = MemoryAuth::default();
        assert!(auth.current_session().await.unwrap().is_none());

        let data = auth.sign_in_with_password("+250788123456", "pw").await.unwrap();
        assert!(data.session.is_none());
        assert!(auth.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_otp_starts_session() {
        let auth = MemoryAuth::default();
        let data = auth.verify_otp("+250788654321", "123456").await.unwrap();
        let session = data.session.unwrap();
        assert_eq!(session.user_id(), "2");
        assert!(session.user.is_admin());

        let current = auth.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, "2");

        auth.sign_out().await.unwrap();
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_otp_unknown_phone() {
        let auth = MemoryAuth::default();
        let err = auth.verify_otp("+1000", "123456").await.unwrap_err();
        assert_eq!(err, Error::Unauthorized);
        assert!(auth.verify_otp("+250788123456", " ").await.is_err());
    }
}
