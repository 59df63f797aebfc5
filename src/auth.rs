//! Session-scoped identity. The signed-in user lives in memory and is mirrored
//! as one serialized blob in the key-value store so it survives a restart.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::access;
use crate::error::{AcademyError, AcademyResult};
use crate::models::{ContentClass, Tier, User, UserPatch};
use crate::store::{KeyValueStore, Latency};

pub const USER_KEY: &str = "apocalypseUser";

pub struct AuthService {
    kv: Arc<dyn KeyValueStore>,
    current: RwLock<Option<User>>,
    latency: Latency,
}

fn validate_credentials(email: &str, password: &str) -> AcademyResult<()> {
    if !email.contains('@') {
        return Err(AcademyError::validation("email must contain '@'"));
    }
    if password.is_empty() {
        return Err(AcademyError::validation("password is required"));
    }
    Ok(())
}

impl AuthService {
    /// Restore the session from the store. An unreadable blob is dropped.
    pub async fn restore(kv: Arc<dyn KeyValueStore>, latency: Latency) -> AcademyResult<Self> {
        let current = match kv.get(USER_KEY).await? {
            Some(blob) => match serde_json::from_str::<User>(&blob) {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "restored session");
                    Some(user)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable stored user");
                    kv.remove(USER_KEY).await?;
                    None
                }
            },
            None => None,
        };
        Ok(Self { kv, current: RwLock::new(current), latency })
    }

    async fn persist(&self, user: User) -> AcademyResult<User> {
        self.kv.set(USER_KEY, serde_json::to_string(&user)?).await?;
        *self.current.write().await = Some(user.clone());
        Ok(user)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> AcademyResult<User> {
        validate_credentials(email, password)?;
        if name.trim().is_empty() {
            return Err(AcademyError::validation("name is required"));
        }
        let user = User {
            id: format!("user_{}", Uuid::new_v4().simple()),
            email: email.to_string(),
            name: name.trim().to_string(),
            role: "member".into(),
            member_since: Utc::now(),
            subscription_status: "active".into(),
            subscription_tier: Tier::Basic,
        };
        let user = self.persist(user).await?;
        tracing::info!(user_id = %user.id, "registered");
        Ok(user)
    }

    /// Mock login: any well-formed credentials sign in the demo premium member.
    pub async fn login(&self, email: &str, password: &str) -> AcademyResult<User> {
        validate_credentials(email, password)?;
        self.latency.simulate().await;
        let member_since = Utc
            .with_ymd_and_hms(2025, 1, 15, 0, 0, 0)
            .single()
            .ok_or_else(|| AcademyError::Internal("invalid member_since".into()))?;
        let user = User {
            id: "user_123456".into(),
            email: email.to_string(),
            name: "Membro Apocalypse".into(),
            role: "member".into(),
            member_since,
            subscription_status: "active".into(),
            subscription_tier: Tier::Premium,
        };
        let user = self.persist(user).await?;
        tracing::info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    pub async fn logout(&self) -> AcademyResult<()> {
        self.kv.remove(USER_KEY).await?;
        if let Some(user) = self.current.write().await.take() {
            tracing::info!(user_id = %user.id, "logged out");
        }
        Ok(())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.current.read().await.clone()
    }

    pub async fn update_profile(&self, patch: UserPatch) -> AcademyResult<User> {
        let mut user = self
            .current_user()
            .await
            .ok_or_else(|| AcademyError::Unauthorized("no active session".into()))?;

        if patch.subscription_tier == Some(Tier::Unknown) {
            return Err(AcademyError::validation("unknown subscription tier"));
        }
        if let Some(email) = patch.email {
            if !email.contains('@') {
                return Err(AcademyError::validation("email must contain '@'"));
            }
            user.email = email;
        }
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(tier) = patch.subscription_tier {
            user.subscription_tier = tier;
        }
        if let Some(status) = patch.subscription_status {
            user.subscription_status = status;
        }
        self.persist(user).await
    }

    pub async fn has_access(&self, content: ContentClass) -> bool {
        access::has_access(self.current.read().await.as_ref(), content)
    }
}
