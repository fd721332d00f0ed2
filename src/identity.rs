use crate::domain::targeting::UserAttributes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Identity port: resolves a user id to targeting attributes.
#[async_trait::async_trait]
pub trait IdentityPort: Send + Sync {
    async fn lookup(&self, user_id: &str) -> Option<UserAttributes>;
}

/// Map-backed identity source for dev and tests.
#[derive(Clone, Default)]
pub struct StaticIdentity {
    users: Arc<RwLock<HashMap<String, UserAttributes>>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, attrs: UserAttributes) {
        self.users.write().await.insert(attrs.user_id.clone(), attrs);
    }
}

#[async_trait::async_trait]
impl IdentityPort for StaticIdentity {
    async fn lookup(&self, user_id: &str) -> Option<UserAttributes> {
        self.users.read().await.get(user_id).cloned()
    }
}
