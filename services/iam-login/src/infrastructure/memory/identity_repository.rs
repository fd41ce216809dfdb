//! 身份内存仓储

use async_trait::async_trait;
use dashmap::DashMap;
use keel_common::{TenantId, UserId};
use keel_errors::{AppError, AppResult};

use crate::domain::{Identity, IdentityRepository};

#[derive(Debug, Default)]
pub struct InMemoryIdentityRepository {
    identities: DashMap<UserId, Identity>,
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let repo = Self::new();
        for identity in identities {
            repo.identities.insert(identity.id.clone(), identity);
        }
        repo
    }

    pub fn get(&self, id: &UserId) -> Option<Identity> {
        self.identities.get(id).map(|identity| identity.value().clone())
    }

    fn find(&self, username: &str, tenant_id: Option<&TenantId>) -> Option<Identity> {
        self.identities
            .iter()
            .find(|entry| {
                let identity = entry.value();
                identity.username == username
                    && tenant_id.is_none_or(|tenant| identity.tenant_id.as_ref() == Some(tenant))
            })
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_username(
        &self,
        username: &str,
        tenant_id: Option<&TenantId>,
    ) -> AppResult<Option<Identity>> {
        Ok(self.find(username, tenant_id))
    }

    async fn update(&self, identity: &Identity) -> AppResult<()> {
        match self.identities.get_mut(&identity.id) {
            Some(mut existing) => {
                *existing = identity.clone();
                Ok(())
            }
            None => Err(AppError::IdentityNotFound),
        }
    }

    async fn create(&self, identity: &Identity) -> AppResult<()> {
        if self
            .find(&identity.username, identity.tenant_id.as_ref())
            .is_some()
        {
            return Err(AppError::validation(format!(
                "Username already exists: {}",
                identity.username
            )));
        }
        self.identities.insert(identity.id.clone(), identity.clone());
        Ok(())
    }
}
