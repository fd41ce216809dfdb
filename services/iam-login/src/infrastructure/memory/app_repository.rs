//! 第三方应用内存仓储

use async_trait::async_trait;
use dashmap::DashMap;
use keel_errors::AppResult;

use crate::domain::{ThirdPartyApp, ThirdPartyAppRepository};

#[derive(Debug, Default)]
pub struct InMemoryThirdPartyAppRepository {
    apps: DashMap<String, ThirdPartyApp>,
}

impl InMemoryThirdPartyAppRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps(apps: impl IntoIterator<Item = ThirdPartyApp>) -> Self {
        let repo = Self::new();
        for app in apps {
            repo.save(app);
        }
        repo
    }

    pub fn save(&self, app: ThirdPartyApp) {
        self.apps.insert(app.app_key.clone(), app);
    }
}

#[async_trait]
impl ThirdPartyAppRepository for InMemoryThirdPartyAppRepository {
    async fn find_by_app_key(&self, app_key: &str) -> AppResult<Option<ThirdPartyApp>> {
        Ok(self.apps.get(app_key).map(|app| app.value().clone()))
    }
}
