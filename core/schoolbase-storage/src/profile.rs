//! Institution branding, stored locally only.

use crate::error::StorageResult;
use crate::store::SnapshotStore;
use serde::{Deserialize, Serialize};

pub const NAME_KEY: &str = "sms_schoolName";
pub const MOTTO_KEY: &str = "sms_schoolMotto";
pub const CONTACT_KEY: &str = "sms_schoolContact";
pub const LOGO_KEY: &str = "sms_schoolLogo";

const DEFAULT_NAME: &str = "MPULUNGU DAY SECONDARY SCHOOL";
const DEFAULT_MOTTO: &str = "EDUCATION IS THE VANGUARD OF DEVELOPMENT";
const DEFAULT_LOGO: &str =
    "https://img.freepik.com/free-vector/school-building-with-green-lawn-trees-background_1308-41071.jpg";

/// Branding shown on printed documents and the dashboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolProfile {
    pub name: String,
    pub motto: String,
    pub contact: String,
    pub logo_url: String,
}

impl Default for SchoolProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            motto: DEFAULT_MOTTO.to_string(),
            contact: String::new(),
            logo_url: DEFAULT_LOGO.to_string(),
        }
    }
}

impl SchoolProfile {
    /// Loads the profile; missing or empty keys take their defaults.
    pub async fn load(store: &dyn SnapshotStore) -> StorageResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            name: read_or(store, NAME_KEY, defaults.name).await?,
            motto: read_or(store, MOTTO_KEY, defaults.motto).await?,
            contact: read_or(store, CONTACT_KEY, defaults.contact).await?,
            logo_url: read_or(store, LOGO_KEY, defaults.logo_url).await?,
        })
    }

    /// Persists every field under its own key.
    pub async fn save(&self, store: &dyn SnapshotStore) -> StorageResult<()> {
        store.set(NAME_KEY, &self.name).await?;
        store.set(MOTTO_KEY, &self.motto).await?;
        store.set(CONTACT_KEY, &self.contact).await?;
        store.set(LOGO_KEY, &self.logo_url).await?;
        Ok(())
    }
}

async fn read_or(store: &dyn SnapshotStore, key: &str, default: String) -> StorageResult<String> {
    Ok(store
        .get(key)
        .await?
        .filter(|v| !v.is_empty())
        .unwrap_or(default))
}
