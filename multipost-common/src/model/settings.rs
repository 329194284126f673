use crate::model::platform::PlatformId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Key of the single settings row.
pub const SETTINGS_KEY: &str = "settings";
pub const DEFAULT_PLATFORMS: [&str; 2] = ["instagram", "twitter"];

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_notifications")]
    pub notif: bool,
    #[serde(rename = "defPlat", default = "default_platforms")]
    pub default_platforms: BTreeSet<PlatformId>,
}

fn default_notifications() -> bool {
    true
}

fn default_platforms() -> BTreeSet<PlatformId> {
    DEFAULT_PLATFORMS.into_iter().map(PlatformId::new).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notif: default_notifications(),
            default_platforms: default_platforms(),
        }
    }
}
