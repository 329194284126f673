use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PlatformInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub url: &'static str,
}

pub const PLATFORMS: [PlatformInfo; 7] = [
    PlatformInfo {
        id: "instagram",
        name: "Instagram",
        icon: "📸",
        color: "#e1306c",
        url: "https://www.instagram.com/",
    },
    PlatformInfo {
        id: "youtube",
        name: "YouTube Shorts",
        icon: "▶️",
        color: "#ff0000",
        url: "https://www.youtube.com/upload",
    },
    PlatformInfo {
        id: "line",
        name: "LINE VOOM",
        icon: "💬",
        color: "#06c755",
        url: "https://linevoom.line.me/",
    },
    PlatformInfo {
        id: "twitter",
        name: "X (Twitter)",
        icon: "𝕏",
        color: "#000000",
        url: "https://x.com/compose/post",
    },
    PlatformInfo {
        id: "facebook",
        name: "Facebook",
        icon: "📘",
        color: "#1877f2",
        url: "https://www.facebook.com/",
    },
    PlatformInfo {
        id: "tiktok",
        name: "TikTok",
        icon: "🎵",
        color: "#00f2ea",
        url: "https://www.tiktok.com/upload",
    },
    PlatformInfo {
        id: "gmb",
        name: "Google Business",
        icon: "🏢",
        color: "#4285f4",
        url: "https://business.google.com/locations",
    },
];

impl PlatformInfo {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// Platform identifier as stored on records.
///
/// Identifiers outside of [`PLATFORMS`] are kept as-is, they just have no
/// [`PlatformInfo`].
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn info(&self) -> Option<&'static PlatformInfo> {
        PLATFORMS.iter().find(|platform| platform.id == self.0)
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        self.info().is_some()
    }
}

impl Display for PlatformId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<&PlatformInfo> for PlatformId {
    fn from(value: &PlatformInfo) -> Self {
        Self::new(value.id)
    }
}

/// Badge labels for the known platforms among `ids`.
pub fn platform_labels<'a>(ids: impl IntoIterator<Item = &'a PlatformId>) -> Vec<String> {
    ids.into_iter()
        .filter_map(PlatformId::info)
        .map(PlatformInfo::label)
        .collect()
}
