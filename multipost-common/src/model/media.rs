use crate::{model::Id, util::null_as_default};
use base64::{Engine, display::Base64Display, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";
pub const LINK_MEDIA_NAME: &str = "Drive Link";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MediaMarker;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Url,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Media {
    pub id: Id<MediaMarker>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    /// A `data:` URI for uploaded bytes, otherwise an external link.
    pub url: String,
}

impl Media {
    /// Embeds uploaded bytes as a base64 `data:` URI.
    #[must_use]
    pub fn from_upload(name: impl Into<String>, mime_type: &str, bytes: &[u8]) -> Self {
        let kind = if mime_type.starts_with("image") {
            MediaKind::Image
        } else {
            MediaKind::Video
        };
        let mime_type = if mime_type.is_empty() {
            FALLBACK_MIME_TYPE
        } else {
            mime_type
        };
        let encoded = Base64Display::new(bytes, &BASE64_STANDARD);

        Self {
            id: Id::generate(),
            name: name.into(),
            kind,
            url: format!("data:{mime_type};base64,{encoded}"),
        }
    }

    #[must_use]
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            id: Id::generate(),
            name: LINK_MEDIA_NAME.to_owned(),
            kind: MediaKind::Url,
            url: url.into(),
        }
    }

    /// Decodes the payload of an embedded upload.
    #[must_use]
    pub fn embedded_bytes(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.url.strip_prefix("data:")?.split_once(";base64,")?;
        BASE64_STANDARD.decode(payload).ok()
    }
}
