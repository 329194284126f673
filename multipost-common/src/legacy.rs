//! The flat JSON document that held all data before the record store.
//!
//! The same shape is written by the JSON backup, so a backup can be imported
//! through the legacy migration.

use crate::{
    model::{Timestamp, media::Media, post::Post, settings::Settings, template::Template},
    util::null_as_default,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// File name the legacy blob was kept under.
pub const LEGACY_FILE_NAME: &str = "sns_mp2.json";

const POST_TIMESTAMPS: [&str; 2] = ["createdAt", "updatedAt"];

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct LegacyDocument {
    pub posts: Vec<Post>,
    pub templates: Vec<Template>,
    pub media: Vec<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<Settings>,
}

/// A record of the blob that did not decode and was left out.
#[derive(Debug)]
pub struct SkippedRecord {
    pub collection: &'static str,
    pub index: usize,
    pub error: serde_json::Error,
}

/// Everything readable from a blob, and what had to be left out.
#[derive(Debug, Default)]
pub struct LegacyImport {
    pub document: LegacyDocument,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    posts: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    templates: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    media: Vec<Value>,
    #[serde(default)]
    set: Option<Value>,
}

impl LegacyDocument {
    /// Reads a blob record by record.
    ///
    /// Only fails if `raw` is not a JSON object of collections. Records that do
    /// not decode are skipped. Posts without a valid creation or update time
    /// get `now`.
    pub fn parse(raw: &str, now: Timestamp) -> serde_json::Result<LegacyImport> {
        let raw: RawDocument = serde_json::from_str(raw)?;

        let mut skipped = Vec::new();
        let posts = raw
            .posts
            .into_iter()
            .map(|post| with_timestamps(post, now));
        let document = Self {
            posts: decode_all("posts", posts, &mut skipped),
            templates: decode_all("templates", raw.templates, &mut skipped),
            media: decode_all("media", raw.media, &mut skipped),
            set: decode_all("set", raw.set, &mut skipped).pop(),
        };

        Ok(LegacyImport { document, skipped })
    }
}

fn decode_all<T: DeserializeOwned>(
    collection: &'static str,
    values: impl IntoIterator<Item = Value>,
    skipped: &mut Vec<SkippedRecord>,
) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(error) => {
                skipped.push(SkippedRecord {
                    collection,
                    index,
                    error,
                });
                None
            }
        })
        .collect()
}

fn with_timestamps(mut post: Value, now: Timestamp) -> Value {
    if let Value::Object(fields) = &mut post {
        for key in POST_TIMESTAMPS {
            let valid = fields
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|time| time.parse::<Timestamp>().is_ok());
            if !valid {
                fields.insert(key.to_owned(), Value::String(now.to_string()));
            }
        }
    }
    post
}
