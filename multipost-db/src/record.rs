use crate::store::Kind;
use multipost_common::model::{
    media::Media,
    post::Post,
    settings::{SETTINGS_KEY, Settings},
    template::Template,
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbDataError {
    #[error("Record {id:?} in {kind} could not be decoded: {source}")]
    Decode {
        kind: Kind,
        id: String,
        source: serde_json::Error,
    },
    #[error("Record could not be encoded: {0}")]
    Encode(serde_json::Error),
}

/// A record that lives in one of the store's collections.
pub trait StoredRecord: Serialize + DeserializeOwned {
    const KIND: Kind;

    fn key(&self) -> &str;
}

impl StoredRecord for Post {
    const KIND: Kind = Kind::Posts;

    fn key(&self) -> &str {
        self.id.get()
    }
}

impl StoredRecord for Template {
    const KIND: Kind = Kind::Templates;

    fn key(&self) -> &str {
        self.id.get()
    }
}

impl StoredRecord for Media {
    const KIND: Kind = Kind::Media;

    fn key(&self) -> &str {
        self.id.get()
    }
}

impl StoredRecord for Settings {
    const KIND: Kind = Kind::Config;

    fn key(&self) -> &str {
        SETTINGS_KEY
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub id: String,
    pub data: String,
}

impl RecordRow {
    pub fn encode<R: StoredRecord>(record: &R) -> Result<Self, DbDataError> {
        Ok(Self {
            id: record.key().to_owned(),
            data: serde_json::to_string(record).map_err(DbDataError::Encode)?,
        })
    }

    pub fn decode<R: StoredRecord>(self) -> Result<R, DbDataError> {
        serde_json::from_str(&self.data).map_err(|source| DbDataError::Decode {
            kind: R::KIND,
            id: self.id,
            source,
        })
    }
}
