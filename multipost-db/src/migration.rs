//! One-shot import of the legacy flat JSON blob into the record store.

use crate::client::{DbClient, DbError, Result};
use multipost_common::{
    legacy::{LegacyDocument, LegacyImport},
    model::Timestamp,
};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Location of the legacy blob.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct LegacyBlob {
    path: PathBuf,
}

impl LegacyBlob {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw blob, or `None` if there is none. An empty file counts as none.
    pub async fn read(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn remove(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(error) if error.kind() != ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Could not read the legacy data: {0}")]
    Read(io::Error),
    #[error("Legacy data is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not store the legacy data: {0}")]
    Replay(#[from] DbError),
    #[error("Legacy data was imported but could not be removed: {0}")]
    Remove(io::Error),
}

/// How many records of each kind were replayed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MigrationReport {
    pub posts: usize,
    pub templates: usize,
    pub media: usize,
    pub settings: bool,
    /// Records that did not decode and were left out.
    pub skipped: usize,
}

#[derive(Debug)]
pub enum MigrationOutcome {
    NothingToMigrate,
    Migrated(MigrationReport),
    /// The blob is kept, so the next start tries again.
    Failed(MigrationError),
}

/// Saves every decoded record of `import` through the repository.
///
/// Records already present under the same id are overwritten.
pub async fn replay(db: &DbClient, import: &LegacyImport) -> Result<MigrationReport> {
    for record in &import.skipped {
        warn!(
            collection = record.collection,
            index = record.index,
            error = %record.error,
            "Skipping undecodable legacy record"
        );
    }

    let document = &import.document;
    for post in &document.posts {
        db.save_post(post).await?;
    }
    for template in &document.templates {
        db.save_template(template).await?;
    }
    for media in &document.media {
        db.save_media(media).await?;
    }
    if let Some(settings) = &document.set {
        db.save_settings(settings).await?;
    }

    Ok(MigrationReport {
        posts: document.posts.len(),
        templates: document.templates.len(),
        media: document.media.len(),
        settings: document.set.is_some(),
        skipped: import.skipped.len(),
    })
}

async fn migrate(
    db: &DbClient,
    blob: &LegacyBlob,
) -> Result<Option<MigrationReport>, MigrationError> {
    let Some(raw) = blob.read().await.map_err(MigrationError::Read)? else {
        return Ok(None);
    };

    let import = LegacyDocument::parse(&raw, Timestamp::now())?;
    let report = replay(db, &import).await?;
    blob.remove().await.map_err(MigrationError::Remove)?;

    Ok(Some(report))
}

/// Moves the legacy blob into the store if there is one, then deletes it.
///
/// Must run before anything else reads from the store. Failures are logged and
/// reported in the outcome, never returned as errors.
pub async fn migrate_if_present(db: &DbClient, blob: &LegacyBlob) -> MigrationOutcome {
    match migrate(db, blob).await {
        Ok(None) => {
            debug!(path = %blob.path().display(), "No legacy data found");
            MigrationOutcome::NothingToMigrate
        }
        Ok(Some(report)) => {
            info!(
                path = %blob.path().display(),
                posts = report.posts,
                templates = report.templates,
                media = report.media,
                settings = report.settings,
                skipped = report.skipped,
                "Migrated legacy data"
            );
            MigrationOutcome::Migrated(report)
        }
        Err(error) => {
            warn!(path = %blob.path().display(), %error, "Legacy migration failed");
            MigrationOutcome::Failed(error)
        }
    }
}
