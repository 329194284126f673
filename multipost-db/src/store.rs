//! Durable collections of records, one SQLite table per kind.

use crate::{
    client::{DbError, Result},
    record::{RecordRow, StoredRecord},
};
use multipost_common::util::PositiveDuration;
use sqlx::{
    SqlitePool,
    migrate::{MigrateError, Migrator},
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;

pub const IN_MEMORY_URL: &str = "sqlite::memory:";

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Kind {
    Posts,
    Templates,
    Media,
    Config,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Self::Posts, Self::Templates, Self::Media, Self::Config];

    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Templates => "templates",
            Self::Media => "media",
            Self::Config => "config",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Could not connect: {0}")]
    Connect(#[from] sqlx::Error),
    #[error("Could not set up the collections: {0}")]
    Schema(#[from] MigrateError),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoreOptions {
    pub url: String,
    /// Upper bound for a single storage operation. `None` waits indefinitely.
    pub timeout: Option<PositiveDuration>,
}

impl StoreOptions {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_URL)
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Option<PositiveDuration>) -> Self {
        Self { timeout, ..self }
    }
}

/// Handle to the open store, kept for the whole session.
///
/// The pool holds exactly one connection, so there is a single writer.
#[derive(Debug)]
pub struct RecordStore {
    pool: SqlitePool,
    timeout: Option<PositiveDuration>,
}

impl RecordStore {
    /// Opens the store, creating the database and its collections if needed.
    pub async fn open(options: &StoreOptions) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&options.url)
            .map_err(OpenError::from)?
            .create_if_missing(true);

        // an in-memory database lives exactly as long as its connection
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(OpenError::from)?;

        MIGRATOR.run(&pool).await.map_err(OpenError::from)?;

        debug!(url = %options.url, "Record store opened");

        Ok(Self {
            pool,
            timeout: options.timeout,
        })
    }

    async fn bounded<F: Future>(&self, operation: F) -> Result<F::Output> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout.to_std(), operation)
                .await
                .map_err(|_| DbError::Timeout(timeout.get())),
            None => Ok(operation.await),
        }
    }

    /// All records of one kind, in no particular order.
    pub async fn list_all<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let sql = format!("SELECT id, data FROM {}", R::KIND.table());
        let rows: Vec<RecordRow> = self
            .bounded(query_as::<_, RecordRow>(&sql).fetch_all(&self.pool))
            .await?
            .map_err(DbError::ReadFailed)?;

        debug!(kind = %R::KIND, count = rows.len(), "Listed records");

        let records = rows
            .into_iter()
            .map(RecordRow::decode)
            .collect::<Result<_, _>>()?;
        Ok(records)
    }

    pub async fn get_one<R: StoredRecord>(&self, key: &str) -> Result<Option<R>> {
        let sql = format!("SELECT id, data FROM {} WHERE id = ?1", R::KIND.table());
        let row: Option<RecordRow> = self
            .bounded(query_as::<_, RecordRow>(&sql).bind(key).fetch_optional(&self.pool))
            .await?
            .map_err(DbError::ReadFailed)?;

        let record = row.map(RecordRow::decode).transpose()?;
        Ok(record)
    }

    /// Inserts the record, or replaces the one stored under the same key.
    pub async fn put<R: StoredRecord>(&self, record: &R) -> Result<()> {
        let row = RecordRow::encode(record)?;
        let sql = format!(
            "
            INSERT INTO {} (id, data)
            VALUES (?1, ?2)
            ON CONFLICT (id) DO UPDATE SET data = excluded.data
            ",
            R::KIND.table()
        );

        self.bounded(query(&sql).bind(row.id.as_str()).bind(row.data.as_str()).execute(&self.pool))
            .await?
            .map_err(DbError::WriteFailed)?;

        debug!(kind = %R::KIND, id = %row.id, "Stored record");
        Ok(())
    }

    /// Removes the record if present. A missing key is not an error.
    pub async fn delete<R: StoredRecord>(&self, key: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::KIND.table());
        let result = self
            .bounded(query(&sql).bind(key).execute(&self.pool))
            .await?
            .map_err(DbError::WriteFailed)?;

        debug!(kind = %R::KIND, id = key, deleted = result.rows_affected(), "Deleted record");
        Ok(())
    }

    /// Empties every collection in one transaction.
    pub async fn clear_all(&self) -> Result<()> {
        self.bounded(async {
            let mut transaction = self.pool.begin().await?;
            for kind in Kind::ALL {
                query(&format!("DELETE FROM {}", kind.table()))
                    .execute(&mut *transaction)
                    .await?;
            }
            transaction.commit().await
        })
        .await?
        .map_err(DbError::WriteFailed)?;

        debug!("Cleared all collections");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::DbError,
        store::{Kind, RecordStore, StoreOptions},
    };
    use multipost_common::{
        model::{
            Id,
            media::Media,
            post::Post,
            settings::{SETTINGS_KEY, Settings},
            template::Template,
        },
        util::PositiveDuration,
    };

    async fn store() -> RecordStore {
        RecordStore::open(&StoreOptions::in_memory()).await.unwrap()
    }

    fn template(id: &str, name: &str) -> Template {
        Template {
            id: Id::new(id).unwrap(),
            name: name.to_owned(),
            content: String::new(),
            hashtags: String::new(),
            platforms: Default::default(),
        }
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = store().await;

        store.put(&template("t1", "first")).await.unwrap();
        store.put(&template("t1", "second")).await.unwrap();

        let templates: Vec<Template> = store.list_all().await.unwrap();
        assert_eq!(templates, [template("t1", "second")]);
    }

    #[tokio::test]
    async fn kinds_are_separate() {
        let store = store().await;
        let media = Media::link("https://example.com");
        store.put(&media).await.unwrap();

        assert!(store.list_all::<Template>().await.unwrap().is_empty());
        assert_eq!(
            store.get_one::<Media>(media.id.get()).await.unwrap(),
            Some(media.clone())
        );
        assert_eq!(store.get_one::<Template>(media.id.get()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_keys() {
        let store = store().await;

        assert_eq!(store.get_one::<Template>("nope").await.unwrap(), None);
        store.delete::<Template>("nope").await.unwrap();
    }

    #[tokio::test]
    async fn settings_live_under_one_key() {
        let store = store().await;
        store.put(&Settings::default()).await.unwrap();
        store
            .put(&Settings {
                notif: false,
                ..Settings::default()
            })
            .await
            .unwrap();

        let all: Vec<Settings> = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!store.get_one::<Settings>(SETTINGS_KEY).await.unwrap().unwrap().notif);
    }

    #[tokio::test]
    async fn clear_all_empties_every_kind() {
        let store = store().await;
        store.put(&template("t1", "a")).await.unwrap();
        store.put(&Media::link("https://example.com")).await.unwrap();
        store.put(&Settings::default()).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.list_all::<Template>().await.unwrap().is_empty());
        assert!(store.list_all::<Media>().await.unwrap().is_empty());
        assert!(store.list_all::<Settings>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let directory = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", directory.path().join("store.db").display());

        let store = RecordStore::open(&StoreOptions::new(&url)).await.unwrap();
        store.put(&template("t1", "kept")).await.unwrap();
        store.pool.close().await;

        let store = RecordStore::open(&StoreOptions::new(&url)).await.unwrap();
        assert_eq!(
            store.get_one::<Template>("t1").await.unwrap(),
            Some(template("t1", "kept"))
        );
    }

    #[tokio::test]
    async fn unreachable_storage() {
        let directory = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}",
            directory.path().join("missing").join("store.db").display()
        );

        let error = RecordStore::open(&StoreOptions::new(url)).await.unwrap_err();
        assert!(matches!(error, DbError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn corrupt_rows_are_reported() {
        let store = store().await;
        sqlx::query("INSERT INTO templates (id, data) VALUES ('bad', '{not json')")
            .execute(&store.pool)
            .await
            .unwrap();

        let error = store.get_one::<Template>("bad").await.unwrap_err();
        assert!(matches!(error, DbError::Data(_)));
        assert_eq!(Kind::Templates.to_string(), "templates");
    }

    #[tokio::test]
    async fn blocked_operations_time_out() {
        let options = StoreOptions::in_memory().with_timeout(PositiveDuration::from_millis(1));
        let store = RecordStore::open(&options).await.unwrap();

        // the only connection is taken, so every operation has to wait
        let _held = store.pool.acquire().await.unwrap();

        let error = store.get_one::<Template>("t1").await.unwrap_err();
        assert!(matches!(error, DbError::Timeout(timeout) if timeout.whole_milliseconds() == 1));
        let error = store.put(&template("t1", "late")).await.unwrap_err();
        assert!(matches!(error, DbError::Timeout(_)));
    }

    #[tokio::test]
    async fn rejected_put_leaves_nothing_behind() {
        let store = store().await;
        sqlx::query(
            "
            CREATE TRIGGER reject_templates BEFORE INSERT ON templates
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END
            ",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let error = store.put(&template("t1", "rejected")).await.unwrap_err();
        assert!(matches!(error, DbError::WriteFailed(_)));
        assert!(store.list_all::<Template>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_clear_keeps_every_collection() {
        let store = store().await;
        store.put(&template("t1", "kept")).await.unwrap();
        store.put(&Media::link("https://example.com")).await.unwrap();
        sqlx::query(
            "
            CREATE TRIGGER keep_media BEFORE DELETE ON media
            BEGIN
                SELECT RAISE(ABORT, 'kept');
            END
            ",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let error = store.clear_all().await.unwrap_err();
        assert!(matches!(error, DbError::WriteFailed(_)));

        // templates were emptied before media failed, and rolled back with it
        assert_eq!(store.list_all::<Template>().await.unwrap().len(), 1);
        assert_eq!(store.list_all::<Media>().await.unwrap().len(), 1);
        assert!(store.list_all::<Post>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_collection_fails_the_write() {
        let store = store().await;
        sqlx::query("DROP TABLE media")
            .execute(&store.pool)
            .await
            .unwrap();

        let error = store
            .put(&Media::link("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(error, DbError::WriteFailed(_)));
        let error = store.list_all::<Media>().await.unwrap_err();
        assert!(matches!(error, DbError::ReadFailed(_)));
    }
}
