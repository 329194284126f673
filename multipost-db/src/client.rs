use crate::{
    record::DbDataError,
    store::{OpenError, RecordStore, StoreOptions},
};
use multipost_common::{
    legacy::LegacyDocument,
    model::{
        Id, Timestamp,
        media::{Media, MediaMarker},
        post::{Post, PostMarker, PostedConfirmation},
        settings::{SETTINGS_KEY, Settings},
        template::{Template, TemplateMarker},
    },
};
use thiserror::Error;
use time::Duration;
use tracing::info;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Storage is unavailable: {0}")]
    StorageUnavailable(#[from] OpenError),
    #[error("Reading from storage failed: {0}")]
    ReadFailed(sqlx::Error),
    #[error("Writing to storage failed: {0}")]
    WriteFailed(sqlx::Error),
    #[error("A stored record was invalid: {0}")]
    Data(#[from] DbDataError),
    #[error("Storage did not respond within {0}")]
    Timeout(Duration),
    #[error("Post {0} was not confirmed as posted")]
    ConfirmationRequired(Id<PostMarker>),
}

/// Typed access to the record store. Records are saved as given.
#[derive(Debug)]
pub struct DbClient {
    store: RecordStore,
}

impl DbClient {
    #[must_use]
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub async fn connect(options: &StoreOptions) -> Result<Self> {
        RecordStore::open(options).await.map(Self::new)
    }

    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        self.store.list_all().await
    }

    pub async fn fetch_post(&self, post_id: &Id<PostMarker>) -> Result<Option<Post>> {
        self.store.get_one(post_id.get()).await
    }

    pub async fn save_post(&self, post: &Post) -> Result<()> {
        self.store.put(post).await
    }

    pub async fn delete_post(&self, post_id: &Id<PostMarker>) -> Result<()> {
        self.store.delete::<Post>(post_id.get()).await
    }

    /// Commits the `posted` transition once the user has confirmed it.
    ///
    /// Returns `None` if there is no such post. Without the confirmation
    /// nothing is written.
    pub async fn confirm_posted(
        &self,
        post_id: &Id<PostMarker>,
        confirmation: PostedConfirmation,
    ) -> Result<Option<Post>> {
        let Some(mut post) = self.fetch_post(post_id).await? else {
            return Ok(None);
        };

        post.mark_posted(confirmation, Timestamp::now())
            .map_err(|_| DbError::ConfirmationRequired(post_id.clone()))?;
        self.save_post(&post).await?;

        info!(post = %post.id, "Post marked as posted");
        Ok(Some(post))
    }

    pub async fn fetch_templates(&self) -> Result<Vec<Template>> {
        self.store.list_all().await
    }

    pub async fn fetch_template(
        &self,
        template_id: &Id<TemplateMarker>,
    ) -> Result<Option<Template>> {
        self.store.get_one(template_id.get()).await
    }

    pub async fn save_template(&self, template: &Template) -> Result<()> {
        self.store.put(template).await
    }

    pub async fn delete_template(&self, template_id: &Id<TemplateMarker>) -> Result<()> {
        self.store.delete::<Template>(template_id.get()).await
    }

    pub async fn fetch_media(&self) -> Result<Vec<Media>> {
        self.store.list_all().await
    }

    pub async fn fetch_media_item(&self, media_id: &Id<MediaMarker>) -> Result<Option<Media>> {
        self.store.get_one(media_id.get()).await
    }

    pub async fn save_media(&self, media: &Media) -> Result<()> {
        self.store.put(media).await
    }

    /// Posts that embedded this media keep their copy.
    pub async fn delete_media(&self, media_id: &Id<MediaMarker>) -> Result<()> {
        self.store.delete::<Media>(media_id.get()).await
    }

    pub async fn fetch_settings(&self) -> Result<Option<Settings>> {
        self.store.get_one(SETTINGS_KEY).await
    }

    /// The stored settings, or the defaults. Never writes.
    pub async fn fetch_settings_or_default(&self) -> Result<Settings> {
        Ok(self.fetch_settings().await?.unwrap_or_default())
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store.put(settings).await
    }

    /// Applies `update` to the current settings and saves the result.
    pub async fn update_settings(&self, update: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.fetch_settings_or_default().await?;
        update(&mut settings);
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    /// Everything in the store, in the legacy document format.
    pub async fn snapshot(&self) -> Result<LegacyDocument> {
        Ok(LegacyDocument {
            posts: self.fetch_posts().await?,
            templates: self.fetch_templates().await?,
            media: self.fetch_media().await?,
            set: self.fetch_settings().await?,
        })
    }

    /// Irreversibly deletes every record.
    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear_all().await?;
        info!("All records deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::{DbClient, DbError},
        store::StoreOptions,
    };
    use multipost_common::model::{
        Id, Timestamp,
        media::Media,
        platform::PlatformId,
        post::{Analytics, Post, PostContent, PostStatus, PostedConfirmation},
        settings::Settings,
        template::Template,
    };
    use std::collections::BTreeSet;
    use time::macros::datetime;

    async fn client() -> DbClient {
        DbClient::connect(&StoreOptions::in_memory()).await.unwrap()
    }

    fn post(id: &str) -> Post {
        let mut post = Post::new(
            Id::new(id).unwrap(),
            PostContent {
                title: "Launch".to_owned(),
                content: r#"He said "hi""#.to_owned(),
                hashtags: "#launch".to_owned(),
                platforms: BTreeSet::from([PlatformId::new("twitter"), PlatformId::new("gmb")]),
                status: PostStatus::Scheduled,
                scheduled_at: "2024-03-15T09:00:00Z".parse().ok(),
                drive_link: Some("https://drive.example/x".to_owned()),
                analytics: Analytics {
                    views: 10,
                    likes: 2,
                    comments: 1,
                },
                ..PostContent::default()
            },
            Timestamp::new(datetime!(2024-03-01 12:00 UTC)),
        );
        post.attach_media(&Media::from_upload("a.png", "image/png", b"png"));
        post
    }

    #[tokio::test]
    async fn post_round_trip() {
        let db = client().await;
        let post = post("p1");

        db.save_post(&post).await.unwrap();
        db.save_post(&post).await.unwrap();

        assert_eq!(db.fetch_post(&post.id).await.unwrap(), Some(post.clone()));
        assert_eq!(db.fetch_posts().await.unwrap(), [post]);
    }

    #[tokio::test]
    async fn deleting_missing_records_is_a_no_op() {
        let db = client().await;

        db.delete_post(&Id::new("missing").unwrap()).await.unwrap();
        db.delete_template(&Id::new("missing").unwrap()).await.unwrap();
        db.delete_media(&Id::new("missing").unwrap()).await.unwrap();
        assert_eq!(db.fetch_post(&Id::new("missing").unwrap()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn settings_default_without_writing() {
        let db = client().await;

        let settings = db.fetch_settings_or_default().await.unwrap();
        assert!(settings.notif);
        assert_eq!(
            settings.default_platforms,
            BTreeSet::from([PlatformId::new("instagram"), PlatformId::new("twitter")])
        );
        assert_eq!(db.fetch_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_settings_persists() {
        let db = client().await;

        db.update_settings(|settings| settings.notif = false)
            .await
            .unwrap();

        let stored = db.fetch_settings().await.unwrap().unwrap();
        assert_eq!(
            stored,
            Settings {
                notif: false,
                ..Settings::default()
            }
        );
    }

    #[tokio::test]
    async fn confirm_posted_needs_acknowledgment() {
        let db = client().await;
        let post = post("p1");
        db.save_post(&post).await.unwrap();

        let error = db
            .confirm_posted(&post.id, PostedConfirmation::default())
            .await
            .unwrap_err();
        assert!(matches!(error, DbError::ConfirmationRequired(id) if id == post.id));
        assert_eq!(
            db.fetch_post(&post.id).await.unwrap().unwrap().status,
            PostStatus::Scheduled
        );

        let posted = db
            .confirm_posted(&post.id, PostedConfirmation { acknowledged: true })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(posted.status, PostStatus::Posted);
        assert!(posted.updated_at > post.updated_at);
        assert_eq!(db.fetch_post(&post.id).await.unwrap(), Some(posted));

        let missing = db
            .confirm_posted(&Id::new("nope").unwrap(), PostedConfirmation { acknowledged: true })
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn deleting_media_keeps_post_snapshots() {
        let db = client().await;
        let media = Media::link("https://drive.example/y");
        db.save_media(&media).await.unwrap();

        let mut post = post("p1");
        post.attach_media(&media);
        db.save_post(&post).await.unwrap();

        db.delete_media(&media.id).await.unwrap();

        assert_eq!(db.fetch_media_item(&media.id).await.unwrap(), None);
        let stored = db.fetch_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.media_data, Some(media));
    }

    #[tokio::test]
    async fn templates() {
        let db = client().await;
        let template = Template {
            id: Id::new("t1").unwrap(),
            name: "Weekly".to_owned(),
            content: "Digest".to_owned(),
            hashtags: String::new(),
            platforms: BTreeSet::new(),
        };

        db.save_template(&template).await.unwrap();
        assert_eq!(db.fetch_templates().await.unwrap(), [template.clone()]);
        assert_eq!(db.fetch_template(&template.id).await.unwrap(), Some(template.clone()));

        db.delete_template(&template.id).await.unwrap();
        assert!(db.fetch_templates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_and_reset() {
        let db = client().await;
        db.save_post(&post("p1")).await.unwrap();
        db.save_media(&Media::link("https://drive.example/z")).await.unwrap();
        db.save_settings(&Settings::default()).await.unwrap();

        let snapshot = db.snapshot().await.unwrap();
        assert_eq!(snapshot.posts.len(), 1);
        assert_eq!(snapshot.media.len(), 1);
        assert!(snapshot.templates.is_empty());
        assert_eq!(snapshot.set, Some(Settings::default()));

        db.clear_all().await.unwrap();

        let snapshot = db.snapshot().await.unwrap();
        assert!(snapshot.posts.is_empty());
        assert!(snapshot.media.is_empty());
        assert_eq!(snapshot.set, None);
    }
}
