use crate::{
    model::{
        Id, Timestamp, lenient_timestamp,
        media::{Media, MediaKind},
        platform::{PlatformId, PlatformInfo},
        template::Template,
    },
    util::{non_empty_string, non_negative, null_as_default},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

pub const UNTITLED: &str = "無題";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Scheduled,
    Posted,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown post status: {0:?}")]
pub struct UnknownStatusError(String);

impl PostStatus {
    pub const ALL: [PostStatus; 3] = [Self::Draft, Self::Scheduled, Self::Posted];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Posted => "posted",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Scheduled => "Scheduled",
            Self::Posted => "Posted",
        }
    }
}

impl Display for PostStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatusError(s.to_owned()))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Analytics {
    #[serde(default, deserialize_with = "non_negative")]
    pub views: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub likes: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub comments: u64,
}

impl Analytics {
    #[must_use]
    pub fn engagements(self) -> u64 {
        self.likes.saturating_add(self.comments)
    }
}

/// The human acknowledgment that a post really went out.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostedConfirmation {
    pub acknowledged: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Marking a post as posted needs an explicit confirmation")]
pub struct UnconfirmedPostedError;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: BTreeSet<PlatformId>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_at: Option<Timestamp>,
    /// Copied from the media library when the post is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_data: Option<Media>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub drive_link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analytics: Analytics,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Everything a writer chooses when composing a post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostContent {
    pub title: String,
    pub content: String,
    pub hashtags: String,
    pub platforms: BTreeSet<PlatformId>,
    pub status: PostStatus,
    pub scheduled_at: Option<Timestamp>,
    pub media: Option<Media>,
    pub drive_link: Option<String>,
    pub analytics: Analytics,
}

impl Post {
    #[must_use]
    pub fn new(id: Id<PostMarker>, content: PostContent, now: Timestamp) -> Self {
        let mut post = Self {
            id,
            title: String::new(),
            content: String::new(),
            hashtags: String::new(),
            platforms: BTreeSet::new(),
            status: PostStatus::Draft,
            scheduled_at: None,
            media_data: None,
            drive_link: None,
            analytics: Analytics::default(),
            created_at: now,
            updated_at: now,
        };
        post.apply(content, now);
        post
    }

    /// Overwrites every editable field, keeping `id` and `created_at`.
    pub fn apply(&mut self, content: PostContent, now: Timestamp) {
        self.title = if content.title.is_empty() {
            UNTITLED.to_owned()
        } else {
            content.title
        };
        self.content = content.content;
        self.hashtags = content.hashtags;
        self.platforms = content.platforms;
        self.status = content.status;
        self.scheduled_at = content.scheduled_at;
        self.media_data = content.media;
        self.drive_link = content.drive_link.filter(|link| !link.is_empty());
        self.analytics = content.analytics;
        self.updated_at = now;
    }

    /// Starts a draft from a template, with a fresh id.
    #[must_use]
    pub fn from_template(template: &Template, now: Timestamp) -> Self {
        Self::new(Id::generate(), template.seed(), now)
    }

    /// Starts a post from a template that is scheduled for right now.
    #[must_use]
    pub fn quick_from_template(template: &Template, now: Timestamp) -> Self {
        let mut post = Self::from_template(template, now);
        post.status = PostStatus::Scheduled;
        post.scheduled_at = Some(now);
        post
    }

    #[must_use]
    pub fn content(&self) -> PostContent {
        PostContent {
            title: self.title.clone(),
            content: self.content.clone(),
            hashtags: self.hashtags.clone(),
            platforms: self.platforms.clone(),
            status: self.status,
            scheduled_at: self.scheduled_at,
            media: self.media_data.clone(),
            drive_link: self.drive_link.clone(),
            analytics: self.analytics,
        }
    }

    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        !self.platforms.is_empty()
    }

    /// Sets the schedule time; a draft becomes scheduled.
    pub fn schedule(&mut self, at: Timestamp, now: Timestamp) {
        self.scheduled_at = Some(at);
        if self.status == PostStatus::Draft {
            self.status = PostStatus::Scheduled;
        }
        self.updated_at = now;
    }

    pub fn mark_posted(
        &mut self,
        confirmation: PostedConfirmation,
        now: Timestamp,
    ) -> Result<(), UnconfirmedPostedError> {
        if !confirmation.acknowledged {
            return Err(UnconfirmedPostedError);
        }

        self.status = PostStatus::Posted;
        self.updated_at = now;
        Ok(())
    }

    pub fn attach_media(&mut self, media: &Media) {
        self.media_data = Some(media.clone());
    }

    /// Text that gets copied into a platform's composer.
    #[must_use]
    pub fn share_text(&self) -> String {
        [self.content.as_str(), self.hashtags.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[must_use]
    pub fn external_link(&self) -> Option<&str> {
        self.drive_link.as_deref().or_else(|| {
            self.media_data
                .as_ref()
                .filter(|media| media.kind == MediaKind::Url)
                .map(|media| media.url.as_str())
        })
    }

    /// The known platforms this post targets, whose pages the user opens.
    pub fn platform_targets(&self) -> impl Iterator<Item = &'static PlatformInfo> + '_ {
        self.platforms.iter().filter_map(PlatformId::info)
    }
}
