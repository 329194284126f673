//! Derived views over posts that were already loaded from storage.

use crate::model::post::{Analytics, Post, PostStatus};
use std::{
    cmp::{Ordering, Reverse},
    fmt::{Display, Formatter},
};

pub const HIGH_ENGAGEMENT_THRESHOLD: f64 = 5.0;
pub const DASHBOARD_UPCOMING_LEN: usize = 5;
pub const DASHBOARD_TOP_LEN: usize = 3;

/// `(likes + comments) / views` in percent. Displays with two decimals.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default)]
pub struct EngagementRate(f64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum EngagementTier {
    Normal,
    High,
}

impl EngagementRate {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(analytics: Analytics) -> Self {
        if analytics.views == 0 {
            return Self(0.0);
        }

        Self(analytics.engagements() as f64 / analytics.views as f64 * 100.0)
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn tier(self) -> EngagementTier {
        if self.0 > HIGH_ENGAGEMENT_THRESHOLD {
            EngagementTier::High
        } else {
            EngagementTier::Normal
        }
    }

    fn total_cmp(self, other: Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for EngagementRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[must_use]
pub fn engagement_rate(post: &Post) -> EngagementRate {
    EngagementRate::of(post.analytics)
}

/// Text search and status filter of the post list.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFilter {
    pub query: String,
    pub status: Option<PostStatus>,
}

impl PostFilter {
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        self.matches_query(post) && self.status.is_none_or(|status| post.status == status)
    }

    fn matches_query(&self, post: &Post) -> bool {
        if self.query.is_empty() {
            return true;
        }

        let haystack = format!("{}{}{}", post.title, post.content, post.hashtags).to_lowercase();
        haystack.contains(&self.query.to_lowercase())
    }

    #[must_use]
    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        posts.into_iter().filter(|post| self.matches(post)).collect()
    }
}

/// Most recently updated first.
pub fn sort_by_recent(posts: &mut [Post]) {
    posts.sort_by_key(|post| Reverse(post.updated_at));
}

/// The post list: filtered, then most recently updated first.
#[must_use]
pub fn listing(posts: Vec<Post>, filter: &PostFilter) -> Vec<Post> {
    let mut posts = filter.apply(posts);
    sort_by_recent(&mut posts);
    posts
}

/// Posted posts only, highest engagement rate first.
#[must_use]
pub fn top_performing(posts: impl IntoIterator<Item = Post>) -> Vec<Post> {
    let mut posted: Vec<_> = posts
        .into_iter()
        .filter(|post| post.status == PostStatus::Posted)
        .collect();
    posted.sort_by(|a, b| engagement_rate(b).total_cmp(engagement_rate(a)));
    posted
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Dashboard {
    pub total_posts: usize,
    pub scheduled_posts: usize,
    pub media_count: usize,
    pub best_rate: Option<EngagementRate>,
    pub upcoming: Vec<Post>,
    pub top: Vec<Post>,
}

impl Dashboard {
    #[must_use]
    pub fn summarize(posts: &[Post], media_count: usize) -> Self {
        let mut upcoming: Vec<_> = posts
            .iter()
            .filter(|post| post.status == PostStatus::Scheduled)
            .cloned()
            .collect();
        let scheduled_posts = upcoming.len();
        // unscheduled times sort last
        upcoming.sort_by_key(|post| (post.scheduled_at.is_none(), post.scheduled_at));
        upcoming.truncate(DASHBOARD_UPCOMING_LEN);

        let mut top = top_performing(posts.iter().cloned());
        let best_rate = top.first().map(engagement_rate);
        top.truncate(DASHBOARD_TOP_LEN);

        Self {
            total_posts: posts.len(),
            scheduled_posts,
            media_count,
            best_rate,
            upcoming,
            top,
        }
    }
}
