use crate::{
    model::{Id, platform::PlatformId, post::PostContent},
    util::null_as_default,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TemplateMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Template {
    pub id: Id<TemplateMarker>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: BTreeSet<PlatformId>,
}

impl Template {
    /// The post fields a template pre-fills; the title is left for the writer.
    #[must_use]
    pub fn seed(&self) -> PostContent {
        PostContent {
            content: self.content.clone(),
            hashtags: self.hashtags.clone(),
            platforms: self.platforms.clone(),
            ..PostContent::default()
        }
    }
}
