//! Documents handed to the user as downloads.

use crate::{legacy::LegacyDocument, model::post::Post, query::engagement_rate};
use std::borrow::Cow;

pub const CSV_FILE_NAME: &str = "sns_mp_strategy.csv";
pub const CSV_HEADER: &str = "Title,Text,Status,ROI,EngCount";
pub const JSON_BACKUP_FILE_NAME: &str = "sns_mp_backup.json";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Engagement summary of `posts`, one row each.
///
/// The text column is always quoted. Titles are only quoted when they would
/// otherwise break the row.
pub fn to_csv<'a>(posts: impl IntoIterator<Item = &'a Post>) -> String {
    let mut csv = String::new();
    csv.push(BYTE_ORDER_MARK);
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    let rows: Vec<String> = posts.into_iter().map(csv_row).collect();
    csv.push_str(&rows.join("\n"));
    csv
}

fn csv_row(post: &Post) -> String {
    format!(
        "{},{},{},{}%,{}",
        escape_title(&post.title),
        quote(&post.content),
        post.status,
        engagement_rate(post),
        post.analytics.engagements(),
    )
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn escape_title(title: &str) -> Cow<'_, str> {
    if title.contains([',', '"', '\n', '\r']) {
        Cow::Owned(quote(title))
    } else {
        Cow::Borrowed(title)
    }
}

/// Full backup in the legacy document format.
pub fn to_json_backup(document: &LegacyDocument) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}

#[cfg(test)]
mod tests {
    use crate::{
        export::{CSV_HEADER, to_csv, to_json_backup},
        legacy::LegacyDocument,
        model::{
            Id, Timestamp,
            post::{Analytics, Post, PostContent, PostStatus},
            settings::Settings,
        },
    };
    use time::macros::datetime;

    fn post(title: &str, content: &str, status: PostStatus, analytics: Analytics) -> Post {
        Post::new(
            Id::new(title).unwrap(),
            PostContent {
                title: title.to_owned(),
                content: content.to_owned(),
                status,
                analytics,
                ..PostContent::default()
            },
            Timestamp::new(datetime!(2024-03-01 00:00 UTC)),
        )
    }

    #[test]
    fn single_row() {
        let post = post(
            "A",
            r#"He said "hi""#,
            PostStatus::Posted,
            Analytics {
                views: 10,
                likes: 2,
                comments: 1,
            },
        );

        assert_eq!(
            to_csv([&post]),
            "\u{feff}Title,Text,Status,ROI,EngCount\nA,\"He said \"\"hi\"\"\",posted,30.00%,3"
        );
    }

    #[test]
    fn rows_without_views() {
        let posts = [
            post("First", "one", PostStatus::Draft, Analytics::default()),
            post(
                "Second, again",
                "two\nlines",
                PostStatus::Scheduled,
                Analytics {
                    views: 0,
                    likes: 4,
                    comments: 0,
                },
            ),
        ];

        let csv = to_csv(&posts);
        let lines: Vec<_> = csv.trim_start_matches('\u{feff}').split('\n').collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "First,\"one\",draft,0.00%,0");
        assert_eq!(lines[2], "\"Second, again\",\"two");
        assert_eq!(lines[3], "lines\",scheduled,0.00%,4");
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(to_csv([]), "\u{feff}Title,Text,Status,ROI,EngCount\n");
    }

    #[test]
    fn json_backup_reads_back_as_legacy_document() {
        let document = LegacyDocument {
            posts: vec![post("A", "a", PostStatus::Draft, Analytics::default())],
            set: Some(Settings::default()),
            ..LegacyDocument::default()
        };

        let backup = to_json_backup(&document).unwrap();
        let import = LegacyDocument::parse(&backup, Timestamp::now()).unwrap();
        assert!(import.skipped.is_empty());
        assert_eq!(import.document, document);
    }
}
