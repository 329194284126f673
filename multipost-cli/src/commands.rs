use clap::{ArgAction, Args, Parser, Subcommand};
use multipost_common::{
    calendar::CalendarMonth,
    export::{CSV_FILE_NAME, JSON_BACKUP_FILE_NAME, to_csv, to_json_backup},
    legacy::LegacyDocument,
    model::{
        Id, Timestamp,
        media::{FALLBACK_MIME_TYPE, Media, MediaMarker},
        platform::{PLATFORMS, PlatformId, platform_labels},
        post::{Post, PostContent, PostMarker, PostStatus, PostedConfirmation},
        template::{Template, TemplateMarker},
    },
    query::{Dashboard, EngagementTier, PostFilter, engagement_rate, listing, top_performing},
};
use multipost_db::{
    client::{DbClient, DbError},
    migration::replay,
};
use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use time::{Month, error::ComponentRange};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Could not access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid month: {0}")]
    Month(#[from] ComponentRange),
    #[error("No {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("Select at least one platform")]
    NoPlatforms,
    #[error("Use `posts confirm-posted --confirm` to mark a post as posted")]
    PostedNeedsConfirmation,
    #[error("Pass --yes to delete all data")]
    ResetNotConfirmed,
}

type Result<T, E = CommandError> = std::result::Result<T, E>;

/// Plans social media posts and tracks how they performed.
#[derive(Parser, Debug)]
#[command(name = "multipost", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Posts(PostCommand),
    /// Month view of scheduled posts.
    Calendar { year: i32, month: u8 },
    Dashboard,
    #[command(subcommand)]
    Export(ExportCommand),
    /// Imports a JSON backup. Records with the same id are replaced.
    Import { path: PathBuf },
    #[command(subcommand)]
    Media(MediaCommand),
    #[command(subcommand)]
    Templates(TemplateCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Deletes every post, template, media item and the settings.
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    List {
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long)]
        status: Option<PostStatus>,
    },
    /// Posted posts by engagement rate.
    Top,
    Show {
        id: Id<PostMarker>,
    },
    New(PostArgs),
    /// Replaces the given fields of a post.
    Edit {
        id: Id<PostMarker>,
        #[command(flatten)]
        fields: PostArgs,
    },
    Schedule {
        id: Id<PostMarker>,
        at: Timestamp,
    },
    /// Records that the post was published by hand.
    ConfirmPosted {
        id: Id<PostMarker>,
        #[arg(long)]
        confirm: bool,
    },
    /// Prints the text to copy and the pages to open.
    Share {
        id: Id<PostMarker>,
    },
    Delete {
        id: Id<PostMarker>,
    },
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    hashtags: Option<String>,
    /// May be repeated. Defaults to the configured platforms for new posts.
    #[arg(short, long = "platform")]
    platforms: Vec<String>,
    #[arg(long)]
    status: Option<PostStatus>,
    #[arg(long)]
    at: Option<Timestamp>,
    /// Id of a media library item to copy into the post.
    #[arg(long)]
    media: Option<Id<MediaMarker>>,
    #[arg(long)]
    drive_link: Option<String>,
    #[arg(long)]
    views: Option<u64>,
    #[arg(long)]
    likes: Option<u64>,
    #[arg(long)]
    comments: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum ExportCommand {
    Csv {
        #[arg(short, long, default_value = CSV_FILE_NAME)]
        out: PathBuf,
    },
    /// Everything, in the format `import` reads.
    Json {
        #[arg(short, long, default_value = JSON_BACKUP_FILE_NAME)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum MediaCommand {
    List,
    AddUrl { url: String },
    /// Embeds a local file into the library.
    Upload { path: PathBuf },
    Delete { id: Id<MediaMarker> },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, default_value = "")]
        hashtags: String,
        #[arg(short, long = "platform")]
        platforms: Vec<String>,
    },
    Delete {
        id: Id<TemplateMarker>,
    },
    /// Starts a draft from the template.
    Use {
        id: Id<TemplateMarker>,
        /// Schedule it for right now instead.
        #[arg(long)]
        quick: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    Show,
    Notifications {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    DefaultPlatforms {
        platforms: Vec<String>,
    },
}

pub async fn run(db: &DbClient, command: Command) -> Result<()> {
    match command {
        Command::Posts(command) => posts(db, command).await,
        Command::Calendar { year, month } => calendar(db, year, month).await,
        Command::Dashboard => dashboard(db).await,
        Command::Export(command) => export(db, command).await,
        Command::Import { path } => import(db, &path).await,
        Command::Media(command) => media(db, command).await,
        Command::Templates(command) => templates(db, command).await,
        Command::Settings(command) => settings(db, command).await,
        Command::Reset { yes } => {
            if !yes {
                return Err(CommandError::ResetNotConfirmed);
            }
            db.clear_all().await?;
            println!("All data deleted");
            Ok(())
        }
    }
}

fn not_found<Marker>(kind: &'static str, id: &Id<Marker>) -> CommandError {
    CommandError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn platform_ids(raw: Vec<String>) -> BTreeSet<PlatformId> {
    raw.into_iter()
        .map(PlatformId::new)
        .inspect(|platform| {
            if !platform.is_known() {
                let known: Vec<_> = PLATFORMS.iter().map(|info| info.id).collect();
                warn!(%platform, ?known, "Unknown platform");
            }
        })
        .collect()
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_owned(),
        source,
    })
}

async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| CommandError::Io {
            path: path.to_owned(),
            source,
        })
}

fn print_post(post: &Post) {
    let rate = engagement_rate(post);
    let marker = match rate.tier() {
        EngagementTier::High => " 🔥",
        EngagementTier::Normal => "",
    };
    println!(
        "{}  [{}]  {}  {}%{}  {}",
        post.id,
        post.status.label(),
        post.title,
        rate,
        marker,
        platform_labels(&post.platforms).join(" ")
    );
}

async fn fetch_post(db: &DbClient, id: &Id<PostMarker>) -> Result<Post> {
    db.fetch_post(id)
        .await?
        .ok_or_else(|| not_found("post", id))
}

impl PostArgs {
    async fn apply_to(self, content: &mut PostContent, db: &DbClient) -> Result<()> {
        if self.status == Some(PostStatus::Posted) && content.status != PostStatus::Posted {
            return Err(CommandError::PostedNeedsConfirmation);
        }

        if let Some(media_id) = self.media {
            let media = db
                .fetch_media_item(&media_id)
                .await?
                .ok_or_else(|| not_found("media", &media_id))?;
            content.media = Some(media);
        }
        if !self.platforms.is_empty() {
            content.platforms = platform_ids(self.platforms);
        }

        if let Some(title) = self.title {
            content.title = title;
        }
        if let Some(text) = self.content {
            content.content = text;
        }
        if let Some(hashtags) = self.hashtags {
            content.hashtags = hashtags;
        }
        if self.drive_link.is_some() {
            content.drive_link = self.drive_link;
        }
        content.status = self.status.unwrap_or(content.status);
        content.scheduled_at = self.at.or(content.scheduled_at);
        content.analytics.views = self.views.unwrap_or(content.analytics.views);
        content.analytics.likes = self.likes.unwrap_or(content.analytics.likes);
        content.analytics.comments = self.comments.unwrap_or(content.analytics.comments);

        if content.platforms.is_empty() {
            return Err(CommandError::NoPlatforms);
        }
        Ok(())
    }
}

async fn posts(db: &DbClient, command: PostCommand) -> Result<()> {
    match command {
        PostCommand::List { query, status } => {
            let filter = PostFilter { query, status };
            for post in listing(db.fetch_posts().await?, &filter) {
                print_post(&post);
            }
        }
        PostCommand::Top => {
            for post in top_performing(db.fetch_posts().await?) {
                print_post(&post);
            }
        }
        PostCommand::Show { id } => {
            let post = fetch_post(db, &id).await?;
            println!("{}", serde_json::to_string_pretty(&post)?);
        }
        PostCommand::New(fields) => {
            let settings = db.fetch_settings_or_default().await?;
            let mut content = PostContent {
                platforms: settings.default_platforms,
                ..PostContent::default()
            };
            fields.apply_to(&mut content, db).await?;

            let post = Post::new(Id::generate(), content, Timestamp::now());
            db.save_post(&post).await?;
            print_post(&post);
        }
        PostCommand::Edit { id, fields } => {
            let mut post = fetch_post(db, &id).await?;
            let mut content = post.content();
            fields.apply_to(&mut content, db).await?;

            post.apply(content, Timestamp::now());
            db.save_post(&post).await?;
            print_post(&post);
        }
        PostCommand::Schedule { id, at } => {
            let mut post = fetch_post(db, &id).await?;
            if !post.is_schedulable() {
                return Err(CommandError::NoPlatforms);
            }

            post.schedule(at, Timestamp::now());
            db.save_post(&post).await?;
            print_post(&post);
        }
        PostCommand::ConfirmPosted { id, confirm } => {
            let post = db
                .confirm_posted(&id, PostedConfirmation {
                    acknowledged: confirm,
                })
                .await?
                .ok_or_else(|| not_found("post", &id))?;
            print_post(&post);
        }
        PostCommand::Share { id } => {
            let post = fetch_post(db, &id).await?;
            println!("{}", post.share_text());
            println!();
            for platform in post.platform_targets() {
                println!("{}: {}", platform.label(), platform.url);
            }
            if let Some(link) = post.external_link() {
                println!("Media: {link}");
            }
        }
        PostCommand::Delete { id } => {
            db.delete_post(&id).await?;
        }
    }

    Ok(())
}

async fn calendar(db: &DbClient, year: i32, month: u8) -> Result<()> {
    let month = Month::try_from(month)?;
    let posts = db.fetch_posts().await?;
    let calendar = CalendarMonth::bucket(year, month, &posts)?;

    println!("{} {}", calendar.month(), calendar.year());
    println!("Su  Mo  Tu  We  Th  Fr  Sa");
    let mut line = "    ".repeat(usize::from(calendar.leading_blanks()));
    for day in calendar.days() {
        let marker = if day.posts().is_empty() { ' ' } else { '*' };
        line.push_str(&format!("{:>2}{marker} ", day.day()));
        if line.len() >= 4 * 7 {
            println!("{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }

    for day in calendar.days().iter().filter(|day| !day.posts().is_empty()) {
        let titles: Vec<_> = day.preview().iter().map(|post| post.title.as_str()).collect();
        print!("\n{:>2}: {}", day.day(), titles.join(", "));
        if day.overflow() > 0 {
            print!(" (+{})", day.overflow());
        }
    }
    println!();

    Ok(())
}

async fn dashboard(db: &DbClient) -> Result<()> {
    let posts = db.fetch_posts().await?;
    let media = db.fetch_media().await?;
    let dashboard = Dashboard::summarize(&posts, media.len());

    println!("Posts:     {}", dashboard.total_posts);
    println!("Scheduled: {}", dashboard.scheduled_posts);
    println!("Media:     {}", dashboard.media_count);
    match dashboard.best_rate {
        Some(rate) => println!("Best rate: {rate}%"),
        None => println!("Best rate: -"),
    }

    println!("\nUpcoming");
    for post in &dashboard.upcoming {
        let at = post
            .scheduled_at
            .map_or_else(|| "-".to_owned(), |at| at.to_string());
        println!("  {at}  {}", post.title);
    }

    println!("\nTop performing");
    for post in &dashboard.top {
        println!("  {}%  {}", engagement_rate(post), post.title);
    }

    Ok(())
}

async fn export(db: &DbClient, command: ExportCommand) -> Result<()> {
    let (out, contents) = match command {
        ExportCommand::Csv { out } => (out, to_csv(&db.fetch_posts().await?)),
        ExportCommand::Json { out } => (out, to_json_backup(&db.snapshot().await?)?),
    };

    write_file(&out, contents).await?;
    info!(path = %out.display(), "Exported");
    Ok(())
}

async fn import(db: &DbClient, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.to_owned(),
            source,
        })?;
    let import = LegacyDocument::parse(&raw, Timestamp::now())?;
    let report = replay(db, &import).await?;

    println!(
        "Imported {} posts, {} templates, {} media items{}",
        report.posts,
        report.templates,
        report.media,
        if report.settings { " and the settings" } else { "" }
    );
    if report.skipped > 0 {
        println!("Skipped {} records that could not be read", report.skipped);
    }
    Ok(())
}

async fn media(db: &DbClient, command: MediaCommand) -> Result<()> {
    match command {
        MediaCommand::List => {
            for media in db.fetch_media().await? {
                let size = media
                    .embedded_bytes()
                    .map_or_else(|| media.url.clone(), |bytes| format!("{} bytes", bytes.len()));
                println!("{}  {:?}  {}  {size}", media.id, media.kind, media.name);
            }
        }
        MediaCommand::AddUrl { url } => {
            let media = Media::link(url);
            db.save_media(&media).await?;
            println!("{}", media.id);
        }
        MediaCommand::Upload { path } => {
            let bytes = read_file(&path).await?;
            let mime_type = infer::get(&bytes).map_or(FALLBACK_MIME_TYPE, |kind| kind.mime_type());
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

            let media = Media::from_upload(name, mime_type, &bytes);
            db.save_media(&media).await?;
            println!("{}", media.id);
        }
        MediaCommand::Delete { id } => {
            db.delete_media(&id).await?;
        }
    }

    Ok(())
}

async fn templates(db: &DbClient, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::List => {
            for template in db.fetch_templates().await? {
                println!(
                    "{}  {}  {}",
                    template.id,
                    template.name,
                    platform_labels(&template.platforms).join(" ")
                );
            }
        }
        TemplateCommand::Add {
            name,
            content,
            hashtags,
            platforms,
        } => {
            let template = Template {
                id: Id::generate(),
                name,
                content,
                hashtags,
                platforms: platform_ids(platforms),
            };
            db.save_template(&template).await?;
            println!("{}", template.id);
        }
        TemplateCommand::Delete { id } => {
            db.delete_template(&id).await?;
        }
        TemplateCommand::Use { id, quick } => {
            let template = db
                .fetch_template(&id)
                .await?
                .ok_or_else(|| not_found("template", &id))?;

            let now = Timestamp::now();
            let post = if quick {
                Post::quick_from_template(&template, now)
            } else {
                Post::from_template(&template, now)
            };
            db.save_post(&post).await?;
            print_post(&post);
        }
    }

    Ok(())
}

async fn settings(db: &DbClient, command: SettingsCommand) -> Result<()> {
    let settings = match command {
        SettingsCommand::Show => db.fetch_settings_or_default().await?,
        SettingsCommand::Notifications { enabled } => {
            db.update_settings(|settings| settings.notif = enabled).await?
        }
        SettingsCommand::DefaultPlatforms { platforms } => {
            let platforms = platform_ids(platforms);
            db.update_settings(|settings| settings.default_platforms = platforms)
                .await?
        }
    };

    println!("Notifications:     {}", if settings.notif { "on" } else { "off" });
    println!(
        "Default platforms: {}",
        platform_labels(&settings.default_platforms).join(" ")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::commands::{Cli, Command, PostArgs, PostCommand};
    use clap::{CommandFactory, Parser};
    use multipost_common::model::post::PostStatus;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_post_fields() {
        let cli = Cli::try_parse_from([
            "multipost", "posts", "new", "--title", "Launch", "-p", "twitter", "-p", "gmb",
            "--status", "scheduled", "--at", "2024-03-15T09:00",
        ])
        .unwrap();

        let Command::Posts(PostCommand::New(PostArgs {
            title,
            platforms,
            status,
            at,
            ..
        })) = cli.command
        else {
            panic!("unexpected command");
        };
        assert_eq!(title.as_deref(), Some("Launch"));
        assert_eq!(platforms, ["twitter", "gmb"]);
        assert_eq!(status, Some(PostStatus::Scheduled));
        assert_eq!(at.unwrap().to_string(), "2024-03-15T09:00:00Z");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Cli::try_parse_from(["multipost", "posts", "list", "-s", "archived"]).is_err());
        assert!(Cli::try_parse_from(["multipost", "posts", "show", ""]).is_err());
        assert!(Cli::try_parse_from(["multipost", "posts", "schedule", "p1", "soon"]).is_err());
    }

    #[test]
    fn reset_flag() {
        let cli = Cli::try_parse_from(["multipost", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Reset { yes: false }));

        let cli = Cli::try_parse_from(["multipost", "reset", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Reset { yes: true }));
    }
}
