use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use agentdir_cli::{Command, Config, FilterArgs, OutputFormat};
use agentdir_client::{CmsClient, DirectoryClient};
use agentdir_core::{
    related_to, search_by_name, select, AppError, ContentItem, DirectoryConfig, FilterDimension,
    FilterOptions, Listing, ListingEdit, ListingId, ModerationStatus, Newsletter, SortMode,
    StatusUpdate, Subscription,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let config = Config::parse();

    // Setup logging (stderr to keep stdout clean for JSON output)
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(config).await {
        match err.downcast_ref::<AppError>() {
            Some(app_err) => eprintln!("\n❌ {}\n", app_err.user_message()),
            None => eprintln!("\n❌ {:#}\n", err),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let settings = config.resolve()?;

    match config.command {
        Command::Browse {
            filters,
            sort,
            search,
            all,
            format,
        } => {
            let directory = DirectoryClient::from_config(&settings)?;
            let preview = if all {
                None
            } else {
                Some(settings.preview_per_category)
            };
            browse(&directory, &filters, sort, search.as_deref(), preview, format).await?;
        }
        Command::Filters { derive, format } => {
            let directory = DirectoryClient::from_config(&settings)?;
            show_filters(&directory, derive, format).await?;
        }
        Command::Related {
            slug,
            limit,
            format,
        } => {
            let cms = CmsClient::from_config(&settings)?;
            let limit = limit.unwrap_or(settings.related_limit);
            related(&cms, &slug, limit, format).await?;
        }
        Command::Moderation {
            status,
            search,
            format,
        } => {
            let directory = authed_client(&settings)?;
            moderation(&directory, status, search.as_deref(), format).await?;
        }
        Command::SetStatus {
            id,
            status,
            instructions,
        } => {
            let directory = authed_client(&settings)?;
            set_status(&directory, &ListingId::new(id), status, instructions).await?;
        }
        Command::Edit { id, fields } => {
            let directory = authed_client(&settings)?;
            let edit = ListingEdit::from(fields);
            directory.update_listing(&ListingId::new(id.clone()), &edit).await?;
            println!("\n✓ Listing {} updated\n", id);
        }
        Command::Delete { id, yes } => {
            if !yes {
                bail!("Refusing to delete listing {} without --yes", id);
            }
            let directory = authed_client(&settings)?;
            directory.delete_listing(&ListingId::new(id.clone())).await?;
            println!("\n🗑  Deleted listing {}\n", id);
        }
        Command::Like { id } => {
            let directory = authed_client(&settings)?;
            let toggle = directory.toggle_like(&ListingId::new(id.clone())).await?;
            let verb = if toggle.liked { "Liked" } else { "Removed like from" };
            println!("\n♥ {} {} ({} likes)\n", verb, id, toggle.likes);
        }
        Command::Save { id } => {
            let directory = authed_client(&settings)?;
            let saved = directory.toggle_saved(&ListingId::new(id.clone())).await?;
            println!("\n🔖 Wishlist updated for {} (saved by {})\n", id, saved);
        }
        Command::Subscribe { email } => {
            let directory = DirectoryClient::from_config(&settings)?;
            let message = directory.subscribe(&Subscription::new(email)).await?;
            println!(
                "\n✉️  {}\n",
                message.unwrap_or_else(|| "Subscribed successfully.".to_string())
            );
        }
        Command::Newsletter {
            subject,
            text,
            html_file,
        } => {
            let directory = authed_client(&settings)?;
            send_newsletter(&directory, subject, text, html_file.as_deref()).await?;
        }
    }

    Ok(())
}

/// Directory client for commands that act on behalf of a user or an admin;
/// warns when no token is configured.
fn authed_client(settings: &DirectoryConfig) -> anyhow::Result<DirectoryClient> {
    if settings.api_token.is_none() {
        tracing::warn!("No API token configured; the API will likely refuse the request");
    }
    Ok(DirectoryClient::from_config(settings)?)
}

/// Fetch the listing snapshot and print it filtered, sorted and grouped
async fn browse(
    directory: &DirectoryClient,
    filters: &FilterArgs,
    sort: SortMode,
    search: Option<&str>,
    preview: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    info!("Fetching listings from {}", directory.base_url());
    let listings = directory.list_listings().await?;

    let selection = filters.selection();
    let groups = match search {
        Some(query) => select(search_by_name(&listings, query), &selection, sort),
        None => select(&listings, &selection, sort),
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("\n🔍 No listings match the current filters.\n");
        if !selection.is_unfiltered() || search.is_some() {
            println!("Try:");
            println!("  • Removing a filter flag");
            println!("  • Listing available values with: agentdir filters");
        }
        return Ok(());
    }

    println!(
        "\n🤖 {} listings in {} categories (sort: {})\n",
        groups.total_listings(),
        groups.len(),
        sort
    );

    for group in &groups {
        println!("📂 {} ({})", group.category, group.len());
        let shown = match preview {
            Some(limit) => group.preview(limit),
            None => &group.listings[..],
        };
        for listing in shown {
            print_listing(listing);
        }
        if shown.len() < group.len() {
            println!("   … and {} more (use --all)", group.len() - shown.len());
        }
        println!();
    }

    Ok(())
}

fn print_listing(listing: &Listing) {
    let pricing = listing
        .pricing_model
        .as_deref()
        .map(|p| format!("  [{}]", p))
        .unwrap_or_default();
    println!(
        "   • {}{}  ★ {}  ♥ {}  🔖 {}",
        listing.name, pricing, listing.popularity_score, listing.likes, listing.saved_by_count
    );
    if let Some(desc) = listing
        .short_description
        .as_deref()
        .or(listing.tagline.as_deref())
    {
        println!("     {}", truncate_text(desc, 100));
    }
    println!("     id: {}", listing.id);
}

/// Print the values available for each filter dimension
async fn show_filters(
    directory: &DirectoryClient,
    derive: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let options = if derive {
        let listings = directory.list_listings().await?;
        FilterOptions::from_listings(&listings)
    } else {
        directory.filter_options().await?
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    println!();
    for dimension in FilterDimension::ALL {
        let values = options.values(dimension);
        println!("{} ({}):", dimension, values.len());
        if values.is_empty() {
            println!("   (none)");
        }
        for value in values {
            println!("   • {}", value);
        }
        println!();
    }
    Ok(())
}

/// Print the articles related to the article with `slug`
async fn related(
    cms: &CmsClient,
    slug: &str,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    info!("Fetching article '{}'", slug);
    let article = cms.article_by_slug(slug).await?;
    let pool = cms.all_articles().await?;
    let matches = related_to(&article, &pool, limit);

    if format == OutputFormat::Json {
        let out = serde_json::json!({
            "article": article,
            "related": matches,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("\n📰 {}\n", article.title);
    if matches.is_empty() {
        println!("No similar articles.\n");
        return Ok(());
    }

    println!("Similar articles:\n");
    for (i, item) in matches.iter().enumerate() {
        print_article(i + 1, item);
    }
    Ok(())
}

fn print_article(position: usize, item: &ContentItem) {
    println!("{}. {}", position, item.title);
    println!("   🔗 {}", item.slug);
    if let Some(name) = item.category.as_ref().and_then(|c| c.name.as_deref()) {
        println!("   📁 {}", name);
    }
    let tags: Vec<&str> = item.tags.iter().filter_map(|t| t.name.as_deref()).collect();
    if !tags.is_empty() {
        println!("   🏷  {}", tags.join(", "));
    }
    if let Some(desc) = &item.description {
        println!("   📝 {}", truncate_text(desc, 100));
    }
    println!();
}

/// Print bucket counts and the listings of one bucket
async fn moderation(
    directory: &DirectoryClient,
    status: ModerationStatus,
    search: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    info!("Fetching moderation queue...");
    let board = directory.moderation_board().await?;
    let listings = board.search(status, search.unwrap_or_default());

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    let counts = board.counts();
    println!("\n🛡  Moderation queue\n");
    for s in ModerationStatus::ALL {
        let marker = if s == status { "▶" } else { " " };
        println!("  {} {:<10} {}", marker, s.to_string(), counts.get(s));
    }
    println!();

    if listings.is_empty() {
        println!("No {} listings{}.\n", status, search_suffix(search));
        return Ok(());
    }

    for listing in listings {
        println!(
            "  {}  {}  ({})",
            listing.id,
            listing.name,
            listing.category_label()
        );
    }
    println!();
    Ok(())
}

fn search_suffix(search: Option<&str>) -> String {
    match search {
        Some(q) if !q.trim().is_empty() => format!(" matching \"{}\"", q),
        _ => String::new(),
    }
}

async fn set_status(
    directory: &DirectoryClient,
    id: &ListingId,
    status: ModerationStatus,
    instructions: Option<String>,
) -> anyhow::Result<()> {
    if instructions.is_some() && status != ModerationStatus::OnHold {
        tracing::warn!("--instructions is only sent for onHold; ignoring it");
    }
    let update = StatusUpdate::new(status, instructions);
    directory.update_status(id, &update).await?;
    println!("\n✓ Listing {} is now {}\n", id, status);
    Ok(())
}

async fn send_newsletter(
    directory: &DirectoryClient,
    subject: String,
    text: String,
    html_file: Option<&Path>,
) -> anyhow::Result<()> {
    let html = match html_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let newsletter = Newsletter::new(subject, text, html);
    let message = match directory.send_newsletter(&newsletter).await {
        Ok(message) => message,
        Err(e @ (AppError::Timeout(_) | AppError::ServerError(_))) => {
            tracing::warn!("The newsletter may have gone out before the failure; check before sending again");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    println!(
        "\n✉️  {}\n",
        message.unwrap_or_else(|| "Newsletter sent.".to_string())
    );
    Ok(())
}

/// Truncate text to a maximum number of characters, adding ellipsis if needed
fn truncate_text(text: &str, max_chars: usize) -> String {
    // Collapse whitespace and newlines
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
