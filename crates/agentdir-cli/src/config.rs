use std::path::PathBuf;

use agentdir_core::config::{load_config, DirectoryConfig};
use agentdir_core::error::AppError;
use agentdir_core::moderation::{ListingEdit, ModerationStatus};
use agentdir_core::selector::{FilterDimension, FilterSelection, FilterValue, SortMode};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "agentdir")]
#[command(
    author,
    version,
    about = "Browse, search and moderate the AI agent directory"
)]
#[command(after_help = "Examples:
  agentdir browse --category Marketing --sort popularity
  agentdir related choosing-an-ai-agent
  agentdir moderation --status onHold --search chat
  agentdir set-status 66f1c0a2 onHold --instructions \"Please add a logo\"")]
pub struct Config {
    /// Base URL of the directory REST API
    #[arg(long, env = "AGENTDIR_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Base URL of the blog CMS
    #[arg(long, env = "AGENTDIR_CMS_URL", global = true)]
    pub cms_url: Option<String>,

    /// Bearer token for admin endpoints
    #[arg(long, env = "AGENTDIR_API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    /// Custom path to the config.toml file
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Loads the config file and applies command-line overrides on top.
    pub fn resolve(&self) -> Result<DirectoryConfig, AppError> {
        let mut resolved = load_config(self.config.as_deref())?;
        if let Some(url) = &self.api_url {
            resolved.api_url = url.clone();
        }
        if let Some(url) = &self.cms_url {
            resolved.cms_url = url.clone();
        }
        if let Some(token) = &self.api_token {
            resolved.api_token = Some(token.clone());
        }
        Ok(resolved)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse listings grouped by category
    #[command(after_help = "Examples:
  agentdir browse
  agentdir browse --pricing-model Freemium --sort popularity
  agentdir browse --search chat --all
  agentdir browse --format json > listings.json")]
    Browse {
        #[command(flatten)]
        filters: FilterArgs,

        /// Ordering within the result
        #[arg(short, long, default_value = "default")]
        sort: SortMode,

        /// Only listings whose name contains this text (case-insensitive)
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Show every listing instead of a preview per category
        #[arg(long)]
        all: bool,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the values available for each filter
    Filters {
        /// Derive the values from the listing snapshot instead of the filters endpoint
        #[arg(long)]
        derive: bool,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show articles related to a blog article
    #[command(after_help = "Example: agentdir related choosing-an-ai-agent --limit 5")]
    Related {
        /// Slug of the reference article
        slug: String,

        /// Maximum number of related articles (defaults to config related_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the moderation queue
    Moderation {
        /// Bucket to list
        #[arg(short, long, default_value = "requested")]
        status: ModerationStatus,

        /// Only listings whose name contains this text (case-insensitive)
        #[arg(short = 'q', long)]
        search: Option<String>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Move a listing to another moderation bucket
    SetStatus {
        /// Listing id
        id: String,

        /// New status: requested, accepted, rejected or onHold
        status: ModerationStatus,

        /// Instructions for the submitter (onHold only)
        #[arg(short, long)]
        instructions: Option<String>,
    },
    /// Edit the text fields of a listing
    #[command(after_help = "Example: agentdir edit 66f1c0a2 --pricing-model Paid --tags sales,crm")]
    Edit {
        /// Listing id
        id: String,

        #[command(flatten)]
        fields: EditArgs,
    },
    /// Permanently delete a listing
    Delete {
        /// Listing id
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Like a listing, or remove your like
    Like {
        /// Listing id
        id: String,
    },
    /// Add a listing to your wishlist, or remove it
    Save {
        /// Listing id
        id: String,
    },
    /// Subscribe an email address to the newsletter
    Subscribe {
        email: String,
    },
    /// Send a newsletter to subscribers
    Newsletter {
        #[arg(long)]
        subject: String,

        /// Plain-text body
        #[arg(long)]
        text: String,

        /// HTML body; defaults to the text wrapped in a paragraph
        #[arg(long, value_name = "PATH")]
        html_file: Option<PathBuf>,
    },
}

/// Filter flags shared by listing views. Omitted flags mean "no filter".
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub industry: Option<String>,

    #[arg(long)]
    pub access_model: Option<String>,

    #[arg(long)]
    pub pricing_model: Option<String>,
}

impl FilterArgs {
    pub fn selection(&self) -> FilterSelection {
        let mut selection = FilterSelection::new();
        let flags = [
            (FilterDimension::Category, &self.category),
            (FilterDimension::Industry, &self.industry),
            (FilterDimension::AccessModel, &self.access_model),
            (FilterDimension::PricingModel, &self.pricing_model),
        ];
        for (dimension, value) in flags {
            if let Some(raw) = value {
                selection.set(dimension, FilterValue::parse(dimension, raw));
            }
        }
        selection
    }
}

/// Listing fields accepted by `edit`. Omitted flags leave the field unchanged.
#[derive(Args, Debug, Default, Clone)]
pub struct EditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub website_url: Option<String>,
    #[arg(long)]
    pub access_model: Option<String>,
    #[arg(long)]
    pub pricing_model: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub industry: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long)]
    pub owner_email: Option<String>,
    #[arg(long)]
    pub tagline: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    pub key_features: Vec<String>,
    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    pub use_cases: Vec<String>,
    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long)]
    pub video_url: Option<String>,
    #[arg(long)]
    pub individual_plan: Option<String>,
    #[arg(long)]
    pub enterprise_plan: Option<String>,
    #[arg(long)]
    pub subscription_model: Option<String>,
    #[arg(long)]
    pub refund_policy: Option<String>,
}

impl From<EditArgs> for ListingEdit {
    fn from(args: EditArgs) -> Self {
        Self {
            name: args.name,
            website_url: args.website_url,
            access_model: args.access_model,
            pricing_model: args.pricing_model,
            category: args.category,
            industry: args.industry,
            price: args.price,
            owner_email: args.owner_email,
            tagline: args.tagline,
            description: args.description,
            key_features: args.key_features,
            use_cases: args.use_cases,
            tags: args.tags,
            video_url: args.video_url,
            individual_plan: args.individual_plan,
            enterprise_plan: args.enterprise_plan,
            subscription_model: args.subscription_model,
            refund_policy: args.refund_policy,
        }
    }
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("agentdir").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_browse_defaults() {
        let config = parse(&["browse"]);
        match config.command {
            Command::Browse {
                filters,
                sort,
                search,
                all,
                format,
            } => {
                assert!(filters.selection().is_unfiltered());
                assert_eq!(sort, SortMode::Default);
                assert!(search.is_none());
                assert!(!all);
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_browse_filters_and_sort() {
        let config = parse(&[
            "browse",
            "--category",
            "Marketing",
            "--access-model",
            "Model",
            "--sort",
            "popularity",
        ]);
        let Command::Browse { filters, sort, .. } = config.command else {
            panic!("expected browse");
        };
        let selection = filters.selection();
        assert_eq!(
            selection.get(FilterDimension::Category),
            &FilterValue::Exactly("Marketing".to_string())
        );
        assert!(selection.get(FilterDimension::AccessModel).is_any());
        assert_eq!(sort, SortMode::Popularity);
    }

    #[test]
    fn test_invalid_sort_is_rejected() {
        let result = Config::try_parse_from(["agentdir", "browse", "--sort", "newest"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_set_status_parses_status() {
        let config = parse(&["set-status", "abc", "on-hold", "-i", "Add pricing"]);
        let Command::SetStatus {
            id,
            status,
            instructions,
        } = config.command
        else {
            panic!("expected set-status");
        };
        assert_eq!(id, "abc");
        assert_eq!(status, ModerationStatus::OnHold);
        assert_eq!(instructions.as_deref(), Some("Add pricing"));
    }

    #[test]
    fn test_moderation_default_bucket() {
        let config = parse(&["moderation"]);
        let Command::Moderation { status, .. } = config.command else {
            panic!("expected moderation");
        };
        assert_eq!(status, ModerationStatus::Requested);
    }

    #[test]
    fn test_edit_collects_fields() {
        let config = parse(&[
            "edit",
            "a1",
            "--tagline",
            "Books meetings",
            "--tags",
            "sales,crm",
        ]);
        let Command::Edit { id, fields } = config.command else {
            panic!("expected edit");
        };
        assert_eq!(id, "a1");
        let edit = ListingEdit::from(fields);
        assert_eq!(
            edit.form_fields(),
            vec![
                ("tagline", "Books meetings".to_string()),
                ("tags", "sales, crm".to_string()),
            ]
        );
    }

    #[test]
    fn test_like_save_subscribe_parse() {
        assert!(matches!(parse(&["like", "a1"]).command, Command::Like { ref id } if id == "a1"));
        assert!(matches!(parse(&["save", "a1"]).command, Command::Save { ref id } if id == "a1"));
        assert!(matches!(
            parse(&["subscribe", "reader@example.com"]).command,
            Command::Subscribe { ref email } if email == "reader@example.com"
        ));
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"http://file/api\"\nrelated_limit = 4\n").unwrap();

        let config = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "http://flag/api",
            "filters",
        ]);
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.api_url, "http://flag/api");
        assert_eq!(resolved.related_limit, 4);
    }
}
