//! agentdir core - domain types, listing selection, related-article
//! matching, moderation types and configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod moderation;
pub mod related;
pub mod selector;

pub use config::{default_config_path, load_config, DirectoryConfig, HttpConfig};
pub use error::AppError;
pub use models::{
    CategoryId, ContentCategory, ContentId, ContentItem, ContentTag, Listing, ListingId, TagId,
    UNCATEGORIZED,
};
pub use moderation::{
    ListingEdit, ModerationBoard, ModerationCounts, ModerationStatus, Newsletter, StatusUpdate,
    Subscription,
};
pub use related::{related_to, DEFAULT_RELATED_LIMIT};
pub use selector::{
    group_by_category, search_by_name, select, CategoryGroup, CategoryGroups, FilterDimension,
    FilterOptions, FilterSelection, FilterValue, SortMode,
};
