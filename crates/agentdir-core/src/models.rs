//! Typed records for directory listings and CMS articles.
//!
//! Both arrive as loosely-typed JSON. Optional fields are `Option`, and
//! collections that the remote side may send as `null` deserialize to an
//! empty `Vec`, so downstream code never re-checks for missing data.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::moderation::ModerationStatus;
use crate::selector::FilterDimension;

/// Label used for listings without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a moderation status, mapping `null` and unrecognised values to `None`.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<ModerationStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Reads a list of strings, dropping `null` entries.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}

// =============================================================================
// Listings
// =============================================================================

/// Opaque listing identifier assigned by the directory API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A directory entry: one submitted AI agent.
///
/// # Examples
///
/// ```
/// use agentdir_core::Listing;
///
/// let json = r#"{
///     "_id": "66f1c0a2",
///     "name": "AI Agent Pro",
///     "category": "Marketing",
///     "pricingModel": "Freemium",
///     "popularityScore": 42,
///     "tags": null
/// }"#;
///
/// let listing: Listing = serde_json::from_str(json).unwrap();
/// assert_eq!(listing.id.as_str(), "66f1c0a2");
/// assert_eq!(listing.category_label(), "Marketing");
/// assert_eq!(listing.popularity_score, 42.0);
/// assert!(listing.tags.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: ListingId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub access_model: Option<String>,
    #[serde(default)]
    pub pricing_model: Option<String>,
    /// Missing scores count as zero when sorting.
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saved_by_count: u64,
    /// Unknown statuses read as `None` rather than failing the record.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<ModerationStatus>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Minimal listing, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ListingId::new(id),
            name: name.into(),
            category: None,
            industry: None,
            access_model: None,
            pricing_model: None,
            popularity_score: 0.0,
            likes: 0,
            saved_by_count: 0,
            status: None,
            tagline: None,
            short_description: None,
            website_url: None,
            logo: None,
            tags: Vec::new(),
            created_at: None,
        }
    }

    /// The listing's value for one filter dimension, without surrounding
    /// whitespace.
    pub fn value_for(&self, dimension: FilterDimension) -> Option<&str> {
        let value = match dimension {
            FilterDimension::Category => &self.category,
            FilterDimension::Industry => &self.industry,
            FilterDimension::AccessModel => &self.access_model,
            FilterDimension::PricingModel => &self.pricing_model,
        };
        value.as_deref().map(str::trim)
    }

    /// Category used for grouping; blank or missing maps to [`UNCATEGORIZED`].
    pub fn category_label(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }
}

// =============================================================================
// CMS content
// =============================================================================

/// Numeric id of a CMS article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub u64);

/// Numeric id of a CMS category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

/// Numeric id of a CMS tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCategory {
    pub id: CategoryId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTag {
    pub id: TagId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A blog article authored in the CMS.
///
/// # Examples
///
/// ```
/// use agentdir_core::{ContentItem, TagId};
///
/// let json = r#"{
///     "id": 7,
///     "title": "Choosing an agent",
///     "slug": "choosing-an-agent",
///     "category": null,
///     "tags": [{"id": 3, "name": "guides"}]
/// }"#;
///
/// let item: ContentItem = serde_json::from_str(json).unwrap();
/// assert!(item.category.is_none());
/// assert_eq!(item.tags[0].id, TagId(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ContentId,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<ContentCategory>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<ContentTag>,
}

impl ContentItem {
    pub fn new(id: u64, title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: ContentId(id),
            document_id: None,
            title: title.into(),
            slug: slug.into(),
            description: None,
            published_at: None,
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, id: u64) -> Self {
        self.category = Some(ContentCategory {
            id: CategoryId(id),
            name: None,
            slug: None,
        });
        self
    }

    pub fn with_tags(mut self, ids: &[u64]) -> Self {
        self.tags = ids
            .iter()
            .map(|&id| ContentTag {
                id: TagId(id),
                name: None,
                slug: None,
            })
            .collect();
        self
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_ref().map(|c| c.id)
    }

    pub fn tag_ids(&self) -> impl Iterator<Item = TagId> + '_ {
        self.tags.iter().map(|t| t.id)
    }
}
