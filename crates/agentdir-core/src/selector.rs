//! Listing selection: filter, sort and group a listing snapshot for display.
//!
//! Everything here is pure. Callers own the snapshot and may re-run
//! [`select`] on every filter change; nothing is cached between calls.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::models::Listing;

/// One axis the browse view can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDimension {
    Category,
    Industry,
    AccessModel,
    PricingModel,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 4] = [
        FilterDimension::Category,
        FilterDimension::Industry,
        FilterDimension::AccessModel,
        FilterDimension::PricingModel,
    ];

    /// Placeholder label the UI shows when the dimension is unfiltered.
    pub fn sentinel_label(self) -> &'static str {
        match self {
            FilterDimension::Category => "Category",
            FilterDimension::Industry => "Industry",
            FilterDimension::AccessModel => "Model",
            FilterDimension::PricingModel => "Pricing",
        }
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterDimension::Category => "category",
            FilterDimension::Industry => "industry",
            FilterDimension::AccessModel => "access model",
            FilterDimension::PricingModel => "pricing model",
        };
        f.write_str(name)
    }
}

/// The selection for a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    /// No filter applied. Never compared against listing data.
    #[default]
    Any,
    Exactly(String),
}

impl FilterValue {
    /// Interprets raw UI input. Blank input and the dimension's sentinel
    /// label both mean [`FilterValue::Any`].
    ///
    /// ```
    /// use agentdir_core::{FilterDimension, FilterValue};
    ///
    /// assert_eq!(FilterValue::parse(FilterDimension::AccessModel, "Model"), FilterValue::Any);
    /// assert_eq!(
    ///     FilterValue::parse(FilterDimension::Category, "Marketing"),
    ///     FilterValue::Exactly("Marketing".to_string())
    /// );
    /// ```
    pub fn parse(dimension: FilterDimension, raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == dimension.sentinel_label() {
            FilterValue::Any
        } else {
            FilterValue::Exactly(raw.to_string())
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, FilterValue::Any)
    }

    /// Exact, case-sensitive comparison. Callers pass values already
    /// trimmed (see [`Listing::value_for`]). A missing value never matches a
    /// concrete selection.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            FilterValue::Any => true,
            FilterValue::Exactly(wanted) => value == Some(wanted.as_str()),
        }
    }
}

/// Exactly one [`FilterValue`] per [`FilterDimension`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    category: FilterValue,
    industry: FilterValue,
    access_model: FilterValue,
    pricing_model: FilterValue,
}

impl FilterSelection {
    /// All dimensions unfiltered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSelection::set`] for a concrete value.
    pub fn with(mut self, dimension: FilterDimension, value: impl Into<String>) -> Self {
        self.set(dimension, FilterValue::Exactly(value.into()));
        self
    }

    pub fn get(&self, dimension: FilterDimension) -> &FilterValue {
        match dimension {
            FilterDimension::Category => &self.category,
            FilterDimension::Industry => &self.industry,
            FilterDimension::AccessModel => &self.access_model,
            FilterDimension::PricingModel => &self.pricing_model,
        }
    }

    pub fn set(&mut self, dimension: FilterDimension, value: FilterValue) {
        let slot = match dimension {
            FilterDimension::Category => &mut self.category,
            FilterDimension::Industry => &mut self.industry,
            FilterDimension::AccessModel => &mut self.access_model,
            FilterDimension::PricingModel => &mut self.pricing_model,
        };
        *slot = value;
    }

    pub fn reset(&mut self, dimension: FilterDimension) {
        self.set(dimension, FilterValue::Any);
    }

    pub fn is_unfiltered(&self) -> bool {
        FilterDimension::ALL.iter().all(|&d| self.get(d).is_any())
    }

    /// True when the listing satisfies every dimension.
    pub fn matches(&self, listing: &Listing) -> bool {
        FilterDimension::ALL
            .iter()
            .all(|&d| self.get(d).matches(listing.value_for(d)))
    }
}

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Keep input order.
    #[default]
    Default,
    /// Descending popularity score, ties keep input order.
    Popularity,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(SortMode::Default),
            "popularity" | "popular" => Ok(SortMode::Popularity),
            other => Err(format!(
                "unknown sort mode '{}' (expected 'default' or 'popularity')",
                other
            )),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Default => f.write_str("default"),
            SortMode::Popularity => f.write_str("popularity"),
        }
    }
}

/// Listings sharing one category label, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub category: &'a str,
    pub listings: Vec<&'a Listing>,
}

impl<'a> CategoryGroup<'a> {
    /// The first `limit` listings of the group.
    pub fn preview(&self, limit: usize) -> &[&'a Listing] {
        &self.listings[..self.listings.len().min(limit)]
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Category groups in first-encounter order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryGroups<'a> {
    groups: Vec<CategoryGroup<'a>>,
}

impl<'a> CategoryGroups<'a> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryGroup<'a>> {
        self.groups.iter().find(|g| g.category == category)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CategoryGroup<'a>> {
        self.groups.iter()
    }

    pub fn categories(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.groups.iter().map(|g| g.category)
    }

    /// Every retained listing, group by group.
    pub fn listings(&self) -> impl Iterator<Item = &'a Listing> + '_ {
        self.groups.iter().flat_map(|g| g.listings.iter().copied())
    }

    pub fn total_listings(&self) -> usize {
        self.groups.iter().map(CategoryGroup::len).sum()
    }
}

impl<'g, 'a> IntoIterator for &'g CategoryGroups<'a> {
    type Item = &'g CategoryGroup<'a>;
    type IntoIter = std::slice::Iter<'g, CategoryGroup<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl Serialize for CategoryGroups<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(group.category, &group.listings)?;
        }
        map.end()
    }
}

/// Filters, sorts and groups `listings` for display.
///
/// # Examples
///
/// ```
/// use agentdir_core::{select, FilterDimension, FilterSelection, Listing, SortMode};
///
/// let mut a = Listing::new("1", "Scout");
/// a.category = Some("Sales".to_string());
/// let mut b = Listing::new("2", "Quill");
/// b.category = Some("Writing".to_string());
///
/// let listings = vec![a, b];
/// let filters = FilterSelection::new().with(FilterDimension::Category, "Writing");
/// let groups = select(&listings, &filters, SortMode::Default);
///
/// assert_eq!(groups.categories().collect::<Vec<_>>(), vec!["Writing"]);
/// assert_eq!(groups.total_listings(), 1);
/// ```
pub fn select<'a, I>(listings: I, filters: &FilterSelection, sort: SortMode) -> CategoryGroups<'a>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut retained: Vec<&'a Listing> = listings
        .into_iter()
        .filter(|listing| filters.matches(listing))
        .collect();

    if sort == SortMode::Popularity {
        // slice::sort_by is stable
        retained.sort_by(|a, b| b.popularity_score.total_cmp(&a.popularity_score));
    }

    group_by_category(retained)
}

/// Partitions listings by [`Listing::category_label`], keeping order.
pub fn group_by_category<'a, I>(listings: I) -> CategoryGroups<'a>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<CategoryGroup<'a>> = Vec::new();

    for listing in listings {
        let category = listing.category_label();
        let slot = *index.entry(category).or_insert_with(|| {
            groups.push(CategoryGroup {
                category,
                listings: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].listings.push(listing);
    }

    CategoryGroups { groups }
}

/// Case-insensitive substring match on listing names.
///
/// Independent of [`select`]; compose by passing its output to `select`.
/// An empty query keeps everything.
pub fn search_by_name<'a, I>(listings: I, query: &str) -> impl Iterator<Item = &'a Listing>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let needle = query.trim().to_lowercase();
    listings
        .into_iter()
        .filter(move |listing| listing.name.to_lowercase().contains(&needle))
}

/// Distinct values available for each filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub access_models: Vec<String>,
    #[serde(default)]
    pub pricing_models: Vec<String>,
}

impl FilterOptions {
    /// Sorted, de-duplicated values present in a snapshot. Blank values are skipped.
    pub fn from_listings<'a, I>(listings: I) -> Self
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let mut sets: [BTreeSet<&str>; 4] = Default::default();
        for listing in listings {
            for (set, dimension) in sets.iter_mut().zip(FilterDimension::ALL) {
                if let Some(value) = listing.value_for(dimension) {
                    if !value.trim().is_empty() {
                        set.insert(value);
                    }
                }
            }
        }

        let [categories, industries, access_models, pricing_models] =
            sets.map(|set| set.into_iter().map(str::to_string).collect::<Vec<String>>());

        Self {
            categories,
            industries,
            access_models,
            pricing_models,
        }
    }

    pub fn values(&self, dimension: FilterDimension) -> &[String] {
        match dimension {
            FilterDimension::Category => &self.categories,
            FilterDimension::Industry => &self.industries,
            FilterDimension::AccessModel => &self.access_models,
            FilterDimension::PricingModel => &self.pricing_models,
        }
    }
}
