//! "Similar articles" matching for blog posts.

use std::collections::HashSet;

use crate::models::{ContentItem, TagId};

/// How many related articles the article page shows.
pub const DEFAULT_RELATED_LIMIT: usize = 3;

/// Returns up to `limit` items from `pool` related to `reference`.
///
/// A candidate is related when it has the same category id as the
/// reference, or shares at least one tag id with it. The reference itself
/// is skipped. Matches keep pool order; there is no ranking.
///
/// # Examples
///
/// ```
/// use agentdir_core::{related_to, ContentItem};
///
/// let reference = ContentItem::new(1, "Intro", "intro").with_category(10).with_tags(&[100]);
/// let pool = vec![
///     ContentItem::new(2, "Same category", "same").with_category(10),
///     ContentItem::new(3, "Shared tag", "tag").with_category(11).with_tags(&[100]),
///     ContentItem::new(4, "Unrelated", "other").with_category(12),
/// ];
///
/// let related = related_to(&reference, &pool, 3);
/// let ids: Vec<u64> = related.iter().map(|item| item.id.0).collect();
/// assert_eq!(ids, vec![2, 3]);
/// ```
pub fn related_to<'a, I>(reference: &ContentItem, pool: I, limit: usize) -> Vec<&'a ContentItem>
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    let category = reference.category_id();
    let tags: HashSet<TagId> = reference.tag_ids().collect();

    if category.is_none() && tags.is_empty() {
        return Vec::new();
    }

    pool.into_iter()
        .filter(|candidate| candidate.id != reference.id)
        .filter(|candidate| {
            let same_category = category.is_some() && candidate.category_id() == category;
            same_category || candidate.tag_ids().any(|t| tags.contains(&t))
        })
        .take(limit)
        .collect()
}
