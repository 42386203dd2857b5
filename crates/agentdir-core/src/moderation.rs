//! Moderation and admin types for the directory.
//!
//! Listings move between four buckets. The board is a snapshot of all four,
//! fetched from the admin endpoints and searched locally. Edits, newsletters
//! and subscriptions are the request bodies of the other admin and visitor
//! endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Listing, ListingId};
use crate::selector::search_by_name;

/// Review state of a submitted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModerationStatus {
    Requested,
    Accepted,
    Rejected,
    OnHold,
}

impl ModerationStatus {
    pub const ALL: [ModerationStatus; 4] = [
        ModerationStatus::Requested,
        ModerationStatus::Accepted,
        ModerationStatus::Rejected,
        ModerationStatus::OnHold,
    ];

    /// Spelling used in URLs and request bodies.
    pub fn as_wire(self) -> &'static str {
        match self {
            ModerationStatus::Requested => "requested",
            ModerationStatus::Accepted => "accepted",
            ModerationStatus::Rejected => "rejected",
            ModerationStatus::OnHold => "onHold",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(ModerationStatus::Requested),
            "accepted" => Ok(ModerationStatus::Accepted),
            "rejected" => Ok(ModerationStatus::Rejected),
            "onhold" | "on-hold" | "on_hold" => Ok(ModerationStatus::OnHold),
            other => Err(format!(
                "unknown status '{}' (expected requested, accepted, rejected or onHold)",
                other
            )),
        }
    }
}

/// Number of listings per bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModerationCounts {
    pub requested: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub on_hold: usize,
}

impl ModerationCounts {
    pub fn get(&self, status: ModerationStatus) -> usize {
        match status {
            ModerationStatus::Requested => self.requested,
            ModerationStatus::Accepted => self.accepted,
            ModerationStatus::Rejected => self.rejected,
            ModerationStatus::OnHold => self.on_hold,
        }
    }

    pub fn total(&self) -> usize {
        self.requested + self.accepted + self.rejected + self.on_hold
    }
}

/// Snapshot of every moderation bucket.
#[derive(Debug, Default, Clone)]
pub struct ModerationBoard {
    pub requested: Vec<Listing>,
    pub accepted: Vec<Listing>,
    pub rejected: Vec<Listing>,
    pub on_hold: Vec<Listing>,
}

impl ModerationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, status: ModerationStatus) -> &[Listing] {
        match status {
            ModerationStatus::Requested => &self.requested,
            ModerationStatus::Accepted => &self.accepted,
            ModerationStatus::Rejected => &self.rejected,
            ModerationStatus::OnHold => &self.on_hold,
        }
    }

    /// Replaces one bucket with a fresh snapshot.
    pub fn set_bucket(&mut self, status: ModerationStatus, listings: Vec<Listing>) {
        let slot = match status {
            ModerationStatus::Requested => &mut self.requested,
            ModerationStatus::Accepted => &mut self.accepted,
            ModerationStatus::Rejected => &mut self.rejected,
            ModerationStatus::OnHold => &mut self.on_hold,
        };
        *slot = listings;
    }

    pub fn counts(&self) -> ModerationCounts {
        ModerationCounts {
            requested: self.requested.len(),
            accepted: self.accepted.len(),
            rejected: self.rejected.len(),
            on_hold: self.on_hold.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.counts().total()
    }

    /// Name search within one bucket.
    pub fn search(&self, status: ModerationStatus, query: &str) -> Vec<&Listing> {
        search_by_name(self.bucket(status), query).collect()
    }

    /// Locates a listing and the bucket holding it.
    pub fn find(&self, id: &ListingId) -> Option<(ModerationStatus, &Listing)> {
        ModerationStatus::ALL.iter().find_map(|&status| {
            self.bucket(status)
                .iter()
                .find(|listing| &listing.id == id)
                .map(|listing| (status, listing))
        })
    }
}

/// Body of a status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: ModerationStatus,
    pub instructions: String,
}

impl StatusUpdate {
    /// Instructions are kept only for `onHold`; other statuses send an empty string.
    ///
    /// ```
    /// use agentdir_core::{ModerationStatus, StatusUpdate};
    ///
    /// let update = StatusUpdate::new(ModerationStatus::Accepted, Some("ignored".into()));
    /// assert_eq!(update.instructions, "");
    ///
    /// let update = StatusUpdate::new(ModerationStatus::OnHold, Some("Add a logo".into()));
    /// assert_eq!(update.instructions, "Add a logo");
    /// ```
    pub fn new(status: ModerationStatus, instructions: Option<String>) -> Self {
        let instructions = match status {
            ModerationStatus::OnHold => instructions.unwrap_or_default(),
            _ => String::new(),
        };
        Self {
            status,
            instructions,
        }
    }
}

/// Newsletter sent to directory subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Newsletter {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Newsletter {
    /// Builds a newsletter. When no HTML body is given the plain text is
    /// wrapped in a paragraph.
    pub fn new(subject: impl Into<String>, text: impl Into<String>, html: Option<String>) -> Self {
        let text = text.into();
        let html = html.unwrap_or_else(|| format!("<p>{}</p>", escape_html(&text)));
        Self {
            subject: subject.into(),
            text,
            html,
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` when the subject or text is blank.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.subject.trim().is_empty() {
            return Err(AppError::InvalidInput("newsletter subject is empty".to_string()));
        }
        if self.text.trim().is_empty() {
            return Err(AppError::InvalidInput("newsletter text is empty".to_string()));
        }
        Ok(())
    }
}

/// Newsletter sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub email: String,
}

impl Subscription {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
        }
    }

    /// Rejects addresses without a local part and a domain around one `@`.
    pub fn validate(&self) -> Result<(), AppError> {
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(AppError::InvalidInput(format!(
                "'{}' is not a valid email address",
                self.email
            ))),
        }
    }
}

/// Text fields of an admin edit. Unset or blank fields are not sent, so
/// the server keeps their current value.
///
/// ```
/// use agentdir_core::ListingEdit;
///
/// let edit = ListingEdit {
///     tagline: Some("Books meetings for you".into()),
///     tags: vec!["sales".into(), " crm ".into()],
///     ..ListingEdit::default()
/// };
/// assert_eq!(
///     edit.form_fields(),
///     vec![
///         ("tagline", "Books meetings for you".to_string()),
///         ("tags", "sales, crm".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingEdit {
    pub name: Option<String>,
    pub website_url: Option<String>,
    pub access_model: Option<String>,
    pub pricing_model: Option<String>,
    pub category: Option<String>,
    pub industry: Option<String>,
    pub price: Option<String>,
    pub owner_email: Option<String>,
    pub tagline: Option<String>,
    pub description: Option<String>,
    pub key_features: Vec<String>,
    pub use_cases: Vec<String>,
    pub tags: Vec<String>,
    pub video_url: Option<String>,
    pub individual_plan: Option<String>,
    pub enterprise_plan: Option<String>,
    pub subscription_model: Option<String>,
    pub refund_policy: Option<String>,
}

impl ListingEdit {
    /// Form fields in wire naming. Lists are sent comma-joined.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        push_text(&mut fields, "name", &self.name);
        push_text(&mut fields, "websiteUrl", &self.website_url);
        push_text(&mut fields, "accessModel", &self.access_model);
        push_text(&mut fields, "pricingModel", &self.pricing_model);
        push_text(&mut fields, "category", &self.category);
        push_text(&mut fields, "industry", &self.industry);
        push_text(&mut fields, "price", &self.price);
        push_text(&mut fields, "ownerEmail", &self.owner_email);
        push_text(&mut fields, "tagline", &self.tagline);
        push_text(&mut fields, "description", &self.description);
        push_list(&mut fields, "keyFeatures", &self.key_features);
        push_list(&mut fields, "useCases", &self.use_cases);
        push_list(&mut fields, "tags", &self.tags);
        push_text(&mut fields, "videoUrl", &self.video_url);
        push_text(&mut fields, "individualPlan", &self.individual_plan);
        push_text(&mut fields, "enterprisePlan", &self.enterprise_plan);
        push_text(&mut fields, "subscriptionModel", &self.subscription_model);
        push_text(&mut fields, "refundPolicy", &self.refund_policy);
        fields
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` when no field would be sent.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.form_fields().is_empty() {
            return Err(AppError::InvalidInput("nothing to update".to_string()));
        }
        Ok(())
    }
}

fn push_text(fields: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        fields.push((key, value.to_string()));
    }
}

fn push_list(fields: &mut Vec<(&'static str, String)>, key: &'static str, values: &[String]) {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if !joined.is_empty() {
        fields.push((key, joined));
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> ModerationBoard {
        let mut board = ModerationBoard::new();
        board.set_bucket(
            ModerationStatus::Requested,
            vec![Listing::new("r1", "Lead Finder"), Listing::new("r2", "Chat Pal")],
        );
        board.set_bucket(ModerationStatus::Accepted, vec![Listing::new("a1", "ChatOps")]);
        board.set_bucket(ModerationStatus::OnHold, vec![Listing::new("h1", "Planner")]);
        board
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ModerationStatus::OnHold).unwrap(),
            "\"onHold\""
        );
        let status: ModerationStatus = serde_json::from_str("\"requested\"").unwrap();
        assert_eq!(status, ModerationStatus::Requested);
        assert_eq!(ModerationStatus::OnHold.to_string(), "onHold");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("onHold".parse::<ModerationStatus>().unwrap(), ModerationStatus::OnHold);
        assert_eq!("on-hold".parse::<ModerationStatus>().unwrap(), ModerationStatus::OnHold);
        assert_eq!("ACCEPTED".parse::<ModerationStatus>().unwrap(), ModerationStatus::Accepted);
        assert!("pending".parse::<ModerationStatus>().is_err());
    }

    #[test]
    fn test_board_counts() {
        let counts = board().counts();
        assert_eq!(counts.requested, 2);
        assert_eq!(counts.accepted, 1);
        assert_eq!(counts.rejected, 0);
        assert_eq!(counts.get(ModerationStatus::OnHold), 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_board_search_stays_in_bucket() {
        let board = board();
        let hits = board.search(ModerationStatus::Requested, "chat");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "r2");

        assert_eq!(board.search(ModerationStatus::Requested, "").len(), 2);
        assert!(board.search(ModerationStatus::Rejected, "chat").is_empty());
    }

    #[test]
    fn test_board_find() {
        let board = board();
        let (status, listing) = board.find(&ListingId::new("h1")).unwrap();
        assert_eq!(status, ModerationStatus::OnHold);
        assert_eq!(listing.name, "Planner");
        assert!(board.find(&ListingId::new("missing")).is_none());
    }

    #[test]
    fn test_status_update_body() {
        let update = StatusUpdate::new(ModerationStatus::OnHold, None);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["status"], "onHold");
        assert_eq!(json["instructions"], "");
    }

    #[test]
    fn test_newsletter_validation() {
        assert!(Newsletter::new("Hello", "Body", None).validate().is_ok());
        assert!(matches!(
            Newsletter::new("  ", "Body", None).validate(),
            Err(AppError::InvalidInput(_))
        ));
        assert!(Newsletter::new("Hello", "", None).validate().is_err());
    }

    #[test]
    fn test_newsletter_default_html_is_escaped() {
        let newsletter = Newsletter::new("Hi", "Tom & <Jerry>", None);
        assert_eq!(newsletter.html, "<p>Tom &amp; &lt;Jerry&gt;</p>");

        let newsletter = Newsletter::new("Hi", "x", Some("<h1>x</h1>".to_string()));
        assert_eq!(newsletter.html, "<h1>x</h1>");
    }

    #[test]
    fn test_subscription_validation() {
        assert!(Subscription::new("  reader@example.com ").validate().is_ok());
        assert_eq!(Subscription::new(" a@b.co ").email, "a@b.co");
        for bad in ["", "reader", "@example.com", "reader@", "a@b@c"] {
            assert!(
                matches!(Subscription::new(bad).validate(), Err(AppError::InvalidInput(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_listing_edit_skips_blank_fields() {
        let edit = ListingEdit {
            name: Some("Scout".to_string()),
            price: Some("   ".to_string()),
            key_features: vec!["".to_string()],
            refund_policy: Some("30 days".to_string()),
            ..ListingEdit::default()
        };
        assert_eq!(
            edit.form_fields(),
            vec![
                ("name", "Scout".to_string()),
                ("refundPolicy", "30 days".to_string()),
            ]
        );
        assert!(edit.validate().is_ok());
    }

    #[test]
    fn test_empty_listing_edit_is_rejected() {
        let edit = ListingEdit {
            tagline: Some(" ".to_string()),
            ..ListingEdit::default()
        };
        assert!(matches!(edit.validate(), Err(AppError::InvalidInput(_))));
    }
}
