use agentdir_core::config::{DirectoryConfig, HttpConfig};
use agentdir_core::error::AppError;
use agentdir_core::models::{Listing, ListingId};
use agentdir_core::moderation::{
    ListingEdit, ModerationBoard, ModerationStatus, Newsletter, StatusUpdate, Subscription,
};
use agentdir_core::selector::FilterOptions;
use futures::future::try_join_all;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::http::{decode_json, join_segments, parse_base_url, Body, HttpTransport};

/// Acknowledgement body returned by mutating endpoints.
#[derive(Deserialize, Debug, Default)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
}

/// Body of the like and wishlist toggles: the listing after the change.
#[derive(Deserialize, Debug)]
struct EngagementResponse {
    agent: EngagementCounts,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EngagementCounts {
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    saved_by_count: Option<u64>,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    /// `true` when the like was added, `false` when it was removed.
    pub liked: bool,
    /// Like count after the toggle.
    pub likes: u64,
}

/// Decodes a listing array record by record, dropping records that are not
/// listings at all (for example without an `_id`).
fn decode_listings(records: Vec<serde_json::Value>) -> Vec<Listing> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Listing>(record) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!("Skipping malformed listing: {}", e);
                None
            }
        })
        .collect()
}

/// Reads the optional `message` of an acknowledgement; an empty body is fine.
async fn acknowledgement(resp: Response) -> Result<Option<String>, AppError> {
    match decode_json::<ApiMessage>(resp).await {
        Ok(ack) => Ok(ack.message),
        Err(AppError::EmptyResponse) => Ok(None),
        Err(e) => Err(e),
    }
}

/// HTTP client for the agent directory REST API.
///
/// Public endpoints need no credentials. Admin endpoints expect the bearer
/// token passed at construction.
///
/// # Examples
///
/// ```no_run
/// use agentdir_client::DirectoryClient;
/// use agentdir_core::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DirectoryClient::new(
///     "https://backend-1-sval.onrender.com/api",
///     &HttpConfig::default(),
///     None,
/// )?;
/// let listings = client.list_listings().await?;
/// println!("Found {} listings", listings.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DirectoryClient {
    transport: HttpTransport,
    base_url: Url,
}

impl DirectoryClient {
    /// Creates a client for the API rooted at `base_url_str`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(
        base_url_str: &str,
        http: &HttpConfig,
        api_token: Option<String>,
    ) -> Result<Self, AppError> {
        let base_url = parse_base_url(base_url_str)?;
        let transport = HttpTransport::new(http, api_token)?;
        Ok(Self {
            transport,
            base_url,
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, AppError> {
        Self::new(&config.api_url, &config.http, config.api_token.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        join_segments(&self.base_url, segments)
    }

    /// Fetches the public listing snapshot (`GET agents/all`).
    pub async fn list_listings(&self) -> Result<Vec<Listing>, AppError> {
        let url = self.endpoint(&["agents", "all"])?;
        let listings = decode_listings(self.transport.get_json(&url).await?);
        debug!("Fetched {} listings", listings.len());
        Ok(listings)
    }

    /// Fetches the values offered in the browse filters (`GET agents/filters`).
    pub async fn filter_options(&self) -> Result<FilterOptions, AppError> {
        let url = self.endpoint(&["agents", "filters"])?;
        self.transport.get_json(&url).await
    }

    /// Fetches one moderation bucket (`GET admin/agents/{status}`).
    pub async fn moderation_bucket(
        &self,
        status: ModerationStatus,
    ) -> Result<Vec<Listing>, AppError> {
        let url = self.endpoint(&["admin", "agents", status.as_wire()])?;
        Ok(decode_listings(self.transport.get_json(&url).await?))
    }

    /// Fetches all four moderation buckets concurrently.
    ///
    /// Fails if any bucket fails; a partial board is never returned.
    pub async fn moderation_board(&self) -> Result<ModerationBoard, AppError> {
        let buckets = try_join_all(
            ModerationStatus::ALL
                .iter()
                .map(|&status| self.moderation_bucket(status)),
        )
        .await?;

        let mut board = ModerationBoard::new();
        for (status, listings) in ModerationStatus::ALL.iter().zip(buckets) {
            board.set_bucket(*status, listings);
        }
        debug!("Fetched moderation board with {} listings", board.total());
        Ok(board)
    }

    /// Moves a listing to another bucket (`PUT admin/agents/{id}/status`).
    pub async fn update_status(
        &self,
        id: &ListingId,
        update: &StatusUpdate,
    ) -> Result<(), AppError> {
        let url = self.endpoint(&["admin", "agents", id.as_str(), "status"])?;
        let body = serde_json::to_value(update)?;
        self.transport
            .send_with_retry(Method::PUT, &url, Some(Body::Json(&body)))
            .await
            .map_err(|e| not_found_as_listing(e, id))?;
        info!("Listing {} status updated to {}", id, update.status);
        Ok(())
    }

    /// Permanently deletes a listing (`DELETE admin/agents/{id}`).
    pub async fn delete_listing(&self, id: &ListingId) -> Result<(), AppError> {
        let url = self.endpoint(&["admin", "agents", id.as_str()])?;
        self.transport
            .send_with_retry(Method::DELETE, &url, None)
            .await
            .map_err(|e| not_found_as_listing(e, id))?;
        info!("Listing {} deleted", id);
        Ok(())
    }

    /// Updates the text fields of a listing (`PUT admin/update/{id}`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` before sending if the edit is empty.
    pub async fn update_listing(&self, id: &ListingId, edit: &ListingEdit) -> Result<(), AppError> {
        edit.validate()?;
        let url = self.endpoint(&["admin", "update", id.as_str()])?;
        let fields = edit.form_fields();
        self.transport
            .send_with_retry(Method::PUT, &url, Some(Body::Form(&fields)))
            .await
            .map_err(|e| not_found_as_listing(e, id))?;
        info!("Listing {} updated ({} fields)", id, fields.len());
        Ok(())
    }

    /// Toggles the caller's like on a listing (`POST users/like/{id}`).
    ///
    /// The API answers 200 when the like is added and 201 when it is removed.
    pub async fn toggle_like(&self, id: &ListingId) -> Result<LikeToggle, AppError> {
        let url = self.endpoint(&["users", "like", id.as_str()])?;
        let resp = self
            .transport
            .send_with_retry(Method::POST, &url, None)
            .await
            .map_err(|e| not_found_as_listing(e, id))?;
        let liked = resp.status() != StatusCode::CREATED;
        let body: EngagementResponse = decode_json(resp).await?;
        let likes = body.agent.likes.ok_or(AppError::EmptyResponse)?;
        debug!("Listing {} like toggled, {} likes", id, likes);
        Ok(LikeToggle { liked, likes })
    }

    /// Toggles a listing in the caller's wishlist (`POST users/wishlist/{id}`).
    ///
    /// Returns how many users have saved the listing afterwards.
    pub async fn toggle_saved(&self, id: &ListingId) -> Result<u64, AppError> {
        let url = self.endpoint(&["users", "wishlist", id.as_str()])?;
        let body = serde_json::json!({});
        let resp = self
            .transport
            .send_with_retry(Method::POST, &url, Some(Body::Json(&body)))
            .await
            .map_err(|e| not_found_as_listing(e, id))?;
        let body: EngagementResponse = decode_json(resp).await?;
        let saved = body.agent.saved_by_count.ok_or(AppError::EmptyResponse)?;
        debug!("Listing {} wishlist toggled, saved by {}", id, saved);
        Ok(saved)
    }

    /// Subscribes an address to the newsletter (`POST newsletter/subscribe`).
    ///
    /// Returns the server's confirmation message, if any.
    pub async fn subscribe(&self, subscription: &Subscription) -> Result<Option<String>, AppError> {
        subscription.validate()?;
        let url = self.endpoint(&["newsletter", "subscribe"])?;
        let body = serde_json::to_value(subscription)?;
        let resp = self
            .transport
            .send_with_retry(Method::POST, &url, Some(Body::Json(&body)))
            .await?;
        let message = acknowledgement(resp).await?;
        info!("Subscribed {}", subscription.email);
        Ok(message)
    }

    /// Sends a newsletter to all subscribers (`POST newsletter/send`).
    ///
    /// Sent exactly once: a timeout or server error is reported, never
    /// retried, since the server may already have mailed subscribers.
    /// Returns the server's confirmation message, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` before sending if the newsletter is
    /// missing a subject or text.
    pub async fn send_newsletter(&self, newsletter: &Newsletter) -> Result<Option<String>, AppError> {
        newsletter.validate()?;
        let url = self.endpoint(&["newsletter", "send"])?;
        let body = serde_json::to_value(newsletter)?;
        let resp = self
            .transport
            .send_with_retry(Method::POST, &url, Some(Body::Json(&body)))
            .await?;
        let message = acknowledgement(resp).await?;
        info!("Newsletter \"{}\" sent", newsletter.subject);
        Ok(message)
    }
}

fn not_found_as_listing(err: AppError, id: &ListingId) -> AppError {
    match err {
        AppError::NotFound(_) => AppError::ListingNotFound(id.to_string()),
        other => other,
    }
}
