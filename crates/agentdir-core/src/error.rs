use thiserror::Error;

/// Application-wide error types.
///
/// Every failure surfaced by the directory and CMS clients, and by
/// configuration loading, is one of these variants. The selection and
/// matching functions never produce an error.
///
/// # Error Conversion
///
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```no_run
/// use agentdir_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP client request failed.
    ///
    /// Covers failed requests that are neither timeouts nor connection
    /// failures, and unexpected HTTP statuses.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// The server answered with a 5xx status.
    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    ///
    /// Raised when a configured base URL or a joined endpoint is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The remote API has no listing with this id.
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    /// The CMS has no article with this slug.
    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    /// A requested resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API rejected the credentials (HTTP 401 / 403).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User input failed validation before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// API response contained no data.
    #[error("Empty response from API")]
    EmptyResponse,

    /// Network or connection error.
    ///
    /// DNS failures, refused connections, and unreachable hosts.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ClientError(msg) => {
                if msg.contains("timeout") || msg.contains("timed out") {
                    "Request timed out. The directory API may be waking up.\n   Try again in a few seconds.".to_string()
                } else if msg.contains("connect") {
                    format!(
                        "Cannot connect to the directory API: {}\n   Check your internet connection and --api-url.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::ServerError(status) => {
                format!(
                    "The server answered HTTP {}.\n   Hosted instances can take a minute to wake up; try again shortly.",
                    status
                )
            }
            AppError::InvalidUrl(url) => {
                format!(
                    "Invalid URL: {}\n   Example: https://backend-1-sval.onrender.com/api",
                    url
                )
            }
            AppError::ArticleNotFound(slug) => {
                format!("No article with slug \"{}\".", slug)
            }
            AppError::ListingNotFound(id) => {
                format!("No listing with id \"{}\".", id)
            }
            AppError::Unauthorized(_) => {
                "The API refused the request.\n   Set AGENTDIR_API_TOKEN to an admin token for moderation commands.".to_string()
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The server may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::EmptyResponse => {
                "The API returned no data. The service may be temporarily unavailable.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if a failed request that produced this error may be
    /// sent again. Only replayable requests are retried; see the client
    /// transport.
    ///
    /// # Examples
    ///
    /// ```
    /// use agentdir_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::RateLimitExceeded;
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::ArticleNotFound("hello-world".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
                | AppError::ServerError(_)
        )
    }
}
