//! Retrying HTTP transport shared by the directory and CMS clients.

use std::time::Duration;

use agentdir_core::config::HttpConfig;
use agentdir_core::error::AppError;
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("agentdir/", env!("CARGO_PKG_VERSION"));

/// Parses a configured base URL and checks it can carry path segments.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw).map_err(|_| AppError::InvalidUrl(raw.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to `base`.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, AppError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Backoff before the next attempt. Rate limits back off exponentially,
/// everything else linearly.
pub(crate) fn retry_delay(base: Duration, attempt: u32, rate_limited: bool) -> Duration {
    if rate_limited {
        base * 2_u32.saturating_pow(attempt)
    } else {
        base * attempt
    }
}

/// Maps an unsuccessful HTTP status to an error.
pub(crate) fn error_for_status(status: StatusCode, url: &Url) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Unauthorized(format!("HTTP {} from {}", status.as_u16(), url))
        }
        StatusCode::NOT_FOUND => AppError::NotFound(url.to_string()),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimitExceeded,
        s if s.is_server_error() => AppError::ServerError(s.as_u16()),
        _ => AppError::ClientError(format!("HTTP {} from {}", status.as_u16(), url)),
    }
}

fn error_for_transport(err: &reqwest::Error, timeout: Duration) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(timeout.as_secs())
    } else if err.is_connect() {
        AppError::NetworkError(format!("Connection failed: {}", err))
    } else {
        AppError::ClientError(err.to_string())
    }
}

/// Whether a request can be sent again after the server may have seen it.
fn is_replayable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Request payload.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Body<'a> {
    Json(&'a serde_json::Value),
    /// Text fields sent as `multipart/form-data`.
    Form(&'a [(&'static str, String)]),
}

fn multipart_form(fields: &[(&'static str, String)]) -> Form {
    fields
        .iter()
        .fold(Form::new(), |form, (key, value)| form.text(*key, value.clone()))
}

#[derive(Clone)]
pub(crate) struct HttpTransport {
    client: Client,
    config: HttpConfig,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub(crate) fn new(config: &HttpConfig, bearer_token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            bearer_token,
        })
    }

    /// GETs `url` and decodes the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, AppError> {
        let resp = self.send_with_retry(Method::GET, url, None).await?;
        decode_json(resp).await
    }

    /// Sends a request, retrying transient failures up to
    /// `HttpConfig::max_attempts` tries in total.
    ///
    /// GET and HEAD are retried on:
    /// - Network errors and timeouts
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    ///
    /// Other methods are sent once. They are only resent when the
    /// connection could not be established, since the server never saw
    /// the request.
    pub(crate) async fn send_with_retry(
        &self,
        method: Method,
        url: &Url,
        body: Option<Body<'_>>,
    ) -> Result<Response, AppError> {
        let max_attempts = self.config.max_attempts.max(1);
        let replayable = is_replayable(&method);
        let mut attempt = 1;

        loop {
            debug!("{} {} (attempt {}/{})", method, url, attempt, max_attempts);

            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token);
            }
            match body {
                Some(Body::Json(value)) => request = request.json(value),
                Some(Body::Form(fields)) => request = request.multipart(multipart_form(fields)),
                None => {}
            }

            let (err, rate_limited, unsent) = match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    (
                        error_for_status(status, url),
                        status == StatusCode::TOO_MANY_REQUESTS,
                        false,
                    )
                }
                Err(e) => (
                    error_for_transport(&e, self.config.timeout),
                    false,
                    e.is_connect(),
                ),
            };

            if !(replayable || unsent) || !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = retry_delay(self.config.retry_base_delay, attempt, rate_limited);
            warn!("{} {} failed ({}), retrying in {:?}", method, url, err, delay);
            sleep(delay).await;
            attempt += 1;
        }
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, AppError> {
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AppError::ClientError(e.to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::EmptyResponse);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fast_http, StubResponse, StubServer};

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("https://backend-1-sval.onrender.com/api").is_ok());
        assert!(matches!(
            parse_base_url("not-a-valid-url"),
            Err(AppError::InvalidUrl(_))
        ));
        assert!(parse_base_url("mailto:admin@example.com").is_err());
        assert!(parse_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_join_segments_keeps_base_path() {
        let base = parse_base_url("https://example.com/api").unwrap();
        let url = join_segments(&base, &["agents", "all"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/agents/all");

        let base = parse_base_url("https://example.com/api/").unwrap();
        let url = join_segments(&base, &["agents", "all"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/agents/all");
    }

    #[test]
    fn test_join_segments_escapes() {
        let base = parse_base_url("https://example.com/api").unwrap();
        let url = join_segments(&base, &["admin", "agents", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/admin/agents/a%2Fb%20c");
    }

    #[test]
    fn test_retry_delay() {
        let base = Duration::from_millis(500);
        assert_eq!(retry_delay(base, 1, false), Duration::from_millis(500));
        assert_eq!(retry_delay(base, 2, false), Duration::from_millis(1000));
        assert_eq!(retry_delay(base, 1, true), Duration::from_millis(1000));
        assert_eq!(retry_delay(base, 2, true), Duration::from_millis(2000));
    }

    #[test]
    fn test_error_for_status() {
        let url = Url::parse("https://example.com/api/agents/all").unwrap();
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, &url),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::FORBIDDEN, &url),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, &url),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, &url),
            AppError::ServerError(502)
        ));
        match error_for_status(StatusCode::BAD_REQUEST, &url) {
            AppError::ClientError(msg) => assert!(msg.contains("HTTP 400")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_transport_builds() {
        assert!(HttpTransport::new(&HttpConfig::default(), Some("token".to_string())).is_ok());
    }

    #[test]
    fn test_only_safe_methods_are_replayable() {
        assert!(is_replayable(&Method::GET));
        assert!(is_replayable(&Method::HEAD));
        assert!(!is_replayable(&Method::POST));
        assert!(!is_replayable(&Method::PUT));
        assert!(!is_replayable(&Method::DELETE));
    }

    fn transport(timeout: Duration) -> HttpTransport {
        HttpTransport::new(&fast_http(timeout), Some("secret".to_string())).unwrap()
    }

    fn stub_url(server: &StubServer) -> Url {
        Url::parse(&server.url("/api/agents/all")).unwrap()
    }

    #[tokio::test]
    async fn test_get_retries_rate_limit_then_succeeds() {
        let server = StubServer::start(vec![
            StubResponse::empty(429),
            StubResponse::json(200, "[]"),
        ])
        .await;

        let items: Vec<serde_json::Value> = transport(Duration::from_secs(5))
            .get_json(&stub_url(&server))
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(server.count(), 2);
    }

    #[tokio::test]
    async fn test_get_retries_server_errors_until_attempts_run_out() {
        let server = StubServer::start(vec![StubResponse::empty(503)]).await;

        let err = transport(Duration::from_secs(5))
            .send_with_retry(Method::GET, &stub_url(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServerError(503)));
        assert_eq!(server.count(), 3);
    }

    #[tokio::test]
    async fn test_get_retries_timeouts() {
        let server = StubServer::start(vec![
            StubResponse::json(200, "[]").delayed(Duration::from_secs(2))
        ])
        .await;

        let err = transport(Duration::from_millis(200))
            .send_with_retry(Method::GET, &stub_url(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert_eq!(server.count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = StubServer::start(vec![StubResponse::json(400, r#"{"message":"bad"}"#)]).await;

        let err = transport(Duration::from_secs(5))
            .send_with_retry(Method::GET, &stub_url(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ClientError(ref msg) if msg.contains("HTTP 400")));
        assert_eq!(server.count(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        for status in [401, 403] {
            let server = StubServer::start(vec![StubResponse::empty(status)]).await;

            let err = transport(Duration::from_secs(5))
                .send_with_retry(Method::GET, &stub_url(&server), None)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
            assert_eq!(server.count(), 1);
        }
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = StubServer::start(vec![StubResponse::json(200, "[]")]).await;

        transport(Duration::from_secs(5))
            .send_with_retry(Method::GET, &stub_url(&server), None)
            .await
            .unwrap();
        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/agents/all");
        assert!(requests[0].headers.contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_post_is_sent_once_on_server_error() {
        let server = StubServer::start(vec![StubResponse::empty(502)]).await;
        let body = serde_json::json!({"subject": "s"});

        let err = transport(Duration::from_secs(5))
            .send_with_retry(Method::POST, &stub_url(&server), Some(Body::Json(&body)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServerError(502)));
        assert_eq!(server.count(), 1);
    }

    #[tokio::test]
    async fn test_post_is_sent_once_on_timeout() {
        let server = StubServer::start(vec![
            StubResponse::json(200, "{}").delayed(Duration::from_secs(2))
        ])
        .await;
        let body = serde_json::json!({"subject": "s"});

        let err = transport(Duration::from_millis(200))
            .send_with_retry(Method::POST, &stub_url(&server), Some(Body::Json(&body)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert_eq!(server.count(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_sends_once() {
        let server = StubServer::start(vec![StubResponse::empty(503)]).await;
        let config = HttpConfig {
            max_attempts: 0,
            ..fast_http(Duration::from_secs(5))
        };

        let err = HttpTransport::new(&config, None)
            .unwrap()
            .send_with_retry(Method::GET, &stub_url(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServerError(503)));
        assert_eq!(server.count(), 1);
    }

    #[tokio::test]
    async fn test_form_body_is_multipart() {
        let server = StubServer::start(vec![StubResponse::json(200, "{}")]).await;
        let fields = vec![("tagline", "Books meetings".to_string())];

        transport(Duration::from_secs(5))
            .send_with_retry(Method::PUT, &stub_url(&server), Some(Body::Form(&fields)))
            .await
            .unwrap();
        let request = &server.requests()[0];
        assert_eq!(request.method, "PUT");
        assert!(request.headers.contains("content-type: multipart/form-data"));
        assert!(request.body.contains("name=\"tagline\""));
        assert!(request.body.contains("Books meetings"));
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_response() {
        let server = StubServer::start(vec![StubResponse::empty(200)]).await;

        let err = transport(Duration::from_secs(5))
            .get_json::<serde_json::Value>(&stub_url(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse));
    }
}
