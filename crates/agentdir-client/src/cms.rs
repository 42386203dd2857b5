use agentdir_core::config::{DirectoryConfig, HttpConfig};
use agentdir_core::error::AppError;
use agentdir_core::models::ContentItem;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::http::{join_segments, parse_base_url, HttpTransport};

/// Page size requested when listing every article.
const PAGE_SIZE: u32 = 100;

/// Hard stop for pagination in case `pageCount` is wrong.
const MAX_PAGES: u32 = 50;

/// Generic wrapper for Strapi REST responses.
///
/// ```json
/// {
///     "data": T,
///     "meta": { "pagination": { "page": 1, "pageSize": 25, "pageCount": 1, "total": 3 } }
/// }
/// ```
#[derive(Deserialize, Debug)]
struct StrapiResponse<T> {
    data: T,
    #[serde(default)]
    meta: StrapiMeta,
}

#[derive(Deserialize, Debug, Default)]
struct StrapiMeta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: u32,
    page_count: u32,
    #[serde(default)]
    total: u32,
}

/// HTTP client for the blog CMS (a Strapi instance).
///
/// # Examples
///
/// ```no_run
/// use agentdir_client::CmsClient;
/// use agentdir_core::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cms = CmsClient::new("https://strapi-jrm5.onrender.com", &HttpConfig::default())?;
/// let article = cms.article_by_slug("what-is-an-ai-agent").await?;
/// println!("{}", article.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CmsClient {
    transport: HttpTransport,
    base_url: Url,
}

impl CmsClient {
    /// Creates a CMS client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the URL is malformed.
    pub fn new(base_url_str: &str, http: &HttpConfig) -> Result<Self, AppError> {
        let base_url = parse_base_url(base_url_str)?;
        let transport = HttpTransport::new(http, None)?;
        Ok(Self {
            transport,
            base_url,
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, AppError> {
        Self::new(&config.cms_url, &config.http)
    }

    fn articles_url(&self) -> Result<Url, AppError> {
        join_segments(&self.base_url, &["api", "articles"])
    }

    fn slug_url(&self, slug: &str) -> Result<Url, AppError> {
        let mut url = self.articles_url()?;
        url.query_pairs_mut()
            .append_pair("filters[slug][$eq]", slug)
            .append_pair("populate", "*");
        Ok(url)
    }

    fn page_url(&self, page: u32) -> Result<Url, AppError> {
        let mut url = self.articles_url()?;
        url.query_pairs_mut()
            .append_pair("populate", "*")
            .append_pair("pagination[page]", &page.to_string())
            .append_pair("pagination[pageSize]", &PAGE_SIZE.to_string());
        Ok(url)
    }

    /// Fetches the article with `slug`, with category and tags populated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ArticleNotFound` if no article has that slug.
    pub async fn article_by_slug(&self, slug: &str) -> Result<ContentItem, AppError> {
        if slug.trim().is_empty() {
            return Err(AppError::InvalidInput("article slug is empty".to_string()));
        }

        let url = self.slug_url(slug)?;
        let resp: StrapiResponse<Vec<ContentItem>> = self.transport.get_json(&url).await?;

        // Slugs are unique in the CMS; take the first hit.
        resp.data
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ArticleNotFound(slug.to_string()))
    }

    /// Fetches every article, following Strapi pagination.
    pub async fn all_articles(&self) -> Result<Vec<ContentItem>, AppError> {
        let mut articles = Vec::new();
        let mut page = 1;

        loop {
            let url = self.page_url(page)?;
            let resp: StrapiResponse<Vec<ContentItem>> = self.transport.get_json(&url).await?;
            let fetched = resp.data.len();
            articles.extend(resp.data);
            if let Some(p) = resp.meta.pagination {
                debug!("Article page {}/{} ({} total)", p.page, p.page_count, p.total);
            }

            match next_page(resp.meta.pagination, fetched) {
                Some(next) if next <= MAX_PAGES => page = next,
                Some(_) => {
                    warn!("Stopping after {} pages of articles", MAX_PAGES);
                    break;
                }
                None => break,
            }
        }

        debug!("Fetched {} articles", articles.len());
        Ok(articles)
    }
}

/// Next page to request, or `None` when the listing is exhausted.
fn next_page(pagination: Option<Pagination>, fetched: usize) -> Option<u32> {
    let pagination = pagination?;
    if fetched == 0 || pagination.page >= pagination.page_count {
        None
    } else {
        Some(pagination.page + 1)
    }
}
