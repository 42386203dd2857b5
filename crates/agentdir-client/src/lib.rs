//! agentdir client - HTTP clients for external services
//!
//! - [`directory`] - the agent directory REST API (listings, likes, moderation, newsletter)
//! - [`cms`] - the Strapi CMS serving blog articles
//!
//! Both share one retrying transport configured from
//! [`agentdir_core::HttpConfig`].

pub mod cms;
pub mod directory;
mod http;
#[cfg(test)]
mod test_utils;

pub use cms::CmsClient;
pub use directory::{DirectoryClient, LikeToggle};
