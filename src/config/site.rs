//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Content source
    #[serde(default)]
    pub cms: CmsConfig,

    // Post page
    #[serde(default)]
    pub post: PostConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "SpaceTraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            cms: CmsConfig::default(),
            post: PostConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the configured timezone, falling back to UTC
    pub fn tz(&self) -> chrono_tz::Tz {
        if self.timezone.is_empty() {
            return chrono_tz::UTC;
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!("Unknown timezone {:?} ({}), using UTC", self.timezone, e);
                chrono_tz::UTC
            }
        }
    }
}

/// Where CMS documents come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Directory holding exported CMS documents (JSON)
    pub snapshot_dir: String,
    /// Custom type of the documents rendered as posts
    pub document_type: String,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: "cms".to_string(),
            document_type: "post".to_string(),
        }
    }
}

/// Post page configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// URL segment posts live under (`/post/<slug>/`)
    pub route_prefix: String,
    /// Serve posts that were not enumerated at build time
    pub fallback: bool,
    pub words_per_minute: usize,
    pub date_format: String,
    pub banner_alt: String,
    /// Shown while a fallback post is being fetched
    pub loading_text: String,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            route_prefix: "post".to_string(),
            fallback: true,
            words_per_minute: crate::helpers::DEFAULT_WORDS_PER_MINUTE,
            date_format: "dd MMM yyyy".to_string(),
            banner_alt: "banner".to_string(),
            loading_text: "Carregando...".to_string(),
        }
    }
}
