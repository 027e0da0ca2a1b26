//! spacetraveling: a static blog generator backed by a headless CMS
//!
//! Posts are fetched from the CMS at build time, reshaped into a display
//! model and rendered to HTML with embedded Tera templates. Posts that were
//! not known at build time can be rendered on demand by the server.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod richtext;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms::{CmsClient, SnapshotClient};
use content::PostLoader;

/// The main application
#[derive(Clone)]
pub struct SpaceTraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Directory of exported CMS documents
    pub snapshot_dir: PathBuf,
    client: Arc<dyn CmsClient>,
}

impl SpaceTraveling {
    /// Create a new instance from a site directory
    ///
    /// Reads `_config.yml` when present and fetches documents from the
    /// configured snapshot directory.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let snapshot_dir = base_dir.join(&config.cms.snapshot_dir);
        let client: Arc<dyn CmsClient> = Arc::new(SnapshotClient::new(&snapshot_dir));

        Self {
            config,
            base_dir,
            public_dir,
            snapshot_dir,
            client,
        }
    }

    /// Replace the CMS client
    pub fn with_client(mut self, client: Arc<dyn CmsClient>) -> Self {
        self.client = client;
        self
    }

    pub fn client(&self) -> Arc<dyn CmsClient> {
        Arc::clone(&self.client)
    }

    /// A post loader for the configured document type
    pub fn loader(&self) -> PostLoader {
        PostLoader::new(
            self.client(),
            &self.config.cms.document_type,
            self.config.post.fallback,
        )
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
