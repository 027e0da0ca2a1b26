//! Generator module - renders post pages into the public directory

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cache::{self, CacheDb};
use crate::content::{DisplayPost, PostLoader};
use crate::templates::{PageState, PostRenderer};
use crate::SpaceTraveling;

/// File name of the loading page written next to the post pages
pub const FALLBACK_PAGE: &str = "_fallback.html";

/// What a generation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub removed: usize,
}

/// Static site generator for post pages
pub struct Generator {
    app: SpaceTraveling,
    loader: PostLoader,
    renderer: PostRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(app: &SpaceTraveling) -> Result<Self> {
        let renderer = PostRenderer::new(&app.config)?;

        Ok(Self {
            app: app.clone(),
            loader: app.loader(),
            renderer,
        })
    }

    pub fn loader(&self) -> &PostLoader {
        &self.loader
    }

    /// Generate all post pages
    ///
    /// Unless `force` is set, posts whose document is unchanged since the
    /// last run are skipped. Any CMS failure aborts the run.
    pub async fn generate(&self, force: bool) -> Result<GenerateSummary> {
        let public_dir = &self.app.public_dir;
        fs::create_dir_all(public_dir)?;

        let static_paths = self
            .loader
            .static_paths()
            .await
            .context("Failed to enumerate posts")?;

        tracing::info!(
            "Found {} {} documents",
            static_paths.paths.len(),
            self.loader.doc_type()
        );

        let config_hash = self.config_hash()?;
        let previous = CacheDb::load(&self.app.base_dir);
        let reuse = !force && previous.config_hash == config_hash;
        if !force && !reuse && !previous.posts.is_empty() {
            tracing::info!("Configuration changed, rendering every post");
        }

        let mut cache = CacheDb::new(config_hash);
        let mut summary = GenerateSummary::default();

        for path in &static_paths.paths {
            let slug = path.slug.as_str();
            let doc = self
                .loader
                .load_document(slug)
                .await
                .with_context(|| format!("Failed to load post {:?}", slug))?;

            let content_hash = cache::hash_content(&serde_json::to_string(&doc)?);
            let output_path = self.relative_output_path(slug);

            if reuse && previous.is_fresh(slug, content_hash, public_dir) {
                tracing::debug!("Unchanged: {}", slug);
                summary.skipped += 1;
            } else {
                let post = DisplayPost::from_document(&doc)
                    .with_context(|| format!("Failed to read post {:?}", slug))?;
                self.write_post(slug, &post).await?;
                summary.rendered += 1;
            }

            cache.insert(slug, content_hash, output_path);
        }

        // Pages of posts that are gone from the CMS
        let current: HashSet<&str> = static_paths
            .paths
            .iter()
            .map(|p| p.slug.as_str())
            .collect();
        for (uid, entry) in &previous.posts {
            if !current.contains(uid.as_str()) {
                remove_page(public_dir, &entry.output_path)?;
                tracing::info!("Removed: {}", uid);
                summary.removed += 1;
            }
        }

        let fallback_path = self.fallback_page_path();
        if static_paths.fallback {
            write_file(fallback_path, self.renderer.render(PageState::Loading)?).await?;
        } else if fallback_path.exists() {
            fs::remove_file(&fallback_path)?;
        }

        cache.save(&self.app.base_dir)?;

        Ok(summary)
    }

    /// Fetch, render and write a single post
    ///
    /// Used for posts requested after the build (fallback).
    pub async fn build_post(&self, slug: &str) -> Result<PathBuf> {
        let post = self
            .loader
            .load_post(slug)
            .await
            .with_context(|| format!("Failed to load post {:?}", slug))?;
        self.write_post(slug, &post).await
    }

    /// Render the loading page shown while a post is fetched
    pub fn render_loading(&self) -> Result<String> {
        self.renderer.render(PageState::Loading)
    }

    /// Absolute path of a post's page
    pub fn post_output_path(&self, slug: &str) -> PathBuf {
        self.app.public_dir.join(self.relative_output_path(slug))
    }

    fn relative_output_path(&self, slug: &str) -> String {
        let prefix = self.app.config.post.route_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/index.html", slug)
        } else {
            format!("{}/{}/index.html", prefix, slug)
        }
    }

    fn fallback_page_path(&self) -> PathBuf {
        let prefix = self.app.config.post.route_prefix.trim_matches('/');
        self.app.public_dir.join(prefix).join(FALLBACK_PAGE)
    }

    async fn write_post(&self, slug: &str, post: &DisplayPost) -> Result<PathBuf> {
        let html = self.renderer.render(PageState::Ready(post))?;
        let output_path = self.post_output_path(slug);
        write_file(output_path.clone(), html).await?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(output_path)
    }

    fn config_hash(&self) -> Result<u64> {
        let config = serde_yaml::to_string(&self.app.config)?;
        Ok(cache::hash_content(&format!(
            "{}{}",
            env!("CARGO_PKG_VERSION"),
            config
        )))
    }
}

/// Write a page off the async runtime
async fn write_file(path: PathBuf, content: String) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomic(&path, &content)).await?
}

/// Replace `path` in one step: the content goes to a temporary file in the
/// same directory, which is then renamed over the target
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("No parent directory for {:?}", path))?;
    fs::create_dir_all(parent)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".page");
    // Temp files default to 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    let mut file = builder.tempfile_in(parent)?;
    file.write_all(content.as_bytes())?;
    file.persist(path)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Delete a generated page and its directory when that becomes empty
fn remove_page(public_dir: &Path, output_path: &str) -> Result<()> {
    let path = public_dir.join(output_path);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    if let Some(parent) = path.parent() {
        if parent != public_dir && parent.exists() && fs::read_dir(parent)?.next().is_none() {
            fs::remove_dir(parent)?;
        }
    }
    Ok(())
}
