//! Post page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off: every value
//! is escaped while the view is built, except rendered rich text, which is
//! trusted CMS content and goes into the page as-is.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::DisplayPost;
use crate::helpers::{format_date, html_escape, reading_time, DateLocale};
use crate::richtext::as_html;

/// Seconds before the loading page asks the browser to retry
pub const LOADING_REFRESH_SECS: u32 = 2;

/// What the post page is rendered from
#[derive(Debug, Clone, Copy)]
pub enum PageState<'a> {
    /// The post is still being fetched (fallback); nothing to show yet
    Loading,
    Ready(&'a DisplayPost),
}

/// Renders post pages
pub struct PostRenderer {
    tera: Tera,
    config: ConfigData,
    timezone: chrono_tz::Tz,
    locale: DateLocale,
    date_format: String,
    words_per_minute: usize,
}

impl PostRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();
        // View values are escaped when built; section bodies stay raw HTML
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            config: ConfigData::from(config),
            timezone: config.tz(),
            locale: DateLocale::from_language(&config.language),
            date_format: config.post.date_format.clone(),
            words_per_minute: config.post.words_per_minute,
        })
    }

    /// Render the post page
    pub fn render(&self, state: PageState<'_>) -> Result<String> {
        let mut context = Context::new();
        context.insert("config", &self.config);

        match state {
            PageState::Loading => {
                context.insert("refresh_secs", &LOADING_REFRESH_SECS);
                Ok(self.tera.render("loading.html", &context)?)
            }
            PageState::Ready(post) => {
                context.insert("post", &self.build_post_view(post));
                Ok(self.tera.render("post.html", &context)?)
            }
        }
    }

    fn build_post_view(&self, post: &DisplayPost) -> PostView {
        let published = post
            .first_publication_date
            .map(|d| d.with_timezone(&self.timezone));

        PostView {
            title: html_escape(&post.data.title),
            author: html_escape(&post.data.author),
            banner_url: html_escape(&post.data.banner.url),
            date: published
                .as_ref()
                .map(|d| format_date(d, &self.date_format, self.locale)),
            datetime: published.as_ref().map(|d| d.to_rfc3339()),
            reading_time: reading_time(&post.data.content, self.words_per_minute),
            sections: post
                .data
                .content
                .iter()
                .map(|block| SectionView {
                    heading: html_escape(&block.heading),
                    html: as_html(&block.body),
                })
                .collect(),
        }
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
struct ConfigData {
    title: String,
    language: String,
    root: String,
    banner_alt: String,
    loading_text: String,
}

impl From<&SiteConfig> for ConfigData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: html_escape(&config.title),
            language: html_escape(&config.language),
            root: html_escape(&config.root),
            banner_alt: html_escape(&config.post.banner_alt),
            loading_text: html_escape(&config.post.loading_text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct PostView {
    title: String,
    author: String,
    banner_url: String,
    /// Formatted publication date, absent when unknown
    date: Option<String>,
    datetime: Option<String>,
    reading_time: usize,
    sections: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
struct SectionView {
    heading: String,
    /// Rendered rich text, emitted unescaped
    html: String,
}
