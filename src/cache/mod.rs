//! Cache module for incremental generation
//!
//! Tracks a content hash per post uid so that posts whose CMS document has
//! not changed since the last build are not rendered again.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = "db.json";

/// Represents a cached entry for a rendered post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the CMS document the page was rendered from
    pub content_hash: u64,
    /// Output path relative to public dir
    pub output_path: String,
}

/// Cache database for tracking document changes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the site config and generator version (changes trigger full rebuild)
    pub config_hash: u64,
    /// Cached entries for posts, keyed by uid
    pub posts: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create an empty cache for the given config hash
    pub fn new(config_hash: u64) -> Self {
        Self {
            version: Self::VERSION,
            config_hash,
            posts: HashMap::new(),
        }
    }

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_DIR).join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            if let Ok(cache) = serde_json::from_str::<CacheDb>(&content) {
                if cache.version == Self::VERSION {
                    return cache;
                }
                tracing::info!("Cache version mismatch, rebuilding cache");
            }
        }
        Self::default()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Whether the post was rendered from this exact content and its page still exists
    pub fn is_fresh(&self, uid: &str, content_hash: u64, public_dir: &Path) -> bool {
        self.posts
            .get(uid)
            .map(|entry| {
                entry.content_hash == content_hash && public_dir.join(&entry.output_path).exists()
            })
            .unwrap_or(false)
    }

    pub fn insert(&mut self, uid: &str, content_hash: u64, output_path: String) {
        self.posts.insert(
            uid.to_string(),
            CacheEntry {
                content_hash,
                output_path,
            },
        );
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Remove the cache directory
pub fn clear(base_dir: &Path) -> Result<()> {
    let cache_dir = base_dir.join(CACHE_DIR);
    if cache_dir.exists() {
        fs::remove_dir_all(&cache_dir)?;
        tracing::info!("Cache cleared");
    }
    Ok(())
}
