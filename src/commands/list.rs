//! List posts known to the CMS

use anyhow::{Context, Result};

use crate::content::DisplayPost;
use crate::SpaceTraveling;

/// Print every post with its publication date and slug
pub async fn run(app: &SpaceTraveling) -> Result<()> {
    let doc_type = &app.config.cms.document_type;
    let documents = app
        .client()
        .list_by_type(doc_type)
        .await
        .context("Failed to list posts")?;

    println!("Posts ({}):", documents.len());
    for doc in documents {
        let uid = doc.uid.clone().unwrap_or_else(|| format!("<no uid: {}>", doc.id));
        match DisplayPost::from_document(&doc) {
            Ok(post) => {
                let date = post
                    .first_publication_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                println!("  {} - {} [{}]", date, post.data.title, uid);
            }
            Err(e) => {
                tracing::warn!("Unreadable {} {}: {}", doc_type, uid, e);
            }
        }
    }

    Ok(())
}
