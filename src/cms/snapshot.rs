//! CMS client over an exported snapshot directory
//!
//! Every `*.json` file under the directory holds either a single document
//! or a query response (`{ "results": [...] }`). Parsed documents are kept
//! until a file is added, removed or modified, so documents exported after a
//! build are visible to later requests.

use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;
use walkdir::WalkDir;

use super::{CmsClient, CmsError, Document};

/// Reads CMS documents from JSON files on disk
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    root: PathBuf,
    cache: Arc<Mutex<Option<Snapshot>>>,
}

/// Size and modification time of one snapshot file
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

/// Parsed documents and the file stamps they were read from
#[derive(Debug)]
struct Snapshot {
    stamps: Vec<FileStamp>,
    documents: Arc<Vec<Document>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Query { results: Vec<Document> },
    Single(Box<Document>),
}

impl SnapshotClient {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All documents in the snapshot, re-parsed only when a file changed
    async fn documents(&self) -> Result<Arc<Vec<Document>>, CmsError> {
        let mut cache = self.cache.lock().await;
        let root = self.root.clone();
        let previous = cache.take();

        let snapshot = tokio::task::spawn_blocking(move || refresh(&root, previous))
            .await
            .map_err(|e| CmsError::Io(std::io::Error::other(e)))??;

        let documents = Arc::clone(&snapshot.documents);
        *cache = Some(snapshot);
        Ok(documents)
    }
}

/// Reuse `previous` if no file under `root` changed, otherwise load again
fn refresh(root: &Path, previous: Option<Snapshot>) -> Result<Snapshot, CmsError> {
    if !root.is_dir() {
        return Err(CmsError::SourceMissing(root.to_path_buf()));
    }

    let stamps = stamp_files(root)?;
    if let Some(previous) = previous {
        if previous.stamps == stamps {
            return Ok(previous);
        }
    }

    let documents = load_documents(root, &stamps)?;
    Ok(Snapshot {
        stamps,
        documents: Arc::new(documents),
    })
}

/// Stamp every `*.json` file under `root`, in file name order
fn stamp_files(root: &Path) -> Result<Vec<FileStamp>, CmsError> {
    let mut stamps = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let metadata = fs::metadata(path)?;
        stamps.push(FileStamp {
            path: path.to_path_buf(),
            len: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }

    Ok(stamps)
}

/// Parse the stamped files into documents
fn load_documents(root: &Path, stamps: &[FileStamp]) -> Result<Vec<Document>, CmsError> {
    let mut documents = Vec::new();

    for stamp in stamps {
        let path = stamp.path.as_path();
        let content = fs::read_to_string(path)?;
        let file: SnapshotFile =
            serde_json::from_str(&content).map_err(|source| CmsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        match file {
            SnapshotFile::Query { results } => documents.extend(results),
            SnapshotFile::Single(doc) => documents.push(*doc),
        }
    }

    tracing::debug!("Loaded {} documents from {:?}", documents.len(), root);
    Ok(documents)
}

#[async_trait]
impl CmsClient for SnapshotClient {
    async fn list_by_type(&self, doc_type: &str) -> Result<Vec<Document>, CmsError> {
        let documents = self.documents().await?;
        Ok(documents
            .iter()
            .filter(|d| d.is_type(doc_type))
            .cloned()
            .collect())
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Document, CmsError> {
        self.documents()
            .await?
            .iter()
            .find(|d| d.is_type(doc_type) && d.has_uid(uid))
            .cloned()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn doc_json(id: &str, uid: &str, doc_type: &str) -> String {
        format!(
            r#"{{"id": "{}", "uid": "{}", "type": "{}", "first_publication_date": null, "data": {{}}}}"#,
            id, uid, doc_type
        )
    }

    #[tokio::test]
    async fn test_reads_single_documents_and_query_responses() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &doc_json("1", "first", "post"));
        write(
            dir.path(),
            "nested/query.json",
            &format!(
                r#"{{"page": 1, "results": [{}, {}]}}"#,
                doc_json("2", "second", "post"),
                doc_json("3", "home", "page")
            ),
        );
        write(dir.path(), "notes.txt", "ignored");

        let client = SnapshotClient::new(dir.path());
        let posts = client.list_by_type("post").await.unwrap();
        let uids: Vec<_> = posts.iter().filter_map(|d| d.uid.as_deref()).collect();
        assert_eq!(uids, ["first", "second"]);

        let doc = client.get_by_uid("page", "home").await.unwrap();
        assert_eq!(doc.id, "3");
    }

    #[tokio::test]
    async fn test_unknown_uid_is_not_found() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &doc_json("1", "first", "post"));

        let client = SnapshotClient::new(dir.path());
        let err = client.get_by_uid("post", "nope").await.unwrap_err();
        assert!(matches!(err, CmsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_fails_the_query() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.json", "{ not json");

        let client = SnapshotClient::new(dir.path());
        let err = client.list_by_type("post").await.unwrap_err();
        assert!(matches!(err, CmsError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_parsed_documents_are_reused_until_a_file_changes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", &doc_json("1", "first", "post"));

        let client = SnapshotClient::new(dir.path());
        let before = client.documents().await.unwrap();
        client.get_by_uid("post", "first").await.unwrap();
        let again = client.documents().await.unwrap();
        assert!(Arc::ptr_eq(&before, &again));

        write(dir.path(), "a.json", &doc_json("1", "first-renamed", "post"));
        write(dir.path(), "b.json", &doc_json("2", "second", "post"));
        let after = client.documents().await.unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(client.get_by_uid("post", "first-renamed").await.is_ok());
        assert!(client.get_by_uid("post", "second").await.is_ok());

        // Clones share the parsed snapshot
        let clone = client.clone();
        assert!(Arc::ptr_eq(&after, &clone.documents().await.unwrap()));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let client = SnapshotClient::new(dir.path().join("nowhere"));
        let err = client.list_by_type("post").await.unwrap_err();
        assert!(matches!(err, CmsError::SourceMissing(_)));
    }
}
