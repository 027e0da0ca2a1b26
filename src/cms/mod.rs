//! CMS access - documents and the clients that fetch them

mod client;
mod document;
mod memory;
mod snapshot;

pub use client::{CmsClient, CmsError};
pub use document::Document;
pub use memory::MemoryClient;
pub use snapshot::SnapshotClient;
