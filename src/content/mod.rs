//! Content module - post display model and the loader that builds it

pub mod loader;
mod post;

pub use loader::{PostLoader, StaticPath, StaticPaths};
pub use post::{Banner, ContentBlock, DisplayPost, PostData};
