//! Configuration module

mod site;

pub use site::CmsConfig;
pub use site::PostConfig;
pub use site::SiteConfig;
