//! Helper functions for templates
//!
//! Presentation values derived from a post: dates, reading time and
//! HTML escaping.

mod date;
mod html;
mod reading;

pub use date::*;
pub use html::*;
pub use reading::*;
