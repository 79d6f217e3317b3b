//! Wayback Press library.
//!
//! Discovers a domain's snapshot history in the Wayback Machine, groups and
//! classifies the URLs into logical pages, extracts post content with a
//! resilient multi-snapshot cascade, infers categories and tags, and exports
//! the result as a WordPress-importable WXR feed.

pub mod cdx;
pub mod classify;
pub mod config;
pub mod constants;
pub mod export;
pub mod extract;
pub mod group;
pub mod progress;
pub mod rules;
pub mod taxonomy;
pub mod text;
pub mod urls;
