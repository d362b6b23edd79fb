//! Markup contracts with external pages.
//!
//! Everything that depends on the shape of someone else's HTML lives here, so
//! that a markup change on the search surface or in article pages means
//! editing one file rather than a pipeline stage.
//!
//! | Module | Page | Extracts |
//! |--------|------|----------|
//! | [`google_news`] | Google News search results | article links (`a.WwrzSb` with `./read/...` hrefs) |
//! | [`article`] | arbitrary article pages | `<title>` and `<p>` text |
//!
//! Discovery only sees the [`google_news::LinkExtractor`] trait, so the
//! search-result marker can be swapped without touching the engine.

pub mod article;
pub mod google_news;
