//! Generic article page parsing.
//!
//! Article pages come from arbitrary publishers, so there is no site-specific
//! selector: the heading is the document `<title>` and the body is every
//! `<p>` element in document order.

use crate::models::NO_TITLE;
use crate::utils::clean_text;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static selector"));

/// Title and paragraph text of an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: String,
    pub paragraphs: Vec<String>,
}

/// Parse an article page.
///
/// Whitespace inside each paragraph is collapsed so that every paragraph
/// fits on one artifact line; paragraphs that are empty after collapsing are
/// dropped. A missing or blank `<title>` becomes [`NO_TITLE`].
pub fn parse_article(html: &str) -> ParsedArticle {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let paragraphs = document
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| clean_text(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect();

    ParsedArticle { title, paragraphs }
}
