//! Google News search surface.
//!
//! Search results are served from `https://news.google.com/search`. Each
//! result card carries an anchor with the `WwrzSb` class whose href is a
//! relative `./read/<token>` link; those are resolved to absolute URLs like
//! `https://news.google.com/read/<token>`, which later redirect to the
//! publisher's page.
//!
//! The class name is whatever Google's current markup uses and changes
//! without notice. When discovery suddenly returns nothing, inspect a result
//! card and update [`ARTICLE_LINK_CLASS`].

use crate::models::SearchParams;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

pub const SEARCH_URL: &str = "https://news.google.com/search";
pub const NEWS_BASE_URL: &str = "https://news.google.com/";
pub const ARTICLE_LINK_CLASS: &str = "WwrzSb";

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Pulls article links out of a search results page.
pub trait LinkExtractor {
    /// Absolute article URLs in document order, without duplicates.
    fn extract_links(&self, html: &str) -> Vec<String>;
}

/// Matches anchors by class and `./read` href shape.
#[derive(Debug, Clone)]
pub struct GoogleNewsLinks {
    marker_class: String,
    base: Url,
}

impl GoogleNewsLinks {
    pub fn new(marker_class: impl Into<String>) -> Self {
        Self {
            marker_class: marker_class.into(),
            base: Url::parse(NEWS_BASE_URL).expect("static base url"),
        }
    }
}

impl Default for GoogleNewsLinks {
    fn default() -> Self {
        Self::new(ARTICLE_LINK_CLASS)
    }
}

impl LinkExtractor for GoogleNewsLinks {
    fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        let links = document
            .select(&ANCHOR_SELECTOR)
            .filter(|a| a.value().classes().any(|c| c == self.marker_class))
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("./read"))
            .filter_map(|href| self.base.join(href).ok())
            .map(|u| u.to_string())
            .unique()
            .collect::<Vec<_>>();

        debug!(count = links.len(), "Extracted article links");
        links
    }
}

/// Build the search URL for one query.
///
/// The recency window is expressed as a `when:` qualifier inside the query
/// itself; `anytime` adds nothing.
pub fn search_url(term: &str, params: &SearchParams) -> String {
    let query = match params.recency.qualifier() {
        Some(window) => format!("{term} when:{window}"),
        None => term.to_string(),
    };

    format!(
        "{SEARCH_URL}?q={}&hl={lang}&gl={loc}&ceid={loc}%3A{lang}",
        urlencoding::encode(&query),
        lang = params.language,
        loc = params.locale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recency;

    fn params(recency: Recency) -> SearchParams {
        SearchParams {
            locale: "IN".to_string(),
            language: "en".to_string(),
            recency,
            total_quota: 10,
        }
    }

    const RESULTS: &str = r#"
        <html><body>
          <article>
            <a class="WwrzSb" href="./read/CBMiAAA?hl=en">First</a>
            <a class="JtKRv" href="./read/CBMiAAA?hl=en">Title link, wrong class</a>
          </article>
          <article>
            <a class="foo WwrzSb" href="./read/CBMiBBB">Second</a>
          </article>
          <article>
            <a class="WwrzSb" href="./publications/XYZ">Publisher page</a>
            <a class="WwrzSb" href="./read/CBMiAAA?hl=en">Duplicate of first</a>
            <a class="WwrzSb">No href</a>
          </article>
        </body></html>
    "#;

    #[test]
    fn test_extracts_marked_read_links_in_order() {
        let links = GoogleNewsLinks::default().extract_links(RESULTS);
        assert_eq!(
            links,
            vec![
                "https://news.google.com/read/CBMiAAA?hl=en".to_string(),
                "https://news.google.com/read/CBMiBBB".to_string(),
            ]
        );
    }

    #[test]
    fn test_marker_is_swappable() {
        let links = GoogleNewsLinks::new("JtKRv").extract_links(RESULTS);
        assert_eq!(links, vec!["https://news.google.com/read/CBMiAAA?hl=en".to_string()]);
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert!(GoogleNewsLinks::default().extract_links("").is_empty());
    }

    #[test]
    fn test_search_url_anytime() {
        let url = search_url("renewable energy", &params(Recency::Anytime));
        assert_eq!(
            url,
            "https://news.google.com/search?q=renewable%20energy&hl=en&gl=IN&ceid=IN%3Aen"
        );
    }

    #[test]
    fn test_search_url_with_recency() {
        let url = search_url("AI", &params(Recency::LastWeek));
        assert!(url.starts_with("https://news.google.com/search?q=AI%20when%3A7d&"));
    }
}
