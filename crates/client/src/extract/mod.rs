//! Title and icon extraction from fetched HTML.
//!
//! Parsing is done with `scraper` (html5ever), which tolerates the broken
//! markup that real sites serve.
//!
//! - Title: text of the first `<title>` in document order, trimmed
//! - Icon: the best-ranked `<link rel~="icon">` (see [`icons`])
//!
//! Relative hrefs are resolved against the page's final URL, so callers must
//! pass the post-redirect URL.

pub mod icons;

pub use icons::{IconCandidate, best_candidate, icon_candidates};

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("invalid selector"));

/// What one HTML document says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Page title, empty when absent.
    pub title: String,
    /// Best icon href (absolute URL or `data:` URI).
    pub icon: Option<String>,
}

/// Extract the title and best icon from raw HTML bytes.
pub fn extract_page_meta(html: &[u8], base_url: &Url) -> PageMeta {
    let html = String::from_utf8_lossy(html);
    let document = Html::parse_document(&html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let icon = best_candidate(icon_candidates(&document, base_url)).map(|c| c.href);

    PageMeta { title, icon }
}
