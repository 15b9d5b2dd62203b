//! Icon link discovery and ranking.
//!
//! Every `<link>` whose `rel` mentions "icon" is a candidate. Candidates are
//! scored and only the highest score survives; ties keep the earliest link.
//!
//! | signal                          | score |
//! |---------------------------------|-------|
//! | rel `apple-touch-icon`          | 100   |
//! | rel `icon` (without `shortcut`) | 50    |
//! | rel `shortcut icon`             | 10    |
//! | `sizes` width 128–192           | +30   |
//! | `sizes` width ≥ 64              | +20   |
//! | `sizes` width ≥ 32              | +10   |
//! | `.svg` / `.png` / `.webp` href  | +25 / +20 / +15 |
//!
//! `data:` hrefs only get the rel score.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[rel][href]").expect("invalid selector"));

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[xX](\d+)$").expect("invalid regex"));

/// A scored icon link found while scanning one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconCandidate {
    /// Absolute URL, or the untouched `data:` URI.
    pub href: String,
    pub priority: i32,
    /// Width from `sizes="WxH"`, 0 when absent or `any`.
    pub declared_size: u32,
}

impl IconCandidate {
    pub fn is_data_uri(&self) -> bool {
        is_data_uri(&self.href)
    }
}

pub(crate) fn is_data_uri(href: &str) -> bool {
    href.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Base score from the `rel` attribute. Expects a lowercased value.
fn rel_score(rel: &str) -> i32 {
    if rel.contains("apple-touch-icon") {
        return 100;
    }
    let shortcut = rel.contains("shortcut");
    if !shortcut && rel.split_ascii_whitespace().any(|token| token == "icon") {
        50
    } else if shortcut {
        10
    } else {
        0
    }
}

/// Width of the first `WxH` token in a `sizes` attribute.
pub(crate) fn declared_width(sizes: Option<&str>) -> u32 {
    sizes
        .and_then(|s| s.split_ascii_whitespace().next())
        .and_then(|token| SIZE_RE.captures(token))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn size_bonus(width: u32) -> i32 {
    match width {
        128..=192 => 30,
        w if w >= 64 => 20,
        w if w >= 32 => 10,
        _ => 0,
    }
}

fn format_bonus(url: &Url) -> i32 {
    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".svg") {
        25
    } else if path.ends_with(".png") {
        20
    } else if path.ends_with(".webp") {
        15
    } else {
        0
    }
}

/// Collect all icon candidates in document order.
pub fn icon_candidates(document: &Html, base_url: &Url) -> Vec<IconCandidate> {
    let mut candidates = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        let (Some(rel), Some(href)) = (element.value().attr("rel"), element.value().attr("href")) else {
            continue;
        };

        let rel = rel.to_ascii_lowercase();
        let href = href.trim();
        if !rel.contains("icon") || href.is_empty() {
            continue;
        }

        let declared_size = declared_width(element.value().attr("sizes"));
        let base = rel_score(&rel);

        if is_data_uri(href) {
            candidates.push(IconCandidate { href: href.to_string(), priority: base, declared_size });
            continue;
        }

        let resolved = match base_url.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };

        let priority = base + size_bonus(declared_size) + format_bonus(&resolved);
        candidates.push(IconCandidate { href: resolved.to_string(), priority, declared_size });
    }

    candidates
}

/// Pick the highest-priority candidate; the first one wins ties.
pub fn best_candidate(candidates: Vec<IconCandidate>) -> Option<IconCandidate> {
    let mut best: Option<IconCandidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.priority <= current.priority => {}
            _ => best = Some(candidate),
        }
    }
    best
}
