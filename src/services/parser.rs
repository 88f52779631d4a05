// src/services/parser.rs

//! HTML parsing.
//!
//! Extracts the page title and splits the page's links into internal
//! (same host as the page) and external ones.

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PageData;
use crate::utils::resolve_url;

/// Turns a fetched body into [`PageData`].
pub trait Parser: Send + Sync {
    fn parse(&self, page_url: &str, body: &[u8]) -> Result<PageData>;
}

/// Parser for HTML documents built on `scraper`.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::parse(format!("invalid selector '{s}': {e:?}")))
    }
}

impl Parser for HtmlParser {
    fn parse(&self, page_url: &str, body: &[u8]) -> Result<PageData> {
        let html = std::str::from_utf8(body)
            .map_err(|e| AppError::parse(format!("{page_url} is not valid UTF-8: {e}")))?;
        let base = Url::parse(page_url)?;
        let base_host = base.host_str().map(str::to_lowercase);

        let document = Html::parse_document(html);
        let title_sel = Self::parse_selector("title")?;
        let link_sel = Self::parse_selector("a[href]")?;

        let title = document
            .select(&title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let mut data = PageData {
            title,
            ..PageData::default()
        };

        for element in document.select(&link_sel) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if is_skippable(href) {
                continue;
            }
            let Some(link) = resolve_url(&base, href) else {
                continue;
            };
            if !matches!(link.scheme(), "http" | "https") {
                continue;
            }

            if link.host_str().map(str::to_lowercase) == base_host {
                data.internal_links.push(link.into());
            } else {
                data.external_links.push(link.into());
            }
        }

        Ok(data)
    }
}

/// Hrefs that never point at another crawlable page.
fn is_skippable(href: &str) -> bool {
    let href = href.trim();
    href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
}
