//! Collaborators consumed by the crawl pipeline.
//!
//! - `Fetcher` / `HttpFetcher`: download page bodies
//! - `Parser` / `HtmlParser`: extract titles and links

mod fetcher;
mod parser;

pub use fetcher::{Fetcher, HttpFetcher};
pub use parser::{HtmlParser, Parser};
