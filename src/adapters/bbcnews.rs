//! BBC News adapter (two-phase)
//!
//! The news front page only links to stories, so a run makes two kinds of
//! invocation: the listing page yields detail links to follow, and each
//! detail page yields one full item. `parse` dispatches on the page URL.

use crate::adapters::{FetchedPage, ParseOutput, SiteAdapter};
use crate::item::NewsItem;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

pub const NAME: &str = "bbcnews";

const START_URL: &str = "https://www.bbc.com/news";

/// Two-phase adapter for bbc.com/news
pub struct BbcNewsAdapter;

impl BbcNewsAdapter {
    /// The front page is the only listing page; everything deeper is an
    /// article
    fn is_listing(url: &Url) -> bool {
        url.path().trim_end_matches('/') == "/news"
    }

    fn parse_listing(page: &FetchedPage) -> ParseOutput {
        let document = Html::parse_document(&page.body);
        let mut output = ParseOutput::default();

        if let Ok(promo_selector) = Selector::parse("div.gs-c-promo a.gs-c-promo-heading[href]") {
            for link in document.select(&promo_selector) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                if !href.contains("/news/") {
                    continue;
                }
                if let Ok(article_url) = page.url.join(href) {
                    output.follow.push(article_url);
                }
            }
        }

        debug!(
            follow = output.follow.len(),
            url = %page.url,
            "Parsed BBC listing page"
        );

        output
    }

    fn parse_article(page: &FetchedPage) -> ParseOutput {
        let document = Html::parse_document(&page.body);
        let mut item = NewsItem::new(NAME);

        item.url = Some(page.url.to_string());

        if let Ok(title_selector) = Selector::parse("h1") {
            item.title = document
                .select(&title_selector)
                .next()
                .map(|h| h.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty());
        }

        if let Ok(para_selector) = Selector::parse("article p") {
            let content = document
                .select(&para_selector)
                .map(|p| p.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            if !content.is_empty() {
                item.content = Some(content);
            }
        }

        if let Ok(time_selector) = Selector::parse("time[datetime]") {
            // Stored verbatim; the record keeps whatever string the source
            // published
            item.published_date = document
                .select(&time_selector)
                .next()
                .and_then(|t| t.value().attr("datetime"))
                .map(str::to_string);
        }

        debug!(url = %page.url, has_title = item.title.is_some(), "Parsed BBC article");

        ParseOutput {
            items: vec![item],
            follow: Vec::new(),
        }
    }
}

impl SiteAdapter for BbcNewsAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start_urls(&self) -> Vec<Url> {
        Url::parse(START_URL).into_iter().collect()
    }

    fn parse(&self, page: &FetchedPage) -> ParseOutput {
        if Self::is_listing(&page.url) {
            Self::parse_listing(page)
        } else {
            Self::parse_article(page)
        }
    }
}
