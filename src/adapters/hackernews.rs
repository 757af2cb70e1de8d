//! Hacker News adapter (single-phase)
//!
//! The front page lists complete stories: headline, outbound link, and a
//! sibling metadata row with the submitter. One pass over a listing page
//! yields finished items plus the "More" pagination link.

use crate::adapters::{FetchedPage, ParseOutput, SiteAdapter};
use crate::item::NewsItem;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

pub const NAME: &str = "hackernews";

const START_URL: &str = "https://news.ycombinator.com/";

/// Single-phase adapter for news.ycombinator.com
pub struct HackerNewsAdapter;

impl SiteAdapter for HackerNewsAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn start_urls(&self) -> Vec<Url> {
        // START_URL is a valid literal; parse cannot fail
        Url::parse(START_URL).into_iter().collect()
    }

    fn parse(&self, page: &FetchedPage) -> ParseOutput {
        let document = Html::parse_document(&page.body);
        let mut output = ParseOutput::default();

        let story_selector = match Selector::parse("tr.athing") {
            Ok(s) => s,
            Err(_) => return output,
        };
        let title_selector = Selector::parse("span.titleline > a").ok();
        let author_selector = Selector::parse("td.subtext a.hnuser").ok();

        for story in document.select(&story_selector) {
            let mut item = NewsItem::new(NAME);

            if let Some(title_sel) = &title_selector {
                if let Some(link) = story.select(title_sel).next() {
                    let title = link.text().collect::<String>().trim().to_string();
                    if !title.is_empty() {
                        item.title = Some(title);
                    }
                    item.url = link
                        .value()
                        .attr("href")
                        .and_then(|href| page.url.join(href).ok())
                        .map(|u| u.to_string());
                }
            }

            if let Some(author_sel) = &author_selector {
                item.author = subtext_author(&story, author_sel);
            }

            output.items.push(item);
        }

        // Follow pagination
        if let Ok(more_selector) = Selector::parse("a.morelink[href]") {
            for link in document.select(&more_selector) {
                if let Some(next) = link
                    .value()
                    .attr("href")
                    .and_then(|href| page.url.join(href).ok())
                {
                    output.follow.push(next);
                }
            }
        }

        debug!(
            items = output.items.len(),
            follow = output.follow.len(),
            url = %page.url,
            "Parsed Hacker News listing"
        );

        output
    }
}

/// Pulls the submitter from the metadata row directly below a story row
///
/// The subtext row is the story's immediate next element sibling; hitting
/// another story row first means this story has no metadata, so its author
/// stays absent rather than borrowing a later row's.
fn subtext_author(story: &ElementRef<'_>, author_sel: &Selector) -> Option<String> {
    let mut node = story.next_sibling();
    while let Some(current) = node {
        if let Some(row) = ElementRef::wrap(current) {
            if has_class(&row, "athing") {
                return None;
            }
            return row
                .select(author_sel)
                .next()
                .map(|a| a.text().collect::<String>().trim().to_string())
                .filter(|a| !a.is_empty());
        }
        node = current.next_sibling();
    }
    None
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}
