//! Porsche Finder (used Taycan).
//!
//! The search page is the first listing page. The finder exposes no count we
//! can rely on, so the number of pages is fixed per configuration.

use listing_sync::{FetchedPage, Listing, ListingSite, ParseResult};
use scraper::Html;

use super::html::{all_text, first_text, non_empty, selector};

pub const HOST: &str = "https://finder.porsche.com";
pub const SEARCH_PATH: &str = "/be/nl-BE/search/taycan";
pub const DEFAULT_PAGES: usize = 11;

const CAR_LINK: &str = "main div div section article div a";
const TITLE: &str = "main header h1";
const STATS: &str = "._1j9sent0._1j9sentc._1j9sentg._18iz1pd8";
const PRICE: &str = "._1j9sent0._1j9sent5._121ldsa5";
const OPTIONS: &str = "._1177mdf0";

#[derive(Debug, Clone)]
pub struct PorscheFinder {
    host: String,
    model: String,
    pages: usize,
}

impl Default for PorscheFinder {
    fn default() -> Self {
        Self::new(HOST)
    }
}

impl PorscheFinder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            model: "taycan".to_string(),
            pages: DEFAULT_PAGES,
        }
    }

    /// Set the number of listing pages walked.
    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    fn base_url(&self) -> String {
        format!("{}{}", self.host, SEARCH_PATH)
    }

    /// Links on the finder are usually host-relative.
    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.host, href)
        }
    }
}

impl ListingSite for PorscheFinder {
    fn search_url(&self) -> String {
        format!("{}?model={}", self.base_url(), self.model)
    }

    fn total_pages(&self, _search: &FetchedPage) -> ParseResult<usize> {
        Ok(self.pages)
    }

    fn listing_page_url(&self, page: usize) -> String {
        if page <= 1 {
            self.search_url()
        } else {
            format!("{}?model={}&page={}", self.base_url(), self.model, page)
        }
    }

    fn search_is_first_page(&self) -> bool {
        true
    }

    fn extract_links(&self, page: &FetchedPage) -> Vec<String> {
        let Ok(link) = selector(CAR_LINK) else {
            return Vec::new();
        };
        let document = Html::parse_document(&page.body);

        document
            .select(&link)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(|href| self.absolutize(href))
            .collect()
    }

    fn extract_listing(&self, link: &str, page: &FetchedPage) -> ParseResult<Listing> {
        let document = Html::parse_document(&page.body);

        // first stat is mileage, second is power
        let mut stats = all_text(&document, STATS)?.into_iter();
        let km = non_empty(stats.next());
        let power = non_empty(stats.next());

        let options: Vec<String> = all_text(&document, OPTIONS)?
            .into_iter()
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Listing {
            title: non_empty(first_text(&document, TITLE)?),
            price: non_empty(first_text(&document, PRICE)?),
            km,
            power,
            dealer: None,
            link: Some(link.to_string()),
            options: if options.is_empty() { None } else { Some(options) },
        })
    }
}
