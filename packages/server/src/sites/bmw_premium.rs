//! BMW Premium Selection (used vehicles).
//!
//! The search request answers with a bare result count and sets the session
//! cookie that listing pages require. Listing pages hold 20 cars each.

use listing_sync::{page_count, FetchedPage, Listing, ListingSite, ParseError, ParseResult};
use scraper::{ElementRef, Html};

use super::html::{first_text, resolve, selector, text_of};

pub const BASE_URL: &str = "https://bmwpremiumselection.be";
pub const PAGE_SIZE: usize = 20;

const SEARCH_QUERY: &str = "/nl/?aj=1&s=1&v[]=124&v[]=125&co2min=0&co2max=290&monthlymin=0&monthlymax=0&pmin=0&pmax=180000&kmin=0&kmax=132661&imin=2005&imax=2025&chmin=0&chmax=748&kwmin=0&kwmax=550&pw=ch&l=0&radius=0&zipcode=0";

const CAR_CARD: &str = "div.car-content.car-bps";
const CAR_LINK: &str = "div.car-body a[href]";

const TITLE: &str = "body > div.container-fluid > div.row.flex-xl-nowrap > main > div.row.align-items-center.page-title.pt-5.pb-1 > div.col-12.col-md-8 > h1";
const PRICE: &str = "body > div.container-fluid > div.row.flex-xl-nowrap > main > div.row.align-items-center.page-title.pt-5.pb-1 > div.col-12.col-md-4.text-right > p.h2.mb-0";
const KM: &str = "#tab-characteristics > table > tbody > tr:nth-child(2) > td:nth-child(2)";
const POWER: &str = "#tab-characteristics > table > tbody > tr:nth-child(3) > td:nth-child(2)";
const DEALER: &str = "body > div.container-fluid > div.row.flex-xl-nowrap > main > div.row.mb-4 > div:nth-child(2) > div > div > h3";
const OPTIONS: &str = "#tab-options";

#[derive(Debug, Clone)]
pub struct BmwPremiumSelection {
    base_url: String,
}

impl Default for BmwPremiumSelection {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}

impl BmwPremiumSelection {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ListingSite for BmwPremiumSelection {
    fn search_url(&self) -> String {
        format!("{}{}", self.base_url, SEARCH_QUERY)
    }

    fn total_pages(&self, search: &FetchedPage) -> ParseResult<usize> {
        let total: usize = search.body.trim().parse().map_err(|_| {
            ParseError::shape(format!(
                "expected a result count, got {:?}",
                search.body.chars().take(40).collect::<String>()
            ))
        })?;
        Ok(page_count(total, PAGE_SIZE))
    }

    fn listing_page_url(&self, page: usize) -> String {
        if page <= 1 {
            format!("{}/nl", self.base_url)
        } else {
            format!("{}/nl/voertuigen_{}.html", self.base_url, page - 1)
        }
    }

    fn requires_session(&self) -> bool {
        true
    }

    fn extract_links(&self, page: &FetchedPage) -> Vec<String> {
        let (Ok(card), Ok(link)) = (selector(CAR_CARD), selector(CAR_LINK)) else {
            return Vec::new();
        };
        let document = Html::parse_document(&page.body);

        document
            .select(&card)
            .filter_map(|card| card.select(&link).next())
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(&page.url, href))
            .collect()
    }

    fn extract_listing(&self, link: &str, page: &FetchedPage) -> ParseResult<Listing> {
        let document = Html::parse_document(&page.body);

        Ok(Listing {
            title: first_text(&document, TITLE)?,
            price: first_text(&document, PRICE)?,
            km: first_text(&document, KM)?,
            power: first_text(&document, POWER)?,
            dealer: first_text(&document, DEALER)?,
            link: Some(link.to_string()),
            options: extract_options(&document)?,
        })
    }
}

/// Option labels: the text node following each `<span>` bullet.
fn extract_options(document: &Html) -> ParseResult<Option<Vec<String>>> {
    let container = selector(OPTIONS)?;
    let span = selector("span")?;

    let Some(tab) = document.select(&container).next() else {
        return Ok(None);
    };

    let options = tab
        .select(&span)
        .filter_map(|span| span.next_sibling())
        .filter_map(|node| match node.value().as_text() {
            Some(text) => Some(text.trim().to_string()),
            None => ElementRef::wrap(node).map(text_of),
        })
        .filter(|text| !text.is_empty())
        .collect();

    Ok(Some(options))
}
