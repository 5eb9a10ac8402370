//! BMW stock locator (new vehicles), a paged JSON search API.

use listing_sync::{PagedApiConfig, RecordKey};
use serde_json::{json, Value};

pub const ENDPOINT: &str = "https://stolo-data-service.prod.stolo.eu-central-1.aws.bmw.cloud/vehiclesearch/search/nl-be/vehiclefinder?maxResults=5&brand=BMW&hash=889c6ce62a4e7c230a55aa25226f173f5ab0115e105a45916fb6b6c4fd0c1f38";

/// Vendor id of a stock vehicle.
pub const ID_POINTER: &str = "/vehicle/vssId";

/// Marketing model ranges searched per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockModel {
    I4,
    I5,
}

impl StockModel {
    pub fn route_key(&self) -> &'static str {
        match self {
            StockModel::I4 => "i4/new",
            StockModel::I5 => "i5/new",
        }
    }

    pub fn model_ranges(&self) -> &'static [&'static str] {
        match self {
            StockModel::I4 => &["i4_G26E"],
            StockModel::I5 => &["i5_G60E", "i5_G61E"],
        }
    }

    /// Search filter posted with every page request.
    pub fn filter(&self) -> Value {
        json!({
            "searchContext": [{
                "model": {
                    "marketingModelRange": { "value": self.model_ranges() }
                }
            }]
        })
    }

    pub fn api_config(&self) -> PagedApiConfig {
        self.api_config_at(ENDPOINT)
    }

    /// Same search against another endpoint (tests, mirrors).
    pub fn api_config_at(&self, endpoint: &str) -> PagedApiConfig {
        PagedApiConfig::new(endpoint, self.filter(), RecordKey::new(ID_POINTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_sync::page_url;

    #[test]
    fn test_i5_filter_lists_both_bodies() {
        assert_eq!(
            StockModel::I5.filter()["searchContext"][0]["model"]["marketingModelRange"]["value"],
            json!(["i5_G60E", "i5_G61E"])
        );
    }

    #[test]
    fn test_offset_appended_after_hash() {
        let url = page_url(ENDPOINT, "startIndex", 10).unwrap();
        assert!(url.ends_with("&hash=889c6ce62a4e7c230a55aa25226f173f5ab0115e105a45916fb6b6c4fd0c1f38&startIndex=10"));
    }
}
