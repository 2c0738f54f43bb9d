use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ExtractorSettings;
use crate::error::ExtractError;
use crate::snapshot::{ItemId, Snapshot};

/// Turns a listing page into the set of items currently in stock.
pub trait StockExtractor: Send + Sync {
    fn extract(&self, markup: &str, queue: &str) -> Snapshot;
}

#[derive(Debug, Deserialize)]
struct OutOfStockEntry {
    asin: String,
}

/// Extractor for the Vine listing layout: one table row per offered item,
/// plus a script blob naming the items that are already gone.
#[derive(Debug)]
pub struct VineExtractor {
    row: Selector,
    script: Selector,
    marker: String,
    entry: Regex,
}

impl VineExtractor {
    pub fn new(settings: &ExtractorSettings) -> Result<Self, ExtractError> {
        Ok(Self {
            row: parse_selector(&settings.row_selector)?,
            script: parse_selector(&settings.script_selector)?,
            marker: settings.out_of_stock_marker.clone(),
            entry: Regex::new(r#"\{"asin":"[^"]*"\}"#)?,
        })
    }

    fn listed_rows(&self, document: &Html, queue: &str) -> Snapshot {
        let mut listed = Snapshot::new();
        for row in document.select(&self.row) {
            let Some(id) = row.value().attr("id") else {
                debug!(queue, "listing row without id");
                continue;
            };
            if !listed.insert(ItemId::new(id)) {
                warn!(queue, asin = id, "Duplicate in-stock item found");
            }
        }
        listed
    }

    fn out_of_stock(&self, document: &Html) -> Vec<ItemId> {
        let mut gone = Vec::new();
        for script in document.select(&self.script) {
            for text in script.text() {
                let Some(line) = text.lines().find(|line| line.contains(&self.marker)) else {
                    continue;
                };
                gone.extend(
                    self.entry
                        .find_iter(line)
                        .filter_map(|m| serde_json::from_str::<OutOfStockEntry>(m.as_str()).ok())
                        .map(|entry| ItemId::new(entry.asin)),
                );
            }
        }
        gone
    }
}

impl StockExtractor for VineExtractor {
    fn extract(&self, markup: &str, queue: &str) -> Snapshot {
        let document = Html::parse_document(markup);

        let mut in_stock = self.listed_rows(&document, queue);
        for id in self.out_of_stock(&document) {
            in_stock.remove(&id);
        }

        info!("Found {} in-stock items in {}.", in_stock.len(), queue);
        in_stock
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}
