use std::io;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::ExtractError;
use crate::fetch::PageFetcher;
use crate::snapshot::ItemId;

/// Something that can show a url to the user.
pub trait BrowserLauncher: Send + Sync {
    fn open_tab(&self, url: &str) -> io::Result<()>;
}

/// Opens urls in the desktop's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open_tab(&self, url: &str) -> io::Result<()> {
        open::that_detached(url)
    }
}

/// Tax estimate shown on an item page.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxEstimate {
    pub currency: char,
    pub amount: f64,
}

pub struct ItemOpener<B> {
    launcher: B,
    delay: Duration,
    paragraph: Selector,
    tax: Regex,
}

impl<B: BrowserLauncher> ItemOpener<B> {
    pub fn new(launcher: B, delay: Duration) -> Result<Self, ExtractError> {
        let paragraph = Selector::parse("p").map_err(|e| ExtractError::Selector {
            selector: "p".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            launcher,
            delay,
            paragraph,
            tax: Regex::new(r"Estimated tax value\s*:\s*([$£€])([0-9.]+)")?,
        })
    }

    pub fn launcher(&self) -> &B {
        &self.launcher
    }

    /// Validates that the item page resolves and opens it. Returns `false`
    /// when the page could not be fetched, so the caller can retry later.
    pub async fn open<F: PageFetcher + ?Sized>(
        &self,
        fetcher: &F,
        queue: &QueueConfig,
        id: &ItemId,
    ) -> bool {
        let url = queue.item_url(id);
        debug!(asin = %id, "Attempting to open product page");

        let Some(markup) = fetcher.fetch(&url).await else {
            warn!(asin = %id, "Invalid item page or error for ASIN: {id}");
            return false;
        };

        info!(queue = %queue.name, "New item found: {id}");
        if let Some(tax) = self.tax_estimate(&markup) {
            info!("  Tax cost: {}{:.2}", tax.currency, tax.amount);
        }

        if let Err(e) = self.launcher.open_tab(&url) {
            warn!(url, "Could not open browser tab: {e}");
        }
        sleep(self.delay).await;
        true
    }

    pub fn tax_estimate(&self, markup: &str) -> Option<TaxEstimate> {
        let document = Html::parse_document(markup);
        document.select(&self.paragraph).find_map(|p| {
            let text: String = p.text().collect();
            let caps = self.tax.captures(&text)?;
            Some(TaxEstimate {
                currency: caps[1].chars().next()?,
                amount: caps[2].parse().ok()?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl BrowserLauncher for Recorder {
        fn open_tab(&self, url: &str) -> io::Result<()> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl PageFetcher for Fixed {
        async fn fetch(&self, _url: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn opener() -> ItemOpener<Recorder> {
        ItemOpener::new(Recorder::default(), Duration::ZERO).unwrap()
    }

    fn queue() -> QueueConfig {
        QueueConfig::new("q", "http://list", "http://item/{asin}").unwrap()
    }

    #[test]
    fn tax_estimate_is_parsed() {
        let markup = "<div><p>Nothing</p><p>Estimated tax value : £12.5</p></div>";
        assert_eq!(
            opener().tax_estimate(markup),
            Some(TaxEstimate {
                currency: '£',
                amount: 12.5
            })
        );
    }

    #[test]
    fn missing_or_malformed_tax_is_none() {
        let x = opener();
        assert_eq!(x.tax_estimate("<p>Free item</p>"), None);
        assert_eq!(x.tax_estimate("<p>Estimated tax value : $1.2.3</p>"), None);
    }

    #[tokio::test]
    async fn resolvable_item_is_opened() {
        let x = opener();
        let opened = x.open(&Fixed(Some("<p>ok</p>")), &queue(), &"B01".into()).await;

        assert!(opened);
        assert_eq!(*x.launcher().0.lock().unwrap(), vec!["http://item/B01"]);
    }

    #[tokio::test]
    async fn unresolvable_item_is_not_opened() {
        let x = opener();
        let opened = x.open(&Fixed(None), &queue(), &"B01".into()).await;

        assert!(!opened);
        assert!(x.launcher().0.lock().unwrap().is_empty());
    }
}
