use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::cookies::BrowserKind;
use crate::error::ConfigError;
use crate::snapshot::ItemId;

pub const LOGIN_PAGE: &str = "https://www.amazon.co.uk/vine/vine-items?queue=potluck";
pub const LOGIN_MARKER: &str = "Vine Help";
pub const COOKIE_DOMAIN: &str = "amazon.co.uk";

pub const YOUR_QUEUE_URL: &str = "https://www.amazon.co.uk/vine/vine-items?queue=encore";
pub const AVAILABLE_FOR_ALL_URL: &str =
    "https://www.amazon.co.uk/vine/vine-items?queue=last_chance";
pub const ITEM_URL_TEMPLATE: &str = "https://www.amazon.co.uk/dp/{asin}";

const ASIN_PLACEHOLDER: &str = "{asin}";

/// Pause after each opened tab so the browser is not flooded.
pub const OPEN_DELAY: Duration = Duration::from_secs(1);

/// Everything needed to establish the authenticated session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub browser: BrowserKind,
    pub cookie_db: Option<PathBuf>,
    pub cookie_domain: String,
    pub user_agent: String,
    pub login_page: String,
    pub login_marker: String,
}

/// A monitored listing page.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    pub listing_url: String,
    pub item_url_template: String,
}

impl QueueConfig {
    pub fn new(
        name: impl Into<String>,
        listing_url: impl Into<String>,
        item_url_template: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let item_url_template = item_url_template.into();
        if !item_url_template.contains(ASIN_PLACEHOLDER) {
            return Err(ConfigError::Template(item_url_template));
        }
        Ok(Self {
            name: name.into(),
            listing_url: listing_url.into(),
            item_url_template,
        })
    }

    pub fn item_url(&self, id: &ItemId) -> String {
        self.item_url_template.replace(ASIN_PLACEHOLDER, id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub wait_interval: Duration,
    pub open_delay: Duration,
    pub queues: Vec<QueueConfig>,
}

/// Markup shape of a listing page.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub row_selector: String,
    pub script_selector: String,
    /// Token naming the out-of-stock list. Misspelled on the site itself.
    pub out_of_stock_marker: String,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            row_selector: "tr.v_newsletter_item".to_string(),
            script_selector: r#"script[type="text/javascript"]"#.to_string(),
            out_of_stock_marker: "vineInitalJson".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
    pub extractor: ExtractorSettings,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.wait == 0 {
            return Err(ConfigError::ZeroWait);
        }
        let wait_secs = args
            .wait
            .checked_mul(60)
            .ok_or(ConfigError::WaitTooLong(args.wait))?;

        let session = SessionConfig {
            browser: args.browser,
            cookie_db: args.cookie_db.clone(),
            cookie_domain: COOKIE_DOMAIN.to_string(),
            user_agent: args
                .user_agent
                .clone()
                .unwrap_or_else(|| args.browser.user_agent().to_string()),
            login_page: LOGIN_PAGE.to_string(),
            login_marker: LOGIN_MARKER.to_string(),
        };

        let monitor = MonitorConfig {
            wait_interval: Duration::from_secs(wait_secs),
            open_delay: OPEN_DELAY,
            queues: vec![
                QueueConfig::new("Your Queue", YOUR_QUEUE_URL, ITEM_URL_TEMPLATE)?,
                QueueConfig::new("Available for all", AVAILABLE_FOR_ALL_URL, ITEM_URL_TEMPLATE)?,
            ],
        };

        let log_file = if args.no_log_file {
            None
        } else {
            Some(args.log_file.clone())
        };

        Ok(Self {
            session,
            monitor,
            extractor: ExtractorSettings::default(),
            log_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("vine-monitor").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults_follow_the_cli() {
        let config = Config::from_args(&args(&[])).unwrap();

        assert_eq!(config.monitor.wait_interval, Duration::from_secs(600));
        assert_eq!(config.monitor.queues.len(), 2);
        assert_eq!(config.session.browser, BrowserKind::Firefox);
        assert_eq!(config.session.user_agent, BrowserKind::Firefox.user_agent());
        assert_eq!(config.log_file, Some(PathBuf::from("vine_monitor.log")));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_args(&args(&[
            "-w",
            "3",
            "--browser",
            "chrome",
            "--user-agent",
            "test-agent",
            "--no-log-file",
        ]))
        .unwrap();

        assert_eq!(config.monitor.wait_interval, Duration::from_secs(180));
        assert_eq!(config.session.browser, BrowserKind::Chrome);
        assert_eq!(config.session.user_agent, "test-agent");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn zero_wait_is_rejected() {
        assert!(matches!(
            Config::from_args(&args(&["-w", "0"])),
            Err(ConfigError::ZeroWait)
        ));
    }

    #[test]
    fn overflowing_wait_is_rejected() {
        assert!(matches!(
            Config::from_args(&args(&["-w", "307445734561825861"])),
            Err(ConfigError::WaitTooLong(307445734561825861))
        ));
    }

    #[test]
    fn largest_representable_wait_is_accepted() {
        let minutes = (u64::MAX / 60).to_string();
        let config = Config::from_args(&args(&["-w", &minutes])).unwrap();
        assert_eq!(config.monitor.wait_interval.as_secs(), u64::MAX / 60 * 60);
    }

    #[test]
    fn item_url_substitutes_asin() {
        let queue = QueueConfig::new("q", "http://list", "http://item/{asin}?x=1").unwrap();
        assert_eq!(queue.item_url(&ItemId::from("B0001")), "http://item/B0001?x=1");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        assert!(QueueConfig::new("q", "http://list", "http://item/").is_err());
    }
}
