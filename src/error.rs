use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("no {browser} cookie database found (looked in {searched})")]
    DatabaseNotFound { browser: String, searched: String },

    #[error("cannot build a database uri for {}", .path.display())]
    BadPath { path: PathBuf },

    #[error("no cookies for {domain} in {}", .path.display())]
    NoCookies { domain: String, path: PathBuf },

    #[error("could not read cookie database {}: {source}", .path.display())]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wait interval must be at least one minute")]
    ZeroWait,

    #[error("wait interval of {0} minutes is too long")]
    WaitTooLong(u64),

    #[error("item url template `{0}` has no {{asin}} placeholder")]
    Template(String),
}

/// Conditions that stop the monitor before or during startup.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cookies(#[from] CookieError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("cannot get initial item lists")]
    NoInitialItems,
}
