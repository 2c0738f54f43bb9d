//! Reuses the login of a locally installed browser by reading its cookie
//! database.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use chrono::Utc;
use clap::ValueEnum;
use reqwest::Url;
use reqwest::cookie::Jar;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use sha1::Sha1;
use tracing::{debug, info, warn};

use crate::error::CookieError;

/// Seconds between 1601-01-01 (Chrome's epoch) and 1970-01-01.
const CHROME_EPOCH_OFFSET: i64 = 11_644_473_600;

/// Password Chrome on Linux uses for `v10` values when no keyring is involved.
const CHROME_V10_PASSWORD: &[u8] = b"peanuts";
const CHROME_SALT: &[u8] = b"saltysalt";
const CHROME_IV: [u8; 16] = [b' '; 16];

/// From this database version on, plaintext starts with SHA-256(host_key).
const CHROME_HOST_DIGEST_VERSION: i64 = 24;
const HOST_DIGEST_LEN: usize = 32;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Firefox,
    Chrome,
}

impl BrowserKind {
    pub fn user_agent(self) -> &'static str {
        match self {
            BrowserKind::Firefox => {
                "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
            }
            BrowserKind::Chrome => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            }
        }
    }

    fn candidate_databases(self) -> Vec<PathBuf> {
        let home = dirs::home_dir();
        let config = dirs::config_dir();
        let local = dirs::data_local_dir();

        match self {
            BrowserKind::Firefox => {
                let mut roots = Vec::new();
                if let Some(home) = &home {
                    roots.push(home.join(".mozilla/firefox"));
                    roots.push(home.join("snap/firefox/common/.mozilla/firefox"));
                }
                if let Some(config) = &config {
                    roots.push(config.join("Firefox").join("Profiles"));
                    roots.push(config.join("Mozilla").join("Firefox").join("Profiles"));
                }
                roots
                    .iter()
                    .filter_map(|root| fs::read_dir(root).ok())
                    .flat_map(|entries| entries.filter_map(Result::ok))
                    .map(|entry| entry.path().join("cookies.sqlite"))
                    .collect()
            }
            BrowserKind::Chrome => {
                let mut profiles = Vec::new();
                if let Some(config) = &config {
                    profiles.push(config.join("google-chrome").join("Default"));
                    profiles.push(config.join("chromium").join("Default"));
                    profiles.push(config.join("Google").join("Chrome").join("Default"));
                }
                if let Some(local) = &local {
                    profiles.push(local.join("Google").join("Chrome").join("User Data").join("Default"));
                }
                profiles
                    .iter()
                    .flat_map(|profile| [profile.join("Network").join("Cookies"), profile.join("Cookies")])
                    .collect()
            }
        }
    }

    /// Most recently written cookie database of this browser.
    pub fn locate_database(self) -> Result<PathBuf, CookieError> {
        let candidates = self.candidate_databases();
        candidates
            .iter()
            .filter_map(|path| {
                let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path.clone())
            .ok_or_else(|| CookieError::DatabaseNotFound {
                browser: self.to_string(),
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Firefox => f.write_str("firefox"),
            BrowserKind::Chrome => f.write_str("chrome"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub host: String,
    pub name: String,
    pub value: String,
    pub path: String,
    pub secure: bool,
}

impl BrowserCookie {
    fn set_cookie_header(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        // A leading dot marks a domain cookie; without it the cookie is host-only.
        if self.host.starts_with('.') {
            header.push_str("; Domain=");
            header.push_str(&self.host);
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Reads unexpired cookies for `domain` from the browser's store, or from
/// `database` when one is given.
pub fn load_cookies(
    browser: BrowserKind,
    database: Option<&Path>,
    domain: &str,
) -> Result<Vec<BrowserCookie>, CookieError> {
    let path = match database {
        Some(path) => path.to_path_buf(),
        None => browser.locate_database()?,
    };
    info!(path = %path.display(), "Loading {browser} cookies");

    let sqlite = |source| CookieError::Sqlite {
        path: path.clone(),
        source,
    };

    let uri = sqlite_uri(&path)?;
    let conn = Connection::open_with_flags(
        &uri,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    )
    .map_err(sqlite)?;

    let cookies = match browser {
        BrowserKind::Firefox => read_firefox(&conn, domain),
        BrowserKind::Chrome => read_chrome(&conn, domain),
    }
    .map_err(sqlite)?;

    if cookies.is_empty() {
        return Err(CookieError::NoCookies {
            domain: domain.to_string(),
            path,
        });
    }
    debug!(count = cookies.len(), "cookies loaded");
    Ok(cookies)
}

/// Read-only `file:` uri for `path`. immutable=1 lets us read while the
/// browser holds its lock.
fn sqlite_uri(path: &Path) -> Result<String, CookieError> {
    let mut url = std::path::absolute(path)
        .ok()
        .and_then(|absolute| Url::from_file_path(absolute).ok())
        .ok_or_else(|| CookieError::BadPath {
            path: path.to_path_buf(),
        })?;
    url.set_query(Some("immutable=1"));
    Ok(url.into())
}

/// `host` is `domain` itself or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.strip_prefix('.').unwrap_or(host);
    host.eq_ignore_ascii_case(domain)
        || host
            .len()
            .checked_sub(domain.len() + 1)
            .is_some_and(|dot| {
                host.as_bytes()[dot] == b'.' && host[dot + 1..].eq_ignore_ascii_case(domain)
            })
}

fn read_firefox(conn: &Connection, domain: &str) -> rusqlite::Result<Vec<BrowserCookie>> {
    let mut stmt = conn.prepare(
        "SELECT host, name, value, path, isSecure FROM moz_cookies WHERE expiry > ?1",
    )?;
    let rows = stmt.query_map(params![Utc::now().timestamp()], |row| {
        Ok(BrowserCookie {
            host: row.get(0)?,
            name: row.get(1)?,
            value: row.get(2)?,
            path: row.get(3)?,
            secure: row.get::<_, i64>(4)? != 0,
        })
    })?;

    let mut cookies = Vec::new();
    for cookie in rows {
        let cookie = cookie?;
        if host_matches(&cookie.host, domain) {
            cookies.push(cookie);
        }
    }
    Ok(cookies)
}

fn chrome_db_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
        row.get::<_, String>(0)
    })
    .optional()
    .ok()
    .flatten()
    .and_then(|version| version.parse().ok())
    .unwrap_or(0)
}

fn chrome_v10_key() -> [u8; 16] {
    let mut key = [0u8; 16];
    pbkdf2::pbkdf2_hmac::<Sha1>(CHROME_V10_PASSWORD, CHROME_SALT, 1, &mut key);
    key
}

/// Decrypts a `v10` value. `v11` (keyring) and Windows values yield `None`.
fn decrypt_chrome_value(encrypted: &[u8], key: &[u8; 16], host_digest: bool) -> Option<String> {
    let mut buf = encrypted.strip_prefix(b"v10")?.to_vec();
    let plain = Aes128CbcDec::new(&(*key).into(), &CHROME_IV.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .ok()?;
    let plain = if host_digest {
        plain.get(HOST_DIGEST_LEN..)?
    } else {
        plain
    };
    String::from_utf8(plain.to_vec()).ok()
}

fn read_chrome(conn: &Connection, domain: &str) -> rusqlite::Result<Vec<BrowserCookie>> {
    let now = (Utc::now().timestamp() + CHROME_EPOCH_OFFSET) * 1_000_000;
    let host_digest = chrome_db_version(conn) >= CHROME_HOST_DIGEST_VERSION;
    let key = chrome_v10_key();

    let mut stmt = conn.prepare(
        "SELECT host_key, name, value, path, is_secure, encrypted_value FROM cookies
         WHERE expires_utc = 0 OR expires_utc > ?1",
    )?;
    let rows = stmt.query_map(params![now], |row| {
        let cookie = BrowserCookie {
            host: row.get(0)?,
            name: row.get(1)?,
            value: row.get(2)?,
            path: row.get(3)?,
            secure: row.get::<_, i64>(4)? != 0,
        };
        Ok((cookie, row.get::<_, Option<Vec<u8>>>(5)?))
    })?;

    let mut cookies = Vec::new();
    let mut undecryptable = 0usize;
    for row in rows {
        let (mut cookie, encrypted) = row?;
        if !host_matches(&cookie.host, domain) {
            continue;
        }
        if cookie.value.is_empty() {
            match encrypted
                .as_deref()
                .and_then(|blob| decrypt_chrome_value(blob, &key, host_digest))
            {
                Some(value) => cookie.value = value,
                None => {
                    undecryptable += 1;
                    continue;
                }
            }
        }
        cookies.push(cookie);
    }
    if undecryptable > 0 {
        warn!(undecryptable, "Skipped Chrome cookies that could not be decrypted");
    }
    Ok(cookies)
}

/// Builds the jar the HTTP client sends cookies from.
pub fn cookie_jar(cookies: &[BrowserCookie]) -> Jar {
    let jar = Jar::default();
    for cookie in cookies {
        let host = cookie.host.trim_start_matches('.');
        match Url::parse(&format!("https://{host}{}", cookie.path)) {
            Ok(url) => jar.add_cookie_str(&cookie.set_cookie_header(), &url),
            Err(e) => warn!(host = %cookie.host, name = %cookie.name, "unusable cookie host: {e}"),
        }
    }
    jar
}
