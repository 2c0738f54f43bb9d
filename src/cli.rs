use std::path::PathBuf;

use clap::Parser;

use crate::cookies::BrowserKind;

/// Watches the Vine queues and opens a browser tab for every new item.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Number of minutes to wait between iterations
    #[arg(short = 'w', long, default_value_t = 10)]
    pub wait: u64,

    /// Browser whose session cookies are reused
    #[arg(long, value_enum, default_value_t = BrowserKind::Firefox)]
    pub browser: BrowserKind,

    /// Read cookies from this database instead of the browser profile
    #[arg(long)]
    pub cookie_db: Option<PathBuf>,

    /// User agent to send (defaults to one matching --browser)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Append log output to this file
    #[arg(long, default_value = "vine_monitor.log")]
    pub log_file: PathBuf,

    /// Log to stdout only
    #[arg(long, default_value_t = false)]
    pub no_log_file: bool,

    /// Take the initial snapshot, poll once, then exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
}
