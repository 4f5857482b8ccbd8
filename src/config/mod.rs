//! Configuration management for selfup
//!
//! selfup has a single, user-wide configuration file. It holds the defaults
//! of every `version upgrade` flag plus the hosts, timeouts and install
//! strategy that have no flag at all.
//!
//! # Modules
//!
//! - `global` - Loading `~/.selfup/config.toml`
//!
//! # Precedence
//!
//! From highest to lowest:
//!
//! 1. Command-line flags (`--thread`, `--privilege`, `--show-progress`)
//! 2. Environment variables (`GITHUB_TOKEN`, `SELFUP_CONFIG`, `SELFUP_NO_PROGRESS`)
//! 3. The global configuration file
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```toml
//! [upgrade]
//! threads = 4
//! install_strategy = "system-copy"
//! download_base_url = "https://github.example.com"
//! ```

mod global;

pub use global::GlobalConfig;
