//! Startup configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file, `PRICER_*` environment variables (a `.env` file is honoured), and
//! command-line flags.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use crate::error::{PricerError, Result};
use crate::feed::normaliser::DEFAULT_PRICE_DECIMALS;

/// Size of the hypothetical market order being priced. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize(u64);

impl TargetSize {
    pub fn new(shares: u64) -> Result<Self> {
        if shares == 0 {
            return Err(PricerError::config("0", "target size must be positive"));
        }
        Ok(Self(shares))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for TargetSize {
    type Error = PricerError;

    fn try_from(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(PricerError::config(value.to_string(), "target size must be positive"));
        }
        Ok(Self(value as u64))
    }
}

impl FromStr for TargetSize {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let value: i64 = s
            .parse()
            .map_err(|_| PricerError::config(s, "target size must be a whole number"))?;
        TargetSize::try_from(value)
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Parser)]
#[command(name = "book-pricer", version, about = "Prices a fixed-size market order against a limit order book feed")]
pub struct Cli {
    /// Shares in the market order being priced; prompted for when missing or invalid
    #[arg(short = 't', long, allow_hyphen_values = true)]
    pub target_size: Option<String>,

    /// Feed file; stdin when omitted
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Fractional digits kept for prices
    #[arg(long)]
    pub price_decimals: Option<u32>,

    /// Optional config file (toml, yaml or json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. "info" or "book_pricer=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

/// Settings read from the config file and environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    // Kept as text so a bad value is re-prompted instead of failing startup
    #[serde(default)]
    pub target_size: Option<String>,
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_price_decimals() -> u32 {
    DEFAULT_PRICE_DECIMALS
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_size: None,
            input: None,
            price_decimals: default_price_decimals(),
            log_filter: default_log_filter(),
        }
    }
}

/// Fully resolved configuration. `target_size` is `Err` when it was missing
/// or rejected, so the caller knows to prompt.
#[derive(Debug)]
pub struct AppConfig {
    pub target_size: Result<TargetSize>,
    pub input: Option<PathBuf>,
    pub price_decimals: u32,
    pub log_filter: String,
}

impl AppConfig {
    pub fn load(cli: Cli) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // load .env

        let mut builder = ::config::Config::builder();
        if let Some(path) = &cli.config {
            builder = builder.add_source(::config::File::from(path.as_path()));
        }
        let settings: Settings = builder
            .add_source(::config::Environment::with_prefix("PRICER"))
            .build()?
            .try_deserialize()?;

        Ok(Self::merge(cli, settings))
    }

    /// Flags win over file/env settings.
    pub fn merge(cli: Cli, settings: Settings) -> Self {
        let target_size = match (cli.target_size, settings.target_size) {
            (Some(raw), _) => raw.parse(),
            (None, Some(raw)) => raw.parse(),
            (None, None) => Err(PricerError::config("", "target size not set")),
        };
        Self {
            target_size,
            input: cli.input.or(settings.input),
            price_decimals: cli.price_decimals.unwrap_or(settings.price_decimals),
            log_filter: cli.log_filter.unwrap_or(settings.log_filter),
        }
    }
}

/// Ask for a target size until a valid one is entered. Rejected values are
/// reported on `prompt` and asked for again; running out of input is an error.
pub fn prompt_target_size<R: BufRead, W: Write>(input: &mut R, prompt: &mut W) -> Result<TargetSize> {
    loop {
        write!(prompt, "Target size (shares): ").map_err(prompt_io)?;
        prompt.flush().map_err(prompt_io)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(prompt_io)?;
        if read == 0 {
            return Err(PricerError::config("", "input closed before a valid target size was entered"));
        }
        match line.parse::<TargetSize>() {
            Ok(size) => return Ok(size),
            Err(e) => {
                warn!(error = %e, "Rejected target size");
                writeln!(prompt, "{e}, try again").map_err(prompt_io)?;
            }
        }
    }
}

fn prompt_io(e: io::Error) -> PricerError {
    PricerError::config("", format!("prompt I/O failed: {e}"))
}
