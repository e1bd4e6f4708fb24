//! Trade Republic statement converter library.
//!
//! Converts brokerage exports into a normalized statement: an ordered list of
//! dated, typed transaction lines plus the resulting balance.
//!
//! # Supported Inputs
//!
//! - **CSV**: semicolon separated transaction list (`transactions.csv`)
//! - **JSON**: timeline event log (`all_events.json`)
//!
//! # Examples
//!
//! ## Converting a file picked by extension
//!
//! ```no_run
//! use trstatement::plugin::TradeRepublicPlugin;
//!
//! let plugin = TradeRepublicPlugin::default();
//! let statement = plugin.get_parser("transactions.csv")?.parse()?;
//! for line in &statement.lines {
//!     println!("{} {} {}", line.date, line.amount, line.memo);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Parsing an event log from any reader
//!
//! ```no_run
//! use std::fs::File;
//! use trstatement::json_format::JsonStatement;
//!
//! let mut input = File::open("all_events.json")?;
//! let json = JsonStatement::from_read(&mut input)?;
//! println!("End balance: {:?}", json.statement.end_balance);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod numbers;
pub mod csv_format;
pub mod json_format;
pub mod plugin;
pub mod output;

use std::path::Path;
use std::str::FromStr;

// Re-export commonly used types
pub use error::{Error, Result};
pub use plugin::{PluginSettings, StatementParser, TradeRepublicPlugin};
pub use types::{Currency, Investment, LineDate, Statement, StatementLine, TransactionType};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Semicolon separated transaction list
    Csv,
    /// JSON event log
    Json,
}

impl FromStr for InputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" | "events" => Ok(InputFormat::Json),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl InputFormat {
    /// Detect the format from a file name. The suffix match is case-sensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_str()?;
        [InputFormat::Csv, InputFormat::Json]
            .into_iter()
            .find(|format| {
                name.strip_suffix(format.extension())
                    .is_some_and(|stem| stem.ends_with('.'))
            })
    }

    /// Get file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            InputFormat::Csv => "csv",
            InputFormat::Json => "json",
        }
    }
}
