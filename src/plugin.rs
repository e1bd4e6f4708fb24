//! Input dispatch: picks a converter for a file and binds it to an open reader.

use crate::csv_format::CsvStatement;
use crate::error::{Error, Result};
use crate::json_format::JsonStatement;
use crate::types::Statement;
use crate::InputFormat;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Settings applied to every statement a plugin produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    /// Account currency code.
    pub currency: String,
    /// Account identification.
    pub account_id: Option<String>,
    /// Bank identification.
    pub bank_id: Option<String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            account_id: None,
            bank_id: Some("TRBKDEBBXXX".to_string()),
        }
    }
}

/// Plugin entry point for Trade Republic exports (`transactions.csv` or
/// `all_events.json`).
#[derive(Debug, Clone, Default)]
pub struct TradeRepublicPlugin {
    settings: PluginSettings,
}

impl TradeRepublicPlugin {
    /// Create a plugin with the given settings.
    pub fn new(settings: PluginSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Open `path` and bind it to the converter for its extension.
    ///
    /// Only `.csv` and `.json` (case-sensitive) are handled. Any other file is
    /// rejected with [`Error::UnsupportedFile`] without being opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trstatement::plugin::TradeRepublicPlugin;
    ///
    /// let plugin = TradeRepublicPlugin::default();
    /// let statement = plugin.get_parser("all_events.json")?.parse()?;
    /// println!("end balance: {:?}", statement.end_balance);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn get_parser<P: AsRef<Path>>(&self, path: P) -> Result<StatementParser<BufReader<File>>> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path)
            .ok_or_else(|| Error::UnsupportedFile(path.display().to_string()))?;

        debug!(path = %path.display(), ?format, "selected converter");
        let file = File::open(path)?;
        Ok(self.parser_for(BufReader::new(file), format))
    }

    /// Bind an already open reader to the converter for `format`.
    pub fn parser_for<R: Read>(&self, reader: R, format: InputFormat) -> StatementParser<R> {
        StatementParser {
            reader,
            format,
            settings: self.settings.clone(),
        }
    }
}

/// A converter bound to its input.
///
/// Parsing consumes the parser, so the reader (and any file handle behind it)
/// is dropped as soon as conversion finishes or fails.
#[derive(Debug)]
pub struct StatementParser<R> {
    reader: R,
    format: InputFormat,
    settings: PluginSettings,
}

impl<R: Read> StatementParser<R> {
    /// Format this parser reads.
    pub fn format(&self) -> InputFormat {
        self.format
    }

    /// Convert the whole input into a statement.
    pub fn parse(mut self) -> Result<Statement> {
        let mut statement = match self.format {
            InputFormat::Csv => CsvStatement::from_read(&mut self.reader)?.statement,
            InputFormat::Json => JsonStatement::from_read(&mut self.reader)?.statement,
        };

        statement.currency = Some(self.settings.currency);
        statement.account_id = self.settings.account_id;
        statement.bank_id = self.settings.bank_id;
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_unsupported_extension() {
        let plugin = TradeRepublicPlugin::default();

        for path in ["statement.pdf", "statement.CSV", "statement.Json", "statement"] {
            assert!(matches!(plugin.get_parser(path), Err(Error::UnsupportedFile(_))));
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let plugin = TradeRepublicPlugin::default();
        assert!(matches!(plugin.get_parser("/nonexistent/transactions.csv"), Err(Error::Io(_))));
    }

    #[test]
    fn test_settings_applied_to_statement() {
        let plugin = TradeRepublicPlugin::new(PluginSettings {
            currency: "USD".into(),
            account_id: Some("DE001".into()),
            bank_id: None,
        });
        let data = "Date;Value;Note;Type;ISIN;Shares\n2025-01-20;1.00;x;Interest;;\n";

        let parser = plugin.parser_for(data.as_bytes(), InputFormat::Csv);
        assert_eq!(parser.format(), InputFormat::Csv);
        let statement = parser.parse().unwrap();

        assert_eq!(statement.currency.as_deref(), Some("USD"));
        assert_eq!(statement.account_id.as_deref(), Some("DE001"));
        assert_eq!(statement.bank_id, None);
        assert_eq!(statement.end_balance, Some(Decimal::from(1)));
    }

    #[test]
    fn test_empty_json_log() {
        let plugin = TradeRepublicPlugin::default();
        let statement = plugin.parser_for("[]".as_bytes(), InputFormat::Json).parse().unwrap();

        assert!(statement.lines.is_empty());
        assert_eq!(statement.end_balance, Some(Decimal::ZERO));
    }
}
