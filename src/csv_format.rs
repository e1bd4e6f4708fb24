//! CSV transaction list parser.
//!
//! Reads the semicolon separated `transactions.csv` export with the columns
//! `Date;Value;Note;Type;ISIN;Shares` (order taken from the header row) and
//! maps every row to exactly one statement line.

use crate::error::{Error, Result};
use crate::numbers::parse_decimal;
use crate::types::{
    generate_transaction_id, recalculate_balance, LineDate, Statement, StatementLine,
    TransactionType,
};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, trace};

/// Represents a statement parsed from the CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvStatement {
    /// The underlying statement data.
    pub statement: Statement,
}

/// CSV transaction record structure.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "Note", default)]
    note: String,
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "ISIN", default)]
    isin: String,
    #[serde(rename = "Shares", default)]
    shares: String,
}

/// How a row `Type` (and possibly its note) maps onto a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowRule {
    /// Classify and optionally drop a leading note prefix from the memo.
    Classify(TransactionType, Option<&'static str>),
    /// Security purchase; memo is `Note - ISIN - Shares`.
    Buy,
    /// Unknown row type, kept without classification.
    Unmapped,
}

const CARD_REFUND: &str = "Card Refund";
const CARD_PAYMENT: &str = "Card Payment";

impl RowRule {
    fn for_record(kind: &str, note: &str) -> Self {
        match kind {
            "Deposit" if note.starts_with(CARD_REFUND) => {
                RowRule::Classify(TransactionType::Credit, Some(CARD_REFUND))
            }
            "Deposit" => RowRule::Classify(TransactionType::Xfer, None),
            "Removal" if note.starts_with(CARD_PAYMENT) => {
                RowRule::Classify(TransactionType::Pos, Some(CARD_PAYMENT))
            }
            "Removal" => RowRule::Classify(TransactionType::Debit, None),
            "Dividend" => RowRule::Classify(TransactionType::Div, None),
            "Interest" => RowRule::Classify(TransactionType::Int, None),
            "Buy" => RowRule::Buy,
            _ => RowRule::Unmapped,
        }
    }
}

impl CsvStatement {
    /// Parse a CSV export from any source implementing `Read`.
    ///
    /// The balance is recalculated once every row has been mapped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use trstatement::csv_format::CsvStatement;
    ///
    /// let mut file = File::open("transactions.csv")?;
    /// let csv = CsvStatement::from_read(&mut file)?;
    /// println!("{} lines", csv.statement.lines.len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().delimiter(b';').from_reader(reader);
        let mut statement = Statement::new();

        for result in csv_reader.deserialize() {
            let record: CsvRecord = result?;
            let line = Self::parse_record(&record)?;
            line.validate()?;
            trace!(id = %line.id, memo = %line.memo, "mapped csv row");
            statement.lines.push(line);
        }

        debug!(lines = statement.lines.len(), "parsed csv export");
        recalculate_balance(&mut statement);
        Ok(CsvStatement { statement })
    }

    fn parse_record(record: &CsvRecord) -> Result<StatementLine> {
        let date = Self::parse_date(&record.date)?;
        let amount = parse_decimal(&record.value)?;
        let mut line = StatementLine::new(LineDate::Date(date), amount, record.note.as_str());

        match RowRule::for_record(&record.kind, &record.note) {
            RowRule::Classify(kind, prefix) => {
                line.transaction_type = Some(kind);
                if let Some(prefix) = prefix {
                    line.memo = Self::strip_note_prefix(&record.note, prefix);
                }
            }
            RowRule::Buy => {
                line.transaction_type = Some(TransactionType::Debit);
                line.memo = format!("{} - {} - {}", record.note, record.isin, record.shares);
            }
            RowRule::Unmapped => {
                debug!(kind = %record.kind, "unmapped csv row type");
            }
        }

        line.id = generate_transaction_id(&line);
        Ok(line)
    }

    fn strip_note_prefix(note: &str, prefix: &str) -> String {
        note.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(" - "))
            .unwrap_or(note)
            .to_string()
    }

    fn parse_date(date_str: &str) -> Result<NaiveDate> {
        let trimmed = date_str.trim();

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(date);
        }

        let datetime_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
        for format in datetime_formats {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(datetime.date());
            }
        }

        Err(Error::InvalidDate(date_str.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const HEADER: &str = "Date;Value;Note;Type;ISIN;Shares\n";

    fn parse(body: &str) -> Result<Statement> {
        let data = format!("{}{}", HEADER, body);
        CsvStatement::from_read(&mut data.as_bytes()).map(|csv| csv.statement)
    }

    #[test]
    fn test_parse_date() {
        let date = CsvStatement::parse_date("2025-01-20").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2025, 1, 20));

        let date = CsvStatement::parse_date("2025-01-20T13:45:00").unwrap();
        assert_eq!(date.day(), 20);

        assert!(matches!(CsvStatement::parse_date("20.01.2025"), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(
            RowRule::for_record("Deposit", "Card Refund - Shop"),
            RowRule::Classify(TransactionType::Credit, Some(CARD_REFUND))
        );
        assert_eq!(
            RowRule::for_record("Deposit", "Jane Doe"),
            RowRule::Classify(TransactionType::Xfer, None)
        );
        assert_eq!(
            RowRule::for_record("Removal", "Card Payment - Shop"),
            RowRule::Classify(TransactionType::Pos, Some(CARD_PAYMENT))
        );
        assert_eq!(
            RowRule::for_record("Removal", "Rent"),
            RowRule::Classify(TransactionType::Debit, None)
        );
        assert_eq!(RowRule::for_record("Buy", "ETF"), RowRule::Buy);
        assert_eq!(RowRule::for_record("Sell", "ETF"), RowRule::Unmapped);
    }

    #[test]
    fn test_card_prefixes_are_stripped() {
        let statement = parse(
            "2025-01-20;5.00;Card Refund - Shop A;Deposit;;\n\
             2025-01-21;-3.00;Card Payment - Shop B;Removal;;\n",
        )
        .unwrap();

        assert_eq!(statement.lines[0].memo, "Shop A");
        assert_eq!(statement.lines[0].transaction_type, Some(TransactionType::Credit));
        assert_eq!(statement.lines[1].memo, "Shop B");
        assert_eq!(statement.lines[1].transaction_type, Some(TransactionType::Pos));
    }

    #[test]
    fn test_bare_prefix_keeps_note() {
        assert_eq!(CsvStatement::strip_note_prefix("Card Refund", CARD_REFUND), "Card Refund");
    }

    #[test]
    fn test_unknown_type_is_kept_unclassified() {
        let statement = parse("2025-01-20;10.00;Something;Sell;;\n").unwrap();

        assert_eq!(statement.lines.len(), 1);
        assert_eq!(statement.lines[0].transaction_type, None);
        assert_eq!(statement.lines[0].memo, "Something");
        assert!(statement.validate().is_ok());
    }

    #[test]
    fn test_malformed_amount_fails() {
        let result = parse("2025-01-20;abc;Something;Deposit;;\n");
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_columns_follow_header_and_optional_columns() {
        let data = "Type;Date;Note;Value\nInterest;2025-01-31;Interest;2.51\n";
        let statement = CsvStatement::from_read(&mut data.as_bytes()).unwrap().statement;

        assert_eq!(statement.lines[0].amount, Decimal::from_str("2.51").unwrap());
        assert_eq!(statement.lines[0].transaction_type, Some(TransactionType::Int));
        assert_eq!(statement.end_balance, Some(Decimal::from_str("2.51").unwrap()));
    }

    #[test]
    fn test_every_row_passes_line_validation() {
        let statement = parse(
            "2025-01-20;-7.01;Card Payment - Some Shop;Removal;;\n\
             2025-02-03;-26.00;MSCI USA USD (Dist);Buy;IE0000000000;0.512345\n",
        )
        .unwrap();

        for line in &statement.lines {
            assert!(line.validate().is_ok());
            assert_eq!(line.id, generate_transaction_id(line));
        }
    }

    #[test]
    fn test_ids_are_deterministic() {
        let body = "2025-01-20;-7.01;Card Payment - Some Shop;Removal;;\n";
        let first = parse(body).unwrap();
        let second = parse(body).unwrap();

        assert_eq!(first, second);
        assert!(!first.lines[0].id.is_empty());
    }
}
