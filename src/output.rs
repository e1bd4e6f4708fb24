//! Rendering of a finished statement for the command line tool.

use crate::error::{Error, Result};
use crate::types::Statement;
use csv::Writer;
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

/// Output representations of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One CSV row per statement line.
    Csv,
    /// The whole statement as pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

#[derive(Serialize)]
struct CsvOutRow<'a> {
    id: &'a str,
    date: String,
    #[serde(rename = "type")]
    kind: &'a str,
    amount: String,
    currency: &'a str,
    memo: &'a str,
    payee: &'a str,
    security_id: &'a str,
    units: String,
    unit_price: String,
}

/// Write `statement` to `writer` in the requested format.
pub fn write_statement<W: Write>(writer: &mut W, statement: &Statement, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(writer, statement),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, statement)?;
            writeln!(writer)?;
            Ok(())
        }
    }
}

fn write_csv<W: Write>(writer: &mut W, statement: &Statement) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    let default_currency = statement.currency.as_deref().unwrap_or("");

    for line in &statement.lines {
        let investment = line.investment.as_ref();
        let record = CsvOutRow {
            id: &line.id,
            date: line.date.to_string(),
            kind: line.transaction_type.map(|t| t.as_str()).unwrap_or(""),
            amount: line.amount.to_string(),
            currency: line
                .currency
                .as_ref()
                .map(|c| c.symbol.as_str())
                .unwrap_or(default_currency),
            memo: &line.memo,
            payee: line.payee.as_deref().unwrap_or(""),
            security_id: investment.and_then(|i| i.security_id.as_deref()).unwrap_or(""),
            units: investment
                .and_then(|i| i.units)
                .map(|u| u.to_string())
                .unwrap_or_default(),
            unit_price: investment
                .and_then(|i| i.unit_price)
                .map(|p| p.to_string())
                .unwrap_or_default(),
        };
        csv_writer.serialize(record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineDate, StatementLine, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn sample() -> Statement {
        let mut statement = Statement::new();
        statement.currency = Some("EUR".into());
        let mut line = StatementLine::new(
            LineDate::Date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()),
            Decimal::new(-701, 2),
            "Some Shop",
        );
        line.id = "id1".into();
        line.transaction_type = Some(TransactionType::Pos);
        statement.lines.push(line);
        statement
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("ofx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_csv() {
        let mut out = Vec::new();
        write_statement(&mut out, &sample(), OutputFormat::Csv).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut rows = text.lines();
        assert_eq!(rows.next(), Some("id,date,type,amount,currency,memo,payee,security_id,units,unit_price"));
        assert_eq!(rows.next(), Some("id1,2025-01-20,POS,-7.01,EUR,Some Shop,,,,"));
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_statement(&mut out, &sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["lines"][0]["transaction_type"], "POS");
        assert_eq!(value["lines"][0]["memo"], "Some Shop");
    }
}
