//! JSON event log parser.
//!
//! The event log is a top-level array of timeline events. Events are sorted by
//! timestamp, filtered to executed events of a known type and mapped one by
//! one. Detail sections are walked leniently: a missing section or row leaves
//! the corresponding optional field empty, while the event's own id, timestamp
//! and amount are mandatory.

use crate::error::{Error, Result};
use crate::numbers::{decimal_from_json, parse_locale_decimal};
use crate::types::{
    recalculate_balance, Currency, Investment, LineDate, Statement, StatementLine,
    TransactionType,
};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use tracing::{debug, trace};

/// Represents a statement parsed from the JSON event log.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStatement {
    /// The underlying statement data.
    pub statement: Statement,
}

/// Event types that produce statement lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    CardTransaction,
    CardRefund,
    PaymentInbound,
    CreditCardPayment,
    InterestPayout,
    CashDividend,
    SavingsPlan,
    Saveback,
}

impl EventKind {
    fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "card_successful_transaction" => Some(EventKind::CardTransaction),
            "card_refund" => Some(EventKind::CardRefund),
            "PAYMENT_INBOUND" => Some(EventKind::PaymentInbound),
            "PAYMENT_INBOUND_CREDIT_CARD" => Some(EventKind::CreditCardPayment),
            "INTEREST_PAYOUT" | "INTEREST_PAYOUT_CREATED" => Some(EventKind::InterestPayout),
            "ssp_corporate_action_invoice_cash" => Some(EventKind::CashDividend),
            "SAVINGS_PLAN_INVOICE_CREATED" => Some(EventKind::SavingsPlan),
            "benefits_saveback_execution" => Some(EventKind::Saveback),
            _ => None,
        }
    }

    fn transaction_type(&self) -> TransactionType {
        match self {
            EventKind::CardTransaction => TransactionType::Pos,
            EventKind::CardRefund => TransactionType::Credit,
            EventKind::PaymentInbound | EventKind::CreditCardPayment => TransactionType::Xfer,
            EventKind::InterestPayout => TransactionType::Int,
            EventKind::CashDividend => TransactionType::Div,
            EventKind::SavingsPlan | EventKind::Saveback => TransactionType::BuyStock,
        }
    }

    fn is_investment(&self) -> bool {
        matches!(self, EventKind::SavingsPlan | EventKind::Saveback)
    }
}

const EXECUTED: &str = "EXECUTED";
const OVERVIEW: &str = "Übersicht";
const TRANSACTION: &str = "Transaktion";

/// Fields needed to order and filter an event.
#[derive(Debug, Deserialize)]
struct EventHeader {
    timestamp: String,
    #[serde(rename = "eventType")]
    event_type: String,
    status: Option<String>,
}

/// Fields read from an event that passed the filter.
#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    timestamp: String,
    title: String,
    amount: Money,
    #[serde(rename = "subAmount", default)]
    sub_amount: Option<Money>,
    #[serde(default)]
    details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Money {
    value: Value,
    currency: String,
}

/// Detail sections of an event. Anything that is not an array of objects is
/// treated as no sections.
#[derive(Debug)]
struct Details {
    sections: Vec<Section>,
}

/// A detail section. Section layouts vary between event types, so every
/// field is optional and read from the raw value.
#[derive(Debug)]
struct Section {
    title: Option<String>,
    action: Option<Value>,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Datum {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<DatumDetail>,
}

#[derive(Debug, Deserialize)]
struct DatumDetail {
    #[serde(default)]
    text: Option<String>,
}

impl Details {
    fn from_value(details: Option<&Value>) -> Self {
        let sections = details
            .and_then(|details| details.get("sections"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Section::from_value)
            .collect();
        Self { sections }
    }

    fn sections_titled<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections.iter().filter(move |section| section.title() == title)
    }
}

impl Section {
    fn from_value(value: &Value) -> Option<Self> {
        let section = value.as_object()?;
        Some(Self {
            title: section.get("title").and_then(Value::as_str).map(str::to_string),
            action: section.get("action").cloned(),
            data: section.get("data").cloned(),
        })
    }

    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Rows of a table-like section; anything else yields nothing.
    fn rows(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.data
            .as_ref()
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|value| Datum::deserialize(value).ok())
            .filter_map(|datum| {
                let text = datum.detail.and_then(|detail| detail.text)?;
                Some((datum.title.unwrap_or_default(), text))
            })
    }

    fn action_payload(&self) -> Option<String> {
        match self.action.as_ref()?.get("payload")? {
            Value::String(payload) => Some(payload.clone()),
            _ => None,
        }
    }

    fn is_investment_summary(&self) -> bool {
        let title = self.title();
        (title.starts_with("Du hast") && title.ends_with("investiert"))
            || (title.starts_with("Dein Bonus von") && title.ends_with("wurde investiert"))
    }
}

impl JsonStatement {
    /// Parse a JSON event log from any source implementing `Read`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use trstatement::json_format::JsonStatement;
    ///
    /// let mut file = File::open("all_events.json")?;
    /// let json = JsonStatement::from_read(&mut file)?;
    /// println!("{} lines", json.statement.lines.len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_reader(reader)?;

        let mut events = values
            .into_iter()
            .map(|value| -> Result<(EventHeader, Value)> {
                let header = EventHeader::deserialize(&value)
                    .map_err(|e| Error::MissingField(format!("event timestamp/eventType: {}", e)))?;
                Ok((header, value))
            })
            .collect::<Result<Vec<_>>>()?;
        events.sort_by(|(a, _), (b, _)| a.timestamp.cmp(&b.timestamp));

        let mut statement = Statement::new();
        for (header, value) in &events {
            if let Some(line) = Self::parse_event(header, value)? {
                line.validate()?;
                trace!(id = %line.id, memo = %line.memo, "mapped event");
                statement.lines.push(line);
            }
        }

        debug!(events = events.len(), lines = statement.lines.len(), "parsed json event log");
        recalculate_balance(&mut statement);
        Ok(JsonStatement { statement })
    }

    fn parse_event(header: &EventHeader, value: &Value) -> Result<Option<StatementLine>> {
        let Some(kind) = EventKind::from_event_type(&header.event_type) else {
            debug!(event_type = %header.event_type, "skipping event type");
            return Ok(None);
        };
        let status = header
            .status
            .as_deref()
            .ok_or_else(|| Error::MissingField(format!("status of {} event", header.event_type)))?;
        if status != EXECUTED {
            debug!(event_type = %header.event_type, status, "skipping event that is not executed");
            return Ok(None);
        }

        let event = Event::deserialize(value)?;
        let amount = decimal_from_json(&event.amount.value)?;
        let date = Self::parse_timestamp(&event.timestamp)?;

        let mut line = StatementLine::new(LineDate::Timestamp(date), amount, event.title.as_str());
        line.id = event.id.clone();
        line.currency = Some(Currency::new(event.amount.currency.as_str()));
        line.orig_currency = Self::secondary_currency(&event, amount)?;
        line.transaction_type = Some(kind.transaction_type());
        if kind.is_investment() {
            line.investment = Some(Investment::buy());
        }

        let details = Details::from_value(event.details.as_ref());
        match kind {
            EventKind::CardTransaction | EventKind::CardRefund | EventKind::CashDividend => {}
            EventKind::PaymentInbound => Self::enrich_inbound_payment(&mut line, &details),
            EventKind::CreditCardPayment => Self::enrich_credit_card_payment(&mut line, &details),
            EventKind::InterestPayout => line.memo = "Interest Payout".to_string(),
            EventKind::SavingsPlan | EventKind::Saveback => {
                let label = if kind == EventKind::SavingsPlan {
                    "Savings Plan Execution"
                } else {
                    "Saveback Execution"
                };
                line.memo = format!("{} - {}", label, event.title);
                Self::enrich_investment(&mut line, &details)?;
            }
        }

        Ok(Some(line))
    }

    fn parse_timestamp(timestamp: &str) -> Result<DateTime<FixedOffset>> {
        let formats = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

        for format in formats {
            if let Ok(ts) = DateTime::parse_from_str(timestamp, format) {
                return Ok(ts);
            }
        }

        Err(Error::InvalidDate(timestamp.to_string()))
    }

    fn secondary_currency(event: &Event, amount: Decimal) -> Result<Option<Currency>> {
        let Some(sub) = &event.sub_amount else {
            return Ok(None);
        };
        let sub_value = decimal_from_json(&sub.value)?;
        Ok(sub_value
            .checked_div(amount)
            .map(|rate| Currency::with_rate(sub.currency.as_str(), rate)))
    }

    fn enrich_inbound_payment(line: &mut StatementLine, details: &Details) {
        let mut name = None;
        let mut iban = None;

        for section in details.sections_titled(OVERVIEW) {
            for (title, text) in section.rows() {
                match title.as_str() {
                    "Von" if !text.is_empty() => name = Some(text),
                    "IBAN" if !text.is_empty() => iban = Some(text),
                    _ => {}
                }
            }
        }

        if let Some(name) = &name {
            line.memo = name.clone();
        }
        line.payee = match (iban, name) {
            (Some(iban), Some(name)) => Some(format!("{} - {}", iban, name)),
            (None, Some(name)) => Some(name),
            (Some(iban), None) => Some(iban),
            (None, None) => None,
        };
    }

    fn enrich_credit_card_payment(line: &mut StatementLine, details: &Details) {
        line.memo = "Credit Card Payment".to_string();

        for section in details.sections_titled(OVERVIEW) {
            for (title, text) in section.rows() {
                if title == "Zahlung" {
                    line.memo.push(' ');
                    line.memo.push_str(&text);
                }
            }
        }
    }

    fn enrich_investment(line: &mut StatementLine, details: &Details) -> Result<()> {
        let mut investment = line.investment.take().unwrap_or_else(Investment::buy);

        for section in &details.sections {
            if section.is_investment_summary() {
                if let Some(payload) = section.action_payload() {
                    investment.security_id = Some(payload);
                }
            } else if section.title() == TRANSACTION {
                for (title, text) in section.rows() {
                    match title.as_str() {
                        "Anteile" | "Aktien" => investment.units = Some(parse_locale_decimal(&text)?),
                        "Anteilspreis" | "Aktienkurs" => {
                            investment.unit_price = Some(parse_locale_decimal(&text)?)
                        }
                        "Gesamt" => line.amount = -parse_locale_decimal(&text)?,
                        _ => {}
                    }
                }
            }
        }

        line.investment = Some(investment);
        Ok(())
    }
}
