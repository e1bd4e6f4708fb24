//! Normalized statement model shared by the CSV and JSON converters.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Closed set of transaction categories understood by accounting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Generic credit.
    Credit,
    /// Generic debit.
    Debit,
    /// Interest earned or paid.
    Int,
    /// Dividend.
    Div,
    /// Bank fee.
    Fee,
    /// Service charge.
    SrvChg,
    /// Deposit.
    Dep,
    /// ATM withdrawal or deposit.
    Atm,
    /// Point of sale (card payment).
    Pos,
    /// Transfer.
    Xfer,
    /// Cheque.
    Check,
    /// Electronic payment.
    Payment,
    /// Cash withdrawal.
    Cash,
    /// Direct deposit.
    DirectDep,
    /// Merchant initiated debit.
    DirectDebit,
    /// Repeating payment or standing order.
    RepeatPmt,
    /// Anything else.
    Other,
    /// Purchase of a security.
    BuyStock,
}

impl TransactionType {
    /// OFX spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Int => "INT",
            TransactionType::Div => "DIV",
            TransactionType::Fee => "FEE",
            TransactionType::SrvChg => "SRVCHG",
            TransactionType::Dep => "DEP",
            TransactionType::Atm => "ATM",
            TransactionType::Pos => "POS",
            TransactionType::Xfer => "XFER",
            TransactionType::Check => "CHECK",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Cash => "CASH",
            TransactionType::DirectDep => "DIRECTDEP",
            TransactionType::DirectDebit => "DIRECTDEBIT",
            TransactionType::RepeatPmt => "REPEATPMT",
            TransactionType::Other => "OTHER",
            TransactionType::BuyStock => "BUYSTOCK",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREDIT" => Ok(TransactionType::Credit),
            "DEBIT" => Ok(TransactionType::Debit),
            "INT" => Ok(TransactionType::Int),
            "DIV" => Ok(TransactionType::Div),
            "FEE" => Ok(TransactionType::Fee),
            "SRVCHG" => Ok(TransactionType::SrvChg),
            "DEP" => Ok(TransactionType::Dep),
            "ATM" => Ok(TransactionType::Atm),
            "POS" => Ok(TransactionType::Pos),
            "XFER" => Ok(TransactionType::Xfer),
            "CHECK" => Ok(TransactionType::Check),
            "PAYMENT" => Ok(TransactionType::Payment),
            "CASH" => Ok(TransactionType::Cash),
            "DIRECTDEP" => Ok(TransactionType::DirectDep),
            "DIRECTDEBIT" => Ok(TransactionType::DirectDebit),
            "REPEATPMT" => Ok(TransactionType::RepeatPmt),
            "OTHER" => Ok(TransactionType::Other),
            "BUYSTOCK" => Ok(TransactionType::BuyStock),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Detailed action of an investment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvestmentAction {
    /// Buying units.
    Buy,
    /// Selling units.
    Sell,
}

/// Currency of an amount, with an optional exchange rate relative to the line currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code.
    pub symbol: String,
    /// Units of this currency per unit of the line currency.
    pub rate: Option<Decimal>,
}

impl Currency {
    /// Currency without a rate.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            rate: None,
        }
    }

    /// Currency carrying an exchange rate.
    pub fn with_rate(symbol: impl Into<String>, rate: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            rate: Some(rate),
        }
    }
}

/// When a line was booked.
///
/// CSV rows only know the calendar day, JSON events carry a full timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineDate {
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
}

impl LineDate {
    /// Calendar day in the timestamp's own offset.
    pub fn calendar_date(&self) -> NaiveDate {
        match self {
            LineDate::Date(date) => *date,
            LineDate::Timestamp(ts) => ts.date_naive(),
        }
    }
}

impl fmt::Display for LineDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            LineDate::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%dT%H:%M:%S%.6f%:z")),
        }
    }
}

/// Security details of an investment line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    /// Buy or sell.
    pub action: InvestmentAction,

    /// Instrument identifier (ISIN).
    pub security_id: Option<String>,

    /// Number of units, signed.
    pub units: Option<Decimal>,

    /// Price per unit.
    pub unit_price: Option<Decimal>,
}

impl Investment {
    /// Empty buy, filled in while walking event details.
    pub fn buy() -> Self {
        Self {
            action: InvestmentAction::Buy,
            security_id: None,
            units: None,
            unit_price: None,
        }
    }
}

/// One financial event within a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Unique transaction identifier.
    pub id: String,

    /// Booking date.
    pub date: LineDate,

    /// Signed amount.
    pub amount: Decimal,

    /// Line currency, when the source states one.
    pub currency: Option<Currency>,

    /// Secondary currency of the original amount.
    ///
    /// The symbol is the currency the original amount was charged in
    /// (`subAmount.currency` for events), not the line currency, and the rate
    /// is original amount per line amount.
    pub orig_currency: Option<Currency>,

    /// Free text description.
    pub memo: String,

    /// Counterparty as `"<IBAN> - <name>"`, `"<name>"` or `"<IBAN>"`.
    pub payee: Option<String>,

    /// Category, `None` when the source record is not classified.
    pub transaction_type: Option<TransactionType>,

    /// Present on investment lines only.
    pub investment: Option<Investment>,
}

impl StatementLine {
    /// Create a plain line with no identifier yet.
    pub fn new(date: LineDate, amount: Decimal, memo: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            date,
            amount,
            currency: None,
            orig_currency: None,
            memo: memo.into(),
            payee: None,
            transaction_type: None,
            investment: None,
        }
    }

    /// Structural self-check performed before a line joins a statement.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("missing transaction id"));
        }

        if let Some(investment) = &self.investment {
            if investment.action == InvestmentAction::Buy
                && self.transaction_type != Some(TransactionType::BuyStock)
            {
                return Err(self.invalid("investment buy must be typed BUYSTOCK"));
            }
            if investment.security_id.as_deref().map_or(true, str::is_empty) {
                return Err(self.invalid("investment line without security id"));
            }
            if investment.units.is_none() {
                return Err(self.invalid("investment line without units"));
            }
            if investment.unit_price.is_none() {
                return Err(self.invalid("investment line without unit price"));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidLine {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Derive a stable identifier for a line that has none.
///
/// The hash covers date, memo and amount only. Two genuinely distinct
/// transactions sharing all three get the same id.
pub fn generate_transaction_id(line: &StatementLine) -> String {
    let mut hasher = Sha256::new();
    hasher.update(line.date.to_string().as_bytes());
    hasher.update(line.memo.as_bytes());
    hasher.update(line.amount.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Complete normalized representation of one imported export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Bank identification.
    pub bank_id: Option<String>,

    /// Account identification.
    pub account_id: Option<String>,

    /// Account currency code.
    pub currency: Option<String>,

    /// Balance before the first line.
    pub start_balance: Option<Decimal>,

    /// Balance after the last line.
    pub end_balance: Option<Decimal>,

    /// First booking day covered.
    pub start_date: Option<NaiveDate>,

    /// Day after the last booking day covered.
    pub end_date: Option<NaiveDate>,

    /// Lines in chronological order.
    pub lines: Vec<StatementLine>,
}

impl Statement {
    /// Create an empty statement.
    pub fn new() -> Self {
        Self {
            bank_id: None,
            account_id: None,
            currency: None,
            start_balance: None,
            end_balance: None,
            start_date: None,
            end_date: None,
            lines: Vec::new(),
        }
    }

    /// Sum of all line amounts.
    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }

    /// Check every line and the balance arithmetic.
    pub fn validate(&self) -> Result<()> {
        for line in &self.lines {
            line.validate()?;
        }

        if let Some(end) = self.end_balance {
            let start = self.start_balance.unwrap_or(Decimal::ZERO);
            let expected = start + self.total_amount();
            if end != expected {
                return Err(Error::InvalidLine {
                    id: "<statement>".to_string(),
                    reason: format!("end balance {} does not match {}", end, expected),
                });
            }
        }

        Ok(())
    }
}

impl Default for Statement {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill in balances and the covered period once all lines are in place.
pub fn recalculate_balance(statement: &mut Statement) {
    let start = statement.start_balance.unwrap_or(Decimal::ZERO);
    statement.start_balance = Some(start);
    statement.end_balance = Some(start + statement.total_amount());

    let dates = statement.lines.iter().map(|line| line.date.calendar_date());
    statement.start_date = dates.clone().min();
    statement.end_date = dates.max().map(|last| last + Duration::days(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(day: u32, amount: &str, memo: &str) -> StatementLine {
        let date = LineDate::Date(NaiveDate::from_ymd_opt(2025, 1, day).unwrap());
        StatementLine::new(date, Decimal::from_str(amount).unwrap(), memo)
    }

    #[test]
    fn test_transaction_type_from_str() {
        assert_eq!("pos".parse::<TransactionType>().unwrap(), TransactionType::Pos);
        assert_eq!("BUYSTOCK".parse::<TransactionType>().unwrap(), TransactionType::BuyStock);
        assert_eq!(TransactionType::Xfer.to_string(), "XFER");
        assert!("WIRE".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_generate_transaction_id_is_stable() {
        let a = line(20, "-7.01", "Some Shop");
        let b = line(20, "-7.01", "Some Shop");
        let c = line(20, "-7.02", "Some Shop");

        assert_eq!(generate_transaction_id(&a), generate_transaction_id(&b));
        assert_ne!(generate_transaction_id(&a), generate_transaction_id(&c));
        assert_eq!(generate_transaction_id(&a).len(), 64);
    }

    #[test]
    fn test_recalculate_balance() {
        let mut statement = Statement::new();
        statement.lines.push(line(21, "100.00", "in"));
        statement.lines.push(line(20, "-7.01", "out"));

        recalculate_balance(&mut statement);

        assert_eq!(statement.start_balance, Some(Decimal::ZERO));
        assert_eq!(statement.end_balance, Some(Decimal::from_str("92.99").unwrap()));
        assert_eq!(statement.start_date, NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(statement.end_date, NaiveDate::from_ymd_opt(2025, 1, 22));
    }

    #[test]
    fn test_recalculate_balance_empty() {
        let mut statement = Statement::new();
        recalculate_balance(&mut statement);

        assert_eq!(statement.end_balance, Some(Decimal::ZERO));
        assert_eq!(statement.start_date, None);
        assert_eq!(statement.end_date, None);
    }

    #[test]
    fn test_validate_requires_id() {
        let mut l = line(20, "1", "x");
        assert!(matches!(l.validate(), Err(Error::InvalidLine { .. })));

        l.id = generate_transaction_id(&l);
        assert!(l.validate().is_ok());
    }

    #[test]
    fn test_validate_investment_line() {
        let mut l = line(20, "-25", "Savings Plan Execution");
        l.id = "abc".into();
        l.transaction_type = Some(TransactionType::BuyStock);
        l.investment = Some(Investment::buy());
        assert!(l.validate().is_err());

        l.investment = Some(Investment {
            action: InvestmentAction::Buy,
            security_id: Some("IE0000000000".into()),
            units: Some(Decimal::from_str("0.5").unwrap()),
            unit_price: Some(Decimal::from(50)),
        });
        assert!(l.validate().is_ok());

        l.transaction_type = Some(TransactionType::Debit);
        assert!(l.validate().is_err());
    }

    #[test]
    fn test_statement_validate_balance_mismatch() {
        let mut statement = Statement::new();
        let mut l = line(20, "5", "x");
        l.id = "1".into();
        statement.lines.push(l);
        recalculate_balance(&mut statement);
        assert!(statement.validate().is_ok());

        statement.end_balance = Some(Decimal::from(6));
        assert!(statement.validate().is_err());
    }
}
