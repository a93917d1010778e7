use crate::error::AppError;
use crate::models::{Period, TransactionRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;

static IBAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{2}[A-Z0-9]{10,30}$").expect("invalid IBAN regex"));
static CURRENCY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("invalid currency regex"));

const FIELD_IBAN: &str = "iban";
const FIELD_DATE: &str = "date";
const FIELD_CURRENCY: &str = "currency";
const FIELD_CATEGORY: &str = "category";
const FIELD_AMOUNT: &str = "amount";

const MAX_CATEGORY_LENGTH: usize = 100;

/// Outcome of validating a single data row, in input order.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Valid(TransactionRecord),
    Rejected(String),
}

impl RowOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, RowOutcome::Valid(_))
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        match self {
            RowOutcome::Valid(record) => Some(record),
            RowOutcome::Rejected(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RowOutcome::Valid(_) => None,
            RowOutcome::Rejected(message) => Some(message),
        }
    }
}

/// Rejection of one row; converted to data, never propagated past the parser.
struct RowRejection(String);

type RowResult<T> = Result<T, RowRejection>;

/// Positions of the required columns within the header row.
struct Columns {
    iban: usize,
    date: usize,
    currency: usize,
    category: usize,
    amount: usize,
}

/// Streaming CSV parser for one monthly batch.
///
/// The header must contain all five required columns (case-sensitive) or the
/// whole batch fails before any row is read. Every data row then yields
/// exactly one [`RowOutcome`]; row-level problems never abort the batch.
/// Output is a pure function of the input bytes and the target period.
pub struct CsvBatchParser;

impl CsvBatchParser {
    pub fn parse<R: Read>(
        workspace_id: &str,
        input: R,
        expected: Period,
    ) -> Result<Vec<RowOutcome>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(input);

        let headers = reader
            .headers()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Unreadable CSV input: {}", e)))?
            .clone();
        let columns = Self::required_columns(&headers)?;

        let mut outcomes = Vec::new();

        // The header is line 1, so the first data row is line 2.
        for (offset, record) in reader.records().enumerate() {
            let line = offset + 2;
            let outcome = match record {
                Ok(record) => Self::parse_row(workspace_id, &record, &columns, expected, line),
                Err(_) => RowOutcome::Rejected(format!("Line {}: invalid record format", line)),
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn required_columns(headers: &csv::StringRecord) -> Result<Columns, AppError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!("Missing or wrong header: {}", name))
                })
        };

        Ok(Columns {
            iban: position(FIELD_IBAN)?,
            date: position(FIELD_DATE)?,
            currency: position(FIELD_CURRENCY)?,
            category: position(FIELD_CATEGORY)?,
            amount: position(FIELD_AMOUNT)?,
        })
    }

    fn parse_row(
        workspace_id: &str,
        record: &csv::StringRecord,
        columns: &Columns,
        expected: Period,
        line: usize,
    ) -> RowOutcome {
        match Self::validate_row(workspace_id, record, columns, expected, line) {
            Ok(record) => RowOutcome::Valid(record),
            Err(RowRejection(message)) => RowOutcome::Rejected(message),
        }
    }

    fn validate_row(
        workspace_id: &str,
        record: &csv::StringRecord,
        columns: &Columns,
        expected: Period,
        line: usize,
    ) -> RowResult<TransactionRecord> {
        let iban = Self::required_field(record, columns.iban, FIELD_IBAN, line)?.to_uppercase();
        let date = Self::parse_date(
            Self::required_field(record, columns.date, FIELD_DATE, line)?,
            line,
        )?;
        let currency =
            Self::required_field(record, columns.currency, FIELD_CURRENCY, line)?.to_uppercase();
        let category =
            Self::required_field(record, columns.category, FIELD_CATEGORY, line)?.to_string();
        let amount = Self::parse_amount(
            Self::required_field(record, columns.amount, FIELD_AMOUNT, line)?,
            line,
        )?;

        if !IBAN_PATTERN.is_match(&iban) {
            return Err(RowRejection(format!("Line {}: invalid IBAN format", line)));
        }
        if !expected.contains(date) {
            return Err(RowRejection(format!(
                "Line {}: date not in expected month: {}",
                line, expected
            )));
        }
        if !CURRENCY_PATTERN.is_match(&currency) {
            return Err(RowRejection(format!(
                "Line {}: invalid currency (expected ISO-4217, e.g. PLN)",
                line
            )));
        }
        if category.is_empty() || category.chars().count() > MAX_CATEGORY_LENGTH {
            return Err(RowRejection(format!(
                "Line {}: invalid category (must be non-empty and <= 100 characters)",
                line
            )));
        }
        if amount.is_zero() {
            return Err(RowRejection(format!(
                "Line {}: amount must be non-zero",
                line
            )));
        }

        Ok(TransactionRecord::new(
            workspace_id.to_string(),
            expected,
            iban,
            date,
            currency,
            category,
            amount,
        ))
    }

    fn required_field<'a>(
        record: &'a csv::StringRecord,
        index: usize,
        name: &str,
        line: usize,
    ) -> RowResult<&'a str> {
        let value = record.get(index).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(RowRejection(format!(
                "Line {}: missing or empty field: {}",
                line, name
            )));
        }
        Ok(value)
    }

    fn parse_date(raw: &str, line: usize) -> RowResult<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            RowRejection(format!(
                "Line {} Invalid date format: {} (expected YYYY-MM-DD)",
                line, raw
            ))
        })
    }

    fn parse_amount(raw: &str, line: usize) -> RowResult<Decimal> {
        Decimal::from_str(raw).map_err(|_| {
            RowRejection(format!(
                "Line {} Invalid amount format: {} (expected decimal number)",
                line, raw
            ))
        })
    }
}
