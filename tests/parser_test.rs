//! Batch parser tests: row validation matrix, header preconditions and
//! ordering guarantees. Pure logic, no database required.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use transactions_service::error::AppError;
use transactions_service::models::Period;
use transactions_service::services::{CsvBatchParser, RowOutcome};

const WORKSPACE_ID: &str = "workspace-1";

const HEADER: &str = "iban,date,currency,category,amount";
const VALID_IBAN_1: &str = "PL61109010140000071219812874";
const VALID_IBAN_2: &str = "PL12109010140000071219812875";

const VALID_CURRENCY: &str = "PLN";
const CATEGORY_FOOD: &str = "FOOD";

const DATE_IN_MONTH_1: &str = "2026-01-10";
const DATE_IN_MONTH_2: &str = "2026-01-11";
const DATE_OUT_OF_MONTH: &str = "2026-02-01";

const AMOUNT_NEGATIVE: &str = "-10.50";

fn expected_month() -> Period {
    Period::new(2026, 1).unwrap()
}

fn row(iban: &str, date: &str, currency: &str, category: &str, amount: &str) -> String {
    [iban, date, currency, category, amount].join(",")
}

fn parse(csv: &str) -> Vec<RowOutcome> {
    CsvBatchParser::parse(WORKSPACE_ID, csv.as_bytes(), expected_month()).unwrap()
}

#[test]
fn parses_valid_rows_as_success() {
    let csv = [
        HEADER.to_string(),
        row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE),
        row(VALID_IBAN_2, DATE_IN_MONTH_2, VALID_CURRENCY, "RENT", "-2000.00"),
    ]
    .join("\n");

    let results = parse(&csv);
    assert_eq!(results.len(), 2);

    let first = results[0].record().expect("first row should be valid");
    assert_eq!(first.workspace_id, WORKSPACE_ID);
    assert_eq!(first.year, 2026);
    assert_eq!(first.month, 1);
    assert_eq!(first.iban, VALID_IBAN_1);
    assert_eq!(
        first.transaction_date,
        NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()
    );
    assert_eq!(first.currency, VALID_CURRENCY);
    assert_eq!(first.category, CATEGORY_FOOD);
    assert_eq!(first.amount, Decimal::from_str(AMOUNT_NEGATIVE).unwrap());
    assert!(!first.id.is_empty());

    let second = results[1].record().expect("second row should be valid");
    assert_eq!(second.iban, VALID_IBAN_2);
    assert_eq!(second.category, "RENT");
}

#[test]
fn rejects_invalid_rows_with_specific_reasons() {
    let cases = [
        (row("", DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE), "iban"),
        (row(VALID_IBAN_1, "", VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE), "date"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, "", CATEGORY_FOOD, AMOUNT_NEGATIVE), "currency"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, "", AMOUNT_NEGATIVE), "category"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, ""), "amount"),
        (row("INVALID", DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE), "IBAN"),
        (row(VALID_IBAN_1, "2026-01-XX", VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE), "date format"),
        (row(VALID_IBAN_1, DATE_OUT_OF_MONTH, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE), "month"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, "PL", CATEGORY_FOOD, AMOUNT_NEGATIVE), "currency"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, &"X".repeat(101), AMOUNT_NEGATIVE), "category"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, "not-a-number"), "amount"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, "0"), "non-zero"),
        (row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, "   ", AMOUNT_NEGATIVE), "category"),
    ];

    for (csv_row, expected_fragment) in cases {
        let csv = format!("{}\n{}", HEADER, csv_row);
        let results = parse(&csv);

        assert_eq!(results.len(), 1, "row {:?}", csv_row);
        let message = results[0]
            .message()
            .unwrap_or_else(|| panic!("row {:?} should be rejected", csv_row));
        assert!(
            message.to_lowercase().contains(&expected_fragment.to_lowercase()),
            "message {:?} should mention {:?}",
            message,
            expected_fragment
        );
        assert!(message.starts_with("Line 2"), "message {:?}", message);
    }
}

#[test]
fn mixes_valid_and_rejected_rows_in_input_order() {
    let csv = [
        HEADER.to_string(),
        row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE),
        row("INVALID", DATE_IN_MONTH_2, VALID_CURRENCY, CATEGORY_FOOD, "-20.00"),
        row(VALID_IBAN_2, DATE_IN_MONTH_2, VALID_CURRENCY, "RENT", "-2000.00"),
    ]
    .join("\n");

    let results = parse(&csv);
    assert_eq!(results.len(), 3);

    assert!(results[0].is_valid());
    assert!(!results[1].is_valid());
    assert!(results[2].is_valid());

    let message = results[1].message().unwrap();
    assert!(message.contains("Line 3"), "message {:?}", message);
    assert!(message.contains("IBAN"), "message {:?}", message);
}

#[test]
fn fails_whole_batch_when_header_is_missing_a_column() {
    let csv = format!(
        "iban,date,currency,category\n{},{},{},{}",
        VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD
    );

    let error = CsvBatchParser::parse(WORKSPACE_ID, csv.as_bytes(), expected_month()).unwrap_err();
    match error {
        AppError::BadRequest(inner) => {
            assert!(inner.to_string().contains("Missing or wrong header: amount"));
        }
        other => panic!("expected BadRequest, got {:?}", other),
    }
}

#[test]
fn header_match_is_case_sensitive() {
    let csv = format!(
        "IBAN,date,currency,category,amount\n{}",
        row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE)
    );

    let error = CsvBatchParser::parse(WORKSPACE_ID, csv.as_bytes(), expected_month()).unwrap_err();
    assert!(error.to_string().contains("iban"), "error {:?}", error);
}

#[test]
fn header_only_batch_yields_no_outcomes() {
    let results = parse(HEADER);
    assert!(results.is_empty());
}

#[test]
fn trims_whitespace_and_normalizes_case() {
    let csv = format!(
        "{}\n pl61109010140000071219812874 , {} , pln , {} , {} ",
        HEADER, DATE_IN_MONTH_1, CATEGORY_FOOD, AMOUNT_NEGATIVE
    );

    let results = parse(&csv);
    assert_eq!(results.len(), 1);

    let record = results[0].record().expect("trimmed row should be valid");
    assert_eq!(record.iban, VALID_IBAN_1);
    assert_eq!(record.currency, VALID_CURRENCY);
}

#[test]
fn short_rows_are_rejected_not_fatal() {
    let csv = format!(
        "{}\n{},{}\n{}",
        HEADER,
        VALID_IBAN_1,
        DATE_IN_MONTH_1,
        row(VALID_IBAN_2, DATE_IN_MONTH_2, VALID_CURRENCY, "RENT", "-2000.00")
    );

    let results = parse(&csv);
    assert_eq!(results.len(), 2);

    let message = results[0].message().expect("short row should be rejected");
    assert!(message.contains("missing or empty field"), "message {:?}", message);
    assert!(results[1].is_valid());
}

#[test]
fn extra_trailing_columns_are_tolerated() {
    let csv = format!(
        "{}\n{},unexpected",
        HEADER,
        row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE)
    );

    let results = parse(&csv);
    assert_eq!(results.len(), 1);
    assert!(results[0].is_valid());
}

#[test]
fn identical_input_yields_identical_outcomes() {
    let csv = [
        HEADER.to_string(),
        row(VALID_IBAN_1, DATE_IN_MONTH_1, VALID_CURRENCY, CATEGORY_FOOD, AMOUNT_NEGATIVE),
        row("INVALID", DATE_IN_MONTH_2, VALID_CURRENCY, CATEGORY_FOOD, "-20.00"),
    ]
    .join("\n");

    let first = parse(&csv);
    let second = parse(&csv);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.is_valid(), b.is_valid());
        assert_eq!(a.message(), b.message());
    }
}
