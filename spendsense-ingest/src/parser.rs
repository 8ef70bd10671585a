//! Bank-agnostic statement text parser.
//!
//! Extracted statement text arrives as loosely columnar lines. Each line is
//! inspected for a date token, a monetary amount, and a free-text
//! description; lines missing a date or an amount are dropped rather than
//! emitted as partial records. Source line order is preserved so downstream
//! sorting stays well-defined.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use spendsense_core::ParsedEntry;

/// Only structurally invalid input is an error; recognizing zero entries in
/// valid text is a normal outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("statement text is empty")]
    EmptyText,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\b(?:\d{4}-\d{2}-\d{2}",
            r"|\d{1,2}/\d{1,2}(?:/\d{2,4})?",
            r"|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2}(?:,?\s+\d{4})?",
            r")\b"
        ))
        .expect("date regex")
    })
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Either a currency-symbol amount (decimals optional) or a bare decimal
    // amount. Bare integers stay unmatched so reference numbers in
    // descriptions don't read as money.
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\(?\s*-?\s*(?:",
            r"[$€£]\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?",
            r"|(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}",
            r")\s*\)?"
        ))
        .expect("amount regex")
    })
}

fn debit_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:DEBIT|WITHDRAWAL)\b").expect("debit regex"))
}

fn credit_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:CREDIT|DEPOSIT)\b").expect("credit regex"))
}

/// Parse extracted statement text into transaction entries.
///
/// Per line, the first date-shaped token and the first monetary token after
/// it are taken; trailing balance columns are therefore ignored. An entry is
/// an expense when its amount carries a minus sign or parentheses, or when
/// the line carries a DEBIT/WITHDRAWAL column marker; otherwise it counts as
/// income/credit.
pub fn parse_statement_text(text: &str) -> Result<Vec<ParsedEntry>, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyText);
    }

    let mut entries = Vec::new();

    for line in text.lines() {
        let Some(date_m) = date_re().find(line) else {
            continue;
        };

        // First monetary token that doesn't overlap the date token.
        let Some(amount_m) = amount_re()
            .find_iter(line)
            .find(|m| m.start() >= date_m.end() || m.end() <= date_m.start())
        else {
            continue;
        };

        let amount_token = amount_m.as_str();
        let Some(value) = parse_amount(amount_token) else {
            continue;
        };

        let is_expense = if amount_token.contains('-') || amount_token.contains('(') {
            true
        } else if credit_marker_re().is_match(line) {
            false
        } else {
            debit_marker_re().is_match(line)
        };

        let description = collapse_whitespace(&strip_spans(
            line,
            &[
                (date_m.start(), date_m.end()),
                (amount_m.start(), amount_m.end()),
            ],
        ));

        entries.push(ParsedEntry::new(
            date_m.as_str().trim(),
            value,
            is_expense,
            description,
        ));
    }

    Ok(entries)
}

/// Parse a delimited statement export (`Date,Description,Amount[,Type]`).
///
/// Rows before the header line are skipped, matching how bank exports pad
/// the top of the file. Rows with a missing date or unparseable amount are
/// dropped. Without a recognizable header the export yields no entries.
pub fn parse_csv_statement(text: &str) -> Result<Vec<ParsedEntry>, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyText);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(text.as_bytes());

    let mut entries = Vec::new();
    let mut columns: Option<CsvColumns> = None;

    for record in rdr.records() {
        let Ok(record) = record else { continue };

        let Some(cols) = &columns else {
            columns = CsvColumns::from_header(&record);
            continue;
        };

        let date = record.get(cols.date).unwrap_or("").trim();
        if date.is_empty() {
            continue;
        }

        let Some(value) = parse_amount(record.get(cols.amount).unwrap_or("")) else {
            continue;
        };

        let amount_raw = record.get(cols.amount).unwrap_or("").trim();
        let type_col = cols
            .kind
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .to_ascii_lowercase();
        let is_expense = amount_raw.starts_with('-')
            || amount_raw.starts_with('(')
            || type_col.contains("debit")
            || type_col.contains("withdrawal");

        entries.push(ParsedEntry::new(
            date,
            value,
            is_expense,
            record.get(cols.description).unwrap_or("").trim(),
        ));
    }

    Ok(entries)
}

struct CsvColumns {
    date: usize,
    description: usize,
    amount: usize,
    kind: Option<usize>,
}

impl CsvColumns {
    fn from_header(record: &csv::StringRecord) -> Option<CsvColumns> {
        let mut date = None;
        let mut description = None;
        let mut amount = None;
        let mut kind = None;
        for (i, field) in record.iter().enumerate() {
            let name = field.trim().to_ascii_lowercase();
            match name.as_str() {
                "date" => date = Some(i),
                "description" | "memo" | "payee" => description = Some(i),
                "amount" => amount = Some(i),
                "type" | "transaction type" => kind = Some(i),
                _ => {}
            }
        }
        Some(CsvColumns {
            date: date?,
            description: description?,
            amount: amount?,
            kind,
        })
    }
}

/// Numeric magnitude of a monetary token; currency symbols, separators,
/// signs, and parentheses are stripped.
fn parse_amount(token: &str) -> Option<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}

fn strip_spans(line: &str, spans: &[(usize, usize)]) -> String {
    line.char_indices()
        .filter(|(i, _)| !spans.iter().any(|&(start, end)| *i >= start && *i < end))
        .map(|(_, c)| c)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_basic_rows() {
        let text = r#"
TRANSACTION DETAIL
       04/22       Discover     E-Payment 8148   Web ID: 123       -15.00      53.70
       04/23       PAYROLL ACME INC                                100.00     153.70
"#;
        let entries = parse_statement_text(text).unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].date, "04/22");
        assert_eq!(entries[0].value, 15.00);
        assert!(entries[0].is_expense);
        assert!(entries[0].description.contains("Discover"));

        assert_eq!(entries[1].value, 100.00);
        assert!(!entries[1].is_expense);
    }

    #[test]
    fn test_currency_symbols_and_thousands_separators() {
        let text = "2024-01-15  RENT JANUARY  $1,250.00\n2024-01-16  TUITION  - $4,500.00\n";
        let entries = parse_statement_text(text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, 1250.0);
        assert!(!entries[0].is_expense);
        assert_eq!(entries[1].value, 4500.0);
        assert!(entries[1].is_expense);
    }

    #[test]
    fn test_parentheses_mark_expenses() {
        let entries = parse_statement_text("01/05/2024 COFFEE SHOP (4.75)\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_expense);
        assert_eq!(entries[0].value, 4.75);
    }

    #[test]
    fn test_debit_and_credit_column_markers() {
        let text = "\
01/02/2024  GROCERY MART        23.10  DEBIT
01/03/2024  REFUND ONLINE ORDER 12.00  CREDIT
01/04/2024  ATM WITHDRAWAL      60.00
";
        let entries = parse_statement_text(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_expense);
        assert!(!entries[1].is_expense);
        assert!(entries[2].is_expense);
    }

    #[test]
    fn test_unmarked_amounts_default_to_income() {
        let entries = parse_statement_text("01/06/2024 TRANSFER IN 250.00\n").unwrap();
        assert!(!entries[0].is_expense);
    }

    #[test]
    fn test_drops_lines_without_date_or_amount() {
        let text = "\
Account summary for January
01/02/2024  OPENING NOTICE
SERVICE FEE 5.00
01/03/2024  COFFEE  -3.50
";
        let entries = parse_statement_text(text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "COFFEE");
    }

    #[test]
    fn test_preserves_source_order() {
        let text = "\
01/09/2024  LATER ROW   -1.00
01/01/2024  EARLIER ROW -2.00
";
        let entries = parse_statement_text(text).unwrap();
        assert_eq!(entries[0].description, "LATER ROW");
        assert_eq!(entries[1].description, "EARLIER ROW");
    }

    #[test]
    fn test_reference_numbers_are_not_amounts() {
        // 8148 must not read as money; the real amount is further right.
        let entries =
            parse_statement_text("04/22 E-Payment 8148 Web ID: 999 -15.00\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 15.00);
    }

    #[test]
    fn test_empty_text_is_the_only_error() {
        assert_eq!(parse_statement_text(""), Err(ParseError::EmptyText));
        assert_eq!(parse_statement_text("   \n  "), Err(ParseError::EmptyText));
        // Valid text with nothing recognizable is an empty result, not an error.
        assert_eq!(parse_statement_text("no transactions here").unwrap(), vec![]);
    }

    #[test]
    fn test_month_name_dates() {
        let entries = parse_statement_text("Jul 20  H-E-B #455 SAN MARCOS  $5.82\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, "Jul 20");
        assert_eq!(entries[0].value, 5.82);
    }

    #[test]
    fn test_csv_statement_with_type_column() {
        let text = "\
Statement export
,,
Date,Description,Amount,Type
01/02/2024,GROCERY MART,23.10,DEBIT
01/03/2024,PAYROLL,1000.00,CREDIT
bad row with no amount,,
01/04/2024,REFUND,-12.50,
";
        let entries = parse_csv_statement(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_expense);
        assert!(!entries[1].is_expense);
        // Negative amounts read as expenses even without a type.
        assert!(entries[2].is_expense);
        assert_eq!(entries[2].value, 12.50);
    }

    #[test]
    fn test_csv_without_header_yields_nothing() {
        let entries = parse_csv_statement("01/02/2024,STORE,5.00\n").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_csv_empty_is_error() {
        assert_eq!(parse_csv_statement(" "), Err(ParseError::EmptyText));
    }
}
