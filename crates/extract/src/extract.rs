use std::str::FromStr;
use std::sync::OnceLock;

use lexmetric_core::{Money, Transaction};
use regex::Regex;
use rust_decimal::Decimal;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Numeric `MM/DD/YY[YY]` with `/`, `-` or `.` separators, or `Jan[.] 15[,] 2024`.
re!(re_date,
    r"[0-9]{1,2}[/.\-][0-9]{1,2}[/.\-][0-9]{2,4}|[A-Za-z]{3}\.?\s+[0-9]{1,2},?\s+[0-9]{4}");
// Dollar amount: optional sign and `$`, thousands commas, exactly two decimals.
re!(re_amount,
    r"-?\$?[0-9,]+\.[0-9]{2}");

/// Lines shorter than this (in characters) are headers or noise.
const MIN_LINE_CHARS: usize = 10;

const UNKNOWN_DESCRIPTION: &str = "Unknown Transaction";

/// One page of statement text together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub source_file: String,
    pub page_number: u32,
    pub text: String,
}

impl Page {
    pub fn new(source_file: impl Into<String>, page_number: u32, text: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            page_number,
            text: text.into(),
        }
    }
}

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Turn one page of raw statement text into transactions, in line order.
    ///
    /// A line becomes a transaction only when it carries both a date and an
    /// amount; anything else is dropped without error.
    pub fn extract_page(text: &str, source_file: &str, page_number: u32) -> Vec<Transaction> {
        let transactions: Vec<Transaction> = text
            .split('\n')
            .filter(|line| line.chars().count() >= MIN_LINE_CHARS)
            .filter_map(parse_line)
            .map(|line| {
                Transaction::new(line.date, line.description, line.amount, source_file, page_number)
            })
            .collect();

        tracing::debug!(
            source_file,
            page_number,
            count = transactions.len(),
            "Extracted page"
        );
        transactions
    }

    /// Extract several pages, concatenating results in page order.
    pub fn extract_pages(pages: &[Page]) -> Vec<Transaction> {
        pages
            .iter()
            .flat_map(|p| Self::extract_page(&p.text, &p.source_file, p.page_number))
            .collect()
    }
}

// ── Line parsing ──────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
struct ParsedLine {
    date: String,
    description: String,
    amount: Money,
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    // Both searches run over the untouched line; the first hit of each wins.
    let date = re_date().find(line)?.as_str();
    let amount_text = re_amount().find(line)?.as_str();

    Some(ParsedLine {
        date: date.to_string(),
        description: clean_description(line, date, amount_text),
        amount: parse_amount_str(amount_text),
    })
}

fn clean_description(line: &str, date: &str, amount: &str) -> String {
    let stripped = line.replacen(date, "", 1).replacen(amount, "", 1);
    let trimmed =
        stripped.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '.' | ','));
    if trimmed.is_empty() {
        UNKNOWN_DESCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Amount parsing ────────────────────────────────────────────────────────────

/// Amounts beyond `Decimal` range saturate at its bounds.
fn parse_amount_str(s: &str) -> Money {
    let clean: String = s.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    // A match of only separators before the point (",.50") leaves no integer part.
    let (sign, digits) = match clean.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", clean.as_str()),
    };
    let lead = if digits.starts_with('.') { "0" } else { "" };
    let dec = match Decimal::from_str(&format!("{sign}{lead}{digits}")) {
        Ok(dec) => dec,
        Err(e) => {
            tracing::debug!(amount = s, error = %e, "Saturating out-of-range amount");
            if sign == "-" {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        }
    };
    Money::from_decimal(dec)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
