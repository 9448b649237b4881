//! # Invoice Numbers
//!
//! Sale invoice numbers have the form `<PFX><YYMMDD><NNN>`:
//!
//! ```text
//!   SNO 250304 002
//!   │   │      └── per-(section, day) sequence, zero-padded to 3 digits
//!   │   └───────── sale date
//!   └───────────── first 3 characters of the section name, uppercased
//! ```
//!
//! The sequence is allocated by the database inside the sale transaction;
//! this module only formats it. Past 999 the number simply grows wider.

use chrono::NaiveDate;

/// Characters of the section name used as the prefix.
pub const PREFIX_LEN: usize = 3;

/// Uppercased first three characters of a section name.
pub fn invoice_prefix(section_name: &str) -> String {
    section_name
        .chars()
        .take(PREFIX_LEN)
        .collect::<String>()
        .to_uppercase()
}

/// Formats an invoice number.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use stockbook_core::invoice::format_invoice_number;
///
/// let day = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
/// assert_eq!(format_invoice_number("Snoonu", day, 2), "SNO250304002");
/// ```
pub fn format_invoice_number(section_name: &str, sale_date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}{}{:03}",
        invoice_prefix(section_name),
        sale_date.format("%y%m%d"),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
    }

    #[test]
    fn test_short_section_names_are_not_padded() {
        assert_eq!(format_invoice_number("Rf", day(), 1), "RF251231001");
    }

    #[test]
    fn test_lowercase_name_is_uppercased() {
        assert_eq!(format_invoice_number("talabat", day(), 17), "TAL251231017");
    }

    #[test]
    fn test_sequence_past_999_widens() {
        assert_eq!(format_invoice_number("Main Store", day(), 1000), "MAI2512311000");
    }
}
