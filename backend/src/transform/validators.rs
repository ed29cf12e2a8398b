//! Per-field cleaning and validation.
//!
//! Every validator is a pure function from a raw (already trimmed) value to a
//! [`Cleaned`] outcome: the typed value, plus an optional [`ValidationError`]
//! and an optional [`TransformationEvent`]. Validators never see each other's
//! output and can run in any order.
//!
//! | Field           | Valid                           | Out of range / bad format      |
//! |-----------------|---------------------------------|--------------------------------|
//! | `email`         | lowercased                      | unset + error                  |
//! | `department`    | alias table, else passthrough   | never an error                 |
//! | `status`        | one of the configured statuses  | silently the default status    |
//! | `year_level`    | integer in 1..=4                | clamped + error                |
//! | `phone`         | `AAA-BBB-CCCC` / `AAA-BBBB`     | original string, no error      |
//! | `date_of_birth` | `YYYY-MM-DD`                    | unset + error                  |
//! | `gpa`           | 0.00..=4.00, 2 decimals         | unset + error (never clamped)  |

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EventAction, FieldValue, TransformationEvent, ValidationError};
use crate::rules::NormalizationRules;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("email pattern is a valid regex")
});

/// Digit layout every accepted date must have: a four-digit year, one- or
/// two-digit month and day.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[/-]\d{1,2}[/-]\d{4})$")
        .expect("date shape is a valid regex")
});

/// Whether `email` has the `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Accepted date layouts, tried in order. First successful parse wins, so an
/// ambiguous `01/02/2003` is always read month-first.
pub const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d", // 2003-05-15
    "%m/%d/%Y", // 05/15/2003
    "%m-%d-%Y", // 05-15-2003
    "%d/%m/%Y", // 15/05/2003
    "%d-%m-%Y", // 15-05-2003
];

pub const YEAR_MIN: i64 = 1;
pub const YEAR_MAX: i64 = 4;
pub const GPA_MIN: f64 = 0.0;
pub const GPA_MAX: f64 = 4.0;

/// Outcome of one validator call.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned {
    pub value: FieldValue,
    pub error: Option<ValidationError>,
    pub event: Option<TransformationEvent>,
}

impl Cleaned {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            error: None,
            event: None,
        }
    }

    fn unset() -> Self {
        Self::ok(FieldValue::Null)
    }

    fn rejected(value: FieldValue, error: ValidationError) -> Self {
        Self {
            value,
            error: Some(error),
            event: None,
        }
    }

    fn with_event(mut self, event: TransformationEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Which validator handles a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Email,
    Department,
    Status,
    YearLevel,
    Phone,
    DateOfBirth,
    Gpa,
    /// Any other field: trimmed passthrough.
    Text,
}

impl FieldKind {
    pub fn for_field(field: &str) -> Self {
        match field {
            "email" => FieldKind::Email,
            "department" => FieldKind::Department,
            "status" => FieldKind::Status,
            "year_level" => FieldKind::YearLevel,
            "phone" => FieldKind::Phone,
            "date_of_birth" => FieldKind::DateOfBirth,
            "gpa" => FieldKind::Gpa,
            _ => FieldKind::Text,
        }
    }
}

/// Run the validator for `field` on `raw`.
pub fn clean_field(field: &str, raw: &str, rules: &NormalizationRules) -> Cleaned {
    match FieldKind::for_field(field) {
        FieldKind::Email => clean_email(raw),
        FieldKind::Department => map_department(raw, rules),
        FieldKind::Status => map_status(raw, rules),
        FieldKind::YearLevel => clean_year(raw),
        FieldKind::Phone => clean_phone(raw),
        FieldKind::DateOfBirth => clean_date(raw),
        FieldKind::Gpa => clean_gpa(raw),
        FieldKind::Text => clean_text(raw),
    }
}

/// Empty, whitespace-only, or the spreadsheet NaN marker.
pub fn is_blank(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

pub fn clean_text(raw: &str) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }
    Cleaned::ok(FieldValue::Text(raw.trim().to_string()))
}

pub fn clean_email(raw: &str) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }

    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Cleaned::rejected(
            FieldValue::Null,
            ValidationError::new("email", raw, "Invalid email format"),
        );
    }

    Cleaned::ok(FieldValue::Text(email))
}

pub fn map_department(raw: &str, rules: &NormalizationRules) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }

    let dept = raw.trim();
    match rules.department_for(dept) {
        Some(mapped) if mapped != dept => Cleaned::ok(FieldValue::Text(mapped.to_string()))
            .with_event(TransformationEvent::new(
                EventAction::DepartmentNormalized,
                format!("'{}' -> '{}'", dept, mapped),
            )),
        Some(mapped) => Cleaned::ok(FieldValue::Text(mapped.to_string())),
        None => Cleaned::ok(FieldValue::Text(dept.to_string())),
    }
}

pub fn map_status(raw: &str, rules: &NormalizationRules) -> Cleaned {
    let default = || Cleaned::ok(FieldValue::Text(rules.default_status.clone()));
    if is_blank(raw) {
        return default();
    }

    let status = raw.trim().to_lowercase();
    if rules.is_known_status(&status) {
        Cleaned::ok(FieldValue::Text(status))
    } else {
        default()
    }
}

pub fn clean_year(raw: &str) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }

    // "4.0" is accepted and truncated
    let year = match raw.trim().parse::<f64>() {
        Ok(y) if y.is_finite() => y.trunc() as i64,
        _ => return Cleaned::unset(),
    };

    if (YEAR_MIN..=YEAR_MAX).contains(&year) {
        return Cleaned::ok(FieldValue::Integer(year));
    }

    Cleaned::rejected(
        FieldValue::Integer(year.clamp(YEAR_MIN, YEAR_MAX)),
        ValidationError::new(
            "year_level",
            raw,
            format!("Year {} out of range ({}-{})", year, YEAR_MIN, YEAR_MAX),
        ),
    )
}

pub fn clean_phone(raw: &str) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let formatted = match digits.len() {
        10 => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        7 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => raw.to_string(),
    };

    Cleaned::ok(FieldValue::Text(formatted))
}

pub fn clean_date(raw: &str) -> Cleaned {
    if is_blank(raw) {
        return Cleaned::unset();
    }

    let trimmed = raw.trim();
    // chrono's %Y takes signed and short years; only plain four-digit years
    // from 0001 on are dates here
    if !DATE_SHAPE.is_match(trimmed) {
        return Cleaned::rejected(
            FieldValue::Null,
            ValidationError::new("date_of_birth", raw, "Unable to parse date"),
        );
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .filter(|date| date.year() >= 1)
        .map(|date| Cleaned::ok(FieldValue::Text(date.format("%Y-%m-%d").to_string())))
        .unwrap_or_else(|| {
            Cleaned::rejected(
                FieldValue::Null,
                ValidationError::new("date_of_birth", raw, "Unable to parse date"),
            )
        })
}

pub fn clean_gpa(raw: &str) -> Cleaned {
    if is_blank(raw) || raw.trim() == "##" {
        return Cleaned::unset();
    }

    let gpa = match raw.trim().parse::<f64>() {
        Ok(g) if g.is_finite() => g,
        _ => return Cleaned::unset(),
    };

    if (GPA_MIN..=GPA_MAX).contains(&gpa) {
        return Cleaned::ok(FieldValue::Decimal(round_to_cents(gpa)));
    }

    Cleaned::rejected(
        FieldValue::Null,
        ValidationError::new(
            "gpa",
            raw,
            format!("GPA {} out of range ({}-{})", gpa, GPA_MIN, GPA_MAX),
        ),
    )
}

/// Two decimals, ties to even (`0.125` -> `0.12`).
fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> NormalizationRules {
        NormalizationRules::default()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    // Email

    #[test]
    fn test_clean_email_valid() {
        assert_eq!(clean_email("test@example.com").value, text("test@example.com"));
        assert_eq!(clean_email("  TEST@EXAMPLE.COM  ").value, text("test@example.com"));
        assert_eq!(clean_email("first.last-1@uni.edu.au").value, text("first.last-1@uni.edu.au"));
    }

    #[test]
    fn test_clean_email_invalid() {
        let cleaned = clean_email("invalid-email");
        assert!(cleaned.value.is_null());
        let err = cleaned.error.unwrap();
        assert_eq!(err.field, "email");
        assert_eq!(err.value, "invalid-email");

        assert!(clean_email("a@b").error.is_some());
        assert!(clean_email("a b@c.com").error.is_some());
    }

    #[test]
    fn test_clean_email_empty() {
        for raw in ["", "   ", "nan", "NaN"] {
            let cleaned = clean_email(raw);
            assert!(cleaned.value.is_null());
            assert!(cleaned.error.is_none());
        }
    }

    // Department

    #[test]
    fn test_map_department_variations() {
        let rules = rules();
        assert_eq!(map_department("CS", &rules).value, text("Computer Science"));
        assert_eq!(map_department("CompSci", &rules).value, text("Computer Science"));
        assert_eq!(map_department("Math", &rules).value, text("Mathematics"));
        assert_eq!(map_department("EE", &rules).value, text("Electrical Engineering"));
    }

    #[test]
    fn test_map_department_events() {
        let rules = rules();
        let event = map_department("cs", &rules).event.unwrap();
        assert_eq!(event.action, EventAction::DepartmentNormalized);
        assert!(event.detail.contains("Computer Science"));

        // Already canonical: no event
        let cleaned = map_department("Mathematics", &rules);
        assert_eq!(cleaned.value, text("Mathematics"));
        assert!(cleaned.event.is_none());
    }

    #[test]
    fn test_map_department_unknown_and_empty() {
        let rules = rules();
        let unknown = map_department("Unknown Dept", &rules);
        assert_eq!(unknown.value, text("Unknown Dept"));
        assert!(unknown.error.is_none());
        assert!(unknown.event.is_none());

        assert!(map_department("", &rules).value.is_null());
        assert!(map_department("nan", &rules).value.is_null());
    }

    // Status

    #[test]
    fn test_map_status_variations() {
        let rules = rules();
        assert_eq!(map_status("Active", &rules).value, text("active"));
        assert_eq!(map_status("ACTIVE", &rules).value, text("active"));
        assert_eq!(map_status("inactive", &rules).value, text("inactive"));
        assert_eq!(map_status(" GRADUATED ", &rules).value, text("graduated"));
    }

    #[test]
    fn test_map_status_default() {
        let rules = rules();
        for raw in ["", "nan", "invalid", "on leave"] {
            let cleaned = map_status(raw, &rules);
            assert_eq!(cleaned.value, text("active"));
            assert!(cleaned.error.is_none());
        }
    }

    // Year level

    #[test]
    fn test_clean_year_valid() {
        assert_eq!(clean_year("1").value, FieldValue::Integer(1));
        assert_eq!(clean_year("3").value, FieldValue::Integer(3));
        assert_eq!(clean_year("4.0").value, FieldValue::Integer(4));
        assert!(clean_year("2").error.is_none());
    }

    #[test]
    fn test_clean_year_out_of_range_clamps() {
        let high = clean_year("5");
        assert_eq!(high.value, FieldValue::Integer(4));
        let err = high.error.unwrap();
        assert_eq!(err.field, "year_level");
        assert_eq!(err.error, "Year 5 out of range (1-4)");

        let low = clean_year("0");
        assert_eq!(low.value, FieldValue::Integer(1));
        assert!(low.error.is_some());

        assert_eq!(clean_year("-3").value, FieldValue::Integer(1));
    }

    #[test]
    fn test_clean_year_invalid() {
        for raw in ["", "abc", "nan", "inf"] {
            let cleaned = clean_year(raw);
            assert!(cleaned.value.is_null());
            assert!(cleaned.error.is_none());
        }
    }

    // Phone

    #[test]
    fn test_clean_phone_10_digits() {
        assert_eq!(clean_phone("5550101234").value, text("555-010-1234"));
        assert_eq!(clean_phone("(555) 010-1234").value, text("555-010-1234"));
        assert_eq!(clean_phone("555.010.1234").value, text("555-010-1234"));
    }

    #[test]
    fn test_clean_phone_7_digits() {
        assert_eq!(clean_phone("0101234").value, text("010-1234"));
        assert_eq!(clean_phone("555 0101").value, text("555-0101"));
    }

    #[test]
    fn test_clean_phone_other_lengths_untouched() {
        let cleaned = clean_phone("12345");
        assert_eq!(cleaned.value, text("12345"));
        assert!(cleaned.error.is_none());

        assert_eq!(clean_phone("+1 (555) 010-1234").value, text("+1 (555) 010-1234"));
        assert!(clean_phone("").value.is_null());
    }

    // Date of birth

    #[test]
    fn test_clean_date_various_formats() {
        assert_eq!(clean_date("2003-05-15").value, text("2003-05-15"));
        assert_eq!(clean_date("05/15/2003").value, text("2003-05-15"));
        assert_eq!(clean_date("05-15-2003").value, text("2003-05-15"));
        assert_eq!(clean_date("15/05/2003").value, text("2003-05-15"));
        assert_eq!(clean_date("15-05-2003").value, text("2003-05-15"));
    }

    #[test]
    fn test_clean_date_ambiguous_reads_month_first() {
        assert_eq!(clean_date("01/02/2003").value, text("2003-01-02"));
    }

    #[test]
    fn test_clean_date_invalid() {
        let cleaned = clean_date("invalid");
        assert!(cleaned.value.is_null());
        assert_eq!(cleaned.error.unwrap().error, "Unable to parse date");

        assert!(clean_date("2003-02-30").error.is_some());
        assert!(clean_date("").error.is_none());
    }

    #[test]
    fn test_clean_date_requires_four_digit_year() {
        for raw in ["+12345-01-01", "-0001-01-01", "05/15/03", "15/05/99", "0000-01-01", "12003-05-15"] {
            let cleaned = clean_date(raw);
            assert!(cleaned.value.is_null(), "{raw} should not parse");
            assert_eq!(cleaned.error.unwrap().error, "Unable to parse date");
        }
    }

    #[test]
    fn test_clean_date_output_is_canonical() {
        let canonical = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
        let inputs = [
            "2000-02-29", "2001-02-29", "2003-5-7", "5/7/2003", "29-02-2004", "0001-01-01",
            "9999-12-31", "2003/05/15", " 2003-05-15 ", "2003-05-15T00:00", "1e3", "31/31/2003",
        ];

        for raw in inputs {
            let cleaned = clean_date(raw);
            match &cleaned.value {
                FieldValue::Text(date) => {
                    assert!(canonical.is_match(date), "{raw} -> {date}");
                    assert!(cleaned.error.is_none());
                }
                FieldValue::Null => assert!(cleaned.error.is_some(), "{raw} dropped silently"),
                other => panic!("{raw} -> unexpected {other:?}"),
            }
        }

        assert_eq!(clean_date("2000-02-29").value, text("2000-02-29"));
        assert!(clean_date("2001-02-29").value.is_null());
        assert_eq!(clean_date("5/7/2003").value, text("2003-05-07"));
    }

    // GPA

    #[test]
    fn test_clean_gpa_valid() {
        assert_eq!(clean_gpa("3.85").value, FieldValue::Decimal(3.85));
        assert_eq!(clean_gpa("3.849").value, FieldValue::Decimal(3.85));
        assert_eq!(clean_gpa("4.0").value, FieldValue::Decimal(4.0));
        assert_eq!(clean_gpa("0").value, FieldValue::Decimal(0.0));
    }

    #[test]
    fn test_clean_gpa_out_of_range_rejected() {
        let high = clean_gpa("4.5");
        assert!(high.value.is_null());
        assert_eq!(high.error.unwrap().error, "GPA 4.5 out of range (0-4)");

        let low = clean_gpa("-1");
        assert!(low.value.is_null());
        assert!(low.error.is_some());
    }

    #[test]
    fn test_clean_gpa_invalid() {
        for raw in ["##", "", "nan", "abc"] {
            let cleaned = clean_gpa(raw);
            assert!(cleaned.value.is_null());
            assert!(cleaned.error.is_none());
        }
    }

    // Dispatch

    #[test]
    fn test_clean_gpa_rounds_ties_to_even() {
        assert_eq!(clean_gpa("0.125").value, FieldValue::Decimal(0.12));
        assert_eq!(clean_gpa("0.375").value, FieldValue::Decimal(0.38));
    }

    #[test]
    fn test_numeric_outputs_stay_in_range() {
        let inputs = [
            "1e3", "-1e3", "1e30", "-0", "0.0001", "3.999", "4.0000001", "2.5", "007", "inf",
            "-inf", "NaN", "0x10", "1_000", "+3", " 2 ",
        ];

        for raw in inputs {
            match clean_year(raw).value {
                FieldValue::Integer(y) => assert!((YEAR_MIN..=YEAR_MAX).contains(&y), "year {raw} -> {y}"),
                FieldValue::Null => {}
                other => panic!("year {raw} -> unexpected {other:?}"),
            }

            let gpa = clean_gpa(raw);
            match gpa.value {
                FieldValue::Decimal(g) => {
                    assert!((GPA_MIN..=GPA_MAX).contains(&g), "gpa {raw} -> {g}");
                    assert_eq!(g, (g * 100.0).round() / 100.0, "gpa {raw} has more than 2 decimals");
                }
                FieldValue::Null => {}
                other => panic!("gpa {raw} -> unexpected {other:?}"),
            }
        }

        assert_eq!(clean_year("1e3").value, FieldValue::Integer(YEAR_MAX));
        assert!(clean_year("1e3").error.is_some());
        assert!(clean_gpa("1e3").error.is_some());
        assert!(clean_gpa("4.0000001").value.is_null());
    }

    #[test]
    fn test_phone_output_shapes() {
        let formatted = Regex::new(r"^([0-9]{3}-[0-9]{3}-[0-9]{4}|[0-9]{3}-[0-9]{4})$").unwrap();
        let inputs = [
            "5550101", "555.010.1234", "(555)0101234", "+1 555 010 1234", "555-01", "ext. 12",
            "1234567890123", "٥٥٥٠١٠١",
        ];

        for raw in inputs {
            let cleaned = clean_phone(raw);
            assert!(cleaned.error.is_none());
            match cleaned.value {
                FieldValue::Text(p) => assert!(formatted.is_match(&p) || p == raw, "{raw} -> {p}"),
                other => panic!("phone {raw} -> unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_clean_field_dispatch() {
        let rules = rules();
        assert_eq!(FieldKind::for_field("gpa"), FieldKind::Gpa);
        assert_eq!(FieldKind::for_field("first_name"), FieldKind::Text);
        assert_eq!(clean_field("first_name", " Jane ", &rules).value, text("Jane"));
        assert!(clean_field("last_name", "", &rules).value.is_null());
        assert_eq!(clean_field("year_level", "2", &rules).value, FieldValue::Integer(2));
    }
}
