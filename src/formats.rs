//! Value-format checks: language tags, dates, durations.
//!
//! These are acceptance checks, not parsers for downstream consumption;
//! the single exception is [`parse_duration_seconds`], whose result feeds
//! the audiobook duration-sum comparison.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

// BCP-47 well-formedness, anchored. Extension subtags are deliberately not
// accepted: tags of the form "xxx-a-yyy" are rejected rather than treated as
// singleton extensions.
const LANGUAGE_TAG_PATTERN: &str = r"(?i)^(?:(?:en-GB-oed|i-ami|i-bnn|i-default|i-enochian|i-hak|i-klingon|i-lux|i-mingo|i-navajo|i-pwn|i-tao|i-tay|i-tsu|sgn-BE-FR|sgn-BE-NL|sgn-CH-DE)|(?:art-lojban|cel-gaulish|no-bok|no-nyn|zh-guoyu|zh-hakka|zh-min|zh-min-nan|zh-xiang))$|^(?:[a-z]{2,3}(?:-[a-z]{3}){0,3}|[a-z]{4}|[a-z]{5,8})(?:-[a-z]{4})?(?:-(?:[a-z]{2}|[0-9]{3}))?(?:-(?:[0-9a-z]{5,8}|[0-9][0-9a-z]{3}))*(?:-x(?:-[0-9a-z]{1,8})+)?$|^x(?:-[0-9a-z]{1,8})+$";

/// Whether `tag` is a well-formed BCP-47 language tag.
pub fn is_valid_language_tag(tag: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(LANGUAGE_TAG_PATTERN).expect("language tag pattern")
    });
    pattern.is_match(tag)
}

/// Whether `value` is an ISO-8601 date or date-time.
///
/// Accepts reduced-precision dates (`2021`, `2021-03`), calendar dates, and
/// date-times with or without an offset.
pub fn is_valid_date(value: &str) -> bool {
    // chrono's %Y would happily parse a two-digit year
    let four_digit_year = value.len() >= 4 && value.bytes().take(4).all(|b| b.is_ascii_digit());
    if !four_digit_year {
        return false;
    }
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || is_reduced_precision_date(value)
}

fn is_reduced_precision_date(value: &str) -> bool {
    let mut parts = value.splitn(2, '-');
    let year = parts.next().unwrap_or_default();
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(month) => {
            month.len() == 2
                && month
                    .parse::<u32>()
                    .map(|m| (1..=12).contains(&m))
                    .unwrap_or(false)
        }
    }
}

/// Whether `value` is a usable ISO-8601 duration: it parses and its
/// magnitude is nonzero.
pub fn is_valid_duration(value: &str) -> bool {
    matches!(parse_duration_seconds(value), Some(seconds) if seconds != 0.0)
}

/// Parse an ISO-8601 duration into seconds.
///
/// Calendar components use the 365-day-year and 30-day-month conventions.
pub fn parse_duration_seconds(value: &str) -> Option<f64> {
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, value.strip_prefix('+').unwrap_or(value)),
    };
    let rest = rest.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    if matches!(time_part, Some("")) {
        return None;
    }

    let mut any_component = false;
    let mut seconds = parse_components(
        date_part,
        &[
            ('Y', 31_536_000.0),
            ('M', 2_592_000.0),
            ('W', 604_800.0),
            ('D', 86_400.0),
        ],
        &mut any_component,
    )?;
    if let Some(time) = time_part {
        seconds += parse_components(
            time,
            &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)],
            &mut any_component,
        )?;
    }
    if !any_component {
        return None;
    }
    Some(sign * seconds)
}

// Components must appear in designator order, each as a number followed by
// its unit letter; decimal commas are accepted alongside decimal points.
fn parse_components(part: &str, units: &[(char, f64)], any_component: &mut bool) -> Option<f64> {
    let mut total = 0.0;
    let mut number = String::new();
    let mut next_unit = 0;
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            number.push(if c == ',' { '.' } else { c });
        } else {
            if number.is_empty() {
                return None;
            }
            let position = units
                .iter()
                .skip(next_unit)
                .position(|(unit, _)| *unit == c)?
                + next_unit;
            let magnitude: f64 = number.parse().ok()?;
            total += magnitude * units[position].1;
            next_unit = position + 1;
            number.clear();
            *any_component = true;
        }
    }
    if !number.is_empty() {
        // trailing digits without a unit designator
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_language_tags() {
        for tag in ["en", "en-GB", "fr-CA", "zh-Hans-CN", "de-DE-1996", "i-klingon", "x-private"] {
            assert!(is_valid_language_tag(tag), "expected valid: {tag}");
        }
    }

    #[test]
    fn rejects_malformed_language_tags() {
        for tag in ["", "a", "123", "not-a-tag", "en--US", "en-"] {
            assert!(!is_valid_language_tag(tag), "expected invalid: {tag}");
        }
    }

    #[test]
    fn accepts_iso_dates() {
        for value in [
            "2021",
            "2021-03",
            "2021-03-04",
            "2021-03-04T12:30",
            "2021-03-04T12:30:01",
            "2021-03-04T12:30:01.5",
            "2021-03-04T12:30:01Z",
            "2021-03-04T12:30:01+02:00",
        ] {
            assert!(is_valid_date(value), "expected valid: {value}");
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        for value in ["", "21-03-04", "2021-13", "2021-03-40", "yesterday"] {
            assert!(!is_valid_date(value), "expected invalid: {value}");
        }
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_seconds("PT4S"), Some(4.0));
        assert_eq!(parse_duration_seconds("PT1H30M"), Some(5400.0));
        assert_eq!(parse_duration_seconds("P1DT12H"), Some(129_600.0));
        assert_eq!(parse_duration_seconds("P2W"), Some(1_209_600.0));
        assert_eq!(parse_duration_seconds("PT1.5S"), Some(1.5));
        assert_eq!(parse_duration_seconds("-PT4S"), Some(-4.0));
    }

    #[test]
    fn duration_validity_requires_nonzero_parse() {
        assert!(is_valid_duration("PT4S"));
        assert!(is_valid_duration("PT90M"));
        assert!(!is_valid_duration("PT0S"));
        assert!(!is_valid_duration("4S"));
        assert!(!is_valid_duration("P"));
        assert!(!is_valid_duration("PT"));
        assert!(!is_valid_duration("PTS"));
        assert!(!is_valid_duration("chapter one"));
    }
}
