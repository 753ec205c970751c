//! Named date formats and the parser used by conditional date rules.
//!
//! Dates are parsed into a [`NaiveDateTime`] so that values and rule bounds
//! compare with ordinary ordering. The separator is detected per string
//! (`-`, `/` or `.`), never assumed.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use smallvec::SmallVec;

use crate::error::{DateParseError, FormError, FormResult};

/// Two-digit years below this value belong to the 2000s, the rest to the 1900s.
pub const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

const TIME_SUFFIX: &str = r"( ([01]\d|2[0-3]):[0-5]\d:[0-5]\d)?";

/// A named date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateFormat {
    /// `yyyy-mm-dd [hh:mm:ss]`
    Iso,
    /// `mm/dd/yy`
    UsShort,
    /// `mm/dd/yyyy [hh:mm:ss]`
    UsLong,
    /// `dd/mm/yy`
    EuroShort,
    /// `dd/mm/yyyy [hh:mm:ss]`
    EuroLong,
}

impl DateFormat {
    /// Every format, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Iso,
        Self::UsShort,
        Self::UsLong,
        Self::EuroShort,
        Self::EuroLong,
    ];

    /// Resolves a format name, accepting the legacy aliases (`US`, `UK`,
    /// `EURO`, `EUROPE`, dash or underscore spellings).
    pub fn from_name(name: &str) -> FormResult<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ISO" => Ok(Self::Iso),
            "US" | "US_SHORT" | "US-SHORT" => Ok(Self::UsShort),
            "US_LONG" | "US-LONG" => Ok(Self::UsLong),
            "UK" | "EURO" | "EUROPE" | "EURO_SHORT" | "EURO-SHORT" => Ok(Self::EuroShort),
            "EURO_LONG" | "EURO-LONG" => Ok(Self::EuroLong),
            _ => Err(FormError::InvalidDateFormat {
                format: name.to_owned(),
            }),
        }
    }

    /// Like [`from_name`](Self::from_name), but when `lenient` is set an
    /// unknown name falls back to [`DateFormat::Iso`] instead of failing.
    pub fn resolve(name: &str, lenient: bool) -> FormResult<Self> {
        match Self::from_name(name) {
            Err(FormError::InvalidDateFormat { format }) if lenient => {
                tracing::warn!(format = %format, "unknown date format, falling back to ISO");
                Ok(Self::Iso)
            }
            other => other,
        }
    }

    /// Lower-case suffix used in rule names (`date_euro_long`).
    #[must_use]
    pub fn rule_suffix(self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::UsShort => "us_short",
            Self::UsLong => "us_long",
            Self::EuroShort => "euro_short",
            Self::EuroLong => "euro_long",
        }
    }

    /// Canonical upper-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Iso => "ISO",
            Self::UsShort => "US_SHORT",
            Self::UsLong => "US_LONG",
            Self::EuroShort => "EURO_SHORT",
            Self::EuroLong => "EURO_LONG",
        }
    }

    /// Whether a trailing `hh:mm:ss` is read.
    #[must_use]
    pub fn parses_time(self) -> bool {
        matches!(self, Self::Iso | Self::UsLong | Self::EuroLong)
    }

    /// Regex source that a well-formed value must match before it is parsed.
    #[must_use]
    pub fn pattern(self) -> String {
        const DAY: &str = "(0[1-9]|[12][0-9]|3[01])";
        const MONTH: &str = "(0[1-9]|1[012])";
        const SEP: &str = "[-/.]";
        const YEAR4: &str = r"(19|20)\d\d";
        const YEAR2: &str = r"\d\d";

        match self {
            Self::Iso => format!("^{YEAR4}{SEP}{MONTH}{SEP}{DAY}{TIME_SUFFIX}$"),
            Self::UsShort => format!("^{MONTH}{SEP}{DAY}{SEP}{YEAR2}$"),
            Self::UsLong => format!("^{MONTH}{SEP}{DAY}{SEP}{YEAR4}{TIME_SUFFIX}$"),
            Self::EuroShort => format!("^{DAY}{SEP}{MONTH}{SEP}{YEAR2}$"),
            Self::EuroLong => format!("^{DAY}{SEP}{MONTH}{SEP}{YEAR4}{TIME_SUFFIX}$"),
        }
    }

    /// Length of the date portion and index of the separator inside it.
    fn layout(self) -> (usize, usize) {
        match self {
            Self::Iso => (10, 4),
            Self::UsLong | Self::EuroLong => (10, 2),
            Self::UsShort | Self::EuroShort => (8, 2),
        }
    }

    /// Parses `input` under this format.
    pub fn parse(self, input: &str) -> Result<NaiveDateTime, DateParseError> {
        let input = input.trim();
        let (date_len, separator_at) = self.layout();
        let date_part = char_prefix(input, date_len);

        // Anything that is not a known separator splits on '-', which then
        // usually fails as malformed.
        let separator = match date_part.chars().nth(separator_at) {
            Some(c @ ('-' | '/' | '.')) => c,
            _ => '-',
        };

        let parts: SmallVec<[&str; 3]> = date_part.split(separator).collect();
        let [first, second, third] = parts.as_slice() else {
            return Err(DateParseError::Malformed {
                input: input.to_owned(),
            });
        };
        let first = component(input, first)?;
        let second = component(input, second)?;
        let third = component(input, third)?;

        let (year, month, day) = match self {
            Self::Iso => (first, second, third),
            Self::UsShort => (expand_two_digit_year(third), first, second),
            Self::UsLong => (third, first, second),
            Self::EuroShort => (expand_two_digit_year(third), second, first),
            Self::EuroLong => (third, second, first),
        };

        let (hour, minute, second) = if self.parses_time() {
            parse_time(input, &input[date_part.len()..])?
        } else {
            (0, 0, 0)
        };

        let out_of_range = || DateParseError::OutOfRange {
            input: input.to_owned(),
        };
        let month = u32::try_from(month).map_err(|_| out_of_range())?;
        let day = u32::try_from(day).map_err(|_| out_of_range())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(out_of_range)
    }
}

impl FromStr for DateFormat {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses `input` under the format called `format`.
///
/// See [`DateFormat::resolve`] for the meaning of `lenient`.
pub fn parse_date(input: &str, format: &str, lenient: bool) -> FormResult<NaiveDateTime> {
    let format = DateFormat::resolve(format, lenient)?;
    format
        .parse(input)
        .map_err(|source| FormError::InvalidDate {
            format: format.name(),
            source,
        })
}

/// Maps a two-digit year onto a century around [`TWO_DIGIT_YEAR_PIVOT`].
#[must_use]
pub fn expand_two_digit_year(year: i32) -> i32 {
    if year < TWO_DIGIT_YEAR_PIVOT {
        2000 + year
    } else {
        1900 + year
    }
}

fn char_prefix(input: &str, chars: usize) -> &str {
    input
        .char_indices()
        .nth(chars)
        .map_or(input, |(idx, _)| &input[..idx])
}

fn component(input: &str, raw: &str) -> Result<i32, DateParseError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DateParseError::NotANumber {
            input: input.to_owned(),
            component: raw.to_owned(),
        })
}

/// Reads `hh:mm:ss` after the date. A suffix that is not exactly three
/// components means midnight.
fn parse_time(input: &str, rest: &str) -> Result<(u32, u32, u32), DateParseError> {
    let rest = rest.trim_start_matches([' ', 'T']);
    let parts: SmallVec<[&str; 3]> = rest.split(':').collect();
    let [hour, minute, second] = parts.as_slice() else {
        return Ok((0, 0, 0));
    };

    let number = |raw: &str| {
        raw.trim()
            .parse::<u32>()
            .map_err(|_| DateParseError::NotANumber {
                input: input.to_owned(),
                component: raw.to_owned(),
            })
    };
    Ok((number(*hour)?, number(*minute)?, number(*second)?))
}
