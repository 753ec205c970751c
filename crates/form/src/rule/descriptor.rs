//! Typed representation of a single parsed rule.

use std::fmt;

use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;

use crate::condition::Condition;
use crate::date::DateFormat;
use crate::error::{FormError, FormResult};

/// Pattern source that marks "value must be present".
pub const NON_EMPTY_PATTERN: &str = r"\S+";

/// Rule parameters; almost every rule has at most two.
pub type RuleParams = SmallVec<[String; 2]>;

/// How a descriptor compares the field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    /// Case-insensitive pattern match.
    Regex,
    /// Well-formed date compared against date parameters.
    ConditionalDate {
        format: DateFormat,
        condition: Condition,
    },
    /// `parseFloat` value compared against numeric parameters.
    ConditionalNumber { condition: Condition },
    /// Strict equality with another field's current value (`params[0]`).
    Match,
}

impl ValidatorKind {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::ConditionalDate { .. } => "conditionalDate",
            Self::ConditionalNumber { .. } => "conditionalNumber",
            Self::Match => "match",
        }
    }
}

/// Character-count bounds of a length rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Fewest characters allowed.
    pub min: usize,
    /// Most characters allowed, unbounded when `None`.
    pub max: Option<usize>,
}

impl LengthBounds {
    /// Bounds `min..=max`.
    #[must_use]
    pub const fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Exactly `len` characters.
    #[must_use]
    pub const fn exact(len: usize) -> Self {
        Self::new(len, Some(len))
    }

    /// The equivalent counted-repetition pattern, kept for display.
    #[must_use]
    pub fn pattern(self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("^(?s:.){{{max}}}$"),
            Some(max) => format!("^(?s:.){{{},{max}}}$", self.min),
            None => format!("^(?s:.){{{},}}$", self.min),
        }
    }

    /// Whether `input` has an allowed number of characters.
    #[must_use]
    pub fn contains(self, input: &str) -> bool {
        let len = input.chars().count();
        len >= self.min && self.max.is_none_or(|max| len <= max)
    }
}

#[derive(Clone)]
enum Matcher {
    Regex(Regex),
    // Counted repetitions outgrow the regex size limit for long texts.
    Length(LengthBounds),
}

/// A compiled, case-insensitive rule pattern that remembers its source.
#[derive(Clone)]
pub struct RulePattern {
    source: String,
    matcher: Matcher,
}

impl RulePattern {
    /// Compiles `source` case-insensitively for `rule`.
    pub fn compile(rule: &str, source: impl Into<String>) -> FormResult<Self> {
        let source = source.into();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| FormError::InvalidPattern {
                rule: rule.to_owned(),
                source,
            })?;
        Ok(Self {
            source,
            matcher: Matcher::Regex(regex),
        })
    }

    /// Length check for `bounds`; matches by counting characters.
    #[must_use]
    pub fn length(bounds: LengthBounds) -> Self {
        Self {
            source: bounds.pattern(),
            matcher: Matcher::Length(bounds),
        }
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern is the non-empty sentinel.
    #[must_use]
    pub fn is_non_empty_sentinel(&self) -> bool {
        self.source == NON_EMPTY_PATTERN
    }

    /// Tests the pattern against `input`.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(input),
            Matcher::Length(bounds) => bounds.contains(input),
        }
    }
}

impl fmt::Debug for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RulePattern").field(&self.source).finish()
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// One parsed rule token of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorDescriptor {
    /// Rule name as written (`between`, `regex`, ...).
    pub rule: String,
    /// Comparison semantics.
    pub kind: ValidatorKind,
    /// Pattern for regex rules and the well-formedness check of date rules.
    pub pattern: Option<RulePattern>,
    /// Translation key or message template with `:param` placeholders.
    pub message_key: String,
    /// User override message (raw text or translation key), without the
    /// `alt=` marker.
    pub alt_text: Option<String>,
    /// Ordered rule parameters.
    pub params: RuleParams,
}

impl ValidatorDescriptor {
    /// Whether the descriptor uses the non-empty sentinel pattern.
    #[must_use]
    pub fn is_non_empty_check(&self) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(RulePattern::is_non_empty_sentinel)
    }

    /// Pattern source, if any.
    #[must_use]
    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_ref().map(RulePattern::as_str)
    }

    /// Parameters substituted into `:param` placeholders.
    ///
    /// A `match` rule with a label skips its field reference.
    #[must_use]
    pub fn message_params(&self) -> &[String] {
        match self.kind {
            ValidatorKind::Match if self.params.len() > 1 => &self.params[1..],
            _ => &self.params,
        }
    }
}
