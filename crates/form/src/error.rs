//! Error types for rule parsing, configuration and session operations.
//!
//! Everything that can abort an operation is a [`FormError`]. Failures that
//! the engine recovers from locally (translation lookups, unparsable dates
//! inside an evaluation) have their own types and never escape as
//! `FormError`.

/// Result alias used throughout the crate.
pub type FormResult<T> = Result<T, FormError>;

/// Error type for form validation operations.
///
/// Parse errors are programmer errors in a rule string and are reported
/// synchronously to the caller. None of them leave the field registry or the
/// validation summary partially updated.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// A custom regex clause is missing its `regex:` opener, its `:regex`
    /// terminator, or the `:=` separating message and pattern.
    #[error("malformed regex clause in `{rules}`: {reason}")]
    MalformedRegexClause {
        rules: String,
        reason: &'static str,
    },

    /// The pipeline contains an empty segment (`required||min:3`).
    #[error("empty rule token at position {position} in `{rules}`")]
    EmptyRuleToken { rules: String, position: usize },

    /// The rule name is not known to the catalog.
    #[error("unknown validation rule `{rule}`")]
    UnknownRule { rule: String },

    /// The rule received the wrong number or shape of parameters.
    #[error("invalid parameters for rule `{rule}`: {reason}")]
    InvalidRuleParams { rule: String, reason: String },

    /// A rule pattern failed to compile.
    #[error("invalid pattern for rule `{rule}`")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// The field has no resolvable name.
    #[error("field has no name attribute (rules: `{rules}`)")]
    MissingFieldName { rules: String },

    /// A form-level operation ran before any field attached a summary to
    /// the form.
    #[error("no validation summary attached to {scope}")]
    MissingValidationContext { scope: String },

    /// A named date format is not recognized.
    #[error("unrecognized date format `{format}`")]
    InvalidDateFormat { format: String },

    /// A date string could not be parsed.
    #[error("invalid date under format {format}")]
    InvalidDate {
        format: &'static str,
        #[source]
        source: DateParseError,
    },

    /// The operation targets a field that is not registered.
    #[error("field `{field}` is not registered")]
    UnknownField { field: String },

    /// Field attributes or session options could not be deserialized.
    #[error("invalid validation attributes")]
    InvalidAttributes(#[from] serde_json::Error),
}

impl FormError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedRegexClause { .. }
            | Self::EmptyRuleToken { .. }
            | Self::UnknownRule { .. }
            | Self::InvalidRuleParams { .. }
            | Self::InvalidPattern { .. } => "parse",
            Self::MissingFieldName { .. } | Self::InvalidAttributes(_) => "config",
            Self::MissingValidationContext { .. } | Self::UnknownField { .. } => "lookup",
            Self::InvalidDateFormat { .. } | Self::InvalidDate { .. } => "date",
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRegexClause { .. } => "FORM_MALFORMED_REGEX",
            Self::EmptyRuleToken { .. } => "FORM_EMPTY_RULE",
            Self::UnknownRule { .. } => "FORM_UNKNOWN_RULE",
            Self::InvalidRuleParams { .. } => "FORM_RULE_PARAMS",
            Self::InvalidPattern { .. } => "FORM_INVALID_PATTERN",
            Self::MissingFieldName { .. } => "FORM_MISSING_NAME",
            Self::MissingValidationContext { .. } => "FORM_MISSING_CONTEXT",
            Self::InvalidDateFormat { .. } => "FORM_DATE_FORMAT",
            Self::InvalidDate { .. } => "FORM_INVALID_DATE",
            Self::UnknownField { .. } => "FORM_UNKNOWN_FIELD",
            Self::InvalidAttributes(_) => "FORM_ATTRIBUTES",
        }
    }
}

/// Failure of a [`Translator`](crate::message::Translator) lookup.
///
/// Always recovered: the engine falls back to the rule's alt text, or drops
/// the message when there is none.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// The key has no translation.
    #[error("no translation for key `{0}`")]
    MissingKey(String),

    /// The translation backend failed.
    #[error("translation backend failed: {0}")]
    Backend(String),
}

/// Failure to turn a date string into an instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    /// The string does not have three date components.
    #[error("`{input}` is not a date")]
    Malformed { input: String },

    /// A component is not a number.
    #[error("`{component}` is not a number in `{input}`")]
    NotANumber { input: String, component: String },

    /// The components do not form a calendar date or time.
    #[error("`{input}` is out of range")]
    OutOfRange { input: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = FormError::EmptyRuleToken {
            rules: "required||min:3".into(),
            position: 1,
        };
        assert_eq!(
            err.to_string(),
            "empty rule token at position 1 in `required||min:3`"
        );

        let err = FormError::UnknownRule {
            rule: "nope".into(),
        };
        assert_eq!(err.to_string(), "unknown validation rule `nope`");

        let err = TranslationError::MissingKey("INVALID_EMAIL".into());
        assert_eq!(err.to_string(), "no translation for key `INVALID_EMAIL`");
    }

    #[test]
    fn codes_and_categories() {
        let err = FormError::MissingValidationContext {
            scope: "form `signup`".into(),
        };
        assert_eq!(err.code(), "FORM_MISSING_CONTEXT");
        assert_eq!(err.category(), "lookup");

        let err = FormError::InvalidDateFormat {
            format: "JULIAN".into(),
        };
        assert_eq!(err.category(), "date");
    }

    #[test]
    fn attributes_error_wraps_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FormError::from(source);
        assert_eq!(err.code(), "FORM_ATTRIBUTES");
        assert!(std::error::Error::source(&err).is_some());
    }
}
