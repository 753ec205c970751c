//! Message translation and rendering.
//!
//! Rule messages are translation keys with positional `:param` placeholders.
//! A [`Translator`] resolves keys; the engine ships an English
//! [`MessageCatalog`] and never requires one to be asynchronous.

use std::collections::HashMap;

use crate::date::DateFormat;
use crate::error::TranslationError;
use crate::rule::ValidatorDescriptor;

const PLACEHOLDER: &str = ":param";

/// Key of the message shown for an empty `number` input.
pub const INVALID_KEY_CHAR: &str = "INVALID_KEY_CHAR";

/// Resolves message keys to display text.
pub trait Translator {
    /// Translates `key`.
    fn translate(&self, key: &str) -> Result<String, TranslationError>;

    /// Translates `key`, falling back to the key itself.
    fn translate_or_raw(&self, key: &str) -> String {
        self.translate(key).unwrap_or_else(|_| key.to_owned())
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(&self, key: &str) -> Result<String, TranslationError> {
        (**self).translate(key)
    }
}

/// Translator that returns every key unchanged.
///
/// Used for fields that opt out of translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawText;

impl Translator for RawText {
    fn translate(&self, key: &str) -> Result<String, TranslationError> {
        Ok(key.to_owned())
    }
}

/// In-memory key/message table.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// Creates an empty catalog; every lookup misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in English messages for every catalog rule.
    #[must_use]
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, message) in ENGLISH {
            catalog.insert(*key, *message);
        }
        for format in DateFormat::ALL {
            let name = format.name();
            let hint = layout_hint(format);
            catalog.insert(
                format!("INVALID_DATE_{name}"),
                format!("Must be a valid date format ({hint})."),
            );
            catalog.insert(
                format!("INVALID_DATE_{name}_BETWEEN"),
                format!("Needs to be a valid date format ({hint}) between :param and :param."),
            );
            catalog.insert(
                format!("INVALID_DATE_{name}_MIN"),
                format!(
                    "Needs to be a valid date format ({hint}), equal to, or higher than :param."
                ),
            );
            catalog.insert(
                format!("INVALID_DATE_{name}_MAX"),
                format!(
                    "Needs to be a valid date format ({hint}), equal to, or lower than :param."
                ),
            );
        }
        catalog
    }

    /// Adds or replaces a message.
    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(key.into(), message.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use = "builder methods must be chained or built"]
    pub fn with(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.insert(key, message);
        self
    }

    /// Looks up a message without translation fallback.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: &str) -> Result<String, TranslationError> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| TranslationError::MissingKey(key.to_owned()))
    }
}

fn layout_hint(format: DateFormat) -> &'static str {
    match format {
        DateFormat::Iso => "yyyy-mm-dd",
        DateFormat::UsShort => "mm/dd/yy",
        DateFormat::UsLong => "mm/dd/yyyy",
        DateFormat::EuroShort => "dd-mm-yy",
        DateFormat::EuroLong => "dd-mm-yyyy",
    }
}

const ENGLISH: &[(&str, &str)] = &[
    ("INVALID_ALPHA", "May only contain letters."),
    (
        "INVALID_ALPHA_SPACE",
        "May only contain letters and spaces.",
    ),
    ("INVALID_ALPHA_NUM", "May only contain letters and numbers."),
    (
        "INVALID_ALPHA_NUM_SPACE",
        "May only contain letters, numbers and spaces.",
    ),
    (
        "INVALID_ALPHA_DASH",
        "May only contain letters, numbers and dashes.",
    ),
    (
        "INVALID_ALPHA_DASH_SPACE",
        "May only contain letters, numbers, dashes and spaces.",
    ),
    (
        "INVALID_BETWEEN_CHAR",
        "Text must be between :param and :param characters in length.",
    ),
    (
        "INVALID_BETWEEN_NUM",
        "Needs to be a numeric value, between :param and :param.",
    ),
    (
        "INVALID_BETWEEN_NUM_EXCLUSIVE",
        "Needs to be a numeric value, strictly between :param and :param.",
    ),
    ("INVALID_CREDIT_CARD", "Must be a valid credit card number."),
    ("INVALID_EMAIL", "Must be a valid email address."),
    (
        "INVALID_EXACT_LEN",
        "Must have a length of exactly :param characters.",
    ),
    (
        "INVALID_FLOAT",
        "May only contain a positive float value (integer excluded).",
    ),
    (
        "INVALID_FLOAT_SIGNED",
        "May only contain a positive or negative float value (integer excluded).",
    ),
    ("INVALID_IBAN", "Must be a valid IBAN."),
    (
        "INVALID_INPUT_MATCH",
        "Confirmation field does not match specified field \":param\".",
    ),
    ("INVALID_INTEGER", "Must be a positive integer."),
    (
        "INVALID_INTEGER_SIGNED",
        "Must be a positive or negative integer.",
    ),
    ("INVALID_IPV4", "Must be a valid IP (IPV4)."),
    (
        INVALID_KEY_CHAR,
        "Invalid keyboard entry on a field of type \"number\".",
    ),
    (
        "INVALID_MAX_CHAR",
        "May not be greater than :param characters.",
    ),
    (
        "INVALID_MAX_NUM",
        "Needs to be a numeric value, equal to, or lower than :param.",
    ),
    ("INVALID_MIN_CHAR", "Must be at least :param characters."),
    (
        "INVALID_MIN_NUM",
        "Needs to be a numeric value, equal to, or higher than :param.",
    ),
    ("INVALID_NUMERIC", "Must be a positive number."),
    (
        "INVALID_NUMERIC_SIGNED",
        "Must be a positive or negative number.",
    ),
    ("INVALID_PATTERN", "Must match the expected format."),
    ("INVALID_REQUIRED", "Field is required."),
    (
        "INVALID_TIME",
        "Must be a valid time format (hh:mm OR hh:mm:ss).",
    ),
    ("INVALID_URL", "Must be a valid URL."),
];

/// Replaces each `:param` placeholder, left to right, with the next
/// parameter. Extra placeholders stay as written.
#[must_use]
pub fn replace_params(template: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    for param in params {
        let Some(at) = rest.find(PLACEHOLDER) else {
            break;
        };
        out.push_str(&rest[..at]);
        out.push_str(param);
        rest = &rest[at + PLACEHOLDER.len()..];
    }
    out.push_str(rest);
    out
}

/// Renders the failure message of one rule.
///
/// The alt text wins over the catalog key. The chosen text is translated;
/// if that fails, the alt text is used verbatim, and without alt text the
/// rule contributes no message.
pub fn render_rule_message(
    descriptor: &ValidatorDescriptor,
    translator: &dyn Translator,
) -> Option<String> {
    let key = descriptor
        .alt_text
        .as_deref()
        .unwrap_or(&descriptor.message_key);
    let params = descriptor.message_params();

    match translator.translate(key) {
        Ok(text) => Some(replace_params(&text, params)),
        Err(err) => match descriptor.alt_text.as_deref() {
            Some(alt) => Some(replace_params(alt, params)),
            None => {
                tracing::warn!(
                    rule = %descriptor.rule,
                    key = %key,
                    error = %err,
                    "no message for failed rule"
                );
                None
            }
        },
    }
}

/// Accumulates the messages of failing rules for one field.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    text: String,
    show_only_last: bool,
}

impl MessageBuffer {
    /// Creates a buffer; with `show_only_last` each segment replaces the
    /// previous one.
    #[must_use]
    pub fn new(show_only_last: bool) -> Self {
        Self {
            text: String::new(),
            show_only_last,
        }
    }

    /// Adds the message of one failing rule.
    pub fn push(&mut self, segment: &str) {
        if self.show_only_last || self.text.is_empty() {
            self.text.clear();
            self.text.push_str(segment);
        } else {
            self.text.push(' ');
            self.text.push_str(segment);
        }
    }

    /// The composed, trimmed message.
    #[must_use]
    pub fn finish(self) -> String {
        self.text.trim().to_owned()
    }
}
