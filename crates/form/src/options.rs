//! Session options and per-field attributes.
//!
//! Both deserialize from the camelCase JSON hosts already use for form
//! markup. Millisecond values are accepted as numbers or numeric strings.
//!
//! Precedence for the debounce delay: field attribute, then session
//! options, then [`DEFAULT_DEBOUNCE_MS`].

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::adapter::{ErrorTarget, InputKind};
use crate::error::FormResult;

/// Debounce delay when nothing else is configured.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Session-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Debounce delay in milliseconds.
    #[serde(alias = "typingLimit", deserialize_with = "deserialize_millis")]
    pub debounce: u64,
    /// Keep registry and summary across route changes.
    pub suppress_auto_reset: bool,
    /// Show only the last failing rule's message.
    pub show_only_last_message: bool,
    /// Unknown date format names fall back to ISO instead of failing.
    pub lenient_date_formats: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE_MS,
            suppress_auto_reset: false,
            show_only_last_message: false,
            lenient_date_formats: false,
        }
    }
}

impl ValidationOptions {
    /// Parses options from JSON.
    pub fn from_json(json: &str) -> FormResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Debounce delay as a duration.
    #[must_use]
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce)
    }

    /// Sets the debounce delay.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = duration_millis(delay);
        self
    }

    /// Sets route-change reset suppression.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_suppress_auto_reset(mut self, suppress: bool) -> Self {
        self.suppress_auto_reset = suppress;
        self
    }

    /// Sets "show only the last message".
    #[must_use = "builder methods must be chained or built"]
    pub fn with_show_only_last_message(mut self, only_last: bool) -> Self {
        self.show_only_last_message = only_last;
        self
    }

    /// Sets lenient date format resolution.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_lenient_date_formats(mut self, lenient: bool) -> Self {
        self.lenient_date_formats = lenient;
        self
    }
}

const fn default_translate() -> bool {
    true
}

/// Validation attributes of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAttributes {
    /// Field name; the registry key.
    #[serde(default, alias = "elmName")]
    pub name: String,
    /// Rule pipeline.
    #[serde(alias = "validation")]
    pub rules: String,
    /// Debounce override in milliseconds.
    #[serde(
        default,
        alias = "typingLimit",
        deserialize_with = "deserialize_opt_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub debounce: Option<u64>,
    /// Display name (raw text or translation key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Explicit message target (`#id`, `.class` or bare id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error_to: Option<String>,
    /// Translate messages and the friendly name.
    #[serde(default = "default_translate")]
    pub translate: bool,
    /// Owning form, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Input control kind.
    #[serde(default, alias = "type")]
    pub input_type: InputKind,
}

impl FieldAttributes {
    /// Attributes with just a name and a rule string.
    #[must_use]
    pub fn new(name: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: rules.into(),
            debounce: None,
            friendly_name: None,
            validation_error_to: None,
            translate: true,
            form: None,
            input_type: InputKind::Text,
        }
    }

    /// Parses attributes from JSON.
    pub fn from_json(json: &str) -> FormResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses attributes from a JSON value.
    pub fn from_value(value: serde_json::Value) -> FormResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Sets the friendly name.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    /// Sets the owning form.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }

    /// Sets the debounce override.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = Some(duration_millis(delay));
        self
    }

    /// Sets the input kind.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_input_kind(mut self, kind: InputKind) -> Self {
        self.input_type = kind;
        self
    }

    /// Sets the message target.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_error_target(mut self, selector: impl Into<String>) -> Self {
        self.validation_error_to = Some(selector.into());
        self
    }

    /// Enables or disables translation.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_translate(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    /// Effective debounce delay under `options`.
    #[must_use]
    pub fn effective_debounce(&self, options: &ValidationOptions) -> Duration {
        Duration::from_millis(self.debounce.unwrap_or(options.debounce))
    }

    /// Effective message target.
    #[must_use]
    pub fn error_target(&self) -> ErrorTarget {
        self.validation_error_to
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| ErrorTarget::default_for(&self.name), ErrorTarget::parse)
    }
}

fn duration_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Millis {
    Number(u64),
    Text(String),
}

impl Millis {
    fn into_millis<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Self::Number(ms) => Ok(ms),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("`{text}` is not a millisecond count"))),
        }
    }
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Millis::deserialize(deserializer)?.into_millis()
}

fn deserialize_opt_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    Option::<Millis>::deserialize(deserializer)?
        .map(Millis::into_millis)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let options = ValidationOptions::default();
        assert_eq!(options.debounce_duration(), Duration::from_millis(1000));
        assert!(!options.suppress_auto_reset);

        let parsed = ValidationOptions::from_json("{}").unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn options_accept_typing_limit_alias() {
        let options =
            ValidationOptions::from_json(r#"{"typingLimit": "250", "showOnlyLastMessage": true}"#)
                .unwrap();
        assert_eq!(options.debounce, 250);
        assert!(options.show_only_last_message);
    }

    #[test]
    fn attributes_from_markup_names() {
        let attrs = FieldAttributes::from_json(
            r#"{
                "elmName": "age",
                "validation": "required|between:18,65",
                "debounce": 300,
                "friendlyName": "Age",
                "validationErrorTo": ".age-errors",
                "form": "signup",
                "type": "number"
            }"#,
        )
        .unwrap();

        assert_eq!(attrs.name, "age");
        assert_eq!(attrs.rules, "required|between:18,65");
        assert_eq!(attrs.debounce, Some(300));
        assert_eq!(attrs.input_type, InputKind::Number);
        assert!(attrs.translate);
        assert_eq!(
            attrs.error_target(),
            ErrorTarget::Class("age-errors".into())
        );
    }

    #[test]
    fn debounce_precedence() {
        let options = ValidationOptions::default().with_debounce(Duration::from_millis(400));
        let field = FieldAttributes::new("name", "required");
        assert_eq!(
            field.effective_debounce(&options),
            Duration::from_millis(400)
        );

        let field = field.with_debounce(Duration::from_millis(50));
        assert_eq!(
            field.effective_debounce(&options),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn default_error_target() {
        let field = FieldAttributes::new("user[name]", "required");
        assert_eq!(field.error_target().selector(), ".validation-username");
    }

    #[test]
    fn missing_rules_is_an_error() {
        let err = FieldAttributes::from_json(r#"{"name": "age"}"#).unwrap_err();
        assert_eq!(err.code(), "FORM_ATTRIBUTES");
    }
}
