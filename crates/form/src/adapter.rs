//! Seams between the engine and the host UI.
//!
//! The engine never touches widgets directly. It reads values through a
//! [`FieldValueSource`] and reports messages through an [`ErrorRenderer`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Kind of input control, which changes when validation fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Numeric input; an empty value is reported immediately.
    Number,
    /// Drop-down; validated on every change.
    Select,
    /// Free text; validated after the debounce delay. Unknown kinds map
    /// here.
    #[default]
    #[serde(other)]
    Text,
}

/// Read access to the current value of any field.
pub trait FieldValueSource {
    /// Current value, `None` when the field has no value at all.
    fn current_value(&self, field: &str) -> Option<String>;

    /// Whether the field is disabled.
    fn is_disabled(&self, _field: &str) -> bool {
        false
    }
}

impl<S: FieldValueSource + ?Sized> FieldValueSource for Box<S> {
    fn current_value(&self, field: &str) -> Option<String> {
        (**self).current_value(field)
    }

    fn is_disabled(&self, field: &str) -> bool {
        (**self).is_disabled(field)
    }
}

#[derive(Debug, Clone, Default)]
struct ValueSlot {
    value: Option<String>,
    disabled: bool,
}

/// Shared in-memory value store.
///
/// Clones share the same storage, so the host keeps one handle and the
/// session another.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    slots: Arc<RwLock<HashMap<String, ValueSlot>>>,
}

impl FieldValues {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of `field`.
    pub fn set(&self, field: impl Into<String>, value: impl Into<String>) {
        let mut slots = self.slots.write();
        slots.entry(field.into()).or_default().value = Some(value.into());
    }

    /// Clears the value of `field`, leaving it `None`.
    pub fn unset(&self, field: &str) {
        if let Some(slot) = self.slots.write().get_mut(field) {
            slot.value = None;
        }
    }

    /// Marks `field` disabled or enabled.
    pub fn set_disabled(&self, field: impl Into<String>, disabled: bool) {
        let mut slots = self.slots.write();
        slots.entry(field.into()).or_default().disabled = disabled;
    }

    /// Forgets `field` entirely.
    pub fn remove(&self, field: &str) {
        self.slots.write().remove(field);
    }
}

impl FieldValueSource for FieldValues {
    fn current_value(&self, field: &str) -> Option<String> {
        self.slots
            .read()
            .get(field)
            .and_then(|slot| slot.value.clone())
    }

    fn is_disabled(&self, field: &str) -> bool {
        self.slots
            .read()
            .get(field)
            .is_some_and(|slot| slot.disabled)
    }
}

/// Where a field's message is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ErrorTarget {
    /// Element with this id.
    Id(String),
    /// Elements with this class.
    Class(String),
}

impl ErrorTarget {
    /// Parses a `validationErrorTo` value: `#id`, `.class`, or a bare id.
    #[must_use]
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if let Some(class) = selector.strip_prefix('.') {
            Self::Class(class.to_owned())
        } else if let Some(id) = selector.strip_prefix('#') {
            Self::Id(id.to_owned())
        } else {
            Self::Id(selector.to_owned())
        }
    }

    /// Default target of a field: class `validation-<sanitized name>`.
    #[must_use]
    pub fn default_for(field: &str) -> Self {
        Self::Class(format!("validation-{}", sanitize_field_name(field)))
    }

    /// CSS selector form.
    #[must_use]
    pub fn selector(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ErrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Class(class) => write!(f, ".{class}"),
        }
    }
}

const SELECTOR_UNSAFE: &[char] = &[
    '|', '&', ';', '$', '%', '@', '"', '<', '>', '(', ')', '+', ',', '[', ']', '{', '}',
];

/// Strips characters that are not valid in a class name.
#[must_use]
pub fn sanitize_field_name(field: &str) -> String {
    field
        .chars()
        .filter(|c| !SELECTOR_UNSAFE.contains(c))
        .collect()
}

/// Displays and clears field messages.
pub trait ErrorRenderer {
    /// Shows `message` for `field` at `target`.
    fn show(&mut self, field: &str, message: &str, target: &ErrorTarget);

    /// Removes any message shown for `field` at `target`.
    fn clear(&mut self, field: &str, target: &ErrorTarget);
}

impl<R: ErrorRenderer + ?Sized> ErrorRenderer for Box<R> {
    fn show(&mut self, field: &str, message: &str, target: &ErrorTarget) {
        (**self).show(field, message, target);
    }

    fn clear(&mut self, field: &str, target: &ErrorTarget) {
        (**self).clear(field, target);
    }
}

/// Renderer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl ErrorRenderer for NullRenderer {
    fn show(&mut self, _field: &str, _message: &str, _target: &ErrorTarget) {}

    fn clear(&mut self, _field: &str, _target: &ErrorTarget) {}
}

/// Renderer that keeps the currently displayed message per field.
///
/// Clones share state; useful for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    shown: Arc<RwLock<HashMap<String, (String, ErrorTarget)>>>,
}

impl RecordingRenderer {
    /// Creates an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message currently shown for `field`.
    #[must_use]
    pub fn message(&self, field: &str) -> Option<String> {
        self.shown
            .read()
            .get(field)
            .map(|(message, _)| message.clone())
    }

    /// Target the message of `field` was rendered to.
    #[must_use]
    pub fn target(&self, field: &str) -> Option<ErrorTarget> {
        self.shown
            .read()
            .get(field)
            .map(|(_, target)| target.clone())
    }

    /// Number of fields showing a message.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.shown.read().len()
    }
}

impl ErrorRenderer for RecordingRenderer {
    fn show(&mut self, field: &str, message: &str, target: &ErrorTarget) {
        self.shown
            .write()
            .insert(field.to_owned(), (message.to_owned(), target.clone()));
    }

    fn clear(&mut self, field: &str, _target: &ErrorTarget) {
        self.shown.write().remove(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("#age-error", ErrorTarget::Id("age-error".into()))]
    #[case(".errors", ErrorTarget::Class("errors".into()))]
    #[case("age-error", ErrorTarget::Id("age-error".into()))]
    fn parses_error_targets(#[case] raw: &str, #[case] expected: ErrorTarget) {
        assert_eq!(ErrorTarget::parse(raw), expected);
    }

    #[test]
    fn default_target_sanitizes_name() {
        assert_eq!(
            ErrorTarget::default_for("user[email]").selector(),
            ".validation-useremail"
        );
    }

    #[test]
    fn values_are_shared_between_clones() {
        let values = FieldValues::new();
        let host = values.clone();
        host.set("password", "secret");
        assert_eq!(values.current_value("password").as_deref(), Some("secret"));

        host.unset("password");
        assert_eq!(values.current_value("password"), None);

        host.set_disabled("password", true);
        assert!(values.is_disabled("password"));
        assert!(!values.is_disabled("other"));
    }

    #[test]
    fn input_kind_deserializes_unknown_as_text() {
        let kind: InputKind = serde_json::from_str("\"email\"").unwrap();
        assert_eq!(kind, InputKind::Text);
        let kind: InputKind = serde_json::from_str("\"number\"").unwrap();
        assert_eq!(kind, InputKind::Number);
        assert_eq!(InputKind::default(), InputKind::Text);
        assert_eq!(serde_json::to_string(&InputKind::Text).unwrap(), "\"text\"");
    }

    #[test]
    fn recording_renderer_tracks_visible_messages() {
        let renderer = RecordingRenderer::new();
        let mut handle = renderer.clone();
        let target = ErrorTarget::default_for("age");

        handle.show("age", "Too young.", &target);
        assert_eq!(renderer.message("age").as_deref(), Some("Too young."));
        assert_eq!(renderer.target("age"), Some(target.clone()));

        handle.clear("age", &target);
        assert_eq!(renderer.visible_count(), 0);
    }
}
