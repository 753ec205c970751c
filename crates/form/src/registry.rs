//! Registry of validated fields.
//!
//! Keyed by field name. Registration order is preserved, and re-registering
//! a name replaces the record in place.

use std::time::Duration;

use indexmap::IndexMap;

use crate::adapter::{ErrorTarget, InputKind};
use crate::options::FieldAttributes;
use crate::rule::RulePipeline;

/// Lifecycle of a field's validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Registered, never evaluated.
    #[default]
    Unvalidated,
    /// A debounced evaluation is scheduled.
    Pending,
    /// Last evaluation passed.
    Valid,
    /// Last evaluation failed.
    Invalid,
}

impl FieldState {
    /// State after an evaluation.
    #[must_use]
    pub const fn from_validity(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

/// A registered field.
#[derive(Debug, Clone)]
pub struct FieldRecord {
    /// Registry key.
    pub field_name: String,
    /// Display name, already translated.
    pub friendly_name: String,
    /// Owning form.
    pub form_name: Option<String>,
    /// Parsed rules.
    pub pipeline: RulePipeline,
    /// Input control kind.
    pub input_kind: InputKind,
    /// Effective debounce delay.
    pub debounce: Duration,
    /// Where messages are displayed.
    pub error_target: ErrorTarget,
    /// Messages go through the translator.
    pub translate: bool,
    /// Result of the last evaluation.
    pub is_valid: bool,
    /// Message of the last evaluation.
    pub message: String,
    /// The value was edited.
    pub dirty: bool,
    /// The field lost focus or the form was submitted.
    pub touched: bool,
    /// State of the last rendered evaluation. Never `Pending`; the session
    /// reports `Pending` while a timer is armed.
    pub state: FieldState,
    /// Registration generation; scheduled evaluations carry it.
    pub generation: u64,
}

impl FieldRecord {
    /// Builds a fresh, unvalidated record.
    #[must_use]
    pub fn new(
        attributes: &FieldAttributes,
        friendly_name: String,
        pipeline: RulePipeline,
        debounce: Duration,
        generation: u64,
    ) -> Self {
        Self {
            field_name: attributes.name.clone(),
            friendly_name,
            form_name: attributes.form.clone(),
            pipeline,
            input_kind: attributes.input_type,
            debounce,
            error_target: attributes.error_target(),
            translate: attributes.translate,
            is_valid: false,
            message: String::new(),
            dirty: false,
            touched: false,
            state: FieldState::Unvalidated,
            generation,
        }
    }

    /// The pipeline contains `required`.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.pipeline.is_required()
    }
}

/// Field records by name.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    records: IndexMap<String, FieldRecord>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record of `record.field_name`.
    ///
    /// Returns the replaced record.
    pub fn upsert(&mut self, record: FieldRecord) -> Option<FieldRecord> {
        let name = record.field_name.clone();
        let previous = self.records.insert(name.clone(), record);
        tracing::debug!(
            field = %name,
            replaced = previous.is_some(),
            "registered field"
        );
        previous
    }

    /// Record of `field`, if registered.
    #[must_use]
    pub fn find(&self, field: &str) -> Option<&FieldRecord> {
        self.records.get(field)
    }

    /// Mutable record of `field`.
    pub fn find_mut(&mut self, field: &str) -> Option<&mut FieldRecord> {
        self.records.get_mut(field)
    }

    /// Whether `field` is registered.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.records.contains_key(field)
    }

    /// Removes `field`, keeping the order of the rest.
    pub fn remove(&mut self, field: &str) -> Option<FieldRecord> {
        self.records.shift_remove(field)
    }

    /// All records in registration order.
    pub fn all(&self) -> impl Iterator<Item = &FieldRecord> {
        self.records.values()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
