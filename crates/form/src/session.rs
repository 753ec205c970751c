//! The validation session: one registry, one summary and the debounce
//! timers of a page.
//!
//! The session is driven by the host's events. A value change pre-validates
//! the field silently and arms its debounce timer; [`ValidationSession::poll`]
//! runs the evaluations whose timers expired. Blur, `select` inputs and empty
//! `number` inputs evaluate immediately. Registry and summary are only
//! written after a field's full evaluation, so an error never leaves them
//! half-updated.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use crate::adapter::{ErrorRenderer, FieldValueSource, FieldValues, InputKind, NullRenderer};
use crate::debounce::Debouncer;
use crate::error::{FormError, FormResult};
use crate::evaluator::{FieldContext, FieldEvaluation, ValidatorEvaluator};
use crate::message::{MessageCatalog, RawText, Translator};
use crate::options::{FieldAttributes, ValidationOptions};
use crate::registry::{FieldRecord, FieldRegistry, FieldState};
use crate::rule::{BuiltinCatalog, RuleCatalog, RuleParser};
use crate::summary::{SummaryEntry, ValidationSummary};

/// Which fields a form-level operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope<'a> {
    /// Every registered field.
    Page,
    /// Fields of one named form.
    Form(&'a str),
}

impl fmt::Display for FormScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("page"),
            Self::Form(name) => write!(f, "form `{name}`"),
        }
    }
}

/// Result of an evaluation that was applied and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    /// Field name.
    pub field: String,
    /// Whether every rule passed.
    pub valid: bool,
    /// Composed message; empty when valid.
    pub message: String,
    /// State after the evaluation.
    pub state: FieldState,
}

/// Builder for [`ValidationSession`].
#[derive(Default)]
#[must_use = "builder methods must be chained or built"]
pub struct ValidationSessionBuilder {
    options: ValidationOptions,
    catalog: Option<Box<dyn RuleCatalog>>,
    translator: Option<Box<dyn Translator>>,
    values: Option<Box<dyn FieldValueSource>>,
    renderer: Option<Box<dyn ErrorRenderer>>,
}

impl ValidationSessionBuilder {
    /// Session options.
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Rule catalog; defaults to [`BuiltinCatalog`].
    pub fn catalog(mut self, catalog: impl RuleCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    /// Translator; defaults to [`MessageCatalog::english`].
    pub fn translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Value source; defaults to an empty [`FieldValues`].
    pub fn values(mut self, values: impl FieldValueSource + 'static) -> Self {
        self.values = Some(Box::new(values));
        self
    }

    /// Renderer; defaults to [`NullRenderer`].
    pub fn renderer(mut self, renderer: impl ErrorRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Builds the session.
    #[must_use]
    pub fn build(self) -> ValidationSession {
        let builtin = BuiltinCatalog::new().lenient_date_formats(self.options.lenient_date_formats);
        ValidationSession {
            catalog: self.catalog.unwrap_or_else(|| Box::new(builtin)),
            translator: self
                .translator
                .unwrap_or_else(|| Box::new(MessageCatalog::english())),
            values: self.values.unwrap_or_else(|| Box::new(FieldValues::new())),
            renderer: self.renderer.unwrap_or_else(|| Box::new(NullRenderer)),
            options: self.options,
            registry: FieldRegistry::new(),
            summary: ValidationSummary::new(),
            debouncer: Debouncer::new(),
            attached_forms: HashSet::new(),
            page_attached: false,
            generation: 0,
        }
    }
}

/// Validation state of one page.
pub struct ValidationSession {
    options: ValidationOptions,
    catalog: Box<dyn RuleCatalog>,
    translator: Box<dyn Translator>,
    values: Box<dyn FieldValueSource>,
    renderer: Box<dyn ErrorRenderer>,
    registry: FieldRegistry,
    summary: ValidationSummary,
    debouncer: Debouncer,
    attached_forms: HashSet<String>,
    page_attached: bool,
    generation: u64,
}

impl Default for ValidationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSession")
            .field("options", &self.options)
            .field("fields", &self.registry.len())
            .field("invalid", &self.summary.len())
            .field("pending", &self.debouncer.len())
            .finish_non_exhaustive()
    }
}

impl ValidationSession {
    /// Session with the built-in catalog, English messages, an empty value
    /// store and no renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a builder.
    pub fn builder() -> ValidationSessionBuilder {
        ValidationSessionBuilder::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a field, or re-registers it with new attributes.
    ///
    /// The rule string is parsed first; a parse error leaves the session
    /// untouched. The new record replaces any previous one in place, drops
    /// its pending timer and summary entry, and is pre-validated silently
    /// against the field's current value.
    pub fn add_field(&mut self, attributes: FieldAttributes) -> FormResult<()> {
        if attributes.name.trim().is_empty() {
            return Err(FormError::MissingFieldName {
                rules: attributes.rules,
            });
        }

        let pipeline = RuleParser::new(&*self.catalog).parse(&attributes.rules)?;
        let friendly_name = match attributes.friendly_name.as_deref() {
            Some(label) if attributes.translate => self.translator.translate_or_raw(label),
            Some(label) => label.to_owned(),
            None => String::new(),
        };

        self.generation += 1;
        let debounce = attributes.effective_debounce(&self.options);
        let record = FieldRecord::new(
            &attributes,
            friendly_name,
            pipeline,
            debounce,
            self.generation,
        );
        let name = attributes.name;

        if let Some(form) = &record.form_name {
            self.attached_forms.insert(form.clone());
        }
        self.page_attached = true;
        self.debouncer.cancel(&name);
        self.summary.clear(&name);
        self.registry.upsert(record);

        let value = self.values.current_value(&name);
        let evaluation = self.evaluate(&name, value.as_deref())?;
        self.apply(&name, evaluation, false)?;
        Ok(())
    }

    /// Unregisters `field`, dropping its timer, summary entry and displayed
    /// message. Returns whether it was registered.
    pub fn remove_field(&mut self, field: &str) -> bool {
        self.debouncer.cancel(field);
        self.summary.clear(field);
        let Some(record) = self.registry.remove(field) else {
            return false;
        };
        self.renderer.clear(field, &record.error_target);
        tracing::debug!(field = %field, "removed field");
        true
    }

    /// Unregisters several fields. Returns how many were registered.
    pub fn remove_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> usize {
        let mut removed = 0;
        for field in fields {
            if self.remove_field(field.as_ref()) {
                removed += 1;
            }
        }
        removed
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Handles a value change at `now`.
    ///
    /// Returns the outcome when the field was evaluated immediately, `None`
    /// when a debounced evaluation was scheduled instead.
    pub fn value_changed(
        &mut self,
        field: &str,
        value: Option<&str>,
        now: Instant,
    ) -> FormResult<Option<FieldOutcome>> {
        let record = self.registry.find_mut(field).ok_or_else(|| unknown(field))?;
        record.dirty = true;
        let required = record.is_required();
        let kind = record.input_kind;
        let delay = record.debounce;
        let generation = record.generation;

        let evaluation = self.evaluate(field, value)?;
        let empty = value.is_none_or(str::is_empty);

        let immediate = (!required && empty)
            || (kind == InputKind::Number && empty)
            || kind == InputKind::Select;
        if immediate {
            self.debouncer.cancel(field);
            return self.apply(field, evaluation, true).map(Some);
        }

        self.apply(field, evaluation, false)?;
        if let Some(record) = self.registry.find(field) {
            self.renderer.clear(field, &record.error_target);
        }
        self.debouncer
            .arm(field, value.map(str::to_owned), generation, now, delay);
        Ok(None)
    }

    /// Handles focus loss: marks the field touched and evaluates it now.
    pub fn blur(&mut self, field: &str, value: Option<&str>) -> FormResult<FieldOutcome> {
        self.registry
            .find_mut(field)
            .ok_or_else(|| unknown(field))?
            .touched = true;
        self.validate_field(field, value)
    }

    /// Evaluates `field` against `value` now, cancelling its pending timer.
    pub fn validate_field(&mut self, field: &str, value: Option<&str>) -> FormResult<FieldOutcome> {
        let evaluation = self.evaluate(field, value)?;
        self.debouncer.cancel(field);
        self.apply(field, evaluation, true)
    }

    /// Evaluates `field` against its current value from the value source.
    pub fn revalidate(&mut self, field: &str) -> FormResult<FieldOutcome> {
        let value = self.values.current_value(field);
        self.validate_field(field, value.as_deref())
    }

    /// Runs every debounced evaluation due at `now`.
    ///
    /// Timers armed for a record that has since been removed, replaced or
    /// reset are dropped.
    pub fn poll(&mut self, now: Instant) -> Vec<FieldOutcome> {
        let due = self.debouncer.take_due(now);
        let mut outcomes = Vec::with_capacity(due.len());

        for pending in due {
            let live = self
                .registry
                .find(&pending.field)
                .is_some_and(|r| r.generation == pending.generation);
            if !live {
                tracing::trace!(field = %pending.field, "dropped stale debounce timer");
                continue;
            }

            tracing::trace!(field = %pending.field, "debounce timer fired");
            let outcome = self
                .evaluate(&pending.field, pending.value.as_deref())
                .and_then(|evaluation| self.apply(&pending.field, evaluation, true));
            match outcome {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => tracing::warn!(
                    field = %pending.field,
                    error = %err,
                    "debounced evaluation failed"
                ),
            }
        }
        outcomes
    }

    /// Earliest pending timer deadline, for the host's scheduler.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Cancels the pending timer of `field`.
    pub fn cancel_pending(&mut self, field: &str) -> bool {
        self.debouncer.cancel(field).is_some()
    }

    /// Cancels every pending timer. Returns how many were cancelled.
    pub fn clear_pending(&mut self) -> usize {
        self.debouncer.clear()
    }

    // ========================================================================
    // Forms
    // ========================================================================

    /// Submit-time check.
    ///
    /// Marks every failing field in `scope` as touched and re-renders its
    /// message. Returns `true` iff no field in `scope` is failing.
    pub fn check_form_validity(&mut self, scope: FormScope<'_>) -> FormResult<bool> {
        self.ensure_context(scope)?;

        let failing = self.failing_fields(scope);
        for field in &failing {
            if let Some(record) = self.registry.find_mut(field) {
                record.touched = true;
            }
            self.render(field, true);
        }

        let valid = failing.is_empty();
        tracing::debug!(scope = %scope, valid, failing = failing.len(), "checked form validity");
        Ok(valid)
    }

    /// Drops every failing field of `scope` from the registry and summary.
    ///
    /// Used when stepping back in a multi-step form so validations of steps
    /// not yet revisited do not block it. Returns the removed field names.
    pub fn clear_invalid_entries_ahead(&mut self, scope: FormScope<'_>) -> FormResult<Vec<String>> {
        self.ensure_context(scope)?;

        let failing = self.failing_fields(scope);
        for field in &failing {
            self.remove_field(field);
        }
        Ok(failing)
    }

    /// Current summary entries of `scope`.
    pub fn summary_for<'a>(
        &'a self,
        scope: FormScope<'a>,
    ) -> Box<dyn Iterator<Item = &'a SummaryEntry> + 'a> {
        match scope {
            FormScope::Page => Box::new(self.summary.all()),
            FormScope::Form(form) => Box::new(self.summary.for_form(form)),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Clears registry and summary unconditionally.
    ///
    /// Pending timers are left armed; they are dropped when they fire.
    pub fn reset(&mut self) {
        tracing::debug!(
            fields = self.registry.len(),
            failing = self.summary.len(),
            "reset validation session"
        );
        self.registry.clear();
        self.summary.reset_all();
        self.attached_forms.clear();
        self.page_attached = false;
    }

    /// Page or route transition hook: resets unless auto reset is
    /// suppressed. Returns whether a reset happened.
    pub fn on_route_change(&mut self) -> bool {
        if self.options.suppress_auto_reset {
            tracing::debug!("route change, auto reset suppressed");
            return false;
        }
        self.reset();
        true
    }

    /// Replaces the session options.
    ///
    /// Registered fields keep the debounce delay they were registered with.
    pub fn set_global_options(&mut self, options: ValidationOptions) {
        self.options = options;
    }

    /// Toggles reset suppression on route change.
    pub fn set_suppress_auto_reset(&mut self, suppress: bool) {
        self.options.suppress_auto_reset = suppress;
    }

    /// Toggles "show only the last message".
    pub fn set_show_only_last_message(&mut self, only_last: bool) {
        self.options.show_only_last_message = only_last;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Session options.
    #[must_use]
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Registered fields.
    #[must_use]
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Current errors.
    #[must_use]
    pub fn summary(&self) -> &ValidationSummary {
        &self.summary
    }

    /// Record of `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&FieldRecord> {
        self.registry.find(field)
    }

    /// Lifecycle state of `field`.
    #[must_use]
    pub fn field_state(&self, field: &str) -> Option<FieldState> {
        let record = self.registry.find(field)?;
        let pending = self
            .debouncer
            .get(field)
            .is_some_and(|p| p.generation == record.generation);
        Some(if pending {
            FieldState::Pending
        } else {
            record.state
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn evaluate(&self, field: &str, value: Option<&str>) -> FormResult<FieldEvaluation> {
        let record = self.registry.find(field).ok_or_else(|| unknown(field))?;
        let ctx = FieldContext {
            required: record.is_required(),
            disabled: self.values.is_disabled(field),
            input_kind: record.input_kind,
            values: &*self.values,
        };
        let translator: &dyn Translator = if record.translate {
            &*self.translator
        } else {
            &RawText
        };

        Ok(ValidatorEvaluator::new(translator)
            .show_only_last_message(self.options.show_only_last_message)
            .evaluate_pipeline(&record.pipeline, value, &ctx))
    }

    /// Writes an evaluation to the registry and summary, rendering it when
    /// `render` is set.
    fn apply(
        &mut self,
        field: &str,
        evaluation: FieldEvaluation,
        render: bool,
    ) -> FormResult<FieldOutcome> {
        let record = self.registry.find_mut(field).ok_or_else(|| unknown(field))?;
        record.is_valid = evaluation.valid;
        record.message = evaluation.message;
        if render {
            record.state = FieldState::from_validity(evaluation.valid);
        }

        self.summary.upsert(
            field,
            &record.message,
            &record.friendly_name,
            record.form_name.as_deref(),
        );

        let outcome = FieldOutcome {
            field: field.to_owned(),
            valid: record.is_valid,
            message: record.message.clone(),
            state: record.state,
        };
        if render {
            self.render(field, false);
        }
        Ok(outcome)
    }

    fn render(&mut self, field: &str, submitted: bool) {
        let Some(record) = self.registry.find(field) else {
            return;
        };
        if !record.is_valid && (submitted || record.dirty || record.touched) {
            self.renderer
                .show(field, &record.message, &record.error_target);
        } else {
            self.renderer.clear(field, &record.error_target);
        }
    }

    fn ensure_context(&self, scope: FormScope<'_>) -> FormResult<()> {
        let attached = match scope {
            FormScope::Page => self.page_attached,
            FormScope::Form(form) => self.attached_forms.contains(form),
        };
        if attached {
            Ok(())
        } else {
            Err(FormError::MissingValidationContext {
                scope: scope.to_string(),
            })
        }
    }

    fn failing_fields(&self, scope: FormScope<'_>) -> Vec<String> {
        self.summary_for(scope).map(|e| e.field.clone()).collect()
    }
}

fn unknown(field: &str) -> FormError {
    FormError::UnknownField {
        field: field.to_owned(),
    }
}
