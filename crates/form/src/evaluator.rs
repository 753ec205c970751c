//! Evaluation of parsed rules against a field value.
//!
//! Evaluation is pure: it reads the value, the field context and other
//! fields' values, and returns an outcome. Applying the outcome to the
//! registry and summary is the session's job.

use chrono::NaiveDateTime;
use smallvec::SmallVec;

use crate::adapter::{FieldValueSource, InputKind};
use crate::message::{INVALID_KEY_CHAR, MessageBuffer, Translator, render_rule_message};
use crate::rule::{RulePipeline, ValidatorDescriptor, ValidatorKind};

/// Everything about the field, besides its value, that evaluation reads.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    /// The pipeline contains `required`.
    pub required: bool,
    /// The field is disabled.
    pub disabled: bool,
    /// Input control kind.
    pub input_kind: InputKind,
    /// Values of other fields, for `match`.
    pub values: &'a dyn FieldValueSource,
}

impl std::fmt::Debug for FieldContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldContext")
            .field("required", &self.required)
            .field("disabled", &self.disabled)
            .field("input_kind", &self.input_kind)
            .finish_non_exhaustive()
    }
}

/// Result of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Whether the rule passed.
    pub valid: bool,
    /// Key of the reported failure.
    pub message_key: String,
    /// Rendered rule message; `None` when valid or untranslatable.
    pub message: Option<String>,
    /// Input notice reported ahead of the rule message (empty `number`
    /// input).
    pub notice: Option<String>,
}

/// Result of a whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEvaluation {
    /// `false` iff at least one rule failed.
    pub valid: bool,
    /// Composed, trimmed message; empty when valid.
    pub message: String,
    /// Names of the failing rules, in declaration order.
    pub failed_rules: SmallVec<[String; 4]>,
}

/// Evaluates descriptors and composes their messages.
pub struct ValidatorEvaluator<'t> {
    translator: &'t dyn Translator,
    show_only_last: bool,
}

impl<'t> ValidatorEvaluator<'t> {
    /// Creates an evaluator that renders messages through `translator`.
    #[must_use]
    pub fn new(translator: &'t dyn Translator) -> Self {
        Self {
            translator,
            show_only_last: false,
        }
    }

    /// Report only the last failing rule's message.
    #[must_use = "builder methods must be chained or built"]
    pub fn show_only_last_message(mut self, only_last: bool) -> Self {
        self.show_only_last = only_last;
        self
    }

    /// Evaluates one rule.
    pub fn evaluate(
        &self,
        descriptor: &ValidatorDescriptor,
        value: Option<&str>,
        ctx: &FieldContext<'_>,
    ) -> RuleOutcome {
        let check = check_rule(descriptor, value, ctx);
        let valid = check.valid || is_exempt(value, ctx);

        let mut outcome = RuleOutcome {
            valid,
            message_key: descriptor.message_key.clone(),
            message: None,
            notice: None,
        };
        if valid {
            return outcome;
        }
        tracing::trace!(
            rule = %descriptor.rule,
            kind = descriptor.kind.name(),
            "rule failed"
        );

        if check.key_char {
            outcome.message_key = INVALID_KEY_CHAR.to_owned();
            match self.translator.translate(INVALID_KEY_CHAR) {
                Ok(text) => outcome.notice = Some(text),
                Err(err) => tracing::warn!(error = %err, "no message for invalid number entry"),
            }
        }
        outcome.message = render_rule_message(descriptor, self.translator);
        outcome
    }

    /// Evaluates every rule of `pipeline` in declaration order.
    pub fn evaluate_pipeline(
        &self,
        pipeline: &RulePipeline,
        value: Option<&str>,
        ctx: &FieldContext<'_>,
    ) -> FieldEvaluation {
        let mut buffer = MessageBuffer::new(self.show_only_last);
        let mut failed_rules = SmallVec::new();
        let mut notice_shown = false;

        for descriptor in pipeline {
            let outcome = self.evaluate(descriptor, value, ctx);
            if outcome.valid {
                continue;
            }
            failed_rules.push(descriptor.rule.clone());
            if let Some(notice) = outcome.notice.filter(|_| !notice_shown) {
                buffer.push(&notice);
                notice_shown = true;
            }
            if let Some(message) = outcome.message {
                buffer.push(&message);
            }
        }

        let valid = failed_rules.is_empty();
        tracing::debug!(
            rules = %pipeline.source(),
            valid,
            failed = failed_rules.len(),
            "evaluated field"
        );

        let message = if valid {
            String::new()
        } else {
            buffer.finish()
        };
        FieldEvaluation {
            valid,
            message,
            failed_rules,
        }
    }
}

/// Optional fields with no value and disabled fields always pass.
fn is_exempt(value: Option<&str>, ctx: &FieldContext<'_>) -> bool {
    (!ctx.required && value.is_none_or(str::is_empty)) || ctx.disabled
}

#[derive(Debug, Clone, Copy)]
struct Check {
    valid: bool,
    key_char: bool,
}

impl Check {
    const fn of(valid: bool) -> Self {
        Self {
            valid,
            key_char: false,
        }
    }
}

fn check_rule(
    descriptor: &ValidatorDescriptor,
    value: Option<&str>,
    ctx: &FieldContext<'_>,
) -> Check {
    let pattern = descriptor.pattern.as_ref();
    match descriptor.kind {
        ValidatorKind::ConditionalDate { format, condition } => {
            let Some(value) = value else {
                return Check::of(false);
            };
            if pattern.is_some_and(|p| !p.is_match(value)) {
                return Check::of(false);
            }
            let Ok(date) = format.parse(value) else {
                return Check::of(false);
            };
            let bounds: Option<SmallVec<[NaiveDateTime; 2]>> = descriptor
                .params
                .iter()
                .map(|param| format.parse(param).ok())
                .collect();
            let Some(bounds) = bounds else {
                tracing::warn!(rule = %descriptor.rule, "date rule bound does not parse");
                return Check::of(false);
            };
            Check::of(condition.test(&date, &bounds))
        }
        ValidatorKind::ConditionalNumber { condition } => {
            let number = parse_float(value.unwrap_or_default());
            let bounds: SmallVec<[f64; 2]> =
                descriptor.params.iter().map(|p| parse_float(p)).collect();
            Check::of(condition.test(&number, &bounds))
        }
        ValidatorKind::Match => {
            let other = descriptor
                .params
                .first()
                .and_then(|field| ctx.values.current_value(field));
            Check::of(other.as_deref() == value)
        }
        ValidatorKind::Regex => {
            if ctx.disabled {
                return Check::of(true);
            }
            if value == Some("") && ctx.input_kind == InputKind::Number {
                return Check {
                    valid: false,
                    key_char: true,
                };
            }
            let Some(value) = value else {
                return Check::of(!(descriptor.is_non_empty_check() || ctx.required));
            };
            Check::of(pattern.is_none_or(|p| p.is_match(value)))
        }
    }
}

/// Parses the longest numeric prefix of `input`, like a browser's
/// `parseFloat`. Returns `NaN` when there is none.
#[must_use]
pub fn parse_float(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let mut frac_end = end + 1;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - end - 1;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FieldValues;
    use crate::message::MessageCatalog;
    use crate::rule::{BuiltinCatalog, parse_rules};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn pipeline(rules: &str) -> RulePipeline {
        parse_rules(rules, &BuiltinCatalog::new()).unwrap()
    }

    fn ctx<'a>(pipeline: &RulePipeline, values: &'a FieldValues) -> FieldContext<'a> {
        FieldContext {
            required: pipeline.is_required(),
            disabled: false,
            input_kind: InputKind::Text,
            values,
        }
    }

    fn run(rules: &str, value: Option<&str>) -> FieldEvaluation {
        let pipeline = pipeline(rules);
        let values = FieldValues::new();
        let catalog = MessageCatalog::english();
        let context = ctx(&pipeline, &values);
        ValidatorEvaluator::new(&catalog).evaluate_pipeline(&pipeline, value, &context)
    }

    #[rstest]
    #[case("12", 12.0)]
    #[case("  3.5kg", 3.5)]
    #[case("-4e2x", -400.0)]
    #[case(".5", 0.5)]
    #[case("5.", 5.0)]
    #[case("+7", 7.0)]
    #[case("1e", 1.0)]
    #[case("-Infinity", f64::NEG_INFINITY)]
    fn parse_float_prefix(#[case] input: &str, #[case] expected: f64) {
        assert_eq!(parse_float(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case(".")]
    #[case("-")]
    fn parse_float_nan(#[case] input: &str) {
        assert!(parse_float(input).is_nan());
    }

    #[test]
    fn age_between_reports_range() {
        let result = run("required|between:18,65", Some("17"));
        assert!(!result.valid);
        assert_eq!(
            result.message,
            "Needs to be a numeric value, between 18 and 65."
        );

        let result = run("required|between:18,65", Some("30"));
        assert!(result.valid);
        assert_eq!(result.message, "");
    }

    #[test]
    fn required_rejects_missing_and_blank() {
        assert!(!run("required", None).valid);
        assert!(!run("required", Some("")).valid);
        assert!(!run("required", Some("   ")).valid);
        assert!(run("required", Some("x")).valid);
    }

    #[test]
    fn optional_empty_value_passes() {
        assert!(run("min_len:3", None).valid);
        assert!(run("email", Some("")).valid);
        assert!(!run("email", Some("nope")).valid);
    }

    #[test]
    fn messages_accumulate_in_order() {
        let result = run("required|min_len:5|alpha", Some("ab1"));
        assert_eq!(
            result.failed_rules.as_slice(),
            ["min_len".to_owned(), "alpha".to_owned()]
        );
        assert_eq!(
            result.message,
            "Must be at least 5 characters. May only contain letters."
        );
    }

    #[test]
    fn show_only_last_keeps_final_message() {
        let pipeline = pipeline("required|min_len:5|alpha");
        let values = FieldValues::new();
        let catalog = MessageCatalog::english();
        let result = ValidatorEvaluator::new(&catalog)
            .show_only_last_message(true)
            .evaluate_pipeline(&pipeline, Some("ab1"), &ctx(&pipeline, &values));
        assert_eq!(result.message, "May only contain letters.");
    }

    #[test]
    fn match_compares_other_field() {
        let pipeline = pipeline("required|match:password,Password");
        let values = FieldValues::new();
        values.set("password", "s3cret");
        let catalog = MessageCatalog::english();
        let evaluator = ValidatorEvaluator::new(&catalog);
        let context = ctx(&pipeline, &values);

        let result = evaluator.evaluate_pipeline(&pipeline, Some("s3cret"), &context);
        assert!(result.valid);

        let result = evaluator.evaluate_pipeline(&pipeline, Some("other"), &context);
        assert_eq!(
            result.message,
            "Confirmation field does not match specified field \"Password\"."
        );
    }

    #[test]
    fn disabled_field_always_passes() {
        let pipeline = pipeline("required|email");
        let values = FieldValues::new();
        let catalog = MessageCatalog::english();
        let mut context = ctx(&pipeline, &values);
        context.disabled = true;
        let result = ValidatorEvaluator::new(&catalog).evaluate_pipeline(&pipeline, None, &context);
        assert!(result.valid);
    }

    #[test]
    fn empty_number_input_reports_key_char() {
        let pipeline = pipeline("required|numeric");
        let values = FieldValues::new();
        let catalog = MessageCatalog::english();
        let mut context = ctx(&pipeline, &values);
        context.input_kind = InputKind::Number;

        let evaluator = ValidatorEvaluator::new(&catalog);
        let outcome = evaluator.evaluate(&pipeline.descriptors()[0], Some(""), &context);
        assert!(!outcome.valid);
        assert_eq!(outcome.message_key, INVALID_KEY_CHAR);
        assert_eq!(
            outcome.notice.as_deref(),
            Some("Invalid keyboard entry on a field of type \"number\".")
        );
        assert_eq!(outcome.message.as_deref(), Some("Field is required."));

        let result = evaluator.evaluate_pipeline(&pipeline, Some(""), &context);
        assert_eq!(
            result.message,
            "Invalid keyboard entry on a field of type \"number\". Field is required. Must be a positive number."
        );
    }

    #[test]
    fn date_rules_compare_parsed_dates() {
        let rules = "between_date_euro_long:01/01/2020,31/12/2020";
        assert!(run(rules, Some("15/06/2020")).valid);
        assert!(run(rules, Some("31/12/2020")).valid);
        assert!(!run(rules, Some("01/01/2021")).valid);
        assert!(!run(rules, Some("2020-06-15")).valid);

        assert!(run("min_date_iso:2020-01-01", Some("2020-01-01 10:30:00")).valid);
        assert!(!run("max_date_iso:2020-01-01", Some("2020-01-02")).valid);
    }

    #[test]
    fn custom_regex_message_is_shown() {
        let result = run("regex:Uppercase only:=^[A-Z]+$:regex", Some("abc1"));
        assert_eq!(result.message, "Uppercase only");
        assert!(run("regex:Uppercase only:=^[A-Z]+$:regex", Some("abc")).valid);
    }

    #[test]
    fn non_numeric_value_fails_number_rule() {
        assert!(!run("required|min:3", Some("abc")).valid);
        assert!(run("required|min:3", Some("3 apples")).valid);
    }
}
