//! Rule catalog: maps a rule name and its parameters to a definition.
//!
//! [`BuiltinCatalog`] ships the standard rule set. Applications with their
//! own rules implement [`RuleCatalog`] and usually delegate unknown names to
//! the built-in catalog.

use std::borrow::Cow;

use crate::condition::{Condition, Operator};
use crate::date::DateFormat;
use crate::error::{FormError, FormResult};
use crate::rule::descriptor::{LengthBounds, NON_EMPTY_PATTERN, RuleParams, ValidatorKind};

/// Catalog entry for one rule invocation, before pattern compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    /// Comparison semantics.
    pub kind: ValidatorKind,
    /// Regex source, if the rule uses one.
    pub pattern: Option<String>,
    /// Length rules are matched by character count; `pattern` then only
    /// shows the equivalent regex.
    pub length: Option<LengthBounds>,
    /// Default translation key.
    pub message_key: Cow<'static, str>,
    /// Parameters after catalog normalization.
    pub params: RuleParams,
}

impl RuleDefinition {
    fn regex(pattern: impl Into<String>, key: &'static str, params: &[String]) -> Self {
        Self {
            kind: ValidatorKind::Regex,
            pattern: Some(pattern.into()),
            length: None,
            message_key: Cow::Borrowed(key),
            params: params.iter().cloned().collect(),
        }
    }

    fn length(bounds: LengthBounds, key: &'static str, params: &[String]) -> Self {
        Self {
            kind: ValidatorKind::Regex,
            pattern: Some(bounds.pattern()),
            length: Some(bounds),
            message_key: Cow::Borrowed(key),
            params: params.iter().cloned().collect(),
        }
    }

    fn number(condition: Condition, key: &'static str, params: &[String]) -> Self {
        Self {
            kind: ValidatorKind::ConditionalNumber { condition },
            pattern: None,
            length: None,
            message_key: Cow::Borrowed(key),
            params: params.iter().cloned().collect(),
        }
    }
}

/// Resolves rule names.
pub trait RuleCatalog {
    /// Looks up `rule` with its (already split) parameters.
    ///
    /// Fails with [`FormError::UnknownRule`] for names the catalog does not
    /// know and [`FormError::InvalidRuleParams`] for bad parameters.
    fn lookup(&self, rule: &str, params: &[String]) -> FormResult<RuleDefinition>;
}

impl<C: RuleCatalog + ?Sized> RuleCatalog for Box<C> {
    fn lookup(&self, rule: &str, params: &[String]) -> FormResult<RuleDefinition> {
        (**self).lookup(rule, params)
    }
}

/// The standard rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog {
    lenient_date_formats: bool,
}

impl BuiltinCatalog {
    /// Creates the catalog with strict date format names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let unknown date format suffixes (`min_date_julian`) fall back to ISO.
    #[must_use = "builder methods must be chained or built"]
    pub fn lenient_date_formats(mut self, lenient: bool) -> Self {
        self.lenient_date_formats = lenient;
        self
    }

    fn date_rule(&self, rule: &str, params: &[String]) -> Option<FormResult<RuleDefinition>> {
        let (suffix, condition, key_suffix) = if let Some(s) = rule.strip_prefix("between_date_") {
            (s, Some(Condition::INCLUSIVE), "_BETWEEN")
        } else if let Some(s) = rule.strip_prefix("min_date_") {
            (s, Some(Condition::Single(Operator::Ge)), "_MIN")
        } else if let Some(s) = rule.strip_prefix("max_date_") {
            (s, Some(Condition::Single(Operator::Le)), "_MAX")
        } else if let Some(s) = rule.strip_prefix("date_") {
            (s, None, "")
        } else {
            return None;
        };

        Some(self.build_date_rule(rule, suffix, condition, key_suffix, params))
    }

    fn build_date_rule(
        &self,
        rule: &str,
        suffix: &str,
        condition: Option<Condition>,
        key_suffix: &str,
        params: &[String],
    ) -> FormResult<RuleDefinition> {
        let format = DateFormat::resolve(suffix, self.lenient_date_formats)?;
        let message_key = format!("INVALID_DATE_{}{key_suffix}", format.name());

        let Some(condition) = condition else {
            expect_params(rule, params, 0)?;
            return Ok(RuleDefinition {
                kind: ValidatorKind::Regex,
                pattern: Some(format.pattern()),
                length: None,
                message_key: Cow::Owned(message_key),
                params: RuleParams::new(),
            });
        };

        expect_params(rule, params, condition.arity())?;
        for param in params {
            format
                .parse(param)
                .map_err(|err| FormError::InvalidRuleParams {
                    rule: rule.to_owned(),
                    reason: err.to_string(),
                })?;
        }

        Ok(RuleDefinition {
            kind: ValidatorKind::ConditionalDate { format, condition },
            pattern: Some(format.pattern()),
            length: None,
            message_key: Cow::Owned(message_key),
            params: params.iter().cloned().collect(),
        })
    }
}

const ALPHA: &str = "a-zà-ÿ";

impl RuleCatalog for BuiltinCatalog {
    fn lookup(&self, rule: &str, params: &[String]) -> FormResult<RuleDefinition> {
        if let Some(definition) = self.date_rule(rule, params) {
            return definition;
        }

        let definition = match rule {
            "alpha" => RuleDefinition::regex(format!("^([{ALPHA}])+$"), "INVALID_ALPHA", &[]),
            "alpha_spaces" => {
                RuleDefinition::regex(format!(r"^([{ALPHA}\s])+$"), "INVALID_ALPHA_SPACE", &[])
            }
            "alpha_num" => {
                RuleDefinition::regex(format!("^([{ALPHA}0-9])+$"), "INVALID_ALPHA_NUM", &[])
            }
            "alpha_num_spaces" => RuleDefinition::regex(
                format!(r"^([{ALPHA}0-9\s])+$"),
                "INVALID_ALPHA_NUM_SPACE",
                &[],
            ),
            "alpha_dash" => {
                RuleDefinition::regex(format!("^([{ALPHA}0-9_-])+$"), "INVALID_ALPHA_DASH", &[])
            }
            "alpha_dash_spaces" => RuleDefinition::regex(
                format!(r"^([{ALPHA}0-9\s_-])+$"),
                "INVALID_ALPHA_DASH_SPACE",
                &[],
            ),
            "between_len" => {
                expect_params(rule, params, 2)?;
                let min = length_param(rule, &params[0])?;
                let max = length_param(rule, &params[1])?;
                RuleDefinition::length(
                    LengthBounds::new(min, Some(max)),
                    "INVALID_BETWEEN_CHAR",
                    params,
                )
            }
            "between" | "between_num" => {
                expect_numbers(rule, params, 2)?;
                RuleDefinition::number(Condition::INCLUSIVE, "INVALID_BETWEEN_NUM", params)
            }
            "between_num_exclusive" => {
                expect_numbers(rule, params, 2)?;
                RuleDefinition::number(
                    Condition::EXCLUSIVE,
                    "INVALID_BETWEEN_NUM_EXCLUSIVE",
                    params,
                )
            }
            "credit_card" => RuleDefinition::regex(
                r"^(?:4\d{12}(?:\d{3})?|5[1-5]\d{14}|3[47]\d{13}|6(?:011|5\d{2})\d{12}|3(?:0[0-5]|[68]\d)\d{11}|(?:2131|1800|35\d{3})\d{11})$",
                "INVALID_CREDIT_CARD",
                &[],
            ),
            "email" => RuleDefinition::regex(
                r"^[-\w.%+]{1,64}@(?:[a-z0-9-]{1,63}\.){1,125}[a-z]{2,63}$",
                "INVALID_EMAIL",
                &[],
            ),
            "exact_len" => {
                expect_params(rule, params, 1)?;
                let len = length_param(rule, &params[0])?;
                RuleDefinition::length(LengthBounds::exact(len), "INVALID_EXACT_LEN", params)
            }
            "float" => RuleDefinition::regex(r"^\d*\.\d+$", "INVALID_FLOAT", &[]),
            "float_signed" => {
                RuleDefinition::regex(r"^[-+]?\d*\.\d+$", "INVALID_FLOAT_SIGNED", &[])
            }
            "iban" => RuleDefinition::regex(
                r"^[a-z]{2}\d{2}\s?([0-9a-z]{4}\s?)*([0-9a-z]{1,4})$",
                "INVALID_IBAN",
                &[],
            ),
            "int" | "integer" => RuleDefinition::regex(r"^\d+$", "INVALID_INTEGER", &[]),
            "int_signed" | "integer_signed" => {
                RuleDefinition::regex(r"^[-+]?\d+$", "INVALID_INTEGER_SIGNED", &[])
            }
            "ip" | "ipv4" => RuleDefinition::regex(
                r"^(25[0-5]|2[0-4]\d|[01]?\d\d?)(\.(25[0-5]|2[0-4]\d|[01]?\d\d?)){3}$",
                "INVALID_IPV4",
                &[],
            ),
            "match" | "match_input" | "same" => {
                if params.is_empty() || params.len() > 2 {
                    return Err(FormError::InvalidRuleParams {
                        rule: rule.to_owned(),
                        reason: format!(
                            "expected a field name and an optional label, got {} parameters",
                            params.len()
                        ),
                    });
                }
                RuleDefinition {
                    kind: ValidatorKind::Match,
                    pattern: None,
                    length: None,
                    message_key: Cow::Borrowed("INVALID_INPUT_MATCH"),
                    params: params.iter().cloned().collect(),
                }
            }
            "max_len" => {
                expect_params(rule, params, 1)?;
                let max = length_param(rule, &params[0])?;
                RuleDefinition::length(LengthBounds::new(0, Some(max)), "INVALID_MAX_CHAR", params)
            }
            "max" | "max_num" => {
                expect_numbers(rule, params, 1)?;
                RuleDefinition::number(Condition::Single(Operator::Le), "INVALID_MAX_NUM", params)
            }
            "min_len" => {
                expect_params(rule, params, 1)?;
                let min = length_param(rule, &params[0])?;
                RuleDefinition::length(LengthBounds::new(min, None), "INVALID_MIN_CHAR", params)
            }
            "min" | "min_num" => {
                expect_numbers(rule, params, 1)?;
                RuleDefinition::number(Condition::Single(Operator::Ge), "INVALID_MIN_NUM", params)
            }
            "numeric" => RuleDefinition::regex(r"^\d*\.?\d+$", "INVALID_NUMERIC", &[]),
            "numeric_signed" => {
                RuleDefinition::regex(r"^[-+]?\d*\.?\d+$", "INVALID_NUMERIC_SIGNED", &[])
            }
            // The pattern and message come from the pipeline's custom clause.
            "regex" => RuleDefinition {
                kind: ValidatorKind::Regex,
                pattern: None,
                length: None,
                message_key: Cow::Borrowed("INVALID_PATTERN"),
                params: RuleParams::new(),
            },
            "required" => RuleDefinition::regex(NON_EMPTY_PATTERN, "INVALID_REQUIRED", &[]),
            "time" => RuleDefinition::regex(
                r"^([01]?\d|2[0-3]):[0-5]\d(:[0-5]\d)?$",
                "INVALID_TIME",
                &[],
            ),
            "url" => RuleDefinition::regex(
                r"^(https?|ftp)://[^\s/$.?#][^\s]*$",
                "INVALID_URL",
                &[],
            ),
            _ => {
                return Err(FormError::UnknownRule {
                    rule: rule.to_owned(),
                });
            }
        };

        Ok(definition)
    }
}

fn expect_params(rule: &str, params: &[String], expected: usize) -> FormResult<()> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(FormError::InvalidRuleParams {
            rule: rule.to_owned(),
            reason: format!("expected {expected} parameters, got {}", params.len()),
        })
    }
}

fn expect_numbers(rule: &str, params: &[String], expected: usize) -> FormResult<()> {
    expect_params(rule, params, expected)?;
    for param in params {
        param
            .trim()
            .parse::<f64>()
            .map_err(|_| FormError::InvalidRuleParams {
                rule: rule.to_owned(),
                reason: format!("`{param}` is not a number"),
            })?;
    }
    Ok(())
}

fn length_param(rule: &str, param: &str) -> FormResult<usize> {
    param
        .trim()
        .parse()
        .map_err(|_| FormError::InvalidRuleParams {
            rule: rule.to_owned(),
            reason: format!("`{param}` is not a length"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn required_uses_non_empty_sentinel() {
        let def = BuiltinCatalog::new().lookup("required", &[]).unwrap();
        assert_eq!(def.kind, ValidatorKind::Regex);
        assert_eq!(def.pattern.as_deref(), Some(NON_EMPTY_PATTERN));
        assert_eq!(def.message_key, "INVALID_REQUIRED");
    }

    #[test]
    fn between_is_inclusive_number_range() {
        let def = BuiltinCatalog::new()
            .lookup("between", &params(&["18", "65"]))
            .unwrap();
        assert_eq!(
            def.kind,
            ValidatorKind::ConditionalNumber {
                condition: Condition::INCLUSIVE
            }
        );
        assert_eq!(def.params.as_slice(), params(&["18", "65"]).as_slice());
    }

    #[test]
    fn length_rules_build_patterns() {
        let def = BuiltinCatalog::new()
            .lookup("between_len", &params(&["2", "5"]))
            .unwrap();
        assert_eq!(def.pattern.as_deref(), Some("^(?s:.){2,5}$"));
        assert_eq!(def.length, Some(LengthBounds::new(2, Some(5))));

        let def = BuiltinCatalog::new()
            .lookup("min_len", &params(&["3"]))
            .unwrap();
        assert_eq!(def.pattern.as_deref(), Some("^(?s:.){3,}$"));
    }

    #[test]
    fn date_rules_resolve_format_from_name() {
        let def = BuiltinCatalog::new()
            .lookup(
                "between_date_euro_long",
                &params(&["01/01/2020", "31/12/2020"]),
            )
            .unwrap();
        assert_eq!(
            def.kind,
            ValidatorKind::ConditionalDate {
                format: DateFormat::EuroLong,
                condition: Condition::INCLUSIVE,
            }
        );
        assert_eq!(def.message_key, "INVALID_DATE_EURO_LONG_BETWEEN");

        let def = BuiltinCatalog::new().lookup("date_iso", &[]).unwrap();
        assert_eq!(def.kind, ValidatorKind::Regex);
        assert_eq!(def.message_key, "INVALID_DATE_ISO");
    }

    #[test]
    fn unknown_date_suffix_is_strict_by_default() {
        let err = BuiltinCatalog::new()
            .lookup("min_date_julian", &params(&["2020-01-01"]))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidDateFormat { .. }));

        let def = BuiltinCatalog::new()
            .lenient_date_formats(true)
            .lookup("min_date_julian", &params(&["2020-01-01"]))
            .unwrap();
        assert!(matches!(
            def.kind,
            ValidatorKind::ConditionalDate {
                format: DateFormat::Iso,
                ..
            }
        ));
    }

    #[test]
    fn bad_params_are_rejected() {
        let catalog = BuiltinCatalog::new();
        assert!(matches!(
            catalog.lookup("between", &params(&["1"])),
            Err(FormError::InvalidRuleParams { .. })
        ));
        assert!(matches!(
            catalog.lookup("min", &params(&["three"])),
            Err(FormError::InvalidRuleParams { .. })
        ));
        assert!(matches!(
            catalog.lookup("min_date_iso", &params(&["2020-13-45"])),
            Err(FormError::InvalidRuleParams { .. })
        ));
        assert!(matches!(
            catalog.lookup("match", &[]),
            Err(FormError::InvalidRuleParams { .. })
        ));
    }

    #[test]
    fn unknown_rule() {
        assert!(matches!(
            BuiltinCatalog::new().lookup("palindrome", &[]),
            Err(FormError::UnknownRule { ref rule }) if rule == "palindrome"
        ));
    }
}
