//! Rule pipeline parser.
//!
//! A pipeline is a `|`-separated list of rule tokens. Each token is
//! `name[:param[:param...]][:alt=message]`, and a single parameter may also
//! be a comma list (`between:1,10`). One custom pattern may be embedded as
//! `regex:message:=pattern:regex`; it is lifted out before splitting so the
//! pattern can contain `|` and `:` freely.

use smallvec::SmallVec;

use crate::error::{FormError, FormResult};
use crate::rule::catalog::RuleCatalog;
use crate::rule::descriptor::{RuleParams, RulePattern, ValidatorDescriptor};

const REGEX_OPEN: &str = "regex:";
const REGEX_CLOSE: &str = ":regex";
const REGEX_SPLIT: &str = ":=";
const ALT_MARKER: &str = "alt=";

/// Message and pattern lifted out of a `regex:...:regex` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRegex {
    /// Message shown on failure (raw text or translation key).
    pub message: String,
    /// Pattern source.
    pub pattern: String,
}

/// The parsed form of a rule string.
#[derive(Debug, Clone, PartialEq)]
pub struct RulePipeline {
    source: String,
    rewritten: String,
    descriptors: Vec<ValidatorDescriptor>,
    required: bool,
}

impl RulePipeline {
    /// The rule string as supplied.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The rule string after the custom regex clause was reduced to `regex:`.
    #[must_use]
    pub fn rewritten(&self) -> &str {
        &self.rewritten
    }

    /// Descriptors in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[ValidatorDescriptor] {
        &self.descriptors
    }

    /// Whether any token is `required`.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the pipeline has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterates the descriptors in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidatorDescriptor> {
        self.descriptors.iter()
    }
}

impl<'a> IntoIterator for &'a RulePipeline {
    type Item = &'a ValidatorDescriptor;
    type IntoIter = std::slice::Iter<'a, ValidatorDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

/// Parses rule strings against a catalog.
pub struct RuleParser<'c> {
    catalog: &'c dyn RuleCatalog,
}

impl<'c> RuleParser<'c> {
    /// Creates a parser resolving names through `catalog`.
    #[must_use]
    pub fn new(catalog: &'c dyn RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Parses `rules` into an ordered pipeline.
    ///
    /// Parsing is all-or-nothing: the first malformed token aborts with an
    /// error and nothing is returned.
    pub fn parse(&self, rules: &str) -> FormResult<RulePipeline> {
        let (rewritten, custom) = extract_custom_regex(rules)?;

        let mut descriptors = Vec::new();
        for (position, token) in rewritten.split('|').enumerate() {
            let token = token.trim();
            let (name, params, alt_text) = split_token(token);
            if name.is_empty() {
                return Err(FormError::EmptyRuleToken {
                    rules: rules.to_owned(),
                    position,
                });
            }

            let params = normalize_params(&params);
            let definition = self.catalog.lookup(name, &params)?;

            let mut message_key = definition.message_key.into_owned();
            let mut alt_text = alt_text;
            let mut pattern_source = definition.pattern;

            if name == "regex" {
                let Some(custom) = custom.as_ref() else {
                    return Err(FormError::MalformedRegexClause {
                        rules: rules.to_owned(),
                        reason: "`regex` rule without a `regex:message:=pattern:regex` clause",
                    });
                };
                if descriptors
                    .iter()
                    .any(|d: &ValidatorDescriptor| d.rule == "regex")
                {
                    return Err(FormError::MalformedRegexClause {
                        rules: rules.to_owned(),
                        reason: "only one custom regex clause is allowed per pipeline",
                    });
                }
                pattern_source = Some(custom.pattern.clone());
                if !custom.message.trim().is_empty() {
                    message_key.clone_from(&custom.message);
                    // A custom message is shown verbatim when it is not a key.
                    alt_text = alt_text.or_else(|| Some(custom.message.clone()));
                }
            }

            let pattern = match definition.length {
                Some(bounds) => Some(RulePattern::length(bounds)),
                None => pattern_source
                    .map(|source| RulePattern::compile(name, source))
                    .transpose()?,
            };

            descriptors.push(ValidatorDescriptor {
                rule: name.to_owned(),
                kind: definition.kind,
                pattern,
                message_key,
                alt_text,
                params: definition.params,
            });
        }

        let required = descriptors.iter().any(|d| d.rule == "required");
        tracing::debug!(
            rules = %rules,
            count = descriptors.len(),
            required,
            "parsed rule pipeline"
        );

        Ok(RulePipeline {
            source: rules.to_owned(),
            rewritten,
            descriptors,
            required,
        })
    }
}

/// Parses `rules` against `catalog`.
pub fn parse_rules(rules: &str, catalog: &dyn RuleCatalog) -> FormResult<RulePipeline> {
    RuleParser::new(catalog).parse(rules)
}

/// Lifts the `regex:message:=pattern:regex` clause out of `rules`, leaving a
/// bare `regex:` marker in its place.
pub fn extract_custom_regex(rules: &str) -> FormResult<(String, Option<CustomRegex>)> {
    let Some(start) = rules.find(REGEX_OPEN) else {
        return Ok((rules.to_owned(), None));
    };

    let body_start = start + REGEX_OPEN.len();
    let Some(body_len) = rules[body_start..].find(REGEX_CLOSE) else {
        return Err(FormError::MalformedRegexClause {
            rules: rules.to_owned(),
            reason: "missing closing `:regex`",
        });
    };
    let body = &rules[body_start..body_start + body_len];

    let Some((message, pattern)) = body.split_once(REGEX_SPLIT) else {
        return Err(FormError::MalformedRegexClause {
            rules: rules.to_owned(),
            reason: "missing `:=` between message and pattern",
        });
    };

    let rest = &rules[body_start + body_len + REGEX_CLOSE.len()..];
    let rewritten = format!("{}{REGEX_OPEN}{rest}", &rules[..start]);

    Ok((
        rewritten,
        Some(CustomRegex {
            message: message.to_owned(),
            pattern: pattern.to_owned(),
        }),
    ))
}

/// Splits a token into name, raw parameters and alt text.
///
/// Everything from the first `alt=` segment on is the alt text, so it may
/// contain colons.
fn split_token(token: &str) -> (&str, SmallVec<[&str; 4]>, Option<String>) {
    let mut parts = token.split(':');
    let name = parts.next().unwrap_or_default().trim();

    let mut params = SmallVec::new();
    let mut alt = None;
    let rest: SmallVec<[&str; 4]> = parts.collect();
    for (i, part) in rest.iter().enumerate() {
        if let Some(first) = part.strip_prefix(ALT_MARKER) {
            let mut text = first.to_owned();
            for tail in &rest[i + 1..] {
                text.push(':');
                text.push_str(tail);
            }
            alt = Some(text);
            break;
        }
        params.push(*part);
    }

    (name, params, alt)
}

/// Drops empty parameters and expands a lone comma list.
fn normalize_params(raw: &[&str]) -> RuleParams {
    let params: SmallVec<[&str; 4]> = raw
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    match params.as_slice() {
        [single] if single.contains(',') => single
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => params.iter().map(|p| (*p).to_owned()).collect(),
    }
}
