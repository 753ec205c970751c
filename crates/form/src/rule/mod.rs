//! Rule strings: parsing, the rule catalog and parsed descriptors.

pub mod catalog;
pub mod descriptor;
pub mod parser;

pub use catalog::{BuiltinCatalog, RuleCatalog, RuleDefinition};
pub use descriptor::{
    LengthBounds, NON_EMPTY_PATTERN, RuleParams, RulePattern, ValidatorDescriptor, ValidatorKind,
};
pub use parser::{CustomRegex, RuleParser, RulePipeline, extract_custom_regex, parse_rules};
