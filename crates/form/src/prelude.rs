//! Prelude module for convenient imports.
//!
//! `use nebula_form::prelude::*;` brings in the session, its collaborators
//! and the types needed to define custom rules or translations.

// ============================================================================
// SESSION
// ============================================================================

pub use crate::session::{FieldOutcome, FormScope, ValidationSession, ValidationSessionBuilder};

pub use crate::options::{FieldAttributes, ValidationOptions};

pub use crate::registry::{FieldRecord, FieldState};

pub use crate::summary::{SummaryEntry, ValidationSummary};

// ============================================================================
// COLLABORATORS
// ============================================================================

pub use crate::adapter::{
    ErrorRenderer, ErrorTarget, FieldValueSource, FieldValues, InputKind, NullRenderer,
    RecordingRenderer,
};

pub use crate::message::{MessageCatalog, Translator};

pub use crate::rule::{BuiltinCatalog, RuleCatalog, RuleDefinition};

// ============================================================================
// ERRORS
// ============================================================================

pub use crate::error::{DateParseError, FormError, FormResult, TranslationError};
