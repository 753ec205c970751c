//! # nebula-form
//!
//! Declarative form-field validation for interactive UIs.
//!
//! Each field carries a rule pipeline such as `required|between:18,65` or
//! `required|regex:Uppercase only:=^[A-Z]+$:regex`. A [`ValidationSession`]
//! parses the pipeline once, evaluates it on value changes after a debounce
//! delay (or immediately on blur), keeps a per-form summary of failing
//! fields, and tells an [`ErrorRenderer`] what to show.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nebula_form::prelude::*;
//!
//! let values = FieldValues::new();
//! let mut session = ValidationSession::builder().values(values.clone()).build();
//! session.add_field(
//!     FieldAttributes::new("age", "required|between:18,65").with_form("signup"),
//! )?;
//!
//! let outcome = session.blur("age", Some("17"))?;
//! assert_eq!(outcome.message, "Needs to be a numeric value, between 18 and 65.");
//! assert!(!session.check_form_validity(FormScope::Form("signup"))?);
//! ```
//!
//! ## Building blocks
//!
//! - [`rule`]: pipeline parsing and the built-in rule catalog
//! - [`date`] and [`condition`]: date parsing and comparison operators
//! - [`evaluator`]: pure evaluation of a pipeline against a value
//! - [`registry`] and [`summary`]: per-field state and current errors
//! - [`adapter`]: the host seams (values, rendering, error targets)

pub mod adapter;
pub mod condition;
pub mod date;
pub mod debounce;
pub mod error;
pub mod evaluator;
pub mod message;
pub mod options;
pub mod prelude;
pub mod registry;
pub mod rule;
pub mod session;
pub mod summary;

pub use adapter::{ErrorRenderer, ErrorTarget, FieldValueSource, FieldValues, InputKind};
pub use error::{FormError, FormResult};
pub use options::{FieldAttributes, ValidationOptions};
pub use session::{FieldOutcome, FormScope, ValidationSession};
