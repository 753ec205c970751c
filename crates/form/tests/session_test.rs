//! End-to-end tests of the validation session.

use std::time::{Duration, Instant};

use nebula_form::prelude::*;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Page {
    session: ValidationSession,
    values: FieldValues,
    renderer: RecordingRenderer,
}

#[fixture]
fn page() -> Page {
    init_tracing();
    let values = FieldValues::new();
    let renderer = RecordingRenderer::new();
    let session = ValidationSession::builder()
        .options(ValidationOptions::default().with_debounce(Duration::from_millis(200)))
        .values(values.clone())
        .renderer(renderer.clone())
        .build();
    Page {
        session,
        values,
        renderer,
    }
}

// ============================================================================
// SINGLE FIELD
// ============================================================================

#[rstest]
fn age_between_round_trip(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("age", "required|between:18:65").with_friendly_name("Age"))
        .unwrap();

    let outcome = session.blur("age", Some("17")).unwrap();
    assert!(!outcome.valid);
    assert_eq!(
        outcome.message,
        "Needs to be a numeric value, between 18 and 65."
    );
    assert_eq!(session.summary().get("age").unwrap().friendly_name, "Age");
    assert_eq!(
        page.renderer.message("age").as_deref(),
        Some("Needs to be a numeric value, between 18 and 65.")
    );

    let outcome = session.blur("age", Some("18")).unwrap();
    assert!(outcome.valid);
    assert!(!session.summary().contains("age"));
    assert_eq!(page.renderer.message("age"), None);

    session.blur("age", Some("70")).unwrap();
    assert!(session.remove_field("age"));
    assert!(session.summary().is_empty());
    assert!(session.field("age").is_none());
    assert_eq!(page.renderer.message("age"), None);
}

#[rstest]
fn repeated_evaluation_keeps_single_entry(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("email", "required|email"))
        .unwrap();

    session.validate_field("email", Some("nope")).unwrap();
    session.validate_field("email", Some("still nope")).unwrap();
    assert_eq!(session.summary().len(), 1);

    let valid = Some("ann@example.com");
    session.validate_field("email", valid).unwrap();
    session.validate_field("email", valid).unwrap();
    assert!(session.summary().is_empty());
}

#[rstest]
#[case("alpha|min_len:3", "")]
#[case("email", "")]
#[case("between:1,10", "")]
fn optional_empty_is_valid(mut page: Page, #[case] rules: &str, #[case] value: &str) {
    page.session
        .add_field(FieldAttributes::new("field", rules))
        .unwrap();
    let outcome = page.session.validate_field("field", Some(value)).unwrap();
    assert!(outcome.valid);
}

#[rstest]
fn custom_regex_message(mut page: Page) {
    let session = &mut page.session;
    let rules = "required|regex:Use capital letters:=^[A-Z]+$:regex|min_len:3";
    session
        .add_field(FieldAttributes::new("code", rules))
        .unwrap();

    let outcome = session.validate_field("code", Some("AB-")).unwrap();
    assert_eq!(outcome.message, "Use capital letters");

    let outcome = session.validate_field("code", Some("ab")).unwrap();
    assert_eq!(outcome.message, "Must be at least 3 characters.");
}

#[rstest]
fn show_only_last_message(mut page: Page) {
    let session = &mut page.session;
    session.set_show_only_last_message(true);
    session
        .add_field(FieldAttributes::new("user", "required|min_len:5|alpha"))
        .unwrap();

    let outcome = session.validate_field("user", Some("ab1")).unwrap();
    assert_eq!(outcome.message, "May only contain letters.");
}

#[rstest]
#[case(20_000)]
#[case(50_000)]
fn long_length_limits_are_accepted(mut page: Page, #[case] limit: usize) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("bio", format!("max_len:{limit}")))
        .unwrap();

    let text = "é".repeat(limit);
    let outcome = session.validate_field("bio", Some(text.as_str())).unwrap();
    assert!(outcome.valid);

    let over = format!("{text}!");
    let outcome = session.validate_field("bio", Some(over.as_str())).unwrap();
    assert!(!outcome.valid);
    assert_eq!(
        outcome.message,
        format!("May not be greater than {limit} characters.")
    );
}

// ============================================================================
// CROSS FIELD
// ============================================================================

#[rstest]
fn confirm_matches_password_at_evaluation_time(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("password", "required|min_len:6"))
        .unwrap();
    session
        .add_field(FieldAttributes::new("confirm", "required|match:password,Password"))
        .unwrap();

    page.values.set("password", "s3cret!");
    assert!(session.blur("confirm", Some("s3cret!")).unwrap().valid);

    page.values.set("password", "changed!");
    let outcome = session.blur("confirm", Some("s3cret!")).unwrap();
    assert!(!outcome.valid);
    assert_eq!(
        outcome.message,
        "Confirmation field does not match specified field \"Password\"."
    );
}

// ============================================================================
// DEBOUNCE
// ============================================================================

#[rstest]
fn debounced_typing_renders_once_idle(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("name", "required|min_len:3"))
        .unwrap();
    let t0 = Instant::now();

    for (i, value) in ["A", "An", "Ann"].into_iter().enumerate() {
        let at = t0 + Duration::from_millis(50) * u32::try_from(i).unwrap();
        assert_eq!(
            session.value_changed("name", Some(value), at).unwrap(),
            None
        );
    }
    assert_eq!(session.field_state("name"), Some(FieldState::Pending));
    assert_eq!(
        session.next_deadline(),
        Some(t0 + Duration::from_millis(300))
    );

    // Pre-validation already reflects the last value.
    assert!(!session.summary().contains("name"));

    let fired = session.poll(t0 + Duration::from_millis(300));
    assert_eq!(fired.len(), 1);
    assert!(fired[0].valid);
    assert_eq!(session.field_state("name"), Some(FieldState::Valid));
}

#[rstest]
fn per_field_debounce_overrides_session(mut page: Page) {
    let session = &mut page.session;
    let attrs = FieldAttributes::new("fast", "required").with_debounce(Duration::from_millis(20));
    session.add_field(attrs).unwrap();
    let t0 = Instant::now();
    session.value_changed("fast", Some("x"), t0).unwrap();
    assert_eq!(
        session.next_deadline(),
        Some(t0 + Duration::from_millis(20))
    );
}

#[rstest]
fn clearing_optional_field_cancels_timer(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("nickname", "alpha|min_len:3"))
        .unwrap();
    let t0 = Instant::now();

    assert_eq!(
        session.value_changed("nickname", Some("ab"), t0).unwrap(),
        None
    );
    assert!(session.summary().contains("nickname"));

    let outcome = session
        .value_changed("nickname", Some(""), t0 + Duration::from_millis(10))
        .unwrap()
        .unwrap();
    assert!(outcome.valid);
    assert_eq!(session.next_deadline(), None);
    assert!(session.summary().is_empty());
}

#[rstest]
fn empty_number_input_is_reported_immediately(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("qty", "required|int").with_input_kind(InputKind::Number))
        .unwrap();

    let outcome = session
        .value_changed("qty", Some(""), Instant::now())
        .unwrap()
        .unwrap();
    assert_eq!(
        outcome.message,
        "Invalid keyboard entry on a field of type \"number\". Field is required. Must be a positive integer."
    );
    assert!(page.renderer.message("qty").is_some());
}

#[rstest]
fn cleared_timers_never_fire(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("name", "required"))
        .unwrap();
    let t0 = Instant::now();
    session.value_changed("name", Some("x"), t0).unwrap();
    session.clear_pending();
    assert!(session.poll(t0 + Duration::from_secs(5)).is_empty());
    assert_eq!(session.field_state("name"), Some(FieldState::Unvalidated));
}

#[rstest]
fn reregistered_field_drops_old_timer(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("name", "required|min_len:3"))
        .unwrap();
    let t0 = Instant::now();
    assert_eq!(session.value_changed("name", Some("ab"), t0).unwrap(), None);
    assert_eq!(session.field_state("name"), Some(FieldState::Pending));

    session
        .add_field(FieldAttributes::new("name", "alpha"))
        .unwrap();
    assert_eq!(session.field_state("name"), Some(FieldState::Unvalidated));
    assert!(session.poll(t0 + Duration::from_secs(5)).is_empty());
    assert_eq!(page.renderer.message("name"), None);
    assert_eq!(session.registry().len(), 1);
}

// ============================================================================
// FORMS
// ============================================================================

#[rstest]
fn check_form_validity_touches_failing_fields(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("name", "required").with_form("signup"))
        .unwrap();
    session
        .add_field(FieldAttributes::new("email", "required|email").with_form("signup"))
        .unwrap();
    session
        .add_field(FieldAttributes::new("query", "required").with_form("search"))
        .unwrap();
    assert_eq!(page.renderer.visible_count(), 0);

    let signup = FormScope::Form("signup");
    assert!(!session.check_form_validity(signup).unwrap());
    assert!(session.field("name").unwrap().touched);
    assert!(!session.field("query").unwrap().touched);
    assert_eq!(
        page.renderer.message("name").as_deref(),
        Some("Field is required.")
    );
    assert_eq!(
        page.renderer.message("email").as_deref(),
        Some("Field is required. Must be a valid email address.")
    );
    assert_eq!(page.renderer.message("query"), None);

    session.blur("name", Some("Ann")).unwrap();
    session.blur("email", Some("ann@example.com")).unwrap();
    assert!(session.check_form_validity(signup).unwrap());
    assert!(!session.check_form_validity(FormScope::Page).unwrap());
}

#[rstest]
fn unknown_form_has_no_context(mut page: Page) {
    let err = page
        .session
        .check_form_validity(FormScope::Form("nowhere"))
        .unwrap_err();
    assert!(matches!(err, FormError::MissingValidationContext { .. }));
}

#[rstest]
fn stepping_back_drops_later_steps(mut page: Page) {
    let session = &mut page.session;
    page.values.set("step1", "done");
    session
        .add_field(FieldAttributes::new("step1", "required").with_form("wizard"))
        .unwrap();
    session
        .add_field(FieldAttributes::new("step2", "required").with_form("wizard"))
        .unwrap();

    let wizard = FormScope::Form("wizard");
    let removed = session.clear_invalid_entries_ahead(wizard).unwrap();
    assert_eq!(removed, ["step2"]);
    assert!(session.field("step2").is_none());
    assert!(session.check_form_validity(wizard).unwrap());
}

#[rstest]
fn remove_several_fields(mut page: Page) {
    let session = &mut page.session;
    for name in ["a", "b", "c"] {
        session
            .add_field(FieldAttributes::new(name, "required"))
            .unwrap();
    }
    assert_eq!(session.remove_fields(&["a", "c", "missing"]), 2);
    let left: Vec<_> = session
        .registry()
        .all()
        .map(|r| r.field_name.as_str())
        .collect();
    assert_eq!(left, ["b"]);
}

// ============================================================================
// LIFECYCLE AND CONFIGURATION
// ============================================================================

#[rstest]
fn route_change_resets_unless_suppressed(mut page: Page) {
    let session = &mut page.session;
    session
        .add_field(FieldAttributes::new("name", "required").with_form("signup"))
        .unwrap();

    session.set_suppress_auto_reset(true);
    assert!(!session.on_route_change());
    assert_eq!(session.registry().len(), 1);

    session.set_suppress_auto_reset(false);
    assert!(session.on_route_change());
    assert!(session.registry().is_empty());
    assert!(session.summary().is_empty());
    let signup = FormScope::Form("signup");
    assert!(session.check_form_validity(signup).is_err());
}

#[rstest]
fn attributes_from_markup_json(mut page: Page) {
    let attrs = FieldAttributes::from_json(
        r##"{
            "elmName": "zip",
            "validation": "required|exact_len:5",
            "typingLimit": "0",
            "validationErrorTo": "#zip-error",
            "friendlyName": "ZIP_LABEL"
        }"##,
    )
    .unwrap();
    page.session.add_field(attrs).unwrap();

    page.session.blur("zip", Some("123")).unwrap();
    assert_eq!(
        page.renderer.target("zip"),
        Some(ErrorTarget::Id("zip-error".into()))
    );
    assert_eq!(
        page.session.summary().get("zip").unwrap().friendly_name,
        "ZIP_LABEL"
    );
}

#[test]
fn friendly_name_and_messages_are_translated() {
    let translator = MessageCatalog::english()
        .with("AGE_LABEL", "Âge")
        .with("INVALID_REQUIRED", "Champ requis.");
    let mut session = ValidationSession::builder().translator(translator).build();
    session
        .add_field(FieldAttributes::new("age", "required").with_friendly_name("AGE_LABEL"))
        .unwrap();

    let entry = session.summary().get("age").unwrap();
    assert_eq!(entry.friendly_name, "Âge");
    assert_eq!(entry.message, "Champ requis.");
}

#[test]
fn untranslated_field_shows_keys() {
    let mut session = ValidationSession::new();
    session
        .add_field(FieldAttributes::new("age", "required|min:18").with_translate(false))
        .unwrap();
    let outcome = session.validate_field("age", Some("3")).unwrap();
    assert_eq!(outcome.message, "INVALID_MIN_NUM");
}

#[test]
fn strict_date_formats_by_default() {
    let mut session = ValidationSession::new();
    let err = session
        .add_field(FieldAttributes::new("when", "min_date_julian:2020-01-01"))
        .unwrap_err();
    assert!(matches!(err, FormError::InvalidDateFormat { .. }));

    let mut lenient = ValidationSession::builder()
        .options(ValidationOptions::default().with_lenient_date_formats(true))
        .build();
    lenient
        .add_field(FieldAttributes::new("when", "min_date_julian:2020-01-01"))
        .unwrap();
    let outcome = lenient.validate_field("when", Some("2021-05-05")).unwrap();
    assert!(outcome.valid);
}
