//! Signup, password and input helpers through the public API

use rabit_guard::validation::{
    sanitize_input, validate_display_name, validate_email_address, validate_password_strength,
    validate_password_strength_in, validate_phone_number, validate_required_fields,
    validate_signup_payload, validate_signup_payload_in, Locale, Message, SignupPayload,
};
use serde_json::json;

#[test]
fn test_password_reports_every_failed_rule() {
    let result = validate_password_strength("abc");
    assert!(!result.is_valid);
    assert_eq!(
        result.errors,
        vec![
            "password must be at least 8 characters",
            "password must contain at least one uppercase letter",
            "password must contain at least one digit",
        ]
    );
    assert!(validate_password_strength("Str0ngPass").is_valid);
}

#[test]
fn test_password_messages_localized() {
    let result = validate_password_strength_in("short", Locale::Ar);
    assert_eq!(result.errors[0], Message::PasswordTooShort.text(Locale::Ar));
}

#[test]
fn test_signup_payload_from_json() {
    let payload: SignupPayload = serde_json::from_value(json!({
        "name": "سارة العتيبي",
        "email": "sara@rabit.sa",
        "phone": "+966 55 123 4567",
        "password": "Welcome1",
        "confirmPassword": "Welcome1"
    }))
    .unwrap();
    let result = validate_signup_payload(&payload);
    assert!(result.is_valid, "{:?}", result.errors);
}

#[test]
fn test_signup_payload_collects_field_errors() {
    let payload = SignupPayload {
        name: Some("x".into()),
        email: Some("not-an-email".into()),
        phone: Some("0412345678".into()),
        password: Some("weakpass".into()),
        confirm_password: Some("different".into()),
    };
    let result = validate_signup_payload(&payload);
    assert!(!result.is_valid);
    assert_eq!(result.errors["name"], "name must be 2 to 50 letters");
    assert_eq!(result.errors["email"], "invalid email address");
    assert_eq!(result.errors["phone"], "invalid Saudi mobile number");
    assert_eq!(
        result.errors["password"],
        "password must contain at least one uppercase letter"
    );
    assert_eq!(result.errors["confirmPassword"], "passwords do not match");
}

#[test]
fn test_signup_absent_fields_are_not_checked() {
    let result = validate_signup_payload_in(&SignupPayload::default(), Locale::Ar);
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
}

#[test]
fn test_field_predicates() {
    assert!(validate_email_address("ops@example.com"));
    assert!(!validate_email_address("ops@example"));
    assert!(validate_phone_number("0551234567"));
    assert!(!validate_phone_number("05512345"));
    assert!(validate_display_name("Noura"));
    assert!(!validate_display_name("N"));
    assert!(!validate_display_name("R2-D2"));
}

#[test]
fn test_sanitize_input() {
    assert_eq!(sanitize_input("  <b>hello</b>  "), "bhello/b");
    assert_eq!(sanitize_input("javascript:alert(1)"), "alert(1)");
    assert_eq!(sanitize_input("jav<ascript:x"), "x");
    assert_eq!(sanitize_input("img onerror=steal()"), "img steal()");
    assert_eq!(sanitize_input("plain text"), "plain text");
}

#[test]
fn test_required_fields() {
    let body = json!({ "name": "Project", "owner": "  ", "budget": null });
    let result = validate_required_fields(&body, &["name", "owner", "budget", "phase"], Locale::En);
    assert!(!result.is_valid);
    let missing: Vec<&str> = result.errors.keys().map(String::as_str).collect();
    assert_eq!(missing, vec!["budget", "owner", "phase"]);
    assert_eq!(result.errors["phase"], "required");
}
