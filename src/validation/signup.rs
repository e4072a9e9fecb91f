//! Signup form validation
//!
//! Field validators for email, Saudi mobile numbers, password strength and
//! display names, composed into a partial payload validator: absent fields
//! are never checked.

use super::{FieldValidation, Locale, Message, Rule, RuleSet, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum email length (RFC 5321 path limit)
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Display name length bounds, in characters after trimming
pub const MIN_DISPLAY_NAME_LENGTH: usize = 2;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

// 05XXXXXXXX, 5XXXXXXXX, 9665XXXXXXXX, +9665XXXXXXXX, 009665XXXXXXXX
static SAUDI_MOBILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+966|00966|966|0)?5[0-9]{8}$").expect("phone pattern is valid"));

static DISPLAY_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{M}][\p{L}\p{M} '.\-]*$").expect("display name pattern is valid")
});

/// Signup request body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

/// Check an email address shape (`local@domain.tld`, no whitespace)
pub fn validate_email_address(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && EMAIL_PATTERN.is_match(email)
}

/// Check a Saudi mobile number. Spaces and dashes are ignored.
pub fn validate_phone_number(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    SAUDI_MOBILE_PATTERN.is_match(&compact)
}

fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

fn has_uppercase(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase())
}

fn has_lowercase(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
}

fn has_digit(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_digit())
}

static PASSWORD_RULES: [Rule<str>; 4] = [
    Rule::always("min-length", Message::PasswordTooShort, long_enough),
    Rule::always("uppercase", Message::PasswordMissingUppercase, has_uppercase),
    Rule::always("lowercase", Message::PasswordMissingLowercase, has_lowercase),
    Rule::always("digit", Message::PasswordMissingDigit, has_digit),
];

static PASSWORD_RULE_SET: RuleSet<str> = RuleSet::new(&PASSWORD_RULES);

/// Check password strength, reporting every failing rule in English
pub fn validate_password_strength(password: &str) -> ValidationResult {
    validate_password_strength_in(password, Locale::En)
}

/// Check password strength, reporting every failing rule in `locale`
pub fn validate_password_strength_in(password: &str, locale: Locale) -> ValidationResult {
    PASSWORD_RULE_SET.evaluate(password, locale)
}

/// Check a display name: 2-50 letters (any script), spaces, `'`, `-`, `.`
pub fn validate_display_name(name: &str) -> bool {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    (MIN_DISPLAY_NAME_LENGTH..=MAX_DISPLAY_NAME_LENGTH).contains(&length)
        && DISPLAY_NAME_PATTERN.is_match(trimmed)
}

/// Validate the fields present in a signup payload, English messages
pub fn validate_signup_payload(payload: &SignupPayload) -> FieldValidation {
    validate_signup_payload_in(payload, Locale::En)
}

/// Validate the fields present in a signup payload.
///
/// Each field reports at most one message. `confirmPassword` is compared
/// with `password` only when both are present.
pub fn validate_signup_payload_in(payload: &SignupPayload, locale: Locale) -> FieldValidation {
    let mut errors = BTreeMap::new();

    if let Some(name) = &payload.name {
        if !validate_display_name(name) {
            errors.insert("name".to_string(), Message::InvalidDisplayName.text(locale).to_string());
        }
    }

    if let Some(email) = &payload.email {
        if !validate_email_address(email) {
            errors.insert("email".to_string(), Message::InvalidEmail.text(locale).to_string());
        }
    }

    if let Some(phone) = &payload.phone {
        if !validate_phone_number(phone) {
            errors.insert("phone".to_string(), Message::InvalidPhone.text(locale).to_string());
        }
    }

    if let Some(password) = &payload.password {
        if let Some(first) = PASSWORD_RULE_SET.violations(password).first() {
            errors.insert("password".to_string(), first.text(locale).to_string());
        }
    }

    if let (Some(password), Some(confirm)) = (&payload.password, &payload.confirm_password) {
        if password != confirm {
            errors.insert(
                "confirmPassword".to_string(),
                Message::PasswordMismatch.text(locale).to_string(),
            );
        }
    }

    FieldValidation::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(validate_email_address("hr@rabit.sa"));
        assert!(validate_email_address("first.last+tag@example.co.uk"));
        assert!(!validate_email_address("no-at-sign.com"));
        assert!(!validate_email_address("a@b"));
        assert!(!validate_email_address("a b@c.com"));
        assert!(!validate_email_address("a@@c.com"));
        assert!(!validate_email_address(""));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(!validate_email_address(&long));
    }

    #[test]
    fn test_saudi_phone_formats() {
        for phone in [
            "0512345678",
            "512345678",
            "966512345678",
            "+966512345678",
            "00966512345678",
            "+966 51 234 5678",
            "051-234-5678",
        ] {
            assert!(validate_phone_number(phone), "{} should be accepted", phone);
        }
        for phone in ["0412345678", "05123456", "+966412345678", "+1 555 123 4567", "", "05123456789"] {
            assert!(!validate_phone_number(phone), "{} should be rejected", phone);
        }
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Str0ngPass").is_valid);
        let weak = validate_password_strength("abc");
        assert_eq!(
            weak.errors,
            vec![
                "password must be at least 8 characters",
                "password must contain at least one uppercase letter",
                "password must contain at least one digit",
            ]
        );
    }

    #[test]
    fn test_display_name() {
        assert!(validate_display_name("Sara Al-Harbi"));
        assert!(validate_display_name("سارة الحربي"));
        assert!(validate_display_name("  Li  "));
        assert!(!validate_display_name("A"));
        assert!(!validate_display_name("R2D2"));
        assert!(!validate_display_name(&"a".repeat(51)));
        assert!(!validate_display_name("-dash"));
    }

    #[test]
    fn test_empty_payload_is_valid() {
        let result = validate_signup_payload(&SignupPayload::default());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_only_present_fields_checked() {
        let payload = SignupPayload {
            email: Some("broken".to_string()),
            ..Default::default()
        };
        let result = validate_signup_payload(&payload);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors["email"], "invalid email address");
    }

    #[test]
    fn test_password_mismatch() {
        let payload = SignupPayload {
            password: Some("Str0ngPass".to_string()),
            confirm_password: Some("Str0ngPas".to_string()),
            ..Default::default()
        };
        let result = validate_signup_payload(&payload);
        assert_eq!(result.errors["confirmPassword"], "passwords do not match");
        assert!(!result.errors.contains_key("password"));
    }

    #[test]
    fn test_confirm_without_password_not_compared() {
        let payload = SignupPayload {
            confirm_password: Some("whatever".to_string()),
            ..Default::default()
        };
        assert!(validate_signup_payload(&payload).is_valid);
    }

    #[test]
    fn test_weak_password_reports_first_rule() {
        let payload = SignupPayload {
            password: Some("lowercaseonly".to_string()),
            ..Default::default()
        };
        let result = validate_signup_payload(&payload);
        assert_eq!(
            result.errors["password"],
            "password must contain at least one uppercase letter"
        );
    }

    #[test]
    fn test_arabic_field_messages() {
        let payload = SignupPayload {
            phone: Some("123".to_string()),
            ..Default::default()
        };
        let result = validate_signup_payload_in(&payload, Locale::Ar);
        assert_eq!(result.errors["phone"], Message::InvalidPhone.text(Locale::Ar));
    }

    #[test]
    fn test_payload_deserializes_camel_case() {
        let payload: SignupPayload = serde_json::from_str(
            r#"{"email":"hr@rabit.sa","password":"Str0ngPass","confirmPassword":"Str0ngPass"}"#,
        )
        .unwrap();
        assert_eq!(payload.confirm_password.as_deref(), Some("Str0ngPass"));
        assert!(payload.name.is_none());
        assert!(validate_signup_payload(&payload).is_valid);
    }
}
