//! Generic request body checks and input sanitization

use super::{FieldValidation, Locale, Message};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static SCRIPT_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("script scheme pattern is valid"));

static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").expect("event handler pattern is valid"));

/// Strip markup-significant content from free text.
///
/// Trims, drops `<` and `>`, `javascript:` schemes and inline event handler
/// prefixes such as `onclick=`. Repeats until nothing changes, so the output
/// is a fixed point: sanitizing twice equals sanitizing once.
pub fn sanitize_input(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let without_brackets: String = current.chars().filter(|c| *c != '<' && *c != '>').collect();
        let without_scheme = SCRIPT_SCHEME.replace_all(&without_brackets, "");
        let without_handlers = EVENT_HANDLER.replace_all(&without_scheme, "");
        let next = without_handlers.trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Check that every named field is present in a JSON object body.
///
/// A field counts as missing when absent, `null`, or a blank string. A body
/// that is not an object reports every field.
pub fn validate_required_fields(body: &Value, fields: &[&str], locale: Locale) -> FieldValidation {
    let object = body.as_object();
    let errors: BTreeMap<String, String> = fields
        .iter()
        .filter(|field| {
            match object.and_then(|o| o.get(**field)) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            }
        })
        .map(|field| (field.to_string(), Message::Required.text(locale).to_string()))
        .collect();

    FieldValidation::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_strips_markup() {
        assert_eq!(sanitize_input("  <b>hello</b>  "), "bhello/b");
        assert_eq!(sanitize_input("javascript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_input("JavaScript :alert(1)"), "alert(1)");
        assert_eq!(sanitize_input("x onclick=run()"), "x run()");
        assert_eq!(sanitize_input("plain text"), "plain text");
    }

    #[test]
    fn test_sanitize_keeps_words_containing_on() {
        assert_eq!(sanitize_input("conclusion=final"), "conclusion=final");
        assert_eq!(sanitize_input("مرحبا"), "مرحبا");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in ["javajavascript:script:x", "<<script>>", " onon=load= ", "a > b"] {
            let once = sanitize_input(input);
            assert_eq!(sanitize_input(&once), once, "{}", input);
        }
        assert_eq!(sanitize_input("javajavascript:script:x"), "x");
    }

    #[test]
    fn test_required_fields() {
        let body = json!({"title": "Q3 report", "amount": 0, "note": "  ", "owner": null});
        let result = validate_required_fields(&body, &["title", "amount", "note", "owner", "due"], Locale::En);
        assert!(!result.is_valid);
        let missing: Vec<_> = result.errors.keys().cloned().collect();
        assert_eq!(missing, vec!["due", "note", "owner"]);
        assert_eq!(result.errors["due"], "required");
    }

    #[test]
    fn test_required_fields_non_object_body() {
        let result = validate_required_fields(&json!([1, 2]), &["a", "b"], Locale::En);
        assert_eq!(result.errors.len(), 2);
        assert!(validate_required_fields(&json!({}), &[], Locale::En).is_valid);
    }
}
