//! Identifier (project name) validation
//!
//! Identifiers end up in URLs and storage keys, so they are restricted to
//! lowercase ASCII letters, digits and `.` `_` `-`, at most 100 characters,
//! and may not contain `---`.

use super::{Locale, Message, Rule, RuleSet, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum identifier length in characters
pub const MAX_IDENTIFIER_LENGTH: usize = 100;

static IDENTIFIER_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._-]+$").expect("identifier charset pattern is valid"));

fn has_content(candidate: &str) -> bool {
    !candidate.is_empty()
}

fn within_length(candidate: &str) -> bool {
    candidate.chars().count() <= MAX_IDENTIFIER_LENGTH
}

fn is_lowercase(candidate: &str) -> bool {
    candidate == candidate.to_lowercase()
}

fn in_charset(candidate: &str) -> bool {
    IDENTIFIER_CHARSET.is_match(candidate)
}

fn no_triple_hyphen(candidate: &str) -> bool {
    !candidate.contains("---")
}

static IDENTIFIER_RULES: [Rule<str>; 5] = [
    Rule::always("required", Message::Required, has_content),
    Rule::when("max-length", Message::IdentifierTooLong, has_content, within_length),
    Rule::when("lowercase", Message::MustBeLowercase, has_content, is_lowercase),
    Rule::when("charset", Message::InvalidIdentifierCharacters, has_content, in_charset),
    Rule::always("no-triple-hyphen", Message::TripleHyphen, no_triple_hyphen),
];

/// The identifier rule set, in evaluation order
pub static IDENTIFIER_RULE_SET: RuleSet<str> = RuleSet::new(&IDENTIFIER_RULES);

/// Validate an identifier, reporting messages in English
pub fn validate_identifier_name(candidate: &str) -> ValidationResult {
    validate_identifier_name_in(candidate, Locale::En)
}

/// Validate an identifier, reporting messages in `locale`
pub fn validate_identifier_name_in(candidate: &str, locale: Locale) -> ValidationResult {
    IDENTIFIER_RULE_SET.evaluate(candidate, locale)
}
