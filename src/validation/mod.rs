//! Input validation
//!
//! Rule-based validators for identifiers, signup payloads and generic
//! request bodies. Validators never fail with an error: they always return a
//! result value and the caller decides what to do with `is_valid`.

pub mod identifier;
pub mod input;
pub mod messages;
pub mod signup;

pub use identifier::{validate_identifier_name, validate_identifier_name_in, MAX_IDENTIFIER_LENGTH};
pub use input::{sanitize_input, validate_required_fields};
pub use messages::{Locale, Message};
pub use signup::{
    validate_display_name, validate_email_address, validate_password_strength,
    validate_password_strength_in, validate_phone_number, validate_signup_payload,
    validate_signup_payload_in, SignupPayload,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of checking one value against a rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Build a result from the messages that fired, in order
    pub fn from_messages(messages: &[Message], locale: Locale) -> Self {
        Self {
            is_valid: messages.is_empty(),
            errors: messages.iter().map(|m| m.text(locale).to_string()).collect(),
        }
    }
}

/// Outcome of validating a multi-field payload
///
/// At most one message per field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl FieldValidation {
    pub(crate) fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// A named predicate paired with the message it reports on failure.
///
/// `applies` gates evaluation: a rule that does not apply to a candidate
/// never reports, which is how "only check when non-empty" rules are
/// expressed.
pub struct Rule<T: ?Sized> {
    pub name: &'static str,
    pub message: Message,
    applies: fn(&T) -> bool,
    check: fn(&T) -> bool,
}

impl<T: ?Sized> Rule<T> {
    /// A rule evaluated for every candidate
    pub const fn always(name: &'static str, message: Message, check: fn(&T) -> bool) -> Self {
        Self {
            name,
            message,
            applies: always_applies::<T>,
            check,
        }
    }

    /// A rule evaluated only when `applies` holds for the candidate
    pub const fn when(
        name: &'static str,
        message: Message,
        applies: fn(&T) -> bool,
        check: fn(&T) -> bool,
    ) -> Self {
        Self {
            name,
            message,
            applies,
            check,
        }
    }

    /// Whether the candidate violates this rule
    pub fn violated_by(&self, candidate: &T) -> bool {
        (self.applies)(candidate) && !(self.check)(candidate)
    }
}

fn always_applies<T: ?Sized>(_: &T) -> bool {
    true
}

/// Conjunction of rules. Every rule is evaluated; there is no early exit.
pub struct RuleSet<T: ?Sized + 'static> {
    rules: &'static [Rule<T>],
}

impl<T: ?Sized + 'static> RuleSet<T> {
    pub const fn new(rules: &'static [Rule<T>]) -> Self {
        Self { rules }
    }

    /// Messages of every violated rule, in rule order
    pub fn violations(&self, candidate: &T) -> Vec<Message> {
        self.rules
            .iter()
            .filter(|rule| rule.violated_by(candidate))
            .map(|rule| rule.message)
            .collect()
    }

    /// Evaluate the candidate and render messages in `locale`
    pub fn evaluate(&self, candidate: &T, locale: Locale) -> ValidationResult {
        ValidationResult::from_messages(&self.violations(candidate), locale)
    }

    /// Names of the rules in evaluation order
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name)
    }
}
