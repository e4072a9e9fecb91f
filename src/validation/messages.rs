//! Localized validation messages
//!
//! Every message the validators emit exists in English and Arabic. Callers
//! pick the display language per request, typically from `Accept-Language`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display language for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English (default)
    #[default]
    En,
    /// Arabic (right-to-left)
    Ar,
}

impl Locale {
    /// Whether text in this locale is laid out right-to-left
    pub fn is_rtl(&self) -> bool {
        matches!(self, Locale::Ar)
    }

    /// Language tag as used in HTTP headers
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    /// Pick a locale from an `Accept-Language` header value.
    ///
    /// Only the first (highest priority) language range is considered.
    /// Anything that is not Arabic falls back to English.
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let first = header
            .and_then(|h| h.split(',').next())
            .map(|range| range.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

        match first {
            Some(lang) if lang == "ar" || lang.starts_with("ar-") => Locale::Ar,
            _ => Locale::En,
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "ar" | "arabic" => Ok(Locale::Ar),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

/// A validation message key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    Required,
    IdentifierTooLong,
    MustBeLowercase,
    InvalidIdentifierCharacters,
    TripleHyphen,
    InvalidEmail,
    InvalidPhone,
    PasswordTooShort,
    PasswordMissingUppercase,
    PasswordMissingLowercase,
    PasswordMissingDigit,
    PasswordMismatch,
    InvalidDisplayName,
}

impl Message {
    /// Render the message in the given locale
    pub fn text(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.english(),
            Locale::Ar => self.arabic(),
        }
    }

    fn english(&self) -> &'static str {
        match self {
            Message::Required => "required",
            Message::IdentifierTooLong => "must be at most 100 characters",
            Message::MustBeLowercase => "must be lowercase",
            Message::InvalidIdentifierCharacters => {
                "must contain only lowercase letters, digits, and the symbols `.` `_` `-`"
            }
            Message::TripleHyphen => "must not contain the sequence `---`",
            Message::InvalidEmail => "invalid email address",
            Message::InvalidPhone => "invalid Saudi mobile number",
            Message::PasswordTooShort => "password must be at least 8 characters",
            Message::PasswordMissingUppercase => {
                "password must contain at least one uppercase letter"
            }
            Message::PasswordMissingLowercase => {
                "password must contain at least one lowercase letter"
            }
            Message::PasswordMissingDigit => "password must contain at least one digit",
            Message::PasswordMismatch => "passwords do not match",
            Message::InvalidDisplayName => "name must be 2 to 50 letters",
        }
    }

    fn arabic(&self) -> &'static str {
        match self {
            Message::Required => "هذا الحقل مطلوب",
            Message::IdentifierTooLong => "يجب ألا يتجاوز الاسم 100 حرف",
            Message::MustBeLowercase => "يجب أن يكون الاسم بأحرف صغيرة",
            Message::InvalidIdentifierCharacters => {
                "يجب أن يحتوي الاسم على أحرف إنجليزية صغيرة وأرقام والرموز `.` `_` `-` فقط"
            }
            Message::TripleHyphen => "يجب ألا يحتوي الاسم على التسلسل `---`",
            Message::InvalidEmail => "البريد الإلكتروني غير صالح",
            Message::InvalidPhone => "رقم الجوال السعودي غير صالح",
            Message::PasswordTooShort => "يجب أن تتكون كلمة المرور من 8 أحرف على الأقل",
            Message::PasswordMissingUppercase => "يجب أن تحتوي كلمة المرور على حرف كبير واحد على الأقل",
            Message::PasswordMissingLowercase => "يجب أن تحتوي كلمة المرور على حرف صغير واحد على الأقل",
            Message::PasswordMissingDigit => "يجب أن تحتوي كلمة المرور على رقم واحد على الأقل",
            Message::PasswordMismatch => "كلمتا المرور غير متطابقتين",
            Message::InvalidDisplayName => "يجب أن يتكون الاسم من 2 إلى 50 حرفًا",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.english())
    }
}
