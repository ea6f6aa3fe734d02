//! Generated account emails.
//!
//! Users never type their own email: it is derived from name and surname as
//! `name.surname@bugboard.it`, stripping diacritics, whitespace and
//! punctuation.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub const EMAIL_DOMAIN: &str = "bugboard.it";

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok());

/// Reduce a name component to lowercase ASCII letters and digits.
///
/// Decomposes with NFD first so that accented letters keep their base
/// character (`è` becomes `e`) instead of being dropped.
pub fn normalize_component(input: &str) -> String {
    input
        .nfd()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Build the email for a new account.
///
/// Returns `None` while either component normalizes to nothing, so a form
/// can show an empty preview until both names are usable.
pub fn generate_email(name: &str, surname: &str) -> Option<String> {
    let name = normalize_component(name);
    let surname = normalize_component(surname);
    if name.is_empty() || surname.is_empty() {
        return None;
    }
    Some(format!("{}.{}@{}", name, surname, EMAIL_DOMAIN))
}

/// Syntactic check applied before a password-recovery request.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}
