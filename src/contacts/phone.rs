use once_cell::sync::Lazy;
use regex::Regex;

static STORED_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[0-9]{9,15}$").expect("invalid phone regex"));

/// Trims surrounding whitespace and returns the number when it is in the
/// stored form: a `+` followed by nine to fifteen digits.
pub fn validate_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    STORED_PHONE
        .is_match(trimmed)
        .then(|| trimmed.to_string())
}

/// Best-effort E.164 normalisation for outbound SMS. Separators are stripped,
/// a `00` international prefix becomes `+`, and bare ten digit numbers are
/// treated as North American. Anything else yields `None`.
pub fn normalize_e164(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')')))
    {
        return None;
    }

    let candidate = if has_plus {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix("00") {
        format!("+{rest}")
    } else if digits.len() == 10 {
        format!("+1{digits}")
    } else if digits.len() == 11 && digits.starts_with('1') {
        format!("+{digits}")
    } else {
        return None;
    };

    // E.164 caps numbers at 15 digits.
    let len = candidate.len() - 1;
    (8..=15).contains(&len).then_some(candidate)
}
