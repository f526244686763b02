// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! E.164 phone normalization and syntactic validation.
//!
//! Both functions are pure and deterministic, and `normalize` is idempotent
//! over its own valid output. Validation is a plausibility check only; no
//! carrier or line-type lookup happens here.

/// Canonicalize a free-text phone string.
///
/// Strips everything except digits (a leading `+` is preserved). A
/// `+`-prefixed number is returned as-is; exactly 10 digits are assumed
/// North American and get `+1`; 11 digits starting with `1` get `+`;
/// anything else is `+`-prefixed unchanged.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if has_plus {
        return format!("+{digits}");
    }
    if digits.len() == 10 {
        return format!("+1{digits}");
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return format!("+{digits}");
    }
    format!("+{digits}")
}

/// Syntactic E.164 plausibility check: `+` followed by 7 to 15 digits.
pub fn is_valid(phone: &str) -> bool {
    let Some(rest) = phone.strip_prefix('+') else {
        return false;
    };
    (7..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}
