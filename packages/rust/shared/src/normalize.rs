//! Participant and timestamp normalization.
//!
//! Used by the source adapter when turning raw issue records into
//! [`Thread`](crate::Thread)s and by the classifier when comparing authors.
//! Every function here is total: bad input degrades to a default value.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Login GitHub displays for deleted accounts.
pub const GHOST_LOGIN: &str = "ghost";

const PROFILE_BASE_URL: &str = "https://github.com";

/// Comparison key for an author login: trimmed and lowercased.
///
/// GitHub logins are case-insensitive, so `Alice` and `alice` are the same
/// account.
pub fn identity_key(login: &str) -> String {
    login.trim().to_lowercase()
}

/// Whether two logins name the same account.
pub fn same_identity(a: &str, b: &str) -> bool {
    let a = identity_key(a);
    !a.is_empty() && a == identity_key(b)
}

/// Display form of a login; blank or missing becomes [`GHOST_LOGIN`].
pub fn display_login(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(login) if !login.is_empty() => login.to_string(),
        _ => GHOST_LOGIN.to_string(),
    }
}

/// Profile URL for `login`, preferring the one the source supplied.
pub fn profile_url(login: &str, raw_url: Option<&str>) -> String {
    match raw_url.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("{PROFILE_BASE_URL}/{login}"),
    }
}

/// Parse a source timestamp into UTC.
///
/// Accepts RFC 3339 (`2024-01-02T03:04:05Z`, any offset) and the naive
/// `YYYY-MM-DD HH:MM:SS` form, which is taken as UTC. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// [`parse_timestamp`] over an optional field.
pub fn parse_optional_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

/// Question text for a thread: title, a blank line, then the body.
///
/// An empty body keeps the separator.
pub fn question_text(title: &str, body: &str) -> String {
    format!("{title}\n\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn identity_ignores_case_and_padding() {
        assert!(same_identity("Alice", "alice"));
        assert!(same_identity(" bob ", "BOB"));
        assert!(!same_identity("alice", "bob"));
        assert!(!same_identity("", ""));
        assert_eq!(identity_key("  MixedCase "), "mixedcase");
    }

    #[test]
    fn missing_login_is_ghost() {
        assert_eq!(display_login(None), "ghost");
        assert_eq!(display_login(Some("   ")), "ghost");
        assert_eq!(display_login(Some(" octocat ")), "octocat");
    }

    #[test]
    fn profile_url_falls_back_to_login() {
        assert_eq!(profile_url("octocat", None), "https://github.com/octocat");
        assert_eq!(profile_url("octocat", Some("")), "https://github.com/octocat");
        assert_eq!(
            profile_url("octocat", Some("https://ghe.example.com/octocat")),
            "https://ghe.example.com/octocat"
        );
    }

    #[test]
    fn parses_rfc3339_and_converts_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
    }

    #[test]
    fn parses_naive_forms_as_utc() {
        let expected = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(parse_timestamp("2023-12-31 23:59:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-12-31T23:59:00"), Some(expected));
    }

    #[test]
    fn malformed_timestamps_are_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-40T00:00:00Z"), None);
        assert_eq!(parse_optional_timestamp(None), None);
    }

    #[test]
    fn question_keeps_separator_for_empty_body() {
        assert_eq!(question_text("Title", ""), "Title\n\n");
        assert_eq!(question_text("Title", "Body"), "Title\n\nBody");
    }
}
