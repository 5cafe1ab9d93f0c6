//! Flat regex extraction of email-like strings from page text.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Return every email-like substring of `text`, in order of appearance.
///
/// No deduplication and no validation beyond the pattern, so minified
/// scripts or asset names such as `logo@2x.png` come through as well.
pub fn extract_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
