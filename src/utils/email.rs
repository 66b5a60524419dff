//! Email address extraction from conversation text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `local-part@domain.tld`: word characters, dot, plus and hyphen in
/// the local part; dot-separated domain labels; top-level label of at least
/// two letters. Case-insensitive.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Za-z0-9_.+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("email regex must compile")
});

/// Extract the first email-shaped substring from `text`, if any.
pub fn extract_email(text: &str) -> Option<&str> {
    EMAIL_RE.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_plain_address() {
        let text = "I've recorded your email as jane.doe@example.com, thanks!";
        assert_eq!(extract_email(text), Some("jane.doe@example.com"));
    }

    #[test]
    fn test_first_match_wins() {
        let text = "Is it a@one.com or b@two.org?";
        assert_eq!(extract_email(text), Some("a@one.com"));
    }

    #[test]
    fn test_plus_and_hyphen_in_local_part() {
        assert_eq!(
            extract_email("reach me at dev+leads@my-site.io"),
            Some("dev+leads@my-site.io")
        );
    }

    #[test]
    fn test_subdomains() {
        assert_eq!(
            extract_email("sales@mail.corp.example.co.uk is best"),
            Some("sales@mail.corp.example.co.uk")
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            extract_email("Sure: Jane.Doe@Example.COM"),
            Some("Jane.Doe@Example.COM")
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(extract_email("no address here"), None);
        assert_eq!(extract_email("half an @ sign"), None);
        // single-letter TLDs are not email-shaped
        assert_eq!(extract_email("x@y.z"), None);
    }
}
