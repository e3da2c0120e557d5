//! `Set-Cookie` response header extraction.

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// Separator used when several `Set-Cookie` entries are folded into one value.
const ENTRY_SEPARATOR: &str = ", ";

/// Extracts the value of the named cookie from a response's `Set-Cookie` headers.
///
/// Returns `None` when no entry sets the cookie. Absence is a legitimate
/// outcome (for example the callback does not set a session cookie when the
/// provider accounts were only linked).
#[must_use]
pub fn extract_set_cookie(name: &str, headers: &HeaderMap) -> Option<String> {
    let values = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok());
    let found = extract_from_set_cookie_values(name, values);
    debug!(cookie = name, found = found.is_some(), "set-cookie lookup");
    found
}

/// Extracts the named cookie from raw `Set-Cookie` header values.
///
/// Each value may hold a single entry or several entries joined with `", "`.
/// The first entry starting with `name=` wins; its value is the text between
/// `=` and the first `;`.
pub fn extract_from_set_cookie_values<'a>(
    name: &str,
    values: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let key = format!("{name}=");
    values
        .into_iter()
        .flat_map(|value| value.split(ENTRY_SEPARATOR))
        .find_map(|entry| entry.trim_start().strip_prefix(key.as_str()))
        .map(|rest| rest.split(';').next().unwrap_or(rest).to_string())
}

/// Returns the bare CSRF token from a CSRF cookie value.
///
/// The cookie holds `<token>|<hash>`, URL-encoded as `<token>%7C<hash>`. The
/// sign-out form expects only `<token>`. Values without a separator are
/// returned unchanged.
#[must_use]
pub fn csrf_token_from_cookie(value: &str) -> String {
    let decoded = urlencoding::decode(value).map_or_else(|_| value.to_string(), |d| d.into_owned());
    match decoded.split_once('|') {
        Some((token, _hash)) => token.to_string(),
        None => decoded,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extracts_from_combined_value_in_any_order() {
        let forward = ["a=1; Path=/, b=2; Path=/"];
        let reverse = ["b=2; Path=/, a=1; Path=/"];
        assert_eq!(
            extract_from_set_cookie_values("b", forward),
            Some("2".to_string())
        );
        assert_eq!(
            extract_from_set_cookie_values("b", reverse),
            Some("2".to_string())
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let map = headers(&["a=1; Path=/", "b=2; Path=/"]);
        let first = extract_set_cookie("b", &map);
        let second = extract_set_cookie("b", &map);
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("2"));
    }

    #[test]
    fn test_extracts_from_separate_header_lines() {
        let map = headers(&[
            "next-auth.state=enc-state; Path=/; HttpOnly",
            "next-auth.pkce.code_verifier=verifier; Path=/; HttpOnly",
        ]);
        assert_eq!(
            extract_set_cookie("next-auth.pkce.code_verifier", &map).as_deref(),
            Some("verifier")
        );
        assert_eq!(
            extract_set_cookie("next-auth.state", &map).as_deref(),
            Some("enc-state")
        );
    }

    #[test]
    fn test_missing_cookie_is_none() {
        let map = headers(&["a=1; Path=/"]);
        assert_eq!(extract_set_cookie("b", &map), None);
        assert_eq!(extract_set_cookie("b", &HeaderMap::new()), None);
    }

    #[test]
    fn test_name_must_match_whole_key() {
        // "next-auth.state" must not match "next-auth.state-extra" or a suffix
        let values = ["next-auth.state-extra=x; Path=/, __Secure-next-auth.state=y"];
        assert_eq!(extract_from_set_cookie_values("next-auth.state", values), None);
    }

    #[test]
    fn test_value_without_attributes() {
        assert_eq!(
            extract_from_set_cookie_values("token", ["token=abc"]),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_value_keeps_embedded_equals_signs() {
        assert_eq!(
            extract_from_set_cookie_values("token", ["token=abc==; Path=/"]),
            Some("abc==".to_string())
        );
    }

    #[test]
    fn test_expires_attribute_comma_does_not_confuse_lookup() {
        let values = ["a=1; Expires=Wed, 21 Oct 2026 07:28:00 GMT; Path=/, b=2; Path=/"];
        assert_eq!(
            extract_from_set_cookie_values("b", values),
            Some("2".to_string())
        );
        assert_eq!(
            extract_from_set_cookie_values("a", values),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_csrf_token_from_encoded_cookie() {
        assert_eq!(csrf_token_from_cookie("tok123%7Chash456"), "tok123");
        assert_eq!(csrf_token_from_cookie("tok123|hash456"), "tok123");
    }

    #[test]
    fn test_csrf_token_without_separator_is_unchanged() {
        assert_eq!(csrf_token_from_cookie("plain"), "plain");
    }
}
