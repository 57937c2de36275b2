//! Access token extraction from the implicit-flow redirect.

const ACCESS_TOKEN_KEY: &str = "access_token";

/// Pull `access_token` out of the fragment of a redirect target.
///
/// The fragment is parsed as a query string; blank values count as missing.
pub fn extract_access_token(location: &str) -> Option<String> {
    let (_, fragment) = location.split_once('#')?;
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == ACCESS_TOKEN_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}
