//! Share links: source code carried in a `?code=` query parameter.
//!
//! The parameter holds base64 of the percent-encoded source, the same
//! format the browser playground produces with
//! `btoa(encodeURIComponent(code))`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ShareError;

pub const CODE_PARAM: &str = "code";

/// Characters `encodeURIComponent` leaves alone but `urlencoding` escapes
const URI_COMPONENT_UNRESERVED: &[(&str, &str)] = &[
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

fn encode_uri_component(text: &str) -> String {
    let mut encoded = urlencoding::encode(text).into_owned();
    for (escaped, raw) in URI_COMPONENT_UNRESERVED {
        encoded = encoded.replace(escaped, raw);
    }
    encoded
}

/// Build a link that opens `source` in the playground at `base_url`
pub fn encode_share_url(base_url: &str, source: &str) -> String {
    let payload = STANDARD.encode(encode_uri_component(source));
    let base = base_url.split(['?', '#']).next().unwrap_or_default();
    format!("{}?{}={}", base, CODE_PARAM, urlencoding::encode(&payload))
}

/// Recover the source from a share link, a query string, or the bare value
pub fn decode_share_url(input: &str) -> Result<String, ShareError> {
    let raw = code_param(input.trim())?;

    // Links copied from a browser may have '+' turned into a space
    let value = urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
        .replace(' ', "+");
    if value.is_empty() {
        return Err(ShareError::MissingCode);
    }

    let bytes = STANDARD.decode(value.as_bytes())?;
    let percent_encoded = String::from_utf8(bytes)?;
    let source = urlencoding::decode(&percent_encoded)
        .map(|s| s.into_owned())
        .map_err(ShareError::Utf8)?;
    Ok(source)
}

fn code_param(input: &str) -> Result<&str, ShareError> {
    let without_fragment = input.split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None if without_fragment.contains('=') => without_fragment,
        None => return Ok(without_fragment),
    };

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == CODE_PARAM)
        .map(|(_, value)| value)
        .ok_or(ShareError::MissingCode)
}
